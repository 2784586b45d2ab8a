//! Document collection: list, add (upload or link), favorite, delete and
//! client-side filtering for one account.

use super::{track, FileUpload};
use crate::config::DOCUMENTS_BUCKET;
use crate::db::DocumentRepository;
use crate::models::{Account, Document, DocumentId, FileType, NewDocument};
use crate::storage::{document_object_path, ObjectStorage};
use crate::util::is_http_url;
use crate::{Error, Result};

/// Input of the add-document form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddDocument {
    pub name: String,
    pub file: Option<FileUpload>,
    pub link: Option<String>,
}

impl AddDocument {
    #[must_use]
    pub fn upload(name: impl Into<String>, file: FileUpload) -> Self {
        Self {
            name: name.into(),
            file: Some(file),
            link: None,
        }
    }

    #[must_use]
    pub fn link(name: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file: None,
            link: Some(link.into()),
        }
    }
}

/// Where a validated document comes from
enum Source {
    Upload(FileUpload),
    Link(String),
}

/// Check the form before any network call. A file wins over a link.
fn validate(request: AddDocument) -> Result<(String, Source)> {
    let name = request.name.trim().to_string();
    if name.is_empty() {
        return Err(Error::InvalidInput("Document name is required".to_string()));
    }

    if let Some(file) = request.file {
        if file.bytes.is_empty() {
            return Err(Error::InvalidInput(format!(
                "File '{}' is empty",
                file.file_name
            )));
        }
        return Ok((name, Source::Upload(file)));
    }

    match request.link.map(|link| link.trim().to_string()) {
        Some(link) if is_http_url(&link) => Ok((name, Source::Link(link))),
        Some(link) if !link.is_empty() => Err(Error::InvalidInput(
            "Link must start with http:// or https://".to_string(),
        )),
        _ => Err(Error::InvalidInput(
            "Choose a file or enter a link".to_string(),
        )),
    }
}

/// Client-side filter over the fetched list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentFilter {
    pub favorites_only: bool,
    pub file_type: Option<FileType>,
    /// Case-insensitive substring of the name
    pub query: Option<String>,
}

impl DocumentFilter {
    #[must_use]
    pub fn matches(&self, document: &Document) -> bool {
        if self.favorites_only && !document.is_favorite {
            return false;
        }
        if self
            .file_type
            .is_some_and(|file_type| document.file_type != file_type)
        {
            return false;
        }
        match self.query.as_deref().map(str::trim) {
            Some(query) if !query.is_empty() => document
                .name
                .to_lowercase()
                .contains(&query.to_lowercase()),
            _ => true,
        }
    }
}

/// Documents of the signed-in account
pub struct DocumentCollection<R, S> {
    account: Account,
    repository: R,
    storage: S,
    documents: Vec<Document>,
    error: Option<String>,
}

impl<R: DocumentRepository, S: ObjectStorage> DocumentCollection<R, S> {
    pub const fn new(account: Account, repository: R, storage: S) -> Self {
        Self {
            account,
            repository,
            storage,
            documents: Vec::new(),
            error: None,
        }
    }

    pub const fn account(&self) -> &Account {
        &self.account
    }

    /// Last fetched list, newest first
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn filtered(&self, filter: &DocumentFilter) -> Vec<&Document> {
        self.documents
            .iter()
            .filter(|document| filter.matches(document))
            .collect()
    }

    /// Message of the last failed operation
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Fetch the owner's documents, newest first.
    pub async fn load(&mut self) -> Result<()> {
        let result = self.fetch().await;
        track(&mut self.error, result)
    }

    /// Add a document from an uploaded file or an external link, then reload.
    pub async fn add(&mut self, request: AddDocument) -> Result<Document> {
        let result = self.add_inner(request).await;
        track(&mut self.error, result)
    }

    pub async fn add_upload(
        &mut self,
        name: impl Into<String>,
        file: FileUpload,
    ) -> Result<Document> {
        self.add(AddDocument::upload(name, file)).await
    }

    pub async fn add_link(
        &mut self,
        name: impl Into<String>,
        link: impl Into<String>,
    ) -> Result<Document> {
        self.add(AddDocument::link(name, link)).await
    }

    /// Delete a document row, then its stored object when it lives in the
    /// documents bucket, then reload.
    pub async fn delete(&mut self, id: DocumentId) -> Result<()> {
        let result = self.delete_inner(id).await;
        track(&mut self.error, result)
    }

    /// Flip the favorite flag and mirror the stored value locally.
    pub async fn toggle_favorite(&mut self, id: DocumentId) -> Result<bool> {
        let result = self.toggle_favorite_inner(id).await;
        track(&mut self.error, result)
    }

    async fn fetch(&mut self) -> Result<()> {
        self.documents = self.repository.list_documents(&self.account.id).await?;
        Ok(())
    }

    async fn add_inner(&mut self, request: AddDocument) -> Result<Document> {
        let (name, source) = validate(request)?;

        let (file_url, file_type, uploaded_path) = match source {
            Source::Upload(file) => {
                let path = document_object_path(&self.account.id, &file.file_name)?;
                let content_type = file.effective_content_type();
                let file_type = FileType::from_file_name(&file.file_name);
                let url = self
                    .storage
                    .upload(DOCUMENTS_BUCKET, &path, file.bytes, Some(&content_type))
                    .await?;
                (url, file_type, Some(path))
            }
            Source::Link(link) => (link, FileType::Unknown, None),
        };

        let row = NewDocument {
            name,
            file_url,
            owner_id: self.account.id.clone(),
            is_offline: uploaded_path.is_some(),
            file_type,
            is_favorite: false,
        };

        let document = match self.repository.insert_document(&row).await {
            Ok(document) => document,
            Err(error) => {
                if let Some(path) = uploaded_path {
                    self.discard_object(&path).await;
                }
                return Err(error);
            }
        };
        tracing::info!("Added document {} ({})", document.id, document.file_type);

        self.fetch().await?;
        Ok(document)
    }

    async fn delete_inner(&mut self, id: DocumentId) -> Result<()> {
        let file_url = self
            .documents
            .iter()
            .find(|document| document.id == id)
            .map(|document| document.file_url.clone())
            .ok_or_else(|| Error::NotFound(format!("document {id}")))?;

        let removed = self
            .repository
            .delete_document(&self.account.id, id)
            .await?;
        if removed {
            tracing::info!("Deleted document {id}");
        }

        let object_result = match self
            .storage
            .object_path_from_public_url(DOCUMENTS_BUCKET, &file_url)
        {
            Some(path) => self.storage.remove(DOCUMENTS_BUCKET, &[path]).await,
            None => Ok(()),
        };

        let reloaded = self.fetch().await;
        object_result?;
        reloaded
    }

    async fn toggle_favorite_inner(&mut self, id: DocumentId) -> Result<bool> {
        let current = self
            .documents
            .iter()
            .find(|document| document.id == id)
            .map(|document| document.is_favorite)
            .ok_or_else(|| Error::NotFound(format!("document {id}")))?;

        let updated = self
            .repository
            .set_favorite(&self.account.id, id, !current)
            .await?;
        if let Some(local) = self.documents.iter_mut().find(|document| document.id == id) {
            local.is_favorite = updated.is_favorite;
        }
        Ok(updated.is_favorite)
    }

    async fn discard_object(&self, path: &str) {
        if let Err(error) = self
            .storage
            .remove(DOCUMENTS_BUCKET, &[path.to_string()])
            .await
        {
            tracing::warn!("Failed to remove orphaned upload {path}: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::db::memory::{MemoryBackend, MemoryOp};

    fn account(id: &str) -> Account {
        Account::new(id, Some(format!("{id}@example.com")))
    }

    fn collection(
        backend: &MemoryBackend,
        owner: &str,
    ) -> DocumentCollection<MemoryBackend, MemoryBackend> {
        DocumentCollection::new(account(owner), backend.clone(), backend.clone())
    }

    fn pdf(name: &str) -> FileUpload {
        FileUpload::new(name, b"%PDF-1.7".to_vec())
    }

    #[tokio::test]
    async fn documents_never_leak_across_accounts() {
        let backend = MemoryBackend::new();
        let mut alice = collection(&backend, "alice");
        let mut bob = collection(&backend, "bob");

        alice.add_upload("Passport", pdf("passport.pdf")).await.unwrap();
        alice
            .add_link("Bank", "https://bank.example.com/statement")
            .await
            .unwrap();
        bob.load().await.unwrap();

        assert!(bob.documents().is_empty());
        assert_eq!(alice.documents().len(), 2);
        assert!(alice
            .documents()
            .iter()
            .all(|document| document.owner_id == "alice"));
    }

    #[tokio::test]
    async fn upload_tags_file_type_from_extension() {
        let cases = [
            ("a.pdf", FileType::Pdf),
            ("b.DOCX", FileType::Doc),
            ("c.doc", FileType::Doc),
            ("d.jpeg", FileType::Jpg),
            ("e.JPG", FileType::Jpg),
            ("f.png", FileType::Png),
            ("g.gif", FileType::Gif),
            ("h.txt", FileType::Unknown),
            ("noext", FileType::Unknown),
        ];
        let backend = MemoryBackend::new();
        let mut documents = collection(&backend, "alice");

        for (file_name, expected) in cases {
            let document = documents
                .add_upload(file_name, FileUpload::new(file_name, vec![1]))
                .await
                .unwrap();
            assert_eq!(document.file_type, expected, "{file_name}");
            assert!(document.is_offline);
        }
    }

    #[tokio::test]
    async fn upload_stores_object_under_owner_namespace() {
        let backend = MemoryBackend::new();
        let mut documents = collection(&backend, "alice");

        let document = documents.add_upload("Scan", pdf("scan.pdf")).await.unwrap();

        let paths = backend.object_paths(DOCUMENTS_BUCKET).await;
        assert_eq!(paths.len(), 1);
        assert!(paths[0].starts_with("alice/"));
        assert!(paths[0].ends_with(".pdf"));
        assert_eq!(
            backend.object(DOCUMENTS_BUCKET, &paths[0]).await.unwrap().content_type,
            Some("application/pdf".to_string())
        );
        assert_eq!(
            backend.object_path_from_public_url(DOCUMENTS_BUCKET, &document.file_url),
            Some(paths[0].clone())
        );
    }

    #[tokio::test]
    async fn deleting_bucket_document_removes_object() {
        let backend = MemoryBackend::new();
        let mut documents = collection(&backend, "alice");
        let document = documents.add_upload("Scan", pdf("scan.pdf")).await.unwrap();

        documents.delete(document.id).await.unwrap();

        assert_eq!(backend.call_count(MemoryOp::Remove).await, 1);
        assert!(backend.object_paths(DOCUMENTS_BUCKET).await.is_empty());
        assert!(documents.documents().is_empty());
    }

    #[tokio::test]
    async fn deleting_linked_document_leaves_storage_alone() {
        let backend = MemoryBackend::new();
        let mut documents = collection(&backend, "alice");
        let document = documents
            .add_link("Bank", "https://bank.example.com/statement.pdf")
            .await
            .unwrap();

        documents.delete(document.id).await.unwrap();

        assert_eq!(backend.call_count(MemoryOp::Remove).await, 0);
        assert!(backend.all_documents().await.is_empty());
    }

    #[tokio::test]
    async fn row_is_deleted_before_object() {
        let backend = MemoryBackend::new();
        let mut documents = collection(&backend, "alice");
        let document = documents.add_upload("Scan", pdf("scan.pdf")).await.unwrap();
        backend.fail_on(MemoryOp::Remove).await;

        let result = documents.delete(document.id).await;

        assert!(matches!(result, Err(Error::Storage(_))));
        assert!(documents.error().is_some());
        assert!(backend.all_documents().await.is_empty());
        assert_eq!(backend.object_paths(DOCUMENTS_BUCKET).await.len(), 1);
    }

    #[tokio::test]
    async fn object_error_survives_failed_reload() {
        let backend = MemoryBackend::new();
        let mut documents = collection(&backend, "alice");
        let document = documents.add_upload("Scan", pdf("scan.pdf")).await.unwrap();
        backend.fail_on(MemoryOp::Remove).await;
        backend.fail_on(MemoryOp::ListDocuments).await;

        let result = documents.delete(document.id).await;

        assert!(matches!(result, Err(Error::Storage(_))));
        assert!(backend.all_documents().await.is_empty());
    }

    #[tokio::test]
    async fn links_are_tagged_unknown() {
        let backend = MemoryBackend::new();
        let mut documents = collection(&backend, "alice");

        let plain = documents
            .add_link("Report", "https://example.com/report.pdf")
            .await
            .unwrap();
        let with_query = documents
            .add_link("Report copy", "https://example.com/report.pdf?dl=1")
            .await
            .unwrap();

        assert_eq!(plain.file_type, FileType::Unknown);
        assert_eq!(with_query.file_type, FileType::Unknown);
        assert!(!plain.is_offline);
    }

    #[tokio::test]
    async fn favorite_toggle_twice_restores_state() {
        let backend = MemoryBackend::new();
        let mut documents = collection(&backend, "alice");
        let document = documents.add_link("Link", "https://example.com").await.unwrap();
        backend.reset_calls().await;

        assert!(documents.toggle_favorite(document.id).await.unwrap());
        assert!(documents.documents()[0].is_favorite);
        assert!(!documents.toggle_favorite(document.id).await.unwrap());

        assert!(!documents.documents()[0].is_favorite);
        assert_eq!(backend.call_count(MemoryOp::SetFavorite).await, 2);
        assert_eq!(backend.call_count(MemoryOp::ListDocuments).await, 0);
        assert!(!backend.all_documents().await[0].is_favorite);
    }

    #[tokio::test]
    async fn validation_fails_before_network() {
        let backend = MemoryBackend::new();
        let mut documents = collection(&backend, "alice");

        let cases = [
            AddDocument::link("   ", "https://example.com"),
            AddDocument {
                name: "Nothing".to_string(),
                file: None,
                link: None,
            },
            AddDocument::link("Bad", "ftp://example.com/file"),
            AddDocument::upload("Empty", FileUpload::new("empty.pdf", Vec::new())),
        ];
        for request in cases {
            assert!(matches!(
                documents.add(request).await,
                Err(Error::InvalidInput(_))
            ));
        }

        assert!(documents.error().is_some());
        assert!(backend.calls().await.is_empty());
    }

    #[tokio::test]
    async fn file_wins_over_link() {
        let backend = MemoryBackend::new();
        let mut documents = collection(&backend, "alice");

        let document = documents
            .add(AddDocument {
                name: "Both".to_string(),
                file: Some(pdf("both.pdf")),
                link: Some("https://example.com/ignored".to_string()),
            })
            .await
            .unwrap();

        assert!(document.is_offline);
        assert!(!document.file_url.contains("ignored"));
    }

    #[tokio::test]
    async fn failed_insert_removes_uploaded_object() {
        let backend = MemoryBackend::new();
        let mut documents = collection(&backend, "alice");
        backend.fail_on(MemoryOp::InsertDocument).await;

        let result = documents.add_upload("Scan", pdf("scan.pdf")).await;

        assert!(matches!(result, Err(Error::Table { .. })));
        assert!(backend.object_paths(DOCUMENTS_BUCKET).await.is_empty());
        assert!(backend.all_documents().await.is_empty());
    }

    #[tokio::test]
    async fn success_clears_previous_error() {
        let backend = MemoryBackend::new();
        let mut documents = collection(&backend, "alice");
        backend.fail_on(MemoryOp::ListDocuments).await;
        assert!(documents.load().await.is_err());
        assert!(documents.error().unwrap().contains("injected"));

        backend.clear_failures().await;
        documents.load().await.unwrap();
        assert_eq!(documents.error(), None);
    }

    #[tokio::test]
    async fn filters_apply_to_fetched_list() {
        let backend = MemoryBackend::new();
        let mut documents = collection(&backend, "alice");
        let tax = documents.add_upload("Tax Return", pdf("tax.pdf")).await.unwrap();
        documents
            .add_upload("Holiday photo", FileUpload::new("beach.png", vec![1]))
            .await
            .unwrap();
        documents
            .add_link("Return policy", "https://shop.example.com/returns")
            .await
            .unwrap();
        documents.toggle_favorite(tax.id).await.unwrap();

        let names = |filter: &DocumentFilter| -> Vec<String> {
            documents
                .filtered(filter)
                .into_iter()
                .map(|document| document.name.clone())
                .collect()
        };

        assert_eq!(names(&DocumentFilter::default()).len(), 3);
        assert_eq!(
            names(&DocumentFilter {
                favorites_only: true,
                ..DocumentFilter::default()
            }),
            vec!["Tax Return".to_string()]
        );
        assert_eq!(
            names(&DocumentFilter {
                file_type: Some(FileType::Png),
                ..DocumentFilter::default()
            }),
            vec!["Holiday photo".to_string()]
        );
        assert_eq!(
            names(&DocumentFilter {
                query: Some("RETURN".to_string()),
                ..DocumentFilter::default()
            }),
            vec!["Return policy".to_string(), "Tax Return".to_string()]
        );
    }

    #[tokio::test]
    async fn unknown_document_is_not_found() {
        let backend = MemoryBackend::new();
        let mut documents = collection(&backend, "alice");
        assert!(matches!(
            documents.delete(DocumentId(42)).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            documents.toggle_favorite(DocumentId(42)).await,
            Err(Error::NotFound(_))
        ));
    }
}
