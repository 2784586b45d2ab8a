//! Object storage for uploaded documents and avatars.

use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::config::BackendConfig;
use crate::util::{compact_text, file_extension};
use crate::{Error, Result};

/// Object storage operations shared by the hosted bucket API and the
/// in-memory test backend.
#[allow(async_fn_in_trait)]
pub trait ObjectStorage {
    /// Store `bytes` at `path` inside `bucket` and return the public URL.
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<String>;

    /// Remove objects. Missing objects are not an error.
    async fn remove(&self, bucket: &str, paths: &[String]) -> Result<()>;

    /// Public URL for an object key.
    fn public_url(&self, bucket: &str, path: &str) -> String;

    /// Recover the object key from a public URL of `bucket`.
    ///
    /// Returns `None` for URLs that point anywhere else.
    fn object_path_from_public_url(&self, bucket: &str, url: &str) -> Option<String> {
        strip_public_prefix(&self.public_url(bucket, ""), url)
    }
}

/// Bucket API of the hosted backend.
#[derive(Clone)]
pub struct SupabaseStorage {
    config: BackendConfig,
    access_token: String,
    client: Client,
}

impl SupabaseStorage {
    pub fn new(config: BackendConfig, access_token: impl Into<String>) -> Result<Self> {
        let access_token = access_token.into();
        if access_token.trim().is_empty() {
            return Err(Error::NotSignedIn);
        }
        Ok(Self {
            config,
            access_token,
            client: Client::builder().build()?,
        })
    }

    fn object_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/object/{}/{}",
            self.config.storage_url(),
            encode_segment(bucket),
            encode_key(path)
        )
    }

    fn request(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.config.supabase_anon_key)
            .bearer_auth(&self.access_token)
    }
}

impl ObjectStorage for SupabaseStorage {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<String> {
        let path = normalize_object_key(path)?;
        let content_type = normalize_content_type(content_type)
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let size = bytes.len();

        let response = self
            .request(self.client.post(self.object_url(bucket, &path)))
            .header("Content-Type", content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(storage_error("upload", bucket, Some(&path), &body));
        }

        tracing::debug!("Uploaded {size} bytes to {bucket}/{path}");
        Ok(self.public_url(bucket, &path))
    }

    async fn remove(&self, bucket: &str, paths: &[String]) -> Result<()> {
        let prefixes = paths
            .iter()
            .map(|path| normalize_object_key(path))
            .collect::<Result<Vec<_>>>()?;
        if prefixes.is_empty() {
            return Ok(());
        }

        let url = format!(
            "{}/object/{}",
            self.config.storage_url(),
            encode_segment(bucket)
        );
        let response = self
            .request(self.client.delete(url))
            .json(&json!({ "prefixes": prefixes }))
            .send()
            .await?;
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(storage_error("remove", bucket, None, &body));
        }

        tracing::debug!("Removed {} object(s) from {bucket}", prefixes.len());
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}{}",
            self.config.public_object_prefix(bucket),
            path.trim_matches('/')
        )
    }
}

/// Build a collision-free object key for a document upload:
/// `<owner>/<uuid>.<ext>`.
pub fn document_object_path(owner_id: &str, file_name: &str) -> Result<String> {
    let owner = owner_id.trim();
    if owner.is_empty() || owner.contains('/') {
        return Err(Error::InvalidInput(
            "Object owner must be a non-empty identifier".to_string(),
        ));
    }
    Ok(format!("{owner}/{}", randomized_file_name(file_name)))
}

/// Build a collision-free avatar key: `<owner>-<uuid>.<ext>`.
pub fn avatar_object_path(owner_id: &str, file_name: &str) -> Result<String> {
    let owner = sanitize_token(owner_id);
    if owner.is_empty() {
        return Err(Error::InvalidInput(
            "Avatar owner must be a non-empty identifier".to_string(),
        ));
    }
    Ok(format!("{owner}-{}", randomized_file_name(file_name)))
}

fn randomized_file_name(file_name: &str) -> String {
    let id = Uuid::new_v4();
    match file_extension(&sanitize_file_name(file_name)) {
        Some(ext) => format!("{id}.{ext}"),
        None => id.to_string(),
    }
}

/// Content type for an upload: the caller's value when present, otherwise a
/// guess from the file name.
pub fn guess_content_type(file_name: &str, content_type: Option<&str>) -> String {
    normalize_content_type(content_type).unwrap_or_else(|| {
        mime_guess::from_path(file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    })
}

pub(crate) fn strip_public_prefix(prefix: &str, url: &str) -> Option<String> {
    let rest = url.trim().strip_prefix(prefix)?;
    let end = rest.find(['?', '#']).unwrap_or(rest.len());
    let path = rest[..end].trim_matches('/');
    if path.is_empty() {
        return None;
    }
    let decoded = urlencoding::decode(path).ok()?;
    Some(decoded.into_owned())
}

#[derive(Debug, Deserialize)]
struct StorageErrorResponse {
    error: Option<String>,
    message: Option<String>,
}

fn storage_error(operation: &str, bucket: &str, path: Option<&str>, body: &str) -> Error {
    let target = path.map_or_else(|| bucket.to_string(), |path| format!("{bucket}/{path}"));
    let detail = serde_json::from_str::<StorageErrorResponse>(body)
        .ok()
        .and_then(|payload| payload.message.or(payload.error))
        .unwrap_or_else(|| compact_text(body));
    Error::Storage(format!("Storage {operation} failed for {target}: {detail}"))
}

fn encode_segment(segment: &str) -> String {
    urlencoding::encode(segment.trim_matches('/')).into_owned()
}

fn encode_key(key: &str) -> String {
    key.trim_matches('/')
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn normalize_object_key(object_key: &str) -> Result<String> {
    let object_key = object_key.trim().trim_matches('/').to_string();
    if object_key.is_empty() {
        return Err(Error::InvalidInput(
            "Object path cannot be empty".to_string(),
        ));
    }
    if object_key.split('/').any(|segment| segment == "..") {
        return Err(Error::InvalidInput(format!(
            "Object path '{object_key}' must not contain '..'"
        )));
    }
    Ok(object_key)
}

fn normalize_content_type(content_type: Option<&str>) -> Option<String> {
    content_type
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

fn sanitize_file_name(file_name: &str) -> String {
    let trimmed = file_name.trim().trim_matches('/');
    let trimmed = trimmed.rsplit('/').next().unwrap_or(trimmed);
    if trimmed.is_empty() {
        return "file".to_string();
    }

    let (stem, ext) = trimmed
        .rsplit_once('.')
        .map_or((trimmed, ""), |parts| parts);
    let stem = sanitize_token(stem);
    let stem = if stem.is_empty() {
        "file".to_string()
    } else {
        stem
    };
    let ext = sanitize_token(ext);

    if ext.is_empty() {
        stem
    } else {
        format!("{stem}.{ext}")
    }
}

fn sanitize_token(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_dash = false;

    for ch in input.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }

    out.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::config::{AVATARS_BUCKET, DOCUMENTS_BUCKET};

    fn storage() -> SupabaseStorage {
        let config = BackendConfig::new("https://demo.supabase.co/", "anon").unwrap();
        SupabaseStorage::new(config, "token").unwrap()
    }

    #[test]
    fn document_path_is_namespaced_and_keeps_extension() {
        let path = document_object_path("user-1", "Tax Return 2024.PDF").unwrap();
        let (owner, file) = path.split_once('/').unwrap();
        assert_eq!(owner, "user-1");
        let (stem, ext) = file.rsplit_once('.').unwrap();
        assert_eq!(ext, "pdf");
        assert!(Uuid::parse_str(stem).is_ok());
    }

    #[test]
    fn document_paths_do_not_collide() {
        let first = document_object_path("user-1", "a.png").unwrap();
        let second = document_object_path("user-1", "a.png").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn document_path_without_extension() {
        let path = document_object_path("user-1", "README").unwrap();
        let (_, file) = path.split_once('/').unwrap();
        assert!(Uuid::parse_str(file).is_ok());
    }

    #[test]
    fn document_path_rejects_bad_owner() {
        assert!(document_object_path("  ", "a.pdf").is_err());
        assert!(document_object_path("a/b", "a.pdf").is_err());
    }

    #[test]
    fn avatar_path_uses_owner_prefix() {
        let path = avatar_object_path("user-1", "me.jpeg").unwrap();
        assert!(path.starts_with("user-1-"));
        assert!(path.ends_with(".jpeg"));
        assert!(!path.contains('/'));
    }

    #[test]
    fn sanitize_file_name_normalizes_tokens() {
        assert_eq!(sanitize_file_name(" My Résumé (final).PDF "), "my-r-sum-final.pdf");
        assert_eq!(sanitize_file_name("///"), "file");
        assert_eq!(sanitize_file_name("dir/sub/photo.png"), "photo.png");
        assert_eq!(sanitize_file_name("...png"), "file.png");
    }

    #[test]
    fn normalize_object_key_rejects_empty_and_traversal() {
        assert_eq!(normalize_object_key("/a/b.pdf/").unwrap(), "a/b.pdf");
        assert!(normalize_object_key("  / ").is_err());
        assert!(normalize_object_key("a/../b").is_err());
    }

    #[test]
    fn guess_content_type_prefers_explicit_value() {
        assert_eq!(guess_content_type("a.png", Some(" image/webp ")), "image/webp");
        assert_eq!(guess_content_type("a.png", None), "image/png");
        assert_eq!(guess_content_type("a.pdf", Some("")), "application/pdf");
        assert_eq!(
            guess_content_type("no-extension", None),
            "application/octet-stream"
        );
    }

    #[test]
    fn public_url_and_object_url_shapes() {
        let storage = storage();
        assert_eq!(
            storage.public_url(DOCUMENTS_BUCKET, "user-1/a b.pdf"),
            "https://demo.supabase.co/storage/v1/object/public/documents/user-1/a b.pdf"
        );
        assert_eq!(
            storage.object_url(DOCUMENTS_BUCKET, "user-1/a b.pdf"),
            "https://demo.supabase.co/storage/v1/object/documents/user-1/a%20b.pdf"
        );
    }

    #[test]
    fn object_path_is_recovered_from_public_url() {
        let storage = storage();
        assert_eq!(
            storage.object_path_from_public_url(
                AVATARS_BUCKET,
                "https://demo.supabase.co/storage/v1/object/public/avatars/user-1-abc.png?t=1"
            ),
            Some("user-1-abc.png".to_string())
        );
        assert_eq!(
            storage.object_path_from_public_url(
                DOCUMENTS_BUCKET,
                "https://demo.supabase.co/storage/v1/object/public/documents/user-1/My%20File.pdf"
            ),
            Some("user-1/My File.pdf".to_string())
        );
    }

    #[test]
    fn foreign_urls_have_no_object_path() {
        let storage = storage();
        assert_eq!(
            storage.object_path_from_public_url(DOCUMENTS_BUCKET, "https://example.com/a.pdf"),
            None
        );
        assert_eq!(
            storage.object_path_from_public_url(
                DOCUMENTS_BUCKET,
                "https://demo.supabase.co/storage/v1/object/public/avatars/x.png"
            ),
            None
        );
        assert_eq!(
            storage.object_path_from_public_url(
                DOCUMENTS_BUCKET,
                "https://demo.supabase.co/storage/v1/object/public/documents/"
            ),
            None
        );
    }

    #[test]
    fn storage_error_prefers_message_field() {
        let error = storage_error(
            "upload",
            "documents",
            Some("u/a.pdf"),
            r#"{"statusCode":"409","error":"Duplicate","message":"The resource already exists"}"#,
        );
        assert_eq!(
            error.to_string(),
            "Storage error: Storage upload failed for documents/u/a.pdf: The resource already exists"
        );
    }

    #[test]
    fn empty_token_is_not_signed_in() {
        let config = BackendConfig::new("https://demo.supabase.co", "anon").unwrap();
        assert!(matches!(
            SupabaseStorage::new(config, " "),
            Err(Error::NotSignedIn)
        ));
    }
}
