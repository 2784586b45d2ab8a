//! In-memory backend for tests and offline demos.
//!
//! Implements every repository trait plus [`ObjectStorage`]. Owner filters
//! are enforced the way the hosted row policies enforce them, every call is
//! recorded, and individual operations can be made to fail.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::sync::Mutex;

use super::{DocumentRepository, NoteRepository, ProfileRepository};
use crate::models::{Document, DocumentId, NewDocument, NewNote, Note, NoteId, Profile};
use crate::storage::ObjectStorage;
use crate::{Error, Result};

const PUBLIC_BASE_URL: &str = "https://memory.supabase.co/storage/v1/object/public";

/// Operations recorded by [`MemoryBackend`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryOp {
    ListDocuments,
    InsertDocument,
    SetFavorite,
    DeleteDocument,
    ListNotes,
    InsertNote,
    UpdateNote,
    DeleteNote,
    FetchProfile,
    CreateProfile,
    UpdateProfileName,
    UpsertProfileAvatar,
    Upload,
    Remove,
}

/// A stored object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

#[derive(Default)]
struct State {
    documents: Vec<Document>,
    notes: Vec<Note>,
    profiles: HashMap<String, Profile>,
    objects: BTreeMap<(String, String), StoredObject>,
    next_id: i64,
    calls: Vec<MemoryOp>,
    failures: HashSet<MemoryOp>,
}

impl State {
    fn begin(&mut self, op: MemoryOp) -> Result<()> {
        self.calls.push(op);
        if self.failures.contains(&op) {
            return Err(injected_failure(op));
        }
        Ok(())
    }

    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// Strictly increasing creation times so newest-first ordering is stable.
    fn next_timestamp(&self) -> chrono::DateTime<Utc> {
        Utc::now() + Duration::milliseconds(self.next_id)
    }
}

fn injected_failure(op: MemoryOp) -> Error {
    match op {
        MemoryOp::Upload | MemoryOp::Remove => {
            Error::Storage(format!("injected failure for {op:?}"))
        }
        _ => Error::Table {
            code: "injected".to_string(),
            message: format!("injected failure for {op:?}"),
        },
    }
}

/// Shared in-memory tables and buckets. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<State>>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later call of `op` fail until [`Self::clear_failures`].
    pub async fn fail_on(&self, op: MemoryOp) {
        self.state.lock().await.failures.insert(op);
    }

    pub async fn clear_failures(&self) {
        self.state.lock().await.failures.clear();
    }

    pub async fn calls(&self) -> Vec<MemoryOp> {
        self.state.lock().await.calls.clone()
    }

    pub async fn call_count(&self, op: MemoryOp) -> usize {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|call| **call == op)
            .count()
    }

    pub async fn reset_calls(&self) {
        self.state.lock().await.calls.clear();
    }

    /// Every document row regardless of owner
    pub async fn all_documents(&self) -> Vec<Document> {
        self.state.lock().await.documents.clone()
    }

    /// Every note row regardless of owner
    pub async fn all_notes(&self) -> Vec<Note> {
        self.state.lock().await.notes.clone()
    }

    pub async fn profile(&self, id: &str) -> Option<Profile> {
        self.state.lock().await.profiles.get(id).cloned()
    }

    pub async fn object(&self, bucket: &str, path: &str) -> Option<StoredObject> {
        self.state
            .lock()
            .await
            .objects
            .get(&(bucket.to_string(), path.to_string()))
            .cloned()
    }

    /// Object keys currently stored in `bucket`
    pub async fn object_paths(&self, bucket: &str) -> Vec<String> {
        self.state
            .lock()
            .await
            .objects
            .keys()
            .filter(|(candidate, _)| candidate == bucket)
            .map(|(_, path)| path.clone())
            .collect()
    }

    /// Seed a profile row without recording a call
    pub async fn seed_profile(&self, profile: Profile) {
        self.state
            .lock()
            .await
            .profiles
            .insert(profile.id.clone(), profile);
    }

    /// Seed an object without recording a call and return its public URL
    pub async fn seed_object(&self, bucket: &str, path: &str, bytes: Vec<u8>) -> String {
        self.state.lock().await.objects.insert(
            (bucket.to_string(), path.to_string()),
            StoredObject {
                bytes,
                content_type: None,
            },
        );
        self.public_url(bucket, path)
    }
}

impl DocumentRepository for MemoryBackend {
    async fn list_documents(&self, owner_id: &str) -> Result<Vec<Document>> {
        let mut state = self.state.lock().await;
        state.begin(MemoryOp::ListDocuments)?;
        let mut documents: Vec<Document> = state
            .documents
            .iter()
            .filter(|document| document.owner_id == owner_id)
            .cloned()
            .collect();
        documents.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(documents)
    }

    async fn insert_document(&self, document: &NewDocument) -> Result<Document> {
        let mut state = self.state.lock().await;
        state.begin(MemoryOp::InsertDocument)?;
        let id = state.allocate_id();
        let row = Document {
            id: DocumentId(id),
            name: document.name.clone(),
            file_url: document.file_url.clone(),
            created_at: state.next_timestamp(),
            owner_id: document.owner_id.clone(),
            is_favorite: document.is_favorite,
            is_offline: document.is_offline,
            file_type: document.file_type,
        };
        state.documents.push(row.clone());
        Ok(row)
    }

    async fn set_favorite(
        &self,
        owner_id: &str,
        id: DocumentId,
        is_favorite: bool,
    ) -> Result<Document> {
        let mut state = self.state.lock().await;
        state.begin(MemoryOp::SetFavorite)?;
        let row = state
            .documents
            .iter_mut()
            .find(|document| document.id == id && document.owner_id == owner_id)
            .ok_or_else(|| Error::NotFound(format!("document {id}")))?;
        row.is_favorite = is_favorite;
        Ok(row.clone())
    }

    async fn delete_document(&self, owner_id: &str, id: DocumentId) -> Result<bool> {
        let mut state = self.state.lock().await;
        state.begin(MemoryOp::DeleteDocument)?;
        let before = state.documents.len();
        state
            .documents
            .retain(|document| !(document.id == id && document.owner_id == owner_id));
        Ok(state.documents.len() < before)
    }
}

impl NoteRepository for MemoryBackend {
    async fn list_notes(&self, owner_id: &str) -> Result<Vec<Note>> {
        let mut state = self.state.lock().await;
        state.begin(MemoryOp::ListNotes)?;
        let mut notes: Vec<Note> = state
            .notes
            .iter()
            .filter(|note| note.owner_id == owner_id)
            .cloned()
            .collect();
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(notes)
    }

    async fn insert_note(&self, note: &NewNote) -> Result<Note> {
        let mut state = self.state.lock().await;
        state.begin(MemoryOp::InsertNote)?;
        let id = state.allocate_id();
        let row = Note {
            id: NoteId(id),
            title: note.title.clone(),
            content: note.content.clone(),
            created_at: state.next_timestamp(),
            owner_id: note.owner_id.clone(),
        };
        state.notes.push(row.clone());
        Ok(row)
    }

    async fn update_note(
        &self,
        owner_id: &str,
        id: NoteId,
        title: &str,
        content: &str,
    ) -> Result<Note> {
        let mut state = self.state.lock().await;
        state.begin(MemoryOp::UpdateNote)?;
        let row = state
            .notes
            .iter_mut()
            .find(|note| note.id == id && note.owner_id == owner_id)
            .ok_or_else(|| Error::NotFound(format!("note {id}")))?;
        row.title = title.to_string();
        row.content = content.to_string();
        Ok(row.clone())
    }

    async fn delete_note(&self, owner_id: &str, id: NoteId) -> Result<bool> {
        let mut state = self.state.lock().await;
        state.begin(MemoryOp::DeleteNote)?;
        let before = state.notes.len();
        state
            .notes
            .retain(|note| !(note.id == id && note.owner_id == owner_id));
        Ok(state.notes.len() < before)
    }
}

impl ProfileRepository for MemoryBackend {
    async fn fetch_profile(&self, id: &str) -> Result<Option<Profile>> {
        let mut state = self.state.lock().await;
        state.begin(MemoryOp::FetchProfile)?;
        Ok(state.profiles.get(id).cloned())
    }

    async fn create_profile(&self, profile: &Profile) -> Result<Profile> {
        let mut state = self.state.lock().await;
        state.begin(MemoryOp::CreateProfile)?;
        state.profiles.insert(profile.id.clone(), profile.clone());
        Ok(profile.clone())
    }

    async fn update_profile_name(&self, id: &str, full_name: Option<&str>) -> Result<Profile> {
        let mut state = self.state.lock().await;
        state.begin(MemoryOp::UpdateProfileName)?;
        let row = state
            .profiles
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("profile {id}")))?;
        row.full_name = full_name.map(ToOwned::to_owned);
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn upsert_profile_avatar(&self, id: &str, avatar_url: &str) -> Result<Profile> {
        let mut state = self.state.lock().await;
        state.begin(MemoryOp::UpsertProfileAvatar)?;
        let row = state
            .profiles
            .entry(id.to_string())
            .or_insert_with(|| Profile::blank(id));
        row.avatar_url = Some(avatar_url.to_string());
        row.updated_at = Utc::now();
        Ok(row.clone())
    }
}

impl ObjectStorage for MemoryBackend {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<String> {
        let mut state = self.state.lock().await;
        state.begin(MemoryOp::Upload)?;
        let key = (bucket.to_string(), path.to_string());
        if state.objects.contains_key(&key) {
            return Err(Error::Storage(format!(
                "Storage upload failed for {bucket}/{path}: The resource already exists"
            )));
        }
        state.objects.insert(
            key,
            StoredObject {
                bytes,
                content_type: content_type.map(ToOwned::to_owned),
            },
        );
        Ok(self.public_url(bucket, path))
    }

    async fn remove(&self, bucket: &str, paths: &[String]) -> Result<()> {
        let mut state = self.state.lock().await;
        state.begin(MemoryOp::Remove)?;
        for path in paths {
            state.objects.remove(&(bucket.to_string(), path.clone()));
        }
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{PUBLIC_BASE_URL}/{bucket}/{path}")
    }
}
