//! Repositories over the three hosted tables.
//!
//! Every list, update and delete takes the owning account so the query is
//! scoped even where the server-side row policy would already do it.

pub mod memory;
mod postgrest;

pub use postgrest::PostgrestRepository;

use crate::models::{Document, DocumentId, NewDocument, NewNote, Note, NoteId, Profile};
use crate::Result;

pub const DOCUMENTS_TABLE: &str = "documents";
pub const NOTES_TABLE: &str = "notes";
pub const PROFILES_TABLE: &str = "profiles";

/// Storage operations for document rows
#[allow(async_fn_in_trait)]
pub trait DocumentRepository {
    /// Documents owned by `owner_id`, newest first
    async fn list_documents(&self, owner_id: &str) -> Result<Vec<Document>>;

    async fn insert_document(&self, document: &NewDocument) -> Result<Document>;

    /// Set the favorite flag. Fails with `NotFound` when no owned row matches.
    async fn set_favorite(
        &self,
        owner_id: &str,
        id: DocumentId,
        is_favorite: bool,
    ) -> Result<Document>;

    /// Delete an owned row. Returns `false` when nothing matched.
    async fn delete_document(&self, owner_id: &str, id: DocumentId) -> Result<bool>;
}

/// Storage operations for note rows
#[allow(async_fn_in_trait)]
pub trait NoteRepository {
    /// Notes owned by `owner_id`, newest first
    async fn list_notes(&self, owner_id: &str) -> Result<Vec<Note>>;

    async fn insert_note(&self, note: &NewNote) -> Result<Note>;

    /// Replace title and content of an owned note
    async fn update_note(
        &self,
        owner_id: &str,
        id: NoteId,
        title: &str,
        content: &str,
    ) -> Result<Note>;

    /// Delete an owned note. Returns `false` when nothing matched.
    async fn delete_note(&self, owner_id: &str, id: NoteId) -> Result<bool>;
}

/// Storage operations for profile rows (keyed by account id)
#[allow(async_fn_in_trait)]
pub trait ProfileRepository {
    async fn fetch_profile(&self, id: &str) -> Result<Option<Profile>>;

    /// Insert the profile, merging into an existing row with the same id
    async fn create_profile(&self, profile: &Profile) -> Result<Profile>;

    async fn update_profile_name(&self, id: &str, full_name: Option<&str>) -> Result<Profile>;

    async fn upsert_profile_avatar(&self, id: &str, avatar_url: &str) -> Result<Profile>;
}
