//! UI-agnostic managers behind the workspace and profile pages.
//!
//! Each manager owns its local list state and the last error message. A
//! handler's in-flight state is its pending future; front ends render the
//! loading indicator around the await.

pub mod documents;
pub mod notes;
pub mod profile;

pub use documents::{AddDocument, DocumentCollection, DocumentFilter};
pub use notes::{NoteDraft, NotesBoard};
pub use profile::{AvatarUpload, ProfileManager, MAX_AVATAR_BYTES};

use crate::storage::guess_content_type;

/// A file picked for upload
#[derive(Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub file_name: String,
    /// Declared content type; guessed from the name when absent
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    #[must_use]
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            bytes,
        }
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Declared content type, or a guess from the file name
    #[must_use]
    pub fn effective_content_type(&self) -> String {
        guess_content_type(&self.file_name, self.content_type.as_deref())
    }
}

impl std::fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileUpload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// Store the outcome's error message (or clear it on success) and pass the
/// result through.
fn track<T>(error: &mut Option<String>, result: crate::Result<T>) -> crate::Result<T> {
    match &result {
        Ok(_) => *error = None,
        Err(failure) => *error = Some(failure.to_string()),
    }
    result
}
