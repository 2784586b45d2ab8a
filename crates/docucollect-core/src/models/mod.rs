//! Data models for DocuCollect

mod account;
mod document;
mod note;
mod profile;

pub use account::Account;
pub use document::{Document, DocumentId, FileType, NewDocument};
pub use note::{NewNote, Note, NoteId};
pub use profile::Profile;
