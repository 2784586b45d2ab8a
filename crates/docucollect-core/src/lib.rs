//! docucollect-core - Core library for DocuCollect
//!
//! This crate holds the models, the hosted-backend clients (auth, table rows,
//! object storage), and the UI-agnostic managers used by every DocuCollect
//! front end.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod gate;
pub mod models;
pub mod rest;
pub mod services;
pub mod storage;
pub mod util;

pub use error::{Error, Result};
pub use models::{Account, Document, DocumentId, FileType, Note, NoteId, Profile};
