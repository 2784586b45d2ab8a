pub mod auth_cmd;
pub mod common;
pub mod completions;
pub mod config;
pub mod documents;
pub mod home;
pub mod notes;
pub mod profile;
