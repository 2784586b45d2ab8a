use std::path::Path;

use chrono::{DateTime, Utc};
use docucollect_core::auth::{AuthSession, AuthStore, SupabaseAuthClient};
use docucollect_core::config::BackendConfig;
use docucollect_core::db::PostgrestRepository;
use docucollect_core::gate::{Route, SessionGate, View};
use docucollect_core::rest::PostgrestClient;
use docucollect_core::services::FileUpload;
use docucollect_core::storage::SupabaseStorage;
use docucollect_core::{Account, Document, Note};
use serde::Serialize;

use crate::auth::SessionStore;
use crate::config_profiles::{default_config_path, CliProfile, CliProfilesConfig};
use crate::error::CliError;

pub const CALLBACK_PATH: &str = "/auth/callback";
pub const RESET_PASSWORD_PATH: &str = "/reset-password";

/// Resolved profile, backend clients and the restored session.
pub struct AppContext {
    pub profile_name: String,
    pub profile: CliProfile,
    pub backend: BackendConfig,
    pub auth: SupabaseAuthClient<SessionStore>,
    pub store: AuthStore,
}

impl AppContext {
    /// Load the profile and restore its stored session (refreshing it when
    /// expired).
    pub async fn open(global_profile: Option<&str>) -> Result<Self, CliError> {
        let config = CliProfilesConfig::load_from_path(&default_config_path()?)?;
        let profile_name = config.resolve_profile_name(global_profile);
        let profile = config.profile(&profile_name).cloned().unwrap_or_default();
        let backend = profile
            .backend_config(|key| std::env::var(key).ok())?
            .ok_or_else(|| {
                CliError::Config(format!(
                    "Profile '{profile_name}' has no backend configured. Run `docucollect config init --supabase-url <URL> --supabase-anon-key <KEY>` or set SUPABASE_URL and SUPABASE_ANON_KEY."
                ))
            })?;

        let store = SessionStore::new(&profile_name, &backend);
        let auth = SupabaseAuthClient::from_config(&backend, store)?;
        let session = auth.restore_session().await?;
        tracing::debug!("Opened profile '{profile_name}'");

        Ok(Self {
            profile_name,
            profile,
            backend,
            auth,
            store: AuthStore::new(session),
        })
    }

    pub fn session(&self) -> Option<AuthSession> {
        self.store.session()
    }

    /// Account allowed into `route`, or `NotSignedIn`.
    pub fn require_account(&self, route: Route) -> Result<Account, CliError> {
        match SessionGate::resolve(route, self.session().as_ref()) {
            View::Workspace(account) | View::Profile(account) | View::ResetPassword(account) => {
                Ok(account)
            }
            _ => Err(CliError::NotSignedIn),
        }
    }

    pub fn repository(&self) -> Result<PostgrestRepository, CliError> {
        let client = PostgrestClient::new(&self.backend, self.store.require_access_token()?)?;
        Ok(PostgrestRepository::new(client))
    }

    pub fn storage(&self) -> Result<SupabaseStorage, CliError> {
        Ok(SupabaseStorage::new(
            self.backend.clone(),
            self.store.require_access_token()?,
        )?)
    }

    pub fn redirect_url(&self, path: &str) -> Option<String> {
        self.profile.redirect_url(path)
    }
}

/// Read a local file into an upload.
pub fn read_upload(path: &Path) -> Result<FileUpload, CliError> {
    let bytes = std::fs::read(path)?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| CliError::Config(format!("'{}' is not a file path", path.display())))?;
    Ok(FileUpload::new(file_name, bytes))
}

#[derive(Debug, Serialize)]
pub struct DocumentListItem {
    pub id: i64,
    pub name: String,
    pub file_url: String,
    pub file_type: String,
    pub is_favorite: bool,
    pub uploaded: bool,
    pub created_at: String,
}

impl From<&Document> for DocumentListItem {
    fn from(document: &Document) -> Self {
        Self {
            id: document.id.0,
            name: document.name.clone(),
            file_url: document.file_url.clone(),
            file_type: document.file_type.to_string(),
            is_favorite: document.is_favorite,
            uploaded: document.is_offline,
            created_at: document.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NoteListItem {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created_at: String,
}

impl From<&Note> for NoteListItem {
    fn from(note: &Note) -> Self {
        Self {
            id: note.id.0,
            title: note.title.clone(),
            content: note.content.clone(),
            created_at: note.created_at.to_rfc3339(),
        }
    }
}

pub fn format_document_lines(documents: &[&Document], now: DateTime<Utc>) -> Vec<String> {
    documents
        .iter()
        .map(|document| {
            let star = if document.is_favorite { "*" } else { " " };
            format!(
                "{star} {:>5}  {:<7}  {}  ({})",
                document.id.0,
                document.file_type.as_str(),
                document.name,
                format_relative_time(document.created_at, now)
            )
        })
        .collect()
}

pub fn format_note_lines(notes: &[Note], now: DateTime<Utc>) -> Vec<String> {
    notes
        .iter()
        .map(|note| {
            format!(
                "{:>5}  {}: {}  ({})",
                note.id.0,
                note.title,
                note.preview(60),
                format_relative_time(note.created_at, now)
            )
        })
        .collect()
}

pub fn format_relative_time(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - timestamp).num_seconds().max(0);
    if seconds < 60 {
        "just now".to_string()
    } else if seconds < 3_600 {
        format!("{}m ago", seconds / 60)
    } else if seconds < 86_400 {
        format!("{}h ago", seconds / 3_600)
    } else if seconds < 7 * 86_400 {
        format!("{}d ago", seconds / 86_400)
    } else {
        timestamp.format("%Y-%m-%d").to_string()
    }
}

/// Mask all but the last four characters of a key.
pub fn mask_secret(value: &str) -> String {
    let count = value.chars().count();
    if count <= 4 {
        return "*".repeat(count);
    }
    let tail: String = value.chars().skip(count - 4).collect();
    format!("{}{tail}", "*".repeat(count - 4))
}
