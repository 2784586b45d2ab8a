//! Session persistence in the OS keychain.
//!
//! Each entry is keyed by CLI profile and backend project host, so a profile
//! re-pointed at another project starts signed out instead of replaying a
//! token the new project never issued.

use docucollect_core::auth::{AuthError, AuthResult, AuthSession, SessionPersistence};
use docucollect_core::config::BackendConfig;

const KEYCHAIN_SERVICE: &str = "docucollect";
const SESSION_KEY_PREFIX: &str = "session";

/// Keychain entry holding one profile's session for one backend project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStore {
    key: String,
}

impl SessionStore {
    pub fn new(profile_name: &str, backend: &BackendConfig) -> Self {
        let project = backend
            .project_host()
            .unwrap_or_else(|| backend.supabase_url.clone());
        Self {
            key: format!("{SESSION_KEY_PREFIX}/{profile_name}@{project}"),
        }
    }

    /// Keychain account name of this entry
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl SessionPersistence for SessionStore {
    fn load_session(&self) -> AuthResult<Option<AuthSession>> {
        match vault::read(&self.key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn save_session(&self, session: &AuthSession) -> AuthResult<()> {
        vault::write(&self.key, &serde_json::to_string(session)?)
    }

    fn clear_session(&self) -> AuthResult<()> {
        vault::erase(&self.key)
    }
}

fn storage_error(error: impl std::fmt::Display) -> AuthError {
    AuthError::SecureStorage(error.to_string())
}

#[cfg(not(test))]
mod vault {
    use keyring::{Entry, Error};

    use super::{storage_error, KEYCHAIN_SERVICE};
    use docucollect_core::auth::AuthResult;

    fn entry(key: &str) -> AuthResult<Entry> {
        Entry::new(KEYCHAIN_SERVICE, key).map_err(storage_error)
    }

    pub fn read(key: &str) -> AuthResult<Option<String>> {
        match entry(key)?.get_password() {
            Ok(raw) => Ok(Some(raw)),
            Err(Error::NoEntry) => Ok(None),
            Err(error) => Err(storage_error(error)),
        }
    }

    pub fn write(key: &str, raw: &str) -> AuthResult<()> {
        entry(key)?.set_password(raw).map_err(storage_error)
    }

    pub fn erase(key: &str) -> AuthResult<()> {
        match entry(key)?.delete_credential() {
            Ok(()) | Err(Error::NoEntry) => Ok(()),
            Err(error) => Err(storage_error(error)),
        }
    }
}

/// Process-local stand-in for the keychain.
#[cfg(test)]
mod vault {
    use std::collections::HashMap;
    use std::sync::{Mutex, MutexGuard, OnceLock};

    use super::{storage_error, KEYCHAIN_SERVICE};
    use docucollect_core::auth::AuthResult;

    type Entries = HashMap<(&'static str, String), String>;

    fn entries() -> AuthResult<MutexGuard<'static, Entries>> {
        static ENTRIES: OnceLock<Mutex<Entries>> = OnceLock::new();
        ENTRIES
            .get_or_init(|| Mutex::new(HashMap::new()))
            .lock()
            .map_err(storage_error)
    }

    pub fn read(key: &str) -> AuthResult<Option<String>> {
        Ok(entries()?.get(&(KEYCHAIN_SERVICE, key.to_string())).cloned())
    }

    pub fn write(key: &str, raw: &str) -> AuthResult<()> {
        entries()?.insert((KEYCHAIN_SERVICE, key.to_string()), raw.to_string());
        Ok(())
    }

    pub fn erase(key: &str) -> AuthResult<()> {
        entries()?.remove(&(KEYCHAIN_SERVICE, key.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use docucollect_core::auth::AuthUser;
    use pretty_assertions::assert_eq;

    use super::*;

    fn backend(url: &str) -> BackendConfig {
        BackendConfig::new(url, "anon").unwrap()
    }

    fn session() -> AuthSession {
        AuthSession {
            access_token: "secret-access-token".to_string(),
            refresh_token: "secret-refresh-token".to_string(),
            expires_at: 1_700_000_000,
            user: AuthUser {
                id: "user".to_string(),
                email: Some("user@example.com".to_string()),
                email_confirmed_at: None,
            },
        }
    }

    #[test]
    fn key_names_profile_and_project() {
        let store = SessionStore::new("work", &backend("https://demo.supabase.co/"));
        assert_eq!(store.key(), "session/work@demo.supabase.co");

        let local = SessionStore::new("dev", &backend("http://localhost:54321"));
        assert_eq!(local.key(), "session/dev@localhost:54321");
    }

    #[test]
    fn sessions_are_isolated_per_profile() {
        let project = backend("https://isolation.supabase.co");
        let work = SessionStore::new("work", &project);
        let home = SessionStore::new("home", &project);

        work.save_session(&session()).unwrap();
        assert_eq!(work.load_session().unwrap(), Some(session()));
        assert_eq!(home.load_session().unwrap(), None);

        work.clear_session().unwrap();
        assert_eq!(work.load_session().unwrap(), None);
        work.clear_session().unwrap();
    }

    #[test]
    fn switching_project_does_not_restore_old_session() {
        let before = SessionStore::new("work", &backend("https://old-project.supabase.co"));
        let after = SessionStore::new("work", &backend("https://new-project.supabase.co"));

        before.save_session(&session()).unwrap();
        assert_eq!(after.load_session().unwrap(), None);
        before.clear_session().unwrap();
    }

    #[test]
    fn corrupt_entry_is_a_parse_error() {
        let store = SessionStore::new("corrupt", &backend("https://corrupt.supabase.co"));
        vault::write(store.key(), "not json").unwrap();

        assert!(matches!(store.load_session(), Err(AuthError::Json(_))));
        store.clear_session().unwrap();
    }
}
