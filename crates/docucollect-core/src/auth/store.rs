//! Process-wide authentication state.
//!
//! One `AuthStore` owns the current session. Components read the account
//! from it, or subscribe to be told when the user signs in or out, instead of
//! looking the session up again on every call.

use std::sync::Arc;

use tokio::sync::watch;

use super::AuthSession;
use crate::models::Account;
use crate::{Error, Result};

/// Shared handle to the current session. Clones observe the same state.
#[derive(Clone)]
pub struct AuthStore {
    sender: Arc<watch::Sender<Option<AuthSession>>>,
}

impl AuthStore {
    #[must_use]
    pub fn new(initial: Option<AuthSession>) -> Self {
        let (sender, _receiver) = watch::channel(initial);
        Self {
            sender: Arc::new(sender),
        }
    }

    #[must_use]
    pub fn session(&self) -> Option<AuthSession> {
        self.sender.borrow().clone()
    }

    #[must_use]
    pub fn account(&self) -> Option<Account> {
        self.sender
            .borrow()
            .as_ref()
            .map(|session| Account::from(&session.user))
    }

    /// Account of the signed-in user, or `Error::NotSignedIn`.
    pub fn require_account(&self) -> Result<Account> {
        self.account().ok_or(Error::NotSignedIn)
    }

    pub fn require_access_token(&self) -> Result<String> {
        self.sender
            .borrow()
            .as_ref()
            .map(|session| session.access_token.clone())
            .ok_or(Error::NotSignedIn)
    }

    pub fn set_session(&self, session: AuthSession) {
        tracing::info!("Auth state changed: signed in as {}", session.user.id);
        self.sender.send_replace(Some(session));
    }

    pub fn clear(&self) {
        if self.sender.send_replace(None).is_some() {
            tracing::info!("Auth state changed: signed out");
        }
    }

    /// Start observing session changes. Dropping the subscription, or calling
    /// [`AuthSubscription::unsubscribe`], stops it.
    #[must_use]
    pub fn subscribe(&self) -> AuthSubscription {
        AuthSubscription {
            receiver: self.sender.subscribe(),
        }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for AuthStore {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Live view of the auth state held by one component.
pub struct AuthSubscription {
    receiver: watch::Receiver<Option<AuthSession>>,
}

impl AuthSubscription {
    #[must_use]
    pub fn current(&self) -> Option<AuthSession> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next sign-in, refresh or sign-out.
    ///
    /// Returns `None` once every store handle is gone.
    pub async fn changed(&mut self) -> Option<Option<AuthSession>> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    pub fn unsubscribe(self) {
        drop(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthUser;

    fn session(id: &str) -> AuthSession {
        AuthSession {
            access_token: format!("token-{id}"),
            refresh_token: "refresh".to_string(),
            expires_at: i64::MAX,
            user: AuthUser {
                id: id.to_string(),
                email: Some(format!("{id}@example.com")),
                email_confirmed_at: Some("2024-01-01T00:00:00Z".to_string()),
            },
        }
    }

    #[test]
    fn require_account_without_session_fails() {
        let store = AuthStore::default();
        assert!(matches!(store.require_account(), Err(Error::NotSignedIn)));
        assert!(matches!(store.require_access_token(), Err(Error::NotSignedIn)));
    }

    #[test]
    fn clones_share_state() {
        let store = AuthStore::default();
        let other = store.clone();
        store.set_session(session("a"));
        assert_eq!(other.account().map(|account| account.id), Some("a".to_string()));
        other.clear();
        assert!(store.session().is_none());
    }

    #[tokio::test]
    async fn subscribers_see_changes_until_unsubscribed() {
        let store = AuthStore::default();
        let mut subscription = store.subscribe();
        assert_eq!(store.subscriber_count(), 1);
        assert!(subscription.current().is_none());

        store.set_session(session("a"));
        let next = subscription.changed().await.unwrap();
        assert_eq!(next.map(|session| session.user.id), Some("a".to_string()));

        store.clear();
        assert_eq!(subscription.changed().await, Some(None));

        subscription.unsubscribe();
        assert_eq!(store.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn subscription_ends_when_store_is_dropped() {
        let store = AuthStore::default();
        let mut subscription = store.subscribe();
        drop(store);
        assert_eq!(subscription.changed().await, None);
    }
}
