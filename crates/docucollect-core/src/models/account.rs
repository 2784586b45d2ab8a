//! Authenticated account identity

use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;

/// The end-user identity every row is owned by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Account {
    /// Account identifier issued by the auth service
    pub id: String,
    /// Email address, when the provider exposes one
    pub email: Option<String>,
}

impl Account {
    #[must_use]
    pub fn new(id: impl Into<String>, email: Option<String>) -> Self {
        Self {
            id: id.into(),
            email,
        }
    }
}

impl From<&AuthUser> for Account {
    fn from(user: &AuthUser) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
        }
    }
}
