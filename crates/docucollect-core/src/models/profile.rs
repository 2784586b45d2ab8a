//! Profile model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-account profile row; `id` equals the account identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub avatar_url: Option<String>,
    pub full_name: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Empty profile for a freshly seen account
    #[must_use]
    pub fn blank(account_id: impl Into<String>) -> Self {
        Self {
            id: account_id.into(),
            avatar_url: None,
            full_name: None,
            updated_at: Utc::now(),
        }
    }

    /// Letter shown in the profile icon when no avatar is set
    #[must_use]
    pub fn display_initial(&self, email: Option<&str>) -> char {
        self.full_name
            .as_deref()
            .and_then(first_alphanumeric)
            .or_else(|| email.and_then(first_alphanumeric))
            .unwrap_or('?')
    }
}

fn first_alphanumeric(value: &str) -> Option<char> {
    value
        .chars()
        .find(|ch| ch.is_alphanumeric())
        .and_then(|ch| ch.to_uppercase().next())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_initial_prefers_name_then_email() {
        let mut profile = Profile::blank("u");
        assert_eq!(profile.display_initial(None), '?');
        assert_eq!(profile.display_initial(Some("zoe@example.com")), 'Z');
        profile.full_name = Some("  ada lovelace".to_string());
        assert_eq!(profile.display_initial(Some("zoe@example.com")), 'A');
    }
}
