//! Redirect-URL parsing for magic-link, OAuth and recovery callbacks.

use std::collections::HashMap;

use url::Url;

use super::{AuthError, AuthResult};

/// What kind of flow produced the callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackKind {
    MagicLink,
    SignUp,
    Recovery,
    Invite,
    /// OAuth and other flows that do not tag the redirect
    Other,
}

impl CallbackKind {
    fn from_type(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("magiclink") => Self::MagicLink,
            Some("signup") => Self::SignUp,
            Some("recovery") => Self::Recovery,
            Some("invite") => Self::Invite,
            _ => Self::Other,
        }
    }
}

/// Tokens carried by an implicit-flow redirect.
#[derive(Clone, PartialEq, Eq)]
pub struct CallbackTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: Option<i64>,
    pub expires_in: Option<i64>,
    pub kind: CallbackKind,
}

impl std::fmt::Debug for CallbackTokens {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("CallbackTokens")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("expires_in", &self.expires_in)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Read session tokens from the fragment (or query) of a redirect URL.
pub fn parse_callback_url(callback_url: &str) -> AuthResult<CallbackTokens> {
    let url = Url::parse(callback_url.trim())
        .map_err(|error| AuthError::Api(format!("Invalid callback URL: {error}")))?;

    let mut params: HashMap<String, String> = url
        .query_pairs()
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    if let Some(fragment) = url.fragment() {
        params.extend(
            url::form_urlencoded::parse(fragment.as_bytes())
                .map(|(key, value)| (key.into_owned(), value.into_owned())),
        );
    }

    if let Some(message) = params
        .get("error_description")
        .or_else(|| params.get("error"))
    {
        return Err(AuthError::Api(message.clone()));
    }
    if params.contains_key("code") && !params.contains_key("access_token") {
        return Err(AuthError::Api(
            "Callback carries an authorization code; only token redirects are supported"
                .to_string(),
        ));
    }

    let access_token = required_param(&params, "access_token")?;
    let refresh_token = required_param(&params, "refresh_token")?;
    let expires_at = params.get("expires_at").and_then(|raw| raw.parse().ok());
    let expires_in = params.get("expires_in").and_then(|raw| raw.parse().ok());

    Ok(CallbackTokens {
        access_token,
        refresh_token,
        expires_at,
        expires_in,
        kind: CallbackKind::from_type(params.get("type").map(String::as_str)),
    })
}

fn required_param(params: &HashMap<String, String>, name: &str) -> AuthResult<String> {
    params
        .get(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AuthError::Api(format!("Callback URL is missing {name}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovery_fragment_is_parsed() {
        let tokens = parse_callback_url(
            "http://localhost:3000/reset-password#access_token=abc&expires_in=3600&refresh_token=def&token_type=bearer&type=recovery",
        )
        .unwrap();
        assert_eq!(tokens.access_token, "abc");
        assert_eq!(tokens.refresh_token, "def");
        assert_eq!(tokens.expires_in, Some(3600));
        assert_eq!(tokens.kind, CallbackKind::Recovery);
    }

    #[test]
    fn oauth_redirect_without_type_is_other() {
        let tokens = parse_callback_url(
            "http://localhost:3000/auth/callback#access_token=a&refresh_token=r&expires_at=1700000000",
        )
        .unwrap();
        assert_eq!(tokens.kind, CallbackKind::Other);
        assert_eq!(tokens.expires_at, Some(1_700_000_000));
    }

    #[test]
    fn error_redirect_surfaces_description() {
        let error = parse_callback_url(
            "http://localhost:3000/#error=access_denied&error_description=Email+link+is+invalid+or+has+expired",
        )
        .unwrap_err();
        assert_eq!(error.to_string(), "Email link is invalid or has expired");
    }

    #[test]
    fn missing_tokens_are_rejected() {
        assert!(parse_callback_url("http://localhost:3000/#access_token=a").is_err());
        assert!(parse_callback_url("http://localhost:3000/?code=xyz").is_err());
        assert!(parse_callback_url("not a url").is_err());
    }

    #[test]
    fn debug_redacts_tokens() {
        let tokens =
            parse_callback_url("http://x/#access_token=secret-a&refresh_token=secret-r").unwrap();
        let rendered = format!("{tokens:?}");
        assert!(!rendered.contains("secret-a"));
    }
}
