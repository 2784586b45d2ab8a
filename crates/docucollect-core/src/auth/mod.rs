//! Hosted auth client: password, sign-up, magic link, OAuth, recovery.

mod callback;
pub mod forms;
pub mod store;

use std::fmt;
use std::sync::{Arc, Mutex};

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use callback::{parse_callback_url, CallbackKind, CallbackTokens};
pub use forms::{sign_out, AuthForm, AuthFormOutcome, AuthMode, MagicLinkForm, PasswordResetForm};
pub use store::{AuthStore, AuthSubscription};

use crate::config::BackendConfig;
use crate::util::unix_timestamp_now;

const EXPIRY_SKEW_SECONDS: i64 = 60;

/// Minimum password length accepted by the sign-in, sign-up and reset forms.
pub const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
    #[serde(default)]
    pub email_confirmed_at: Option<String>,
}

impl AuthUser {
    #[must_use]
    pub fn is_email_confirmed(&self) -> bool {
        self.email_confirmed_at
            .as_deref()
            .is_some_and(|value| !value.trim().is_empty())
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
    pub user: AuthUser,
}

impl AuthSession {
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at <= unix_timestamp_now() + EXPIRY_SKEW_SECONDS
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AuthSession")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    SignedIn(AuthSession),
    ConfirmationRequired,
    /// The address already belongs to an account; no session was created.
    AlreadyRegistered,
}

/// Third-party identity providers offered on the login page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthProvider {
    GitHub,
    Google,
}

impl OAuthProvider {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GitHub => "github",
            Self::Google => "google",
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Supabase auth is not configured for this build.")]
    NotConfigured,
    #[error("Invalid auth configuration: {0}")]
    InvalidConfiguration(&'static str),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to parse JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Api(String),
    #[error("Secure storage error: {0}")]
    SecureStorage(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

pub trait SessionPersistence: Clone + Send + Sync + 'static {
    fn load_session(&self) -> AuthResult<Option<AuthSession>>;
    fn save_session(&self, session: &AuthSession) -> AuthResult<()>;
    fn clear_session(&self) -> AuthResult<()>;
}

/// Process-local session persistence.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    inner: Arc<Mutex<Option<AuthSession>>>,
}

impl SessionPersistence for MemorySessionStore {
    fn load_session(&self) -> AuthResult<Option<AuthSession>> {
        let guard = self
            .inner
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        Ok(guard.clone())
    }

    fn save_session(&self, session: &AuthSession) -> AuthResult<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        *guard = Some(session.clone());
        Ok(())
    }

    fn clear_session(&self) -> AuthResult<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        *guard = None;
        Ok(())
    }
}

/// Auth operations the sign-in, sign-up and recovery forms depend on.
#[allow(async_fn_in_trait)]
pub trait AuthBackend {
    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: Option<&str>,
    ) -> AuthResult<SignUpOutcome>;

    async fn send_password_reset(&self, email: &str, redirect_to: Option<&str>)
        -> AuthResult<()>;

    async fn send_magic_link(&self, email: &str, redirect_to: Option<&str>) -> AuthResult<()>;

    async fn update_password(&self, access_token: &str, new_password: &str) -> AuthResult<()>;

    async fn sign_out(&self, access_token: &str) -> AuthResult<()>;
}

#[derive(Clone)]
pub struct SupabaseAuthClient<S: SessionPersistence> {
    auth_url: String,
    anon_key: String,
    client: Client,
    store: S,
}

impl<S: SessionPersistence> SupabaseAuthClient<S> {
    pub fn new(url: impl AsRef<str>, anon_key: impl Into<String>, store: S) -> AuthResult<Self> {
        let auth_url = normalize_auth_url(url.as_ref())?;
        let anon_key = anon_key.into().trim().to_string();
        if anon_key.is_empty() {
            return Err(AuthError::InvalidConfiguration(
                "Supabase anon key must not be empty",
            ));
        }

        Ok(Self {
            auth_url,
            anon_key,
            client: Client::builder().build()?,
            store,
        })
    }

    pub fn from_config(config: &BackendConfig, store: S) -> AuthResult<Self> {
        Self::new(&config.supabase_url, config.supabase_anon_key.clone(), store)
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub async fn restore_session(&self) -> AuthResult<Option<AuthSession>> {
        let Some(stored_session) = self.store.load_session()? else {
            return Ok(None);
        };

        if !stored_session.is_expired() {
            return Ok(Some(stored_session));
        }

        match self.refresh_session(&stored_session.refresh_token).await {
            Ok(refreshed) => {
                self.store.save_session(&refreshed)?;
                Ok(Some(refreshed))
            }
            Err(error) => {
                tracing::warn!("Failed to refresh persisted session: {}", error);
                self.store.clear_session()?;
                Ok(None)
            }
        }
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: Option<&str>,
    ) -> AuthResult<SignUpOutcome> {
        validate_credentials(email, password)?;

        let payload = serde_json::json!({
            "email": email.trim(),
            "password": password,
        });
        let request = self.public_request(
            with_redirect(self.client.post(format!("{}/signup", self.auth_url)), redirect_to)
                .json(&payload),
        );
        let response = match self.send_auth_request(request).await {
            Ok(response) => response,
            Err(AuthError::Api(message)) if is_already_registered_message(&message) => {
                return Ok(SignUpOutcome::AlreadyRegistered);
            }
            Err(error) => return Err(error),
        };

        if response.is_existing_user_placeholder() {
            return Ok(SignUpOutcome::AlreadyRegistered);
        }
        match response.into_session()? {
            Some(session) => {
                self.store.save_session(&session)?;
                Ok(SignUpOutcome::SignedIn(session))
            }
            None => Ok(SignUpOutcome::ConfirmationRequired),
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        validate_credentials(email, password)?;

        let payload = serde_json::json!({
            "email": email.trim(),
            "password": password,
        });
        let request = self.public_request(
            self.client
                .post(format!("{}/token", self.auth_url))
                .query(&[("grant_type", "password")])
                .json(&payload),
        );

        let response = self.send_auth_request(request).await?;
        let session = response.into_session()?.ok_or_else(|| {
            AuthError::Api("Sign-in response did not include an active session".to_string())
        })?;

        self.store.save_session(&session)?;
        Ok(session)
    }

    /// Email a one-time sign-in link.
    pub async fn send_magic_link(&self, email: &str, redirect_to: Option<&str>) -> AuthResult<()> {
        let email = require_email(email)?;
        let payload = serde_json::json!({
            "email": email,
            "create_user": true,
        });
        let request = self.public_request(
            with_redirect(self.client.post(format!("{}/otp", self.auth_url)), redirect_to)
                .json(&payload),
        );
        self.send_empty_request(request).await
    }

    /// Email a password-recovery link.
    pub async fn send_password_reset(
        &self,
        email: &str,
        redirect_to: Option<&str>,
    ) -> AuthResult<()> {
        let email = require_email(email)?;
        let payload = serde_json::json!({ "email": email });
        let request = self.public_request(
            with_redirect(
                self.client.post(format!("{}/recover", self.auth_url)),
                redirect_to,
            )
            .json(&payload),
        );
        self.send_empty_request(request).await
    }

    pub async fn update_password(&self, access_token: &str, new_password: &str) -> AuthResult<()> {
        validate_new_password(new_password)?;
        let payload = serde_json::json!({ "password": new_password });
        let request = self
            .client
            .put(format!("{}/user", self.auth_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .json(&payload);
        self.send_empty_request(request).await
    }

    pub async fn get_user(&self, access_token: &str) -> AuthResult<AuthUser> {
        let request = self
            .client
            .get(format!("{}/user", self.auth_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token);
        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Api(parse_api_error(status, &body)));
        }
        Ok(response.json::<SupabaseUser>().await?.into())
    }

    /// URL that starts an OAuth sign-in with `provider`.
    #[must_use]
    pub fn oauth_authorize_url(&self, provider: OAuthProvider, redirect_to: Option<&str>) -> String {
        let mut url = format!("{}/authorize?provider={}", self.auth_url, provider.as_str());
        if let Some(redirect_to) = redirect_to.map(str::trim).filter(|value| !value.is_empty()) {
            url.push_str("&redirect_to=");
            url.push_str(&urlencoding::encode(redirect_to));
        }
        url
    }

    /// Turn a magic-link, OAuth or recovery redirect URL into a stored session.
    pub async fn session_from_callback_url(
        &self,
        callback_url: &str,
    ) -> AuthResult<(AuthSession, CallbackKind)> {
        let tokens = parse_callback_url(callback_url)?;
        let user = self.get_user(&tokens.access_token).await?;
        let expires_at = tokens.expires_at.unwrap_or_else(|| {
            unix_timestamp_now().saturating_add(tokens.expires_in.unwrap_or(3600))
        });
        let session = AuthSession {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_at,
            user,
        };
        self.store.save_session(&session)?;
        Ok((session, tokens.kind))
    }

    pub async fn refresh_session(&self, refresh_token: &str) -> AuthResult<AuthSession> {
        if refresh_token.trim().is_empty() {
            return Err(AuthError::InvalidConfiguration(
                "Refresh token must not be empty",
            ));
        }

        let payload = serde_json::json!({
            "refresh_token": refresh_token,
        });
        let request = self.public_request(
            self.client
                .post(format!("{}/token", self.auth_url))
                .query(&[("grant_type", "refresh_token")])
                .json(&payload),
        );
        let response = self.send_auth_request(request).await?;
        let session = response.into_session()?.ok_or_else(|| {
            AuthError::Api("Refresh response did not include an active session".to_string())
        })?;

        self.store.save_session(&session)?;
        Ok(session)
    }

    pub async fn sign_out(&self, access_token: &str) -> AuthResult<()> {
        let request = self
            .client
            .post(format!("{}/logout", self.auth_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token);

        let response = request.send().await?;
        if !(response.status().is_success() || response.status() == StatusCode::UNAUTHORIZED) {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Api(parse_api_error(status, &body)));
        }

        self.store.clear_session()?;
        Ok(())
    }

    fn public_request(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", self.anon_key))
    }

    async fn send_auth_request(&self, request: RequestBuilder) -> AuthResult<SupabaseAuthResponse> {
        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Api(parse_api_error(status, &body)));
        }
        Ok(response.json::<SupabaseAuthResponse>().await?)
    }

    async fn send_empty_request(&self, request: RequestBuilder) -> AuthResult<()> {
        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Api(parse_api_error(status, &body)));
        }
        Ok(())
    }
}

impl<S: SessionPersistence> AuthBackend for SupabaseAuthClient<S> {
    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        Self::sign_in(self, email, password).await
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: Option<&str>,
    ) -> AuthResult<SignUpOutcome> {
        Self::sign_up(self, email, password, redirect_to).await
    }

    async fn send_password_reset(
        &self,
        email: &str,
        redirect_to: Option<&str>,
    ) -> AuthResult<()> {
        Self::send_password_reset(self, email, redirect_to).await
    }

    async fn send_magic_link(&self, email: &str, redirect_to: Option<&str>) -> AuthResult<()> {
        Self::send_magic_link(self, email, redirect_to).await
    }

    async fn update_password(&self, access_token: &str, new_password: &str) -> AuthResult<()> {
        Self::update_password(self, access_token, new_password).await
    }

    async fn sign_out(&self, access_token: &str) -> AuthResult<()> {
        Self::sign_out(self, access_token).await
    }
}

pub fn normalize_auth_url(url: &str) -> AuthResult<String> {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(AuthError::InvalidConfiguration(
            "Supabase URL must not be empty",
        ));
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(AuthError::InvalidConfiguration(
            "Supabase URL must include http:// or https://",
        ));
    }
    if trimmed.ends_with("/auth/v1") {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{trimmed}/auth/v1"))
    }
}

/// Whether an auth error message means the email is already taken.
#[must_use]
pub fn is_already_registered_message(message: &str) -> bool {
    let lowered = message.to_ascii_lowercase();
    lowered.contains("already registered") || lowered.contains("already been registered")
}

fn with_redirect(request: RequestBuilder, redirect_to: Option<&str>) -> RequestBuilder {
    match redirect_to.map(str::trim).filter(|value| !value.is_empty()) {
        Some(redirect_to) => request.query(&[("redirect_to", redirect_to)]),
        None => request,
    }
}

fn require_email(email: &str) -> AuthResult<&str> {
    let email = email.trim();
    if email.is_empty() {
        return Err(AuthError::Api("Email is required".to_string()));
    }
    Ok(email)
}

fn validate_credentials(email: &str, password: &str) -> AuthResult<()> {
    require_email(email)?;
    if password.trim().is_empty() {
        return Err(AuthError::Api("Password is required".to_string()));
    }
    Ok(())
}

pub fn validate_new_password(password: &str) -> AuthResult<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::Api(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct SupabaseAuthResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
    expires_in: Option<i64>,
    user: Option<SupabaseUser>,
    session: Option<SupabaseAuthResponseSession>,
    // Sign-up with confirmation enabled returns the bare user object.
    id: Option<String>,
    email: Option<String>,
    identities: Option<Vec<serde_json::Value>>,
}

impl SupabaseAuthResponse {
    /// Sign-up for a taken address answers with a user that has no identities.
    fn is_existing_user_placeholder(&self) -> bool {
        if self.access_token.is_some() {
            return false;
        }
        let identities = self
            .identities
            .as_ref()
            .or_else(|| self.user.as_ref().and_then(|user| user.identities.as_ref()));
        identities.is_some_and(Vec::is_empty)
    }

    fn into_session(self) -> AuthResult<Option<AuthSession>> {
        let nested_session = self.session;
        let access_token = self.access_token.or_else(|| {
            nested_session
                .as_ref()
                .and_then(|session| session.access_token.clone())
        });
        let refresh_token = self.refresh_token.or_else(|| {
            nested_session
                .as_ref()
                .and_then(|session| session.refresh_token.clone())
        });
        let expires_at = self
            .expires_at
            .or_else(|| {
                nested_session
                    .as_ref()
                    .and_then(|session| session.expires_at)
            })
            .or_else(|| {
                self.expires_in
                    .or_else(|| {
                        nested_session
                            .as_ref()
                            .and_then(|session| session.expires_in)
                    })
                    .map(|expires_in| unix_timestamp_now().saturating_add(expires_in))
            });
        let top_level_user = self.id.map(|id| SupabaseUser {
            id,
            email: self.email,
            email_confirmed_at: None,
            identities: None,
        });
        let user = self
            .user
            .or_else(|| nested_session.and_then(|session| session.user))
            .or(top_level_user)
            .map(Into::into);

        match (access_token, refresh_token, expires_at, user) {
            (Some(access_token), Some(refresh_token), Some(expires_at), Some(user)) => {
                Ok(Some(AuthSession {
                    access_token,
                    refresh_token,
                    expires_at,
                    user,
                }))
            }
            (None, None, None, Some(_)) => Ok(None),
            _ => Err(AuthError::Api(
                "Auth response did not include enough session fields".to_string(),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SupabaseAuthResponseSession {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
    expires_in: Option<i64>,
    user: Option<SupabaseUser>,
}

#[derive(Debug, Deserialize)]
struct SupabaseUser {
    id: String,
    email: Option<String>,
    #[serde(default)]
    email_confirmed_at: Option<String>,
    #[serde(default)]
    identities: Option<Vec<serde_json::Value>>,
}

impl From<SupabaseUser> for AuthUser {
    fn from(value: SupabaseUser) -> Self {
        Self {
            id: value.id,
            email: value.email,
            email_confirmed_at: value.email_confirmed_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SupabaseErrorResponse {
    error: Option<String>,
    error_description: Option<String>,
    message: Option<String>,
    msg: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<SupabaseErrorResponse>(body) {
        if let Some(message) = payload
            .message
            .or(payload.msg)
            .or(payload.error_description)
            .or(payload.error)
        {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_response() -> SupabaseAuthResponse {
        SupabaseAuthResponse {
            access_token: None,
            refresh_token: None,
            expires_at: None,
            expires_in: None,
            user: None,
            session: None,
            id: None,
            email: None,
            identities: None,
        }
    }

    fn client() -> SupabaseAuthClient<MemorySessionStore> {
        SupabaseAuthClient::new(
            "https://demo.supabase.co",
            "anon",
            MemorySessionStore::default(),
        )
        .unwrap()
    }

    #[test]
    fn normalize_auth_url_appends_auth_path() {
        let normalized = normalize_auth_url("https://demo.supabase.co").unwrap();
        assert_eq!(normalized, "https://demo.supabase.co/auth/v1");
    }

    #[test]
    fn normalize_auth_url_keeps_existing_auth_path() {
        let normalized = normalize_auth_url("https://demo.supabase.co/auth/v1").unwrap();
        assert_eq!(normalized, "https://demo.supabase.co/auth/v1");
    }

    #[test]
    fn client_rejects_blank_anon_key() {
        let result =
            SupabaseAuthClient::new("https://demo.supabase.co", "  ", MemorySessionStore::default());
        assert!(matches!(result, Err(AuthError::InvalidConfiguration(_))));
    }

    #[test]
    fn response_without_session_fields_means_confirmation_required() {
        let response = SupabaseAuthResponse {
            user: Some(SupabaseUser {
                id: "user".to_string(),
                email: Some("user@example.com".to_string()),
                email_confirmed_at: None,
                identities: Some(vec![serde_json::json!({"provider": "email"})]),
            }),
            ..bare_response()
        };
        assert!(!response.is_existing_user_placeholder());
        assert!(response.into_session().unwrap().is_none());
    }

    #[test]
    fn top_level_user_without_identities_is_already_registered() {
        let response: SupabaseAuthResponse = serde_json::from_str(
            r#"{"id": "user", "email": "taken@example.com", "identities": []}"#,
        )
        .unwrap();
        assert!(response.is_existing_user_placeholder());
    }

    #[test]
    fn full_response_builds_session_with_confirmation_state() {
        let response: SupabaseAuthResponse = serde_json::from_str(
            r#"{
                "access_token": "a",
                "refresh_token": "r",
                "expires_at": 1700000000,
                "user": {"id": "u", "email": "u@example.com", "email_confirmed_at": "2024-01-01T00:00:00Z"}
            }"#,
        )
        .unwrap();
        let session = response.into_session().unwrap().unwrap();
        assert_eq!(session.expires_at, 1_700_000_000);
        assert!(session.user.is_email_confirmed());
    }

    #[test]
    fn already_registered_messages_are_detected() {
        assert!(is_already_registered_message("User already registered (422)"));
        assert!(is_already_registered_message(
            "A user with this email address has already been registered"
        ));
        assert!(!is_already_registered_message("Invalid login credentials"));
    }

    #[test]
    fn oauth_url_encodes_redirect() {
        let url = client().oauth_authorize_url(
            OAuthProvider::GitHub,
            Some("http://localhost:3000/auth/callback"),
        );
        assert_eq!(
            url,
            "https://demo.supabase.co/auth/v1/authorize?provider=github&redirect_to=http%3A%2F%2Flocalhost%3A3000%2Fauth%2Fcallback"
        );
        let bare = client().oauth_authorize_url(OAuthProvider::Google, None);
        assert!(bare.ends_with("provider=google"));
    }

    #[test]
    fn new_password_requires_minimum_length() {
        assert!(validate_new_password("12345").is_err());
        assert!(validate_new_password("123456").is_ok());
    }

    #[test]
    fn parse_api_error_prefers_message_fields() {
        let message = parse_api_error(
            StatusCode::BAD_REQUEST,
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
        );
        assert_eq!(message, "Invalid login credentials (400)");
        assert_eq!(parse_api_error(StatusCode::BAD_GATEWAY, ""), "HTTP 502");
    }

    #[test]
    fn memory_store_round_trips() {
        let store = MemorySessionStore::default();
        assert!(store.load_session().unwrap().is_none());
        let session = AuthSession {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expires_at: 1,
            user: AuthUser {
                id: "u".to_string(),
                email: None,
                email_confirmed_at: None,
            },
        };
        store.save_session(&session).unwrap();
        assert_eq!(store.load_session().unwrap(), Some(session));
        store.clear_session().unwrap();
        assert!(store.load_session().unwrap().is_none());
    }

    #[test]
    fn session_debug_redacts_tokens() {
        let session = AuthSession {
            access_token: "secret-access-token".to_string(),
            refresh_token: "secret-refresh-token".to_string(),
            expires_at: 1_700_000_000,
            user: AuthUser {
                id: "user".to_string(),
                email: None,
                email_confirmed_at: None,
            },
        };
        let rendered = format!("{session:?}");
        assert!(!rendered.contains("secret-access-token"));
        assert!(!rendered.contains("secret-refresh-token"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn expiry_uses_skew_against_current_time() {
        let mut session = AuthSession {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expires_at: unix_timestamp_now() + 3_600,
            user: AuthUser {
                id: "u".to_string(),
                email: None,
                email_confirmed_at: None,
            },
        };
        assert!(!session.is_expired());

        session.expires_at = unix_timestamp_now() + EXPIRY_SKEW_SECONDS / 2;
        assert!(session.is_expired());
    }
}
