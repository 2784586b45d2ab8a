//! Sign-in, sign-up, recovery and magic-link form state.

use super::store::AuthStore;
use super::{
    validate_new_password, AuthBackend, AuthError, SignUpOutcome, MIN_PASSWORD_LENGTH,
};
use crate::models::Account;

const CONFIRMATION_SENT: &str = "Check your email for the confirmation link!";
const ALREADY_REGISTERED: &str =
    "An account with this email already exists. Please sign in instead.";
const NOT_AUTHORIZED: &str = "This email address is not authorized. Please use an approved email or contact the administrator.";
const RESET_SENT: &str = "Check your email for the password reset link!";
const MAGIC_LINK_SENT: &str = "Check your email for the login link!";
const RESET_LINK_EXPIRED: &str = "Password reset link has expired. Please request a new one.";
const PASSWORD_UPDATED: &str =
    "Password updated successfully! Please sign in with your new password.";

/// Which of the three mutually exclusive auth forms is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    #[default]
    SignIn,
    SignUp,
    ForgotPassword,
}

/// Result of one form submission. Messages and errors stay on the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthFormOutcome {
    SignedIn(Account),
    ConfirmationRequired,
    AlreadyRegistered,
    ResetEmailSent,
    Failed,
}

#[derive(Clone, Default)]
pub struct AuthForm {
    pub email: String,
    pub password: String,
    mode: AuthMode,
    redirect_to: Option<String>,
    error: Option<String>,
    message: Option<String>,
}

impl AuthForm {
    /// `redirect_to` is where confirmation and recovery emails send the user.
    #[must_use]
    pub fn new(redirect_to: Option<String>) -> Self {
        Self {
            redirect_to,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn mode(&self) -> AuthMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: AuthMode) {
        self.mode = mode;
        self.error = None;
        self.message = None;
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub async fn submit<B: AuthBackend>(&mut self, backend: &B, store: &AuthStore) -> AuthFormOutcome {
        self.error = None;
        self.message = None;

        if let Err(message) = self.validate() {
            self.error = Some(message);
            return AuthFormOutcome::Failed;
        }

        let email = self.email.trim().to_string();
        let password = self.password.clone();
        let redirect_to = self.redirect_to.clone();
        match self.mode {
            AuthMode::SignIn => match backend.sign_in(&email, &password).await {
                Ok(session) => {
                    let account = Account::from(&session.user);
                    store.set_session(session);
                    AuthFormOutcome::SignedIn(account)
                }
                Err(error) => self.fail(&error),
            },
            AuthMode::SignUp => {
                match backend
                    .sign_up(&email, &password, redirect_to.as_deref())
                    .await
                {
                    Ok(SignUpOutcome::SignedIn(session)) => {
                        let account = Account::from(&session.user);
                        store.set_session(session);
                        AuthFormOutcome::SignedIn(account)
                    }
                    Ok(SignUpOutcome::ConfirmationRequired) => {
                        self.message = Some(CONFIRMATION_SENT.to_string());
                        AuthFormOutcome::ConfirmationRequired
                    }
                    Ok(SignUpOutcome::AlreadyRegistered) => {
                        self.mode = AuthMode::SignIn;
                        self.password.clear();
                        self.message = Some(ALREADY_REGISTERED.to_string());
                        AuthFormOutcome::AlreadyRegistered
                    }
                    Err(error) => self.fail(&error),
                }
            }
            AuthMode::ForgotPassword => {
                match backend
                    .send_password_reset(&email, redirect_to.as_deref())
                    .await
                {
                    Ok(()) => {
                        self.message = Some(RESET_SENT.to_string());
                        AuthFormOutcome::ResetEmailSent
                    }
                    Err(error) => self.fail(&error),
                }
            }
        }
    }

    fn validate(&self) -> Result<(), String> {
        if self.email.trim().is_empty() {
            return Err("Email is required".to_string());
        }
        if self.mode == AuthMode::ForgotPassword {
            return Ok(());
        }
        if self.password.is_empty() {
            return Err("Password is required".to_string());
        }
        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(format!(
                "Password must be at least {MIN_PASSWORD_LENGTH} characters"
            ));
        }
        Ok(())
    }

    fn fail(&mut self, error: &AuthError) -> AuthFormOutcome {
        let text = error.to_string();
        tracing::warn!("Auth form submission failed: {}", text);
        self.error = Some(if self.mode == AuthMode::SignUp && text.contains("cannot be used") {
            NOT_AUTHORIZED.to_string()
        } else {
            text
        });
        AuthFormOutcome::Failed
    }
}

/// Passwordless sign-in by emailed link.
#[derive(Debug, Clone, Default)]
pub struct MagicLinkForm {
    pub email: String,
    redirect_to: Option<String>,
    error: Option<String>,
    message: Option<String>,
}

impl MagicLinkForm {
    #[must_use]
    pub fn new(redirect_to: Option<String>) -> Self {
        Self {
            redirect_to,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub async fn submit<B: AuthBackend>(&mut self, backend: &B) -> bool {
        self.error = None;
        self.message = None;
        let email = self.email.trim().to_string();
        if email.is_empty() {
            self.error = Some("Email is required".to_string());
            return false;
        }

        let redirect_to = self.redirect_to.clone();
        match backend
            .send_magic_link(&email, redirect_to.as_deref())
            .await
        {
            Ok(()) => {
                self.message = Some(MAGIC_LINK_SENT.to_string());
                true
            }
            Err(error) => {
                self.error = Some(error.to_string());
                false
            }
        }
    }
}

/// New-password form reached from a recovery link.
#[derive(Clone, Default)]
pub struct PasswordResetForm {
    pub new_password: String,
    error: Option<String>,
    message: Option<String>,
}

impl PasswordResetForm {
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Update the password for the recovery session, then sign out so the
    /// user signs in again with the new password.
    pub async fn submit<B: AuthBackend>(&mut self, backend: &B, store: &AuthStore) -> bool {
        self.error = None;
        self.message = None;

        let Some(session) = store.session() else {
            self.error = Some(RESET_LINK_EXPIRED.to_string());
            return false;
        };
        if let Err(error) = validate_new_password(&self.new_password) {
            self.error = Some(error.to_string());
            return false;
        }

        let new_password = self.new_password.clone();
        if let Err(error) = backend
            .update_password(&session.access_token, &new_password)
            .await
        {
            self.error = Some(error.to_string());
            return false;
        }

        if let Err(error) = sign_out(backend, store).await {
            tracing::warn!("Sign-out after password update failed: {}", error);
        }
        self.new_password.clear();
        self.message = Some(PASSWORD_UPDATED.to_string());
        true
    }
}

/// End the current session remotely and clear the shared auth state.
///
/// Local state is cleared even when the remote call fails.
pub async fn sign_out<B: AuthBackend>(backend: &B, store: &AuthStore) -> Result<(), AuthError> {
    let Some(session) = store.session() else {
        return Ok(());
    };
    let result = backend.sign_out(&session.access_token).await;
    store.clear();
    result
}
