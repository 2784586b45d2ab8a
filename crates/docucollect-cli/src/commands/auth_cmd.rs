use std::io::Write;

use docucollect_core::auth::{
    sign_out, AuthBackend, AuthForm, AuthFormOutcome, AuthMode, AuthStore, CallbackKind,
    MagicLinkForm, OAuthProvider, PasswordResetForm, SessionPersistence,
};

use crate::cli::AuthCommands;
use crate::commands::common::{AppContext, CALLBACK_PATH, RESET_PASSWORD_PATH};
use crate::error::CliError;

pub async fn run_auth(command: AuthCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    let context = AppContext::open(global_profile).await?;
    let mut out = std::io::stdout();

    match command {
        AuthCommands::Login { email, password } => {
            let mut form = AuthForm::new(context.redirect_url(CALLBACK_PATH));
            submit_credentials(&mut form, AuthMode::SignIn, email, password, &context, &mut out)
                .await
        }
        AuthCommands::Signup { email, password } => {
            let mut form = AuthForm::new(context.redirect_url(CALLBACK_PATH));
            submit_credentials(&mut form, AuthMode::SignUp, email, password, &context, &mut out)
                .await
        }
        AuthCommands::Forgot { email } => {
            let mut form = AuthForm::new(context.redirect_url(RESET_PASSWORD_PATH));
            submit_credentials(
                &mut form,
                AuthMode::ForgotPassword,
                email,
                String::new(),
                &context,
                &mut out,
            )
            .await
        }
        AuthCommands::MagicLink { email } => {
            let mut form = MagicLinkForm::new(context.redirect_url(CALLBACK_PATH));
            form.email = email;
            send_magic_link(&mut form, &context.auth, &mut out).await
        }
        AuthCommands::Oauth { provider } => {
            let provider = OAuthProvider::from(provider);
            let url = context
                .auth
                .oauth_authorize_url(provider, context.redirect_url(CALLBACK_PATH).as_deref());
            writeln!(out, "Open this URL to continue with {}:", provider.as_str())?;
            writeln!(out, "{url}")?;
            writeln!(
                out,
                "Then run `docucollect auth complete '<redirect URL>'` with the address you land on."
            )?;
            Ok(())
        }
        AuthCommands::Complete { url } => {
            let (session, kind) = context.auth.session_from_callback_url(&url).await?;
            let email = session.user.email.clone().unwrap_or_default();
            context.store.set_session(session);
            writeln!(out, "Signed in profile '{}' as {email}", context.profile_name)?;
            if kind == CallbackKind::Recovery {
                writeln!(
                    out,
                    "Set your new password with `docucollect auth update-password --password <new password>`."
                )?;
            }
            Ok(())
        }
        AuthCommands::UpdatePassword { password } => {
            let mut form = PasswordResetForm::default();
            form.new_password = password;
            update_password(&mut form, &context.auth, &context.store, &mut out).await
        }
        AuthCommands::Status => {
            write_status(&context.profile_name, &context.store, &mut out)?;
            Ok(())
        }
        AuthCommands::Logout => {
            let result = sign_out(&context.auth, &context.store).await;
            context.auth.store().clear_session()?;
            if let Err(error) = result {
                tracing::warn!("Remote sign-out failed: {error}");
            }
            writeln!(out, "Signed out profile '{}'", context.profile_name)?;
            Ok(())
        }
    }
}

async fn submit_credentials(
    form: &mut AuthForm,
    mode: AuthMode,
    email: String,
    password: String,
    context: &AppContext,
    out: &mut impl Write,
) -> Result<(), CliError> {
    form.set_mode(mode);
    form.email = email;
    form.password = password;
    let outcome = form.submit(&context.auth, &context.store).await;
    report_form(form, &outcome, &context.profile_name, out)
}

pub fn report_form(
    form: &AuthForm,
    outcome: &AuthFormOutcome,
    profile_name: &str,
    out: &mut impl Write,
) -> Result<(), CliError> {
    match outcome {
        AuthFormOutcome::SignedIn(account) => {
            let email = account.email.as_deref().unwrap_or("(no email)");
            writeln!(out, "Signed in profile '{profile_name}' as {email}")?;
            Ok(())
        }
        AuthFormOutcome::Failed => Err(CliError::Auth(
            form.error()
                .unwrap_or("Authentication failed")
                .to_string(),
        )),
        AuthFormOutcome::ConfirmationRequired
        | AuthFormOutcome::AlreadyRegistered
        | AuthFormOutcome::ResetEmailSent => {
            if let Some(message) = form.message() {
                writeln!(out, "{message}")?;
            }
            Ok(())
        }
    }
}

pub async fn send_magic_link<B: AuthBackend>(
    form: &mut MagicLinkForm,
    backend: &B,
    out: &mut impl Write,
) -> Result<(), CliError> {
    if form.submit(backend).await {
        writeln!(out, "{}", form.message().unwrap_or_default())?;
        Ok(())
    } else {
        Err(CliError::Auth(
            form.error().unwrap_or("Failed to send login link").to_string(),
        ))
    }
}

pub async fn update_password<B: AuthBackend>(
    form: &mut PasswordResetForm,
    backend: &B,
    store: &AuthStore,
    out: &mut impl Write,
) -> Result<(), CliError> {
    if form.submit(backend, store).await {
        writeln!(out, "{}", form.message().unwrap_or_default())?;
        Ok(())
    } else {
        Err(CliError::Auth(
            form.error()
                .unwrap_or("Failed to update password")
                .to_string(),
        ))
    }
}

pub fn write_status(
    profile_name: &str,
    store: &AuthStore,
    out: &mut impl Write,
) -> Result<(), CliError> {
    match store.session() {
        Some(session) => {
            let email = session.user.email.as_deref().unwrap_or("(no email)");
            let confirmed = if session.user.is_email_confirmed() {
                ""
            } else {
                " (email not confirmed)"
            };
            writeln!(
                out,
                "Profile '{profile_name}' is signed in as {email}{confirmed} (expires_at={})",
                session.expires_at
            )?;
        }
        None => writeln!(out, "Profile '{profile_name}' is not signed in.")?,
    }
    Ok(())
}
