use std::io::Write;

use docucollect_core::config::BackendConfig;
use docucollect_core::db::ProfileRepository;
use docucollect_core::gate::Route;
use docucollect_core::services::ProfileManager;
use docucollect_core::storage::ObjectStorage;

use crate::cli::ProfileCommands;
use crate::commands::common::{read_upload, AppContext};
use crate::error::CliError;

pub async fn run_profile(
    command: ProfileCommands,
    global_profile: Option<&str>,
) -> Result<(), CliError> {
    let context = AppContext::open(global_profile).await?;
    let account = context.require_account(Route::Profile)?;
    let mut manager = ProfileManager::new(account, context.repository()?, context.storage()?);
    execute_profile(command, &mut manager, &context.backend, &mut std::io::stdout()).await
}

pub async fn execute_profile<R, S>(
    command: ProfileCommands,
    manager: &mut ProfileManager<R, S>,
    backend: &BackendConfig,
    out: &mut impl Write,
) -> Result<(), CliError>
where
    R: ProfileRepository,
    S: ObjectStorage,
{
    let profile = manager.load_or_create().await?;

    match command {
        ProfileCommands::Show { json } => {
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&profile)?)?;
                return Ok(());
            }
            let email = manager.account().email.as_deref().unwrap_or("(no email)");
            writeln!(out, "[{}] {email}", manager.display_initial())?;
            writeln!(
                out,
                "Name:    {}",
                profile.full_name.as_deref().unwrap_or("(not set)")
            )?;
            match profile.avatar_url.as_deref() {
                Some(url) if backend.is_allowed_image_url(url) => {
                    writeln!(out, "Avatar:  {url}")?;
                }
                Some(url) => writeln!(out, "Avatar:  {url} (host not in image allow-list)")?,
                None => writeln!(out, "Avatar:  (not set)")?,
            }
            writeln!(
                out,
                "Updated: {}",
                profile.updated_at.format("%Y-%m-%d %H:%M UTC")
            )?;
        }
        ProfileCommands::Name { name } => {
            let updated = manager.update_name(&name).await?;
            match updated.full_name {
                Some(name) => writeln!(out, "Display name set to '{name}'")?,
                None => writeln!(out, "Display name cleared")?,
            }
        }
        ProfileCommands::Avatar { path } => {
            let upload = read_upload(&path)?;
            let updated = manager.replace_avatar(upload).await?;
            writeln!(
                out,
                "Avatar updated: {}",
                updated.avatar_url.as_deref().unwrap_or_default()
            )?;
        }
    }
    Ok(())
}
