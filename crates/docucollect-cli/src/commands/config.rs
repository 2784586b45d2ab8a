use std::env;
use std::io::Write;
use std::path::Path;

use docucollect_core::config::{ENV_ANON_KEY, ENV_URL};
use docucollect_core::util::normalize_text_option;
use serde::Serialize;

use crate::cli::ConfigCommands;
use crate::commands::common::mask_secret;
use crate::config_profiles::{default_config_path, CliProfilesConfig};
use crate::error::CliError;

const ENV_SITE_URL: &str = "DOCUCOLLECT_SITE_URL";

pub fn run_config(command: ConfigCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    let path = default_config_path()?;
    let mut out = std::io::stdout();
    match command {
        ConfigCommands::Init {
            supabase_url,
            supabase_anon_key,
            site_url,
            no_activate,
        } => run_config_init(
            &path,
            global_profile,
            ProfileValues {
                supabase_url,
                supabase_anon_key,
                site_url,
            },
            no_activate,
            |key| env::var(key).ok(),
            &mut out,
        ),
        ConfigCommands::Show { json } => run_config_show(&path, global_profile, json, &mut out),
    }
}

/// Values given on the command line for `config init`
#[derive(Debug, Default)]
pub struct ProfileValues {
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    pub site_url: Option<String>,
}

/// Merge explicit values, then the environment, then what the profile
/// already had, and save.
pub fn run_config_init(
    path: &Path,
    profile_name: Option<&str>,
    values: ProfileValues,
    no_activate: bool,
    lookup: impl Fn(&str) -> Option<String>,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load_from_path(path)?;
    let profile_name = config.resolve_profile_name(profile_name);
    let existing = config.profile(&profile_name).cloned().unwrap_or_default();

    let supabase_url = normalize_text_option(values.supabase_url)
        .or_else(|| normalize_text_option(lookup(ENV_URL)))
        .or_else(|| existing.supabase_url());
    let supabase_anon_key = normalize_text_option(values.supabase_anon_key)
        .or_else(|| normalize_text_option(lookup(ENV_ANON_KEY)))
        .or_else(|| existing.supabase_anon_key());
    let site_url = normalize_text_option(values.site_url)
        .or_else(|| normalize_text_option(lookup(ENV_SITE_URL)))
        .or_else(|| existing.site_url());

    let profile = config.profile_mut_or_default(&profile_name);
    profile.supabase_url = supabase_url;
    profile.supabase_anon_key = supabase_anon_key;
    profile.site_url = site_url;
    profile.validate()?;

    let mut missing_fields = Vec::new();
    if profile.supabase_url().is_none() {
        missing_fields.push("supabase_url");
    }
    if profile.supabase_anon_key().is_none() {
        missing_fields.push("supabase_anon_key");
    }

    if !no_activate {
        config.active_profile = Some(profile_name.clone());
    }
    config.save_to_path(path)?;
    tracing::info!("Saved profile '{profile_name}'");

    writeln!(
        out,
        "Profile '{profile_name}' initialized at {}",
        path.display()
    )?;
    if missing_fields.is_empty() {
        writeln!(
            out,
            "Profile '{profile_name}' is ready. Run `docucollect auth login --email <email> --password <password>`."
        )?;
    } else {
        writeln!(
            out,
            "Profile '{profile_name}' is missing: {}",
            missing_fields.join(", ")
        )?;
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct ProfileSummary {
    profile: String,
    active: bool,
    config_path: String,
    supabase_url: Option<String>,
    supabase_anon_key: Option<String>,
    site_url: Option<String>,
}

pub fn run_config_show(
    path: &Path,
    profile_name: Option<&str>,
    json: bool,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let config = CliProfilesConfig::load_from_path(path)?;
    let profile_name = config.resolve_profile_name(profile_name);
    let Some(profile) = config.profile(&profile_name) else {
        writeln!(
            out,
            "Profile '{profile_name}' is not configured. Run `docucollect config init`."
        )?;
        return Ok(());
    };

    let summary = ProfileSummary {
        active: config.active_profile.as_deref() == Some(profile_name.as_str()),
        profile: profile_name,
        config_path: path.display().to_string(),
        supabase_url: profile.supabase_url(),
        supabase_anon_key: profile.supabase_anon_key().map(|key| mask_secret(&key)),
        site_url: profile.site_url(),
    };

    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&summary)?)?;
        return Ok(());
    }

    let unset = || "(not set)".to_string();
    let active = if summary.active { " (active)" } else { "" };
    writeln!(out, "Profile:      {}{active}", summary.profile)?;
    writeln!(out, "Config file:  {}", summary.config_path)?;
    writeln!(
        out,
        "Supabase URL: {}",
        summary.supabase_url.unwrap_or_else(unset)
    )?;
    writeln!(
        out,
        "Anon key:     {}",
        summary.supabase_anon_key.unwrap_or_else(unset)
    )?;
    writeln!(out, "Site URL:     {}", summary.site_url.unwrap_or_else(unset))?;
    Ok(())
}
