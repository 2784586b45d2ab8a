//! Persistent CLI profile configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use docucollect_core::config::{BackendConfig, ENV_ANON_KEY, ENV_URL};
use docucollect_core::util::{is_http_url, normalize_text_option};
use serde::{Deserialize, Serialize};

use crate::error::CliError;

const CONFIG_FILE_NAME: &str = "cli-config.json";
const PROFILE_ENV: &str = "DOCUCOLLECT_PROFILE";
const DEFAULT_PROFILE: &str = "default";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliProfilesConfig {
    #[serde(default = "default_config_version")]
    pub version: u32,
    #[serde(default)]
    pub active_profile: Option<String>,
    #[serde(default)]
    pub profiles: BTreeMap<String, CliProfile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliProfile {
    #[serde(default)]
    pub supabase_url: Option<String>,
    #[serde(default)]
    pub supabase_anon_key: Option<String>,
    /// Origin that email and OAuth redirect links point back to
    #[serde(default)]
    pub site_url: Option<String>,
}

const fn default_config_version() -> u32 {
    1
}

pub fn default_config_path() -> Result<PathBuf, CliError> {
    dirs::config_dir()
        .map(|dir| dir.join("docucollect").join(CONFIG_FILE_NAME))
        .ok_or_else(|| CliError::Config("Failed to resolve CLI config directory".to_string()))
}

pub fn normalize_profile_name(value: Option<&str>) -> Option<String> {
    normalize_text_option(value.map(ToOwned::to_owned))
}

impl CliProfilesConfig {
    pub fn load_from_path(path: &Path) -> Result<Self, CliError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(|error| {
            CliError::Config(format!(
                "Failed to read config at {}: {error}",
                path.display()
            ))
        })?;
        let mut config = serde_json::from_str::<Self>(&raw).map_err(|error| {
            CliError::Config(format!(
                "Failed to parse config at {}: {error}",
                path.display()
            ))
        })?;
        config.normalize();
        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), CliError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                CliError::Config(format!(
                    "Failed to create config directory {}: {error}",
                    parent.display()
                ))
            })?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        let serialized = serde_json::to_string_pretty(&normalized)?;
        std::fs::write(path, serialized).map_err(|error| {
            CliError::Config(format!(
                "Failed to write config at {}: {error}",
                path.display()
            ))
        })
    }

    /// Explicit flag, then `DOCUCOLLECT_PROFILE`, then the active profile.
    pub fn resolve_profile_name(&self, explicit: Option<&str>) -> String {
        self.resolve_profile_name_with(explicit, std::env::var(PROFILE_ENV).ok().as_deref())
    }

    fn resolve_profile_name_with(&self, explicit: Option<&str>, from_env: Option<&str>) -> String {
        normalize_profile_name(explicit)
            .or_else(|| normalize_profile_name(from_env))
            .or_else(|| normalize_profile_name(self.active_profile.as_deref()))
            .unwrap_or_else(|| DEFAULT_PROFILE.to_string())
    }

    pub fn profile(&self, name: &str) -> Option<&CliProfile> {
        self.profiles.get(name)
    }

    pub fn profile_mut_or_default(&mut self, name: &str) -> &mut CliProfile {
        self.profiles.entry(name.to_string()).or_default()
    }

    fn normalize(&mut self) {
        self.active_profile = normalize_profile_name(self.active_profile.as_deref());
        for profile in self.profiles.values_mut() {
            profile.normalize();
        }
    }
}

impl CliProfile {
    pub fn supabase_url(&self) -> Option<String> {
        normalize_text_option(self.supabase_url.clone())
    }

    pub fn supabase_anon_key(&self) -> Option<String> {
        normalize_text_option(self.supabase_anon_key.clone())
    }

    pub fn site_url(&self) -> Option<String> {
        normalize_text_option(self.site_url.clone())
            .map(|url| url.trim_end_matches('/').to_string())
    }

    /// Backend settings from this profile, with `lookup` (the environment)
    /// filling in missing fields.
    pub fn backend_config(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Option<BackendConfig>, CliError> {
        let config = BackendConfig::from_lookup(|key| match key {
            ENV_URL => self.supabase_url().or_else(|| lookup(key)),
            ENV_ANON_KEY => self.supabase_anon_key().or_else(|| lookup(key)),
            _ => lookup(key),
        })?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CliError> {
        if let Some(url) = self.supabase_url() {
            if !is_http_url(&url) {
                return Err(CliError::Config(
                    "supabase_url must include http:// or https://".to_string(),
                ));
            }
        }
        if let Some(url) = self.site_url() {
            if !is_http_url(&url) {
                return Err(CliError::Config(
                    "site_url must include http:// or https://".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// `<site_url><path>` when a site URL is configured.
    pub fn redirect_url(&self, path: &str) -> Option<String> {
        self.site_url().map(|site| format!("{site}{path}"))
    }

    fn normalize(&mut self) {
        self.supabase_url = self.supabase_url();
        self.supabase_anon_key = self.supabase_anon_key();
        self.site_url = self.site_url();
    }
}
