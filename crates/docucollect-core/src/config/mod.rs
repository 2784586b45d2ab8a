//! Backend configuration.
//!
//! The hosted backend is addressed by one project URL plus a public (anon)
//! key. Every service endpoint and the image-domain allow-list derive from
//! that URL.

use std::env;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::util::{is_http_url, normalize_text_option};
use crate::{Error, Result};

pub const ENV_URL: &str = "SUPABASE_URL";
pub const ENV_ANON_KEY: &str = "SUPABASE_ANON_KEY";
const ENV_PUBLIC_URL: &str = "NEXT_PUBLIC_SUPABASE_URL";
const ENV_PUBLIC_ANON_KEY: &str = "NEXT_PUBLIC_SUPABASE_ANON_KEY";

/// Host suffix served by the managed platform.
const PLATFORM_HOST_SUFFIX: &str = ".supabase.co";
const PUBLIC_OBJECT_PATH: &str = "/storage/v1/object/public/";

/// Storage bucket for uploaded documents.
pub const DOCUMENTS_BUCKET: &str = "documents";
/// Storage bucket for profile avatars.
pub const AVATARS_BUCKET: &str = "avatars";

/// Project URL and public key for the hosted backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Project base URL without a trailing slash.
    pub supabase_url: String,
    /// Public (anon) API key. Safe to ship; row policies guard data.
    pub supabase_anon_key: String,
}

impl BackendConfig {
    pub fn new(url: impl AsRef<str>, anon_key: impl AsRef<str>) -> Result<Self> {
        let supabase_url = normalize_project_url(url.as_ref())?;
        let supabase_anon_key = anon_key.as_ref().trim().to_string();
        if supabase_anon_key.is_empty() {
            return Err(Error::InvalidInput(
                "Supabase anon key must not be empty".to_string(),
            ));
        }
        Ok(Self {
            supabase_url,
            supabase_anon_key,
        })
    }

    /// Load configuration from environment variables.
    ///
    /// Returns `Ok(None)` when nothing is set and an error when only one of
    /// the two values is present.
    pub fn from_env() -> Result<Option<Self>> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`Self::from_env`] with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<Self>> {
        parse_config(lookup)
    }

    #[must_use]
    pub fn auth_url(&self) -> String {
        format!("{}/auth/v1", self.supabase_url)
    }

    #[must_use]
    pub fn rest_url(&self) -> String {
        format!("{}/rest/v1", self.supabase_url)
    }

    #[must_use]
    pub fn storage_url(&self) -> String {
        format!("{}/storage/v1", self.supabase_url)
    }

    /// Prefix shared by every public object URL in `bucket`.
    #[must_use]
    pub fn public_object_prefix(&self, bucket: &str) -> String {
        format!(
            "{}{PUBLIC_OBJECT_PATH}{}/",
            self.supabase_url,
            bucket.trim_matches('/')
        )
    }

    /// Host of the project URL, with the port when one is set.
    #[must_use]
    pub fn project_host(&self) -> Option<String> {
        let url = Url::parse(&self.supabase_url).ok()?;
        let host = url.host_str()?;
        Some(url.port().map_or_else(
            || host.to_string(),
            |port| format!("{host}:{port}"),
        ))
    }

    /// Hosts allowed to serve images: the project host plus the platform's
    /// public-object pattern.
    #[must_use]
    pub fn image_domains(&self) -> Vec<String> {
        let mut domains = Vec::new();
        if let Some(host) = Url::parse(&self.supabase_url)
            .ok()
            .and_then(|url| url.host_str().map(ToOwned::to_owned))
        {
            domains.push(host);
        }
        domains.push(format!("*{PLATFORM_HOST_SUFFIX}"));
        domains
    }

    /// Whether `candidate` may be rendered as an image.
    ///
    /// Project-host URLs are always allowed; other platform hosts only for
    /// public storage objects over https.
    #[must_use]
    pub fn is_allowed_image_url(&self, candidate: &str) -> bool {
        let Ok(url) = Url::parse(candidate) else {
            return false;
        };
        let Some(host) = url.host_str() else {
            return false;
        };

        let project_host = Url::parse(&self.supabase_url)
            .ok()
            .and_then(|project| project.host_str().map(ToOwned::to_owned));
        if project_host.as_deref() == Some(host) {
            return true;
        }

        url.scheme() == "https"
            && host.ends_with(PLATFORM_HOST_SUFFIX)
            && url.path().starts_with(PUBLIC_OBJECT_PATH)
    }
}

pub fn normalize_project_url(url: &str) -> Result<String> {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(Error::InvalidInput(
            "Supabase URL must not be empty".to_string(),
        ));
    }
    if !is_http_url(trimmed) {
        return Err(Error::InvalidInput(
            "Supabase URL must include http:// or https://".to_string(),
        ));
    }
    Url::parse(trimmed)
        .map_err(|error| Error::InvalidInput(format!("Supabase URL is invalid: {error}")))?;
    Ok(trimmed.to_string())
}

fn parse_config(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<BackendConfig>> {
    let url = normalize_text_option(lookup(ENV_URL))
        .or_else(|| normalize_text_option(lookup(ENV_PUBLIC_URL)));
    let anon_key = normalize_text_option(lookup(ENV_ANON_KEY))
        .or_else(|| normalize_text_option(lookup(ENV_PUBLIC_ANON_KEY)));

    match (url, anon_key) {
        (None, None) => Ok(None),
        (Some(url), Some(anon_key)) => BackendConfig::new(url, anon_key).map(Some),
        (Some(_), None) => Err(Error::InvalidInput(format!(
            "Backend configuration is incomplete. Missing: {ENV_ANON_KEY}"
        ))),
        (None, Some(_)) => Err(Error::InvalidInput(format!(
            "Backend configuration is incomplete. Missing: {ENV_URL}"
        ))),
    }
}
