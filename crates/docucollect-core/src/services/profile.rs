//! Profile page: load-or-create, display name, avatar replacement.

use super::{track, FileUpload};
use crate::config::AVATARS_BUCKET;
use crate::db::ProfileRepository;
use crate::models::{Account, Profile};
use crate::storage::{avatar_object_path, ObjectStorage};
use crate::util::normalize_text_option;
use crate::{Error, Result};

/// Largest accepted avatar (5 MiB).
pub const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;

/// An image picked as the new avatar
pub type AvatarUpload = FileUpload;

/// Reject anything that is not a non-empty image within the size limit.
fn validate_avatar(upload: &AvatarUpload) -> Result<String> {
    let content_type = upload.effective_content_type();
    if !content_type.starts_with("image/") {
        return Err(Error::InvalidInput(format!(
            "Avatar must be an image, got {content_type}"
        )));
    }
    if upload.bytes.is_empty() {
        return Err(Error::InvalidInput("Avatar file is empty".to_string()));
    }
    if upload.bytes.len() > MAX_AVATAR_BYTES {
        return Err(Error::InvalidInput(format!(
            "Avatar must be 5 MB or smaller ({} bytes given)",
            upload.bytes.len()
        )));
    }
    Ok(content_type)
}

pub struct ProfileManager<R, S> {
    account: Account,
    repository: R,
    storage: S,
    profile: Option<Profile>,
    error: Option<String>,
}

impl<R: ProfileRepository, S: ObjectStorage> ProfileManager<R, S> {
    pub const fn new(account: Account, repository: R, storage: S) -> Self {
        Self {
            account,
            repository,
            storage,
            profile: None,
            error: None,
        }
    }

    pub const fn account(&self) -> &Account {
        &self.account
    }

    pub const fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Letter for the profile icon: name, then email, then `?`.
    pub fn display_initial(&self) -> char {
        let email = self.account.email.as_deref();
        self.profile.as_ref().map_or_else(
            || Profile::blank(&self.account.id).display_initial(email),
            |profile| profile.display_initial(email),
        )
    }

    /// Fetch the account's profile, creating an empty one when absent.
    pub async fn load_or_create(&mut self) -> Result<Profile> {
        let result = self.load_or_create_inner().await;
        track(&mut self.error, result)
    }

    /// Set the display name. A blank name clears it.
    pub async fn update_name(&mut self, full_name: &str) -> Result<Profile> {
        let full_name = normalize_text_option(Some(full_name.to_string()));
        let result = self
            .repository
            .update_profile_name(&self.account.id, full_name.as_deref())
            .await;
        let profile = track(&mut self.error, result)?;
        tracing::info!("Updated profile name");
        self.profile = Some(profile.clone());
        Ok(profile)
    }

    /// Upload a new avatar, point the profile at it, then drop the old object.
    pub async fn replace_avatar(&mut self, upload: AvatarUpload) -> Result<Profile> {
        let result = self.replace_avatar_inner(upload).await;
        track(&mut self.error, result)
    }

    async fn load_or_create_inner(&mut self) -> Result<Profile> {
        let profile = match self.repository.fetch_profile(&self.account.id).await? {
            Some(profile) => profile,
            None => {
                let profile = self
                    .repository
                    .create_profile(&Profile::blank(&self.account.id))
                    .await?;
                tracing::info!("Created profile for account {}", self.account.id);
                profile
            }
        };
        self.profile = Some(profile.clone());
        Ok(profile)
    }

    async fn replace_avatar_inner(&mut self, upload: AvatarUpload) -> Result<Profile> {
        let content_type = validate_avatar(&upload)?;
        let path = avatar_object_path(&self.account.id, &upload.file_name)?;
        let previous_url = self
            .profile
            .as_ref()
            .and_then(|profile| profile.avatar_url.clone());

        let url = self
            .storage
            .upload(AVATARS_BUCKET, &path, upload.bytes, Some(&content_type))
            .await?;

        let profile = match self
            .repository
            .upsert_profile_avatar(&self.account.id, &url)
            .await
        {
            Ok(profile) => profile,
            Err(error) => {
                self.discard_object(path).await;
                return Err(error);
            }
        };
        tracing::info!("Replaced avatar for account {}", self.account.id);
        self.profile = Some(profile.clone());

        if let Some(old_path) = previous_url
            .as_deref()
            .and_then(|url| self.storage.object_path_from_public_url(AVATARS_BUCKET, url))
            .filter(|old_path| *old_path != path)
        {
            self.discard_object(old_path).await;
        }

        Ok(profile)
    }

    async fn discard_object(&self, path: String) {
        if let Err(error) = self.storage.remove(AVATARS_BUCKET, &[path.clone()]).await {
            tracing::warn!("Failed to remove avatar object {path}: {error}");
        }
    }
}
