//! Document model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::util::file_extension;

/// Row identifier of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub i64);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DocumentId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

/// File-type tag derived from the file name at creation time.
///
/// The tag is never re-validated against the stored content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum FileType {
    Pdf,
    Doc,
    Jpg,
    Png,
    Gif,
    #[default]
    Unknown,
}

impl FileType {
    pub const ALL: [Self; 6] = [
        Self::Pdf,
        Self::Doc,
        Self::Jpg,
        Self::Png,
        Self::Gif,
        Self::Unknown,
    ];

    /// Map a file name to its tag using the extension table
    /// (pdf, doc/docx, jpg/jpeg, png, gif, anything else is unknown).
    #[must_use]
    pub fn from_file_name(file_name: &str) -> Self {
        file_extension(file_name).map_or(Self::Unknown, |ext| Self::from_extension(&ext))
    }

    #[must_use]
    pub fn from_extension(extension: &str) -> Self {
        match extension.trim().to_ascii_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "doc" | "docx" => Self::Doc,
            "jpg" | "jpeg" => Self::Jpg,
            "png" => Self::Png,
            "gif" => Self::Gif,
            _ => Self::Unknown,
        }
    }

    /// Stored tag value
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Doc => "doc",
            Self::Jpg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Unknown => "unknown",
        }
    }

    #[must_use]
    pub const fn is_image(self) -> bool {
        matches!(self, Self::Jpg | Self::Png | Self::Gif)
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| format!("unknown file type '{s}'"))
    }
}

impl From<Option<String>> for FileType {
    fn from(value: Option<String>) -> Self {
        value
            .as_deref()
            .and_then(|tag| tag.parse().ok())
            .unwrap_or_default()
    }
}

impl From<FileType> for String {
    fn from(value: FileType) -> Self {
        value.as_str().to_string()
    }
}

/// A stored document or external link owned by one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    /// Display name
    pub name: String,
    /// Uploaded-object public URL or external link
    pub file_url: String,
    pub created_at: DateTime<Utc>,
    /// Owning account
    #[serde(rename = "user_id1")]
    pub owner_id: String,
    #[serde(default)]
    pub is_favorite: bool,
    /// True when the file was uploaded rather than linked
    #[serde(default)]
    pub is_offline: bool,
    #[serde(default)]
    pub file_type: FileType,
}

/// Insert payload for the documents table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDocument {
    pub name: String,
    pub file_url: String,
    #[serde(rename = "user_id1")]
    pub owner_id: String,
    pub is_offline: bool,
    pub file_type: FileType,
    pub is_favorite: bool,
}
