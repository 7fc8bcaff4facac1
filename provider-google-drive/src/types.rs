//! Google Drive API response types
//!
//! Data structures for deserializing Google Drive API v3 responses.

use bridge_traits::MediaFile;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Google Drive API file resource, restricted to the fields the listing asks for.
///
/// See: https://developers.google.com/drive/api/v3/reference/files#resource
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_link: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_content_link: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_view_link: Option<String>,

    /// RFC 3339
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,

    /// RFC 3339
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<String>,

    /// Decimal string; omitted for Google-native documents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

fn parse_timestamp(rfc3339: Option<&str>) -> Option<DateTime<Utc>> {
    rfc3339
        .and_then(|value| DateTime::parse_from_rfc3339(value).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

impl From<DriveFile> for MediaFile {
    fn from(file: DriveFile) -> Self {
        MediaFile {
            created_time: parse_timestamp(file.created_time.as_deref()),
            modified_time: parse_timestamp(file.modified_time.as_deref()),
            size: file.size.as_deref().and_then(|s| s.parse().ok()),
            id: file.id,
            name: file.name,
            mime_type: file.mime_type,
            thumbnail_link: file.thumbnail_link,
            web_content_link: file.web_content_link,
            web_view_link: file.web_view_link,
        }
    }
}

/// Google Drive API files.list response
///
/// See: https://developers.google.com/drive/api/v3/reference/files/list
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesListResponse {
    #[serde(default)]
    pub files: Vec<DriveFile>,

    /// Present when the provider holds more matches than one page
    #[serde(default)]
    pub next_page_token: Option<String>,
}
