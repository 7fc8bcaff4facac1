//! Media Directory Abstraction
//!
//! A [`MediaDirectory`] lists and searches the signed-in user's image and
//! video files on a remote drive. The Google Drive connector is the production
//! implementation; tests substitute mocks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A single media file as returned by the remote directory.
///
/// Records are immutable once fetched and identified by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_content_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_view_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<DateTime<Utc>>,
    /// Size in bytes. Absent for some provider-native formats.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl MediaFile {
    /// Minimal record with only the required fields set.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            mime_type: mime_type.into(),
            thumbnail_link: None,
            web_content_link: None,
            web_view_link: None,
            created_time: None,
            modified_time: None,
            size: None,
        }
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    pub fn is_video(&self) -> bool {
        self.mime_type.starts_with("video/")
    }
}

/// One page of media files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    pub files: Vec<MediaFile>,
    /// The provider holds more files than the page returned.
    pub truncated: bool,
}

/// Remote listing and search of media files.
///
/// Both operations return at most one page of results ordered by most recent
/// modification. Errors:
/// - [`BridgeError::NotAuthenticated`](crate::BridgeError::NotAuthenticated) when no token is stored
/// - [`BridgeError::SessionExpired`](crate::BridgeError::SessionExpired) on an unauthorized response;
///   the stored token has already been cleared when this is returned
/// - [`BridgeError::Transport`](crate::BridgeError::Transport) for any other failure
#[async_trait]
pub trait MediaDirectory: Send + Sync {
    /// Fetch the full listing of image and video files.
    async fn list(&self) -> Result<Vec<MediaFile>>;

    /// Query files whose name contains `term` (matching is provider-defined and
    /// case-insensitive).
    async fn search(&self, term: &str) -> Result<Vec<MediaFile>>;

    /// Listing together with whether it was cut at the page size.
    ///
    /// Implementations that cannot tell report `truncated: false`.
    async fn list_page(&self) -> Result<ListingPage> {
        Ok(ListingPage {
            files: self.list().await?,
            truncated: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_kind_helpers() {
        let photo = MediaFile::new("1", "beach.jpg", "image/jpeg");
        let clip = MediaFile::new("2", "clip.mp4", "video/mp4");

        assert!(photo.is_image());
        assert!(!photo.is_video());
        assert!(clip.is_video());
        assert!(!clip.is_image());
    }

    struct FixedDirectory;

    #[async_trait]
    impl MediaDirectory for FixedDirectory {
        async fn list(&self) -> Result<Vec<MediaFile>> {
            Ok(vec![MediaFile::new("1", "a.png", "image/png")])
        }

        async fn search(&self, _term: &str) -> Result<Vec<MediaFile>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_default_list_page_is_not_truncated() {
        let page = FixedDirectory.list_page().await.unwrap();
        assert_eq!(page.files.len(), 1);
        assert!(!page.truncated);
    }

    #[test]
    fn test_media_file_serializes_camel_case() {
        let mut file = MediaFile::new("abc", "beach.jpg", "image/jpeg");
        file.size = Some(2048);

        let json = serde_json::to_value(&file).unwrap();
        assert_eq!(json["mimeType"], "image/jpeg");
        assert_eq!(json["size"], 2048);
        assert!(json.get("thumbnailLink").is_none());
    }
}
