//! Google Drive API connector implementation
//!
//! Implements [`MediaDirectory`] on top of the Drive v3 `files.list` endpoint.

use async_trait::async_trait;
use bridge_traits::error::BridgeError;
use bridge_traits::http::{HttpClient, HttpRequest};
use bridge_traits::{ListingPage, MediaDirectory, MediaFile};
use core_auth::{AuthError, TokenStore};
use core_runtime::config::{CoreConfig, DriveSettings};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::error::{GoogleDriveError, Result};
use crate::types::FilesListResponse;

/// Fields to request for file resources
const FILE_FIELDS: &str = "nextPageToken,files(id,name,mimeType,thumbnailLink,webContentLink,webViewLink,createdTime,modifiedTime,size)";

/// Server-side restriction to image and video content
const MEDIA_FILTER: &str = "mimeType contains 'image/' or mimeType contains 'video/'";

const ORDER_BY: &str = "modifiedTime desc";

/// Google Drive API connector
///
/// Reads the bearer token from the shared [`TokenStore`] on every call and
/// fetches a single page of results. Nothing is retried. A 401 deletes the
/// stored token before [`GoogleDriveError::SessionExpired`] is returned.
///
/// # Example
///
/// ```ignore
/// use provider_google_drive::GoogleDriveConnector;
/// use bridge_traits::MediaDirectory;
///
/// let connector = GoogleDriveConnector::new(http_client, token_store, settings);
/// let files = connector.list().await?;
/// ```
pub struct GoogleDriveConnector {
    http_client: Arc<dyn HttpClient>,
    token_store: TokenStore,
    settings: DriveSettings,
}

impl GoogleDriveConnector {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        token_store: TokenStore,
        settings: DriveSettings,
    ) -> Self {
        Self {
            http_client,
            token_store,
            settings,
        }
    }

    pub fn from_config(config: &CoreConfig, token_store: TokenStore) -> Self {
        Self::new(config.http_client.clone(), token_store, config.drive.clone())
    }

    /// Most recently modified image and video files, one page.
    #[instrument(skip(self))]
    pub async fn fetch_listing(&self) -> Result<ListingPage> {
        info!("Listing media from Google Drive");
        self.fetch_page(MEDIA_FILTER).await
    }

    /// Files whose name contains `term`, with the same mime-type restriction.
    ///
    /// A blank term is the plain listing.
    #[instrument(skip(self))]
    pub async fn fetch_search(&self, term: &str) -> Result<ListingPage> {
        let term = term.trim();
        if term.is_empty() {
            return self.fetch_listing().await;
        }

        info!("Searching Google Drive");
        let query = format!(
            "name contains '{}' and ({})",
            escape_query_term(term),
            MEDIA_FILTER
        );
        self.fetch_page(&query).await
    }

    fn files_url(&self, query: &str) -> String {
        let mut url = format!(
            "{}/files?pageSize={}&fields={}&q={}&orderBy={}",
            self.settings.api_base_url.trim_end_matches('/'),
            self.settings.page_size,
            urlencoding::encode(FILE_FIELDS),
            urlencoding::encode(query),
            urlencoding::encode(ORDER_BY),
        );

        if let Some(ref api_key) = self.settings.api_key {
            url.push_str(&format!("&key={}", urlencoding::encode(api_key)));
        }

        url
    }

    async fn fetch_page(&self, query: &str) -> Result<ListingPage> {
        let token = match self.token_store.retrieve().await {
            Ok(Some(token)) => token,
            Ok(None) => {
                debug!("No session token stored");
                return Err(GoogleDriveError::NotAuthenticated(
                    "no session token stored".to_string(),
                ));
            }
            Err(e @ AuthError::TokenCorrupted { .. }) => {
                return Err(GoogleDriveError::NotAuthenticated(e.to_string()));
            }
            Err(e) => {
                // storage backend failure, not a missing session
                warn!(error = %e, "Could not read session token");
                return Err(GoogleDriveError::BridgeError(BridgeError::Transport(
                    format!("token storage unavailable: {}", e),
                )));
            }
        };

        let request = HttpRequest::get(self.files_url(query))
            .bearer_token(token.as_str())
            .header("Accept", "application/json")
            .timeout(self.settings.request_timeout);

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| GoogleDriveError::NetworkError(e.to_string()))?;

        if response.is_unauthorized() {
            warn!("Drive rejected the session token, clearing it");
            if let Err(e) = self.token_store.delete().await {
                warn!(error = %e, "Failed to clear rejected session token");
            }
            return Err(GoogleDriveError::SessionExpired(
                "Google Drive returned 401 Unauthorized".to_string(),
            ));
        }

        if !response.is_success() {
            let message = String::from_utf8_lossy(&response.body).to_string();
            warn!(status = response.status, "Drive request failed");
            return Err(GoogleDriveError::ApiError {
                status_code: response.status,
                message,
            });
        }

        let list_response: FilesListResponse = serde_json::from_slice(&response.body)
            .map_err(|e| {
                GoogleDriveError::ParseError(format!("Failed to parse files list response: {}", e))
            })?;

        let truncated = list_response.next_page_token.is_some();
        let files: Vec<MediaFile> = list_response.files.into_iter().map(Into::into).collect();

        if truncated {
            warn!(
                count = files.len(),
                page_size = self.settings.page_size,
                "Drive holds more files than one page, results are truncated"
            );
        }

        info!(count = files.len(), truncated, "Fetched media page");

        Ok(ListingPage { files, truncated })
    }
}

/// Escape a term for embedding in a single-quoted Drive query string.
pub(crate) fn escape_query_term(term: &str) -> String {
    term.replace('\\', "\\\\").replace('\'', "\\'")
}

#[async_trait]
impl MediaDirectory for GoogleDriveConnector {
    async fn list(&self) -> bridge_traits::error::Result<Vec<MediaFile>> {
        Ok(self.fetch_listing().await?.files)
    }

    async fn search(&self, term: &str) -> bridge_traits::error::Result<Vec<MediaFile>> {
        Ok(self.fetch_search(term).await?.files)
    }

    async fn list_page(&self) -> bridge_traits::error::Result<ListingPage> {
        Ok(self.fetch_listing().await?)
    }
}
