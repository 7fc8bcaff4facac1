//! Drive browser façade.
//!
//! Composes the session gate, the media directory and the search controller
//! into the flow the presentation layer drives: restore or sign in, load the
//! listing, search, sign out.

use async_trait::async_trait;
use bridge_traits::error::BridgeError;
use bridge_traits::MediaDirectory;
use core_auth::{AuthError, AuthState, AuthorizationPrompt, SessionGate};
use core_runtime::config::CoreConfig;
use core_runtime::events::{BrowserEvent, CoreEvent, EventBus, EventStream};
use provider_google_drive::GoogleDriveConnector;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{watch, Mutex, RwLock};
use tracing::{info, instrument, warn};

use crate::error::{BrowserError, Result};
use crate::search::{SearchController, SearchPolicy, SearchView, SessionExpiryHandler};

/// Progress of the most recent listing load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ListingState {
    /// Nothing loaded (signed out).
    Idle,
    Loading,
    Ready { truncated: bool },
    /// The listing is empty; the presentation layer offers a retry.
    Failed { message: String },
}

/// Everything the presentation layer needs to render one frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrowserSnapshot {
    pub auth_state: AuthState,
    pub listing_state: ListingState,
    /// Files in the listing, before filtering.
    pub total_count: usize,
    pub view: SearchView,
}

/// Signs the user out when a remote search hits an expired session. The
/// search controller has already dropped its listing by then.
struct ForcedLogout {
    gate: Arc<SessionGate>,
    listing_state: Arc<RwLock<ListingState>>,
}

#[async_trait]
impl SessionExpiryHandler for ForcedLogout {
    async fn session_expired(&self) {
        if let Err(e) = self.gate.expire_session().await {
            warn!(error = %e, "Failed to clear expired session");
        }
        *self.listing_state.write().await = ListingState::Idle;
    }
}

pub struct DriveBrowser {
    gate: Arc<SessionGate>,
    directory: Arc<dyn MediaDirectory>,
    search: SearchController,
    event_bus: EventBus,
    listing_state: Arc<RwLock<ListingState>>,
    load_lock: Mutex<()>,
}

impl DriveBrowser {
    pub fn new(
        gate: Arc<SessionGate>,
        directory: Arc<dyn MediaDirectory>,
        policy: SearchPolicy,
        event_bus: EventBus,
    ) -> Self {
        let listing_state = Arc::new(RwLock::new(ListingState::Idle));
        let logout = Arc::new(ForcedLogout {
            gate: gate.clone(),
            listing_state: listing_state.clone(),
        });
        let search = SearchController::with_expiry_handler(
            directory.clone(),
            policy,
            event_bus.clone(),
            logout,
        );
        Self {
            gate,
            directory,
            search,
            event_bus,
            listing_state,
            load_lock: Mutex::new(()),
        }
    }

    /// Wire the Google Drive stack from a validated configuration.
    pub fn from_config(config: &CoreConfig, prompt: Arc<dyn AuthorizationPrompt>) -> Self {
        let event_bus = EventBus::new(config.event_buffer_size);
        let gate = Arc::new(SessionGate::from_config(config, prompt, event_bus.clone()));
        let connector = GoogleDriveConnector::from_config(config, gate.token_store().clone());

        Self::new(
            gate,
            Arc::new(connector),
            SearchPolicy::from(&config.search),
            event_bus,
        )
    }

    pub fn gate(&self) -> &SessionGate {
        &self.gate
    }

    pub fn search_controller(&self) -> &SearchController {
        &self.search
    }

    pub fn events(&self) -> EventStream {
        EventStream::new(self.event_bus.subscribe())
    }

    pub fn watch_view(&self) -> watch::Receiver<SearchView> {
        self.search.subscribe()
    }

    /// Startup: restore the stored session and load the listing if it is
    /// still valid.
    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<AuthState> {
        match self.gate.restore_session().await? {
            Some(_) => {
                self.load_listing().await?;
            }
            None => info!("No usable session, sign-in required"),
        }
        Ok(self.gate.auth_state().await)
    }

    /// Interactive sign-in followed by the first listing load.
    #[instrument(skip(self))]
    pub async fn sign_in(&self) -> Result<usize> {
        self.gate.authenticate().await?;
        self.load_listing().await
    }

    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<()> {
        self.gate.clear().await?;
        self.drop_listing().await;
        Ok(())
    }

    /// Manual retry of the listing load.
    pub async fn refresh(&self) -> Result<usize> {
        if !self.gate.auth_state().await.is_authenticated() {
            return Err(BrowserError::Auth(AuthError::NotAuthenticated));
        }
        self.load_listing().await
    }

    /// Fetch the listing and hand it to the search controller.
    ///
    /// Returns the number of files loaded. A rejected session forces a
    /// logout; any other failure leaves an empty listing in
    /// [`ListingState::Failed`].
    #[instrument(skip(self))]
    pub async fn load_listing(&self) -> Result<usize> {
        let _guard = self.load_lock.lock().await;

        self.set_listing_state(ListingState::Loading).await;
        self.emit(BrowserEvent::ListingStarted);

        match self.directory.list_page().await {
            Ok(page) => {
                let count = page.files.len();
                let truncated = page.truncated;
                self.search.set_listing(page.files).await;
                self.set_listing_state(ListingState::Ready { truncated }).await;
                info!(count, truncated, "Listing loaded");
                self.emit(BrowserEvent::ListingLoaded { count, truncated });
                Ok(count)
            }
            Err(BridgeError::SessionExpired(message)) => {
                warn!(%message, "Session expired while loading listing");
                if let Err(e) = self.gate.expire_session().await {
                    warn!(error = %e, "Failed to clear expired session");
                }
                self.drop_listing().await;
                Err(BrowserError::SessionExpired)
            }
            Err(BridgeError::NotAuthenticated(message)) => {
                warn!(%message, "Listing requested without a session");
                self.drop_listing().await;
                Err(BrowserError::Auth(AuthError::NotAuthenticated))
            }
            Err(e) => {
                let message = e.to_string();
                warn!(error = %message, "Failed to load listing");
                self.search.set_listing(Vec::new()).await;
                self.set_listing_state(ListingState::Failed {
                    message: message.clone(),
                })
                .await;
                self.emit(BrowserEvent::ListingFailed {
                    message: message.clone(),
                });
                Err(BrowserError::Transport(message))
            }
        }
    }

    pub async fn search(&self, term: &str) {
        self.search.set_term(term).await;
    }

    pub async fn snapshot(&self) -> BrowserSnapshot {
        BrowserSnapshot {
            auth_state: self.gate.auth_state().await,
            listing_state: self.listing_state.read().await.clone(),
            total_count: self.search.listing_len().await,
            view: self.search.view(),
        }
    }

    async fn drop_listing(&self) {
        self.search.reset().await;
        self.set_listing_state(ListingState::Idle).await;
    }

    async fn set_listing_state(&self, state: ListingState) {
        *self.listing_state.write().await = state;
    }

    fn emit(&self, event: BrowserEvent) {
        self.event_bus.emit(CoreEvent::Browser(event)).ok();
    }
}
