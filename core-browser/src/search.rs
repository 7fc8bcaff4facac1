//! # Search Controller
//!
//! Reconciles the user's search term with the loaded listing.
//!
//! ## States
//!
//! - `Idle`: empty term, the view is the full listing
//! - `Filtering`: a term is present; the view is a local substring filter
//!   when the listing holds fewer than `local_search_threshold` files and a
//!   remote search otherwise
//!
//! Every term change waits for a quiet period before it is evaluated. Each
//! evaluation carries a sequence number and only the most recently issued one
//! may update the view; older completions are dropped. A remote search that
//! fails degrades to the local filter without surfacing an error.
//!
//! When a [`SessionExpiryHandler`] is installed, a remote search rejected with
//! `SessionExpired` instead clears the listing and hands control to the
//! handler, which is expected to sign the user out.
//!
//! ## Usage
//!
//! ```ignore
//! let controller = SearchController::new(directory, SearchPolicy::default(), event_bus);
//! let mut view = controller.subscribe();
//!
//! controller.set_listing(files).await;
//! controller.set_term("vac").await;
//!
//! view.changed().await?;
//! render(&view.borrow().files);
//! ```

use async_trait::async_trait;
use bridge_traits::{MediaDirectory, MediaFile};
use core_runtime::config::{
    SearchSettings, DEFAULT_LOCAL_SEARCH_THRESHOLD, DEFAULT_SEARCH_DEBOUNCE,
};
use core_runtime::events::{AuthEvent, BrowserEvent, CoreEvent, EventBus};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::filter::filter_by_name;

/// When to search locally and how long to wait for typing to settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchPolicy {
    /// Listings with at least this many files are searched remotely.
    pub local_search_threshold: usize,
    pub debounce: Duration,
}

impl Default for SearchPolicy {
    fn default() -> Self {
        Self {
            local_search_threshold: DEFAULT_LOCAL_SEARCH_THRESHOLD,
            debounce: DEFAULT_SEARCH_DEBOUNCE,
        }
    }
}

impl From<&SearchSettings> for SearchPolicy {
    fn from(settings: &SearchSettings) -> Self {
        Self {
            local_search_threshold: settings.local_search_threshold,
            debounce: settings.debounce,
        }
    }
}

/// Where the files in a [`SearchView`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewSource {
    /// Empty term, the full listing.
    Listing,
    Local,
    Remote,
    /// Remote search failed and the local filter was used instead.
    LocalFallback,
}

impl ViewSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewSource::Listing => "listing",
            ViewSource::Local => "local",
            ViewSource::Remote => "remote",
            ViewSource::LocalFallback => "fallback",
        }
    }
}

/// The filtered view the presentation layer renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchView {
    pub term: String,
    pub files: Vec<MediaFile>,
    pub source: ViewSource,
    /// Sequence number of the evaluation that produced this view.
    pub seq: u64,
}

impl SearchView {
    fn listing(files: Vec<MediaFile>, seq: u64) -> Self {
        Self {
            term: String::new(),
            files,
            source: ViewSource::Listing,
            seq,
        }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Called when the provider rejects the session during a remote search.
#[async_trait]
pub trait SessionExpiryHandler: Send + Sync {
    async fn session_expired(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    Idle,
    Filtering,
}

struct SearchState {
    listing: Arc<Vec<MediaFile>>,
    /// Trimmed term of the latest request, pending or settled.
    term: String,
    /// Quiet-period timer of the latest scheduled evaluation.
    pending: Option<CancellationToken>,
}

struct Inner {
    directory: Arc<dyn MediaDirectory>,
    policy: SearchPolicy,
    event_bus: EventBus,
    expiry_handler: Option<Arc<dyn SessionExpiryHandler>>,
    state: Mutex<SearchState>,
    latest_seq: AtomicU64,
    view_tx: watch::Sender<SearchView>,
}

/// Debounced search over a [`MediaDirectory`]. Clones share state.
#[derive(Clone)]
pub struct SearchController {
    inner: Arc<Inner>,
}

impl SearchController {
    pub fn new(
        directory: Arc<dyn MediaDirectory>,
        policy: SearchPolicy,
        event_bus: EventBus,
    ) -> Self {
        Self::build(directory, policy, event_bus, None)
    }

    /// Like [`SearchController::new`], but an expired session during remote
    /// search resets the controller and calls `handler` instead of falling
    /// back to the local filter.
    pub fn with_expiry_handler(
        directory: Arc<dyn MediaDirectory>,
        policy: SearchPolicy,
        event_bus: EventBus,
        handler: Arc<dyn SessionExpiryHandler>,
    ) -> Self {
        Self::build(directory, policy, event_bus, Some(handler))
    }

    fn build(
        directory: Arc<dyn MediaDirectory>,
        policy: SearchPolicy,
        event_bus: EventBus,
        expiry_handler: Option<Arc<dyn SessionExpiryHandler>>,
    ) -> Self {
        let (view_tx, _) = watch::channel(SearchView::listing(Vec::new(), 0));
        Self {
            inner: Arc::new(Inner {
                directory,
                policy,
                event_bus,
                expiry_handler,
                state: Mutex::new(SearchState {
                    listing: Arc::new(Vec::new()),
                    term: String::new(),
                    pending: None,
                }),
                latest_seq: AtomicU64::new(0),
                view_tx,
            }),
        }
    }

    pub fn policy(&self) -> SearchPolicy {
        self.inner.policy
    }

    /// Receive every view that becomes visible.
    pub fn subscribe(&self) -> watch::Receiver<SearchView> {
        self.inner.view_tx.subscribe()
    }

    /// The view currently visible.
    pub fn view(&self) -> SearchView {
        self.inner.view_tx.borrow().clone()
    }

    pub async fn term(&self) -> String {
        self.inner.state.lock().await.term.clone()
    }

    pub async fn phase(&self) -> SearchPhase {
        if self.inner.state.lock().await.term.is_empty() {
            SearchPhase::Idle
        } else {
            SearchPhase::Filtering
        }
    }

    pub async fn listing_len(&self) -> usize {
        self.inner.state.lock().await.listing.len()
    }

    /// Record a new search term and schedule its evaluation after the quiet
    /// period. Surrounding whitespace is ignored; a term equal to the latest
    /// one is a no-op.
    #[instrument(skip(self))]
    pub async fn set_term(&self, term: &str) {
        let term = term.trim();
        let mut state = self.inner.state.lock().await;

        if state.term == term {
            debug!("Search term unchanged");
            return;
        }

        state.term = term.to_string();
        let seq = self.next_seq();
        debug!(seq, "Scheduling search evaluation");
        self.schedule(&mut state, seq, term.to_string());
    }

    /// Replace the listing and re-evaluate the current term.
    ///
    /// With an empty term the new listing becomes visible at once.
    #[instrument(skip(self, files), fields(count = files.len()))]
    pub async fn set_listing(&self, files: Vec<MediaFile>) {
        let mut state = self.inner.state.lock().await;
        state.listing = Arc::new(files);
        let seq = self.next_seq();

        if state.term.is_empty() {
            if let Some(pending) = state.pending.take() {
                pending.cancel();
            }
            self.inner
                .view_tx
                .send_replace(SearchView::listing(state.listing.to_vec(), seq));
        } else {
            let term = state.term.clone();
            self.schedule(&mut state, seq, term);
        }
    }

    /// Drop the listing and the term. Used when the user signs out.
    pub async fn reset(&self) {
        let mut state = self.inner.state.lock().await;
        if let Some(pending) = state.pending.take() {
            pending.cancel();
        }
        state.listing = Arc::new(Vec::new());
        state.term.clear();

        let seq = self.next_seq();
        self.inner
            .view_tx
            .send_replace(SearchView::listing(Vec::new(), seq));
        debug!(seq, "Search state reset");
    }

    fn next_seq(&self) -> u64 {
        self.inner.latest_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_latest(&self, seq: u64) -> bool {
        self.inner.latest_seq.load(Ordering::SeqCst) == seq
    }

    fn schedule(&self, state: &mut SearchState, seq: u64, term: String) {
        if let Some(previous) = state.pending.take() {
            previous.cancel();
        }

        let cancellation_token = CancellationToken::new();
        state.pending = Some(cancellation_token.clone());

        let controller = self.clone();
        let debounce = self.inner.policy.debounce;
        tokio::spawn(async move {
            tokio::select! {
                _ = cancellation_token.cancelled() => {
                    debug!(seq, "Search evaluation superseded during quiet period");
                    return;
                }
                _ = tokio::time::sleep(debounce) => {}
            }
            controller.evaluate(seq, term).await;
        });
    }

    #[instrument(skip(self))]
    async fn evaluate(&self, seq: u64, term: String) {
        if !self.is_latest(seq) {
            return;
        }

        let listing = self.inner.state.lock().await.listing.clone();
        let threshold = self.inner.policy.local_search_threshold;

        let (files, source) = if term.is_empty() {
            (listing.to_vec(), ViewSource::Listing)
        } else if listing.len() < threshold {
            (filter_by_name(&listing, &term), ViewSource::Local)
        } else {
            match self.inner.directory.search(&term).await {
                Ok(files) => (files, ViewSource::Remote),
                Err(e) => {
                    if !self.is_latest(seq) {
                        debug!(seq, error = %e, "Stale remote search failed");
                        return;
                    }

                    if e.is_session_expired() {
                        if let Some(handler) = &self.inner.expiry_handler {
                            warn!(error = %e, "Session expired during remote search");
                            self.reset().await;
                            handler.session_expired().await;
                            return;
                        }
                        self.emit(CoreEvent::Auth(AuthEvent::SessionExpired));
                    }

                    warn!(error = %e, "Remote search failed, filtering locally");
                    self.emit(CoreEvent::Browser(BrowserEvent::SearchFellBack {
                        term: term.clone(),
                        message: e.to_string(),
                    }));
                    (filter_by_name(&listing, &term), ViewSource::LocalFallback)
                }
            }
        };

        self.apply(SearchView {
            term,
            files,
            source,
            seq,
        })
        .await;
    }

    /// Publish `view` if no newer evaluation was issued meanwhile.
    async fn apply(&self, view: SearchView) -> bool {
        // Sequence numbers are issued under this lock.
        let _state = self.inner.state.lock().await;

        if !self.is_latest(view.seq) {
            debug!(
                seq = view.seq,
                latest = self.inner.latest_seq.load(Ordering::SeqCst),
                "Discarding stale search result"
            );
            return false;
        }

        let event = BrowserEvent::SearchCompleted {
            term: view.term.clone(),
            count: view.files.len(),
            source: view.source.as_str().to_string(),
        };
        info!(
            seq = view.seq,
            count = view.files.len(),
            source = view.source.as_str(),
            "Search view updated"
        );

        self.inner.view_tx.send_replace(view);
        self.emit(CoreEvent::Browser(event));
        true
    }

    fn emit(&self, event: CoreEvent) {
        self.inner.event_bus.emit(event).ok();
    }
}
