//! End-to-end flows through the browser façade with in-memory bridges.

use async_trait::async_trait;
use bridge_desktop::MemorySecureStore;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::{ListingPage, MediaDirectory, MediaFile};
use core_auth::{
    AccessToken, AuthState, AuthorizationPrompt, AuthorizationResponse, SessionGate, TokenStore,
};
use core_browser::{BrowserError, DriveBrowser, ListingState, SearchPolicy, ViewSource};
use core_runtime::config::DriveSettings;
use core_runtime::events::{AuthEvent, BrowserEvent, CoreEvent, EventBus, EventStream};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Answers the token endpoint with a fresh token and the introspection
/// endpoint with a fixed status.
struct StubHttpClient {
    tokeninfo_status: u16,
}

#[async_trait]
impl HttpClient for StubHttpClient {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        let settings = DriveSettings::default();
        if request.url.starts_with(&settings.token_url) {
            Ok(HttpResponse::new(
                200,
                r#"{"access_token":"ya29.fresh","expires_in":3599}"#,
            ))
        } else if request.url.starts_with(&settings.tokeninfo_url) {
            Ok(HttpResponse::new(self.tokeninfo_status, "{}"))
        } else {
            Err(BridgeError::Transport(format!("unexpected request to {}", request.url)))
        }
    }
}

struct ApprovingPrompt;

#[async_trait]
impl AuthorizationPrompt for ApprovingPrompt {
    async fn authorize(&self, authorization_url: &str) -> core_auth::Result<AuthorizationResponse> {
        let state = authorization_url
            .split(['?', '&'])
            .find_map(|pair| pair.strip_prefix("state="))
            .unwrap_or_default()
            .to_string();
        Ok(AuthorizationResponse::Code {
            code: "auth-code".to_string(),
            state,
        })
    }
}

/// Replays queued listing results. Remote search always fails, with an
/// expired session once `reject_session` is set.
#[derive(Default)]
struct ScriptedDirectory {
    pages: Mutex<VecDeque<BridgeResult<ListingPage>>>,
    list_calls: AtomicUsize,
    reject_session: AtomicBool,
}

impl ScriptedDirectory {
    fn push(&self, result: BridgeResult<ListingPage>) {
        self.pages.lock().unwrap().push_back(result);
    }

    fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaDirectory for ScriptedDirectory {
    async fn list(&self) -> BridgeResult<Vec<MediaFile>> {
        Ok(self.list_page().await?.files)
    }

    async fn search(&self, _term: &str) -> BridgeResult<Vec<MediaFile>> {
        if self.reject_session.load(Ordering::SeqCst) {
            return Err(BridgeError::SessionExpired("401".to_string()));
        }
        Err(BridgeError::Transport("search not scripted".to_string()))
    }

    async fn list_page(&self) -> BridgeResult<ListingPage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ListingPage::default()))
    }
}

struct Harness {
    browser: DriveBrowser,
    directory: Arc<ScriptedDirectory>,
    token_store: TokenStore,
    events: EventStream,
}

fn harness(tokeninfo_status: u16) -> Harness {
    let settings = DriveSettings {
        client_id: Some("client".to_string()),
        api_key: Some("key".to_string()),
        ..DriveSettings::default()
    };
    let event_bus = EventBus::new(64);
    let events = EventStream::new(event_bus.subscribe());
    let token_store = TokenStore::new(Arc::new(MemorySecureStore::new()));
    let gate = Arc::new(SessionGate::new(
        settings,
        token_store.clone(),
        Arc::new(StubHttpClient { tokeninfo_status }),
        Arc::new(ApprovingPrompt),
        event_bus.clone(),
    ));
    let directory = Arc::new(ScriptedDirectory::default());
    let browser = DriveBrowser::new(
        gate,
        directory.clone(),
        SearchPolicy::default(),
        event_bus,
    );

    Harness {
        browser,
        directory,
        token_store,
        events,
    }
}

fn page(names: &[&str], truncated: bool) -> ListingPage {
    ListingPage {
        files: names
            .iter()
            .enumerate()
            .map(|(i, name)| MediaFile::new(format!("id-{}", i), *name, "image/png"))
            .collect(),
        truncated,
    }
}

fn drain(events: &mut EventStream) -> Vec<CoreEvent> {
    let mut out = Vec::new();
    while let Some(Ok(event)) = events.try_recv() {
        out.push(event);
    }
    out
}

#[tokio::test]
async fn test_start_without_session() {
    let h = harness(200);

    let state = h.browser.start().await.unwrap();

    assert_eq!(state, AuthState::SignedOut);
    assert_eq!(h.directory.list_calls(), 0);
    assert_eq!(h.browser.snapshot().await.listing_state, ListingState::Idle);
}

#[tokio::test]
async fn test_start_restores_session_and_loads_listing() {
    let h = harness(200);
    h.token_store.store(&AccessToken::new("stored")).await.unwrap();
    h.directory
        .push(Ok(page(&["vacation.png", "Report.png"], true)));

    let state = h.browser.start().await.unwrap();

    assert_eq!(state, AuthState::SignedIn);
    let snapshot = h.browser.snapshot().await;
    assert_eq!(snapshot.listing_state, ListingState::Ready { truncated: true });
    assert_eq!(snapshot.total_count, 2);
    assert_eq!(snapshot.view.source, ViewSource::Listing);
    assert_eq!(snapshot.view.files.len(), 2);
}

#[tokio::test]
async fn test_rejected_token_does_not_attempt_listing() {
    let h = harness(401);
    h.token_store.store(&AccessToken::new("stale")).await.unwrap();

    let state = h.browser.start().await.unwrap();

    assert_eq!(state, AuthState::SignedOut);
    assert_eq!(h.directory.list_calls(), 0);
}

#[tokio::test]
async fn test_sign_in_loads_listing() {
    let mut h = harness(200);
    h.directory.push(Ok(page(&["a.png", "b.png", "c.png"], false)));

    let count = h.browser.sign_in().await.unwrap();

    assert_eq!(count, 3);
    assert_eq!(h.browser.gate().auth_state().await, AuthState::SignedIn);
    let events = drain(&mut h.events);
    assert!(events.iter().any(|e| matches!(
        e,
        CoreEvent::Auth(AuthEvent::SignedIn {
            restored: false,
            ..
        })
    )));
    assert!(events.contains(&CoreEvent::Browser(BrowserEvent::ListingLoaded {
        count: 3,
        truncated: false
    })));
}

#[tokio::test]
async fn test_expired_session_forces_logout() {
    let mut h = harness(200);
    h.token_store.store(&AccessToken::new("stored")).await.unwrap();
    h.directory.push(Ok(page(&["a.png"], false)));
    h.browser.start().await.unwrap();
    drain(&mut h.events);

    h.directory
        .push(Err(BridgeError::SessionExpired("401".to_string())));
    let result = h.browser.refresh().await;

    assert!(matches!(result, Err(BrowserError::SessionExpired)));
    assert!(!h.token_store.has_token().await.unwrap());
    let snapshot = h.browser.snapshot().await;
    assert_eq!(snapshot.auth_state, AuthState::SignedOut);
    assert_eq!(snapshot.listing_state, ListingState::Idle);
    assert!(snapshot.view.files.is_empty());
    assert!(drain(&mut h.events).contains(&CoreEvent::Auth(AuthEvent::SessionExpired)));
}

#[tokio::test]
async fn test_transport_failure_then_manual_retry() {
    let h = harness(200);
    h.token_store.store(&AccessToken::new("stored")).await.unwrap();
    h.directory
        .push(Err(BridgeError::Transport("connection reset".to_string())));
    h.directory.push(Ok(page(&["a.png", "b.png"], false)));

    let result = h.browser.start().await;
    assert!(matches!(result, Err(BrowserError::Transport(_))));
    let snapshot = h.browser.snapshot().await;
    assert!(matches!(snapshot.listing_state, ListingState::Failed { .. }));
    assert!(snapshot.view.files.is_empty());
    assert_eq!(snapshot.auth_state, AuthState::SignedIn);

    let count = h.browser.refresh().await.unwrap();
    assert_eq!(count, 2);
    assert_eq!(
        h.browser.snapshot().await.listing_state,
        ListingState::Ready { truncated: false }
    );
}

#[tokio::test]
async fn test_sign_out_drops_listing() {
    let mut h = harness(200);
    h.directory.push(Ok(page(&["a.png"], false)));
    h.browser.sign_in().await.unwrap();

    h.browser.sign_out().await.unwrap();

    let snapshot = h.browser.snapshot().await;
    assert_eq!(snapshot.auth_state, AuthState::SignedOut);
    assert_eq!(snapshot.listing_state, ListingState::Idle);
    assert_eq!(snapshot.total_count, 0);
    assert!(!h.token_store.has_token().await.unwrap());
    assert!(drain(&mut h.events).contains(&CoreEvent::Auth(AuthEvent::SignedOut)));
}

#[tokio::test]
async fn test_refresh_requires_session() {
    let h = harness(200);

    let result = h.browser.refresh().await;

    assert!(matches!(
        result,
        Err(BrowserError::Auth(core_auth::AuthError::NotAuthenticated))
    ));
    assert_eq!(h.directory.list_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_search_filters_small_listing_locally() {
    let h = harness(200);
    h.directory
        .push(Ok(page(&["vacation.png", "Report.pdf"], false)));
    h.browser.sign_in().await.unwrap();
    let mut view = h.browser.watch_view();
    view.borrow_and_update();

    h.browser.search("vac").await;
    view.changed().await.unwrap();

    let current = view.borrow().clone();
    assert_eq!(current.source, ViewSource::Local);
    assert_eq!(current.files.len(), 1);
    assert_eq!(current.files[0].name, "vacation.png");

    h.browser.search("").await;
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(h.browser.snapshot().await.view.files.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_expired_session_during_remote_search_forces_logout() {
    let mut h = harness(200);
    h.token_store.store(&AccessToken::new("stored")).await.unwrap();
    let names: Vec<String> = (0..60).map(|i| format!("beach-{}.png", i)).collect();
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    h.directory.push(Ok(page(&names, false)));
    h.browser.start().await.unwrap();
    drain(&mut h.events);

    h.directory.reject_session.store(true, Ordering::SeqCst);
    h.browser.search("beach").await;
    tokio::time::sleep(Duration::from_millis(400)).await;

    let snapshot = h.browser.snapshot().await;
    assert_eq!(snapshot.auth_state, AuthState::SignedOut);
    assert_eq!(snapshot.listing_state, ListingState::Idle);
    assert_eq!(snapshot.total_count, 0);
    assert!(snapshot.view.files.is_empty());
    assert!(!h.token_store.has_token().await.unwrap());

    let events = drain(&mut h.events);
    assert!(events.contains(&CoreEvent::Auth(AuthEvent::SessionExpired)));
    assert!(!events.iter().any(|e| matches!(
        e,
        CoreEvent::Browser(BrowserEvent::SearchFellBack { .. })
    )));
}
