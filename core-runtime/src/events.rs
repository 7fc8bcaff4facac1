//! # Event Bus System
//!
//! Broadcasts typed events from the auth gate and the browser to any number
//! of presentation-layer subscribers using `tokio::sync::broadcast`.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐    emit     ┌───────────┐
//! │ Session Gate ├────────────>│           │    subscribe    ┌────────────┐
//! └──────────────┘             │ EventBus  ├────────────────>│ Subscriber │
//!                              │ (broadcast│                 └────────────┘
//! ┌──────────────┐    emit     │  channel) │    subscribe    ┌────────────┐
//! │ Drive Browser├────────────>│           ├────────────────>│ Subscriber │
//! └──────────────┘             └───────────┘                 └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut subscriber = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Auth(AuthEvent::SignedOut))
//!     .ok();
//!
//! assert_eq!(
//!     subscriber.recv().await.unwrap(),
//!     CoreEvent::Auth(AuthEvent::SignedOut)
//! );
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events. Non-fatal.
//! - **`RecvError::Closed`**: every sender has been dropped; treat as shutdown.
//!
//! `emit` fails only when nobody is subscribed, which publishers ignore.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event published through the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Session lifecycle events
    Auth(AuthEvent),
    /// Listing and search events
    Browser(BrowserEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Auth(e) => e.description(),
            CoreEvent::Browser(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Auth(AuthEvent::AuthError { .. }) => EventSeverity::Error,
            CoreEvent::Browser(BrowserEvent::ListingFailed { .. }) => EventSeverity::Error,
            CoreEvent::Auth(AuthEvent::SessionExpired) => EventSeverity::Warning,
            CoreEvent::Browser(BrowserEvent::SearchFellBack { .. }) => EventSeverity::Warning,
            CoreEvent::Auth(AuthEvent::SignedIn { .. }) => EventSeverity::Info,
            CoreEvent::Browser(BrowserEvent::ListingLoaded { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Authentication Events
// ============================================================================

/// Session lifecycle events emitted by the auth gate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum AuthEvent {
    /// Authorization prompt has been handed to the host.
    SigningIn {
        /// Provider being authenticated with (e.g., "GoogleDrive").
        provider: String,
    },
    /// A usable session token is available.
    SignedIn {
        provider: String,
        /// `true` when the token came from storage rather than a fresh sign-in.
        restored: bool,
    },
    /// The stored token was removed by an explicit logout.
    SignedOut,
    /// The provider rejected the token; the user has to sign in again.
    SessionExpired,
    /// Authentication failed or was cancelled.
    AuthError {
        message: String,
        /// Whether simply trying again may succeed.
        recoverable: bool,
    },
}

impl AuthEvent {
    fn description(&self) -> &str {
        match self {
            AuthEvent::SigningIn { .. } => "Authentication in progress",
            AuthEvent::SignedIn { .. } => "User signed in successfully",
            AuthEvent::SignedOut => "User signed out",
            AuthEvent::SessionExpired => "Session expired, please sign in again",
            AuthEvent::AuthError { .. } => "Authentication error",
        }
    }
}

// ============================================================================
// Browser Events
// ============================================================================

/// Events emitted while loading the listing and resolving searches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum BrowserEvent {
    /// A listing fetch has started.
    ListingStarted,
    /// The listing was replaced.
    ListingLoaded {
        count: usize,
        /// The provider had more files than one page holds.
        truncated: bool,
    },
    /// The listing fetch failed; the view is empty until a retry succeeds.
    ListingFailed { message: String },
    /// A debounced search settled and its result became visible.
    SearchCompleted {
        term: String,
        count: usize,
        /// "listing", "local", "remote" or "fallback"
        source: String,
    },
    /// Remote search failed and the local filter was used instead.
    SearchFellBack { term: String, message: String },
}

impl BrowserEvent {
    fn description(&self) -> &str {
        match self {
            BrowserEvent::ListingStarted => "Loading media listing",
            BrowserEvent::ListingLoaded { .. } => "Media listing loaded",
            BrowserEvent::ListingFailed { .. } => "Failed to load media listing",
            BrowserEvent::SearchCompleted { .. } => "Search results updated",
            BrowserEvent::SearchFellBack { .. } => "Remote search failed, filtered locally",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central broadcast channel. Clones publish into the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus.
    ///
    /// `capacity` is the number of events buffered per subscriber before it
    /// starts receiving `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// when there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with an optional filter.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let event_bus = EventBus::new(100);
/// let browser_only = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Browser(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` will be returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without waiting.
    ///
    /// Returns `None` if no matching event is currently buffered.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded(count: usize) -> CoreEvent {
        CoreEvent::Browser(BrowserEvent::ListingLoaded {
            count,
            truncated: false,
        })
    }

    #[tokio::test]
    async fn test_event_bus_subscription() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);

        let _sub1 = bus.subscribe();
        let _sub2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::new(10);
        assert!(bus.emit(CoreEvent::Auth(AuthEvent::SignedOut)).is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        let event = CoreEvent::Auth(AuthEvent::SignedIn {
            provider: "GoogleDrive".to_string(),
            restored: false,
        });
        assert_eq!(bus.emit(event.clone()).unwrap(), 2);

        assert_eq!(sub1.recv().await.unwrap(), event);
        assert_eq!(sub2.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_event_stream_with_filter() {
        let bus = EventBus::new(10);
        let mut stream =
            EventStream::new(bus.subscribe()).filter(|event| matches!(event, CoreEvent::Auth(_)));

        bus.emit(loaded(3)).ok();
        bus.emit(CoreEvent::Auth(AuthEvent::SessionExpired)).ok();

        assert_eq!(
            stream.recv().await.unwrap(),
            CoreEvent::Auth(AuthEvent::SessionExpired)
        );
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        for i in 0..5 {
            bus.emit(loaded(i)).ok();
        }

        assert!(matches!(sub.recv().await, Err(RecvError::Lagged(_))));
    }

    #[test]
    fn test_event_severity() {
        let error_event = CoreEvent::Browser(BrowserEvent::ListingFailed {
            message: "timeout".to_string(),
        });
        assert_eq!(error_event.severity(), EventSeverity::Error);

        assert_eq!(
            CoreEvent::Auth(AuthEvent::SessionExpired).severity(),
            EventSeverity::Warning
        );
        assert_eq!(loaded(1).severity(), EventSeverity::Info);
        assert_eq!(
            CoreEvent::Browser(BrowserEvent::ListingStarted).severity(),
            EventSeverity::Debug
        );
    }

    #[test]
    fn test_event_description() {
        assert_eq!(
            CoreEvent::Auth(AuthEvent::SessionExpired).description(),
            "Session expired, please sign in again"
        );
    }

    #[test]
    fn test_event_serialization_shape() {
        let event = CoreEvent::Browser(BrowserEvent::SearchCompleted {
            term: "vac".to_string(),
            count: 1,
            source: "local".to_string(),
        });

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "Browser");
        assert_eq!(json["payload"]["event"], "SearchCompleted");
        assert_eq!(json["payload"]["term"], "vac");

        let back: CoreEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[tokio::test]
    async fn test_try_recv() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe());
        assert!(stream.try_recv().is_none());

        bus.emit(loaded(7)).ok();
        assert_eq!(stream.try_recv().unwrap().unwrap(), loaded(7));
    }
}
