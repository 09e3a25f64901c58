//! Capability traits for callback-style messaging endpoints.
//!
//! An endpoint is anything that delivers named events (`message`-like,
//! `close`, `error`, optionally `open`) to registered listeners. Sinks add a
//! transmit primitive on top. The bridge only ever attaches and removes its
//! own listeners; it never closes or otherwise mutates the endpoint.

use std::sync::Arc;

/// Callback attached for one named event.
///
/// Lifecycle deliveries (`open`, `close`) usually carry no payload;
/// `message`-like and `error` deliveries carry the transported value
/// unchanged.
pub type EventListener<P> = Arc<dyn Fn(Option<P>) + Send + Sync>;

/// Cleanup callback run exactly once when a source subscription tears down,
/// regardless of the reason for teardown.
pub type Disposer = Arc<dyn Fn() + Send + Sync>;

/// Object that delivers named events to registered listeners.
///
/// Sources used with the bridge must deliver at least a `message`-like event
/// plus `close` and `error`; endpoints with an open handshake additionally
/// deliver `open` and report it via [`EventTarget::requires_open`].
pub trait EventTarget: Send + Sync {
    /// Value type carried by this endpoint's events.
    type Payload: Send + 'static;

    /// Attach `listener` for the named event.
    ///
    /// Whether an event name supports one listener or many is up to the
    /// implementation; the bridge attaches each of its listeners once.
    fn add_listener(&self, event: &str, listener: EventListener<Self::Payload>);

    /// Detach a previously attached listener for the named event.
    ///
    /// Production implementations should treat an unknown listener as a
    /// no-op. Test doubles may instead panic to surface a bridge that
    /// removes a listener it never attached.
    fn remove_listener(&self, event: &str, listener: &EventListener<Self::Payload>);

    /// True when this endpoint completes an `open` handshake before it
    /// starts delivering events.
    fn requires_open(&self) -> bool {
        false
    }
}

/// Endpoint that can transmit payloads to its peer.
pub trait MessageSink: EventTarget {
    /// Transmit one payload.
    fn post(&self, payload: Self::Payload);
}
