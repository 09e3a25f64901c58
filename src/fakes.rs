//! Scriptable in-memory endpoints for tests, benches, and doc examples.
//!
//! [`FakeEndpoint`] keeps one listener per event name (attaching again
//! replaces the previous one) and enforces the listener contract fatally:
//! removing a listener that is not the currently attached one panics, as
//! does closing the endpoint twice. Bridge code paths must never trip
//! either.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use hashbrown::HashMap;
use parking_lot::Mutex;

use crate::endpoint::{EventListener, EventTarget, MessageSink};

/// In-memory endpoint implementing both the source and sink capabilities.
pub struct FakeEndpoint<P> {
    listeners: Mutex<HashMap<String, EventListener<P>>>,
    sent: Mutex<Vec<P>>,
    handshake: bool,
    open: AtomicBool,
}

impl<P: Send + 'static> FakeEndpoint<P> {
    /// Endpoint that is ready immediately, with no open handshake.
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(HashMap::new()),
            sent: Mutex::new(Vec::new()),
            handshake: false,
            open: AtomicBool::new(true),
        }
    }

    /// Endpoint that reports an open handshake; nothing active happens
    /// until [`FakeEndpoint::open`] fires it.
    pub fn with_handshake() -> Self {
        Self {
            handshake: true,
            ..Self::new()
        }
    }

    /// Deliver a named event to the attached listener, if any.
    pub fn emit(&self, event: &str, payload: Option<P>) {
        // Snapshot the listener and release the lock before calling it, so
        // a listener can re-enter add/remove without deadlocking.
        let listener = self.listeners.lock().get(event).cloned();
        if let Some(listener) = listener {
            listener(payload);
        }
    }

    /// Fire the open handshake.
    pub fn open(&self) {
        self.emit("open", None);
    }

    /// Close the endpoint. Panics when closed more than once.
    pub fn close(&self) {
        if !self.open.swap(false, Ordering::SeqCst) {
            panic!("closed more than once");
        }
        self.emit("close", None);
    }

    /// Emit an `error` event carrying `value`.
    pub fn fail(&self, value: P) {
        self.emit("error", Some(value));
    }

    /// Number of listeners currently attached, across all event names.
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }
}

impl<P: Clone + Send + 'static> FakeEndpoint<P> {
    /// Payloads transmitted through [`MessageSink::post`] so far.
    pub fn sent(&self) -> Vec<P> {
        self.sent.lock().clone()
    }
}

impl<P: Send + 'static> Default for FakeEndpoint<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Send + 'static> EventTarget for FakeEndpoint<P> {
    type Payload = P;

    fn add_listener(&self, event: &str, listener: EventListener<P>) {
        self.listeners.lock().insert(event.to_string(), listener);
    }

    fn remove_listener(&self, event: &str, listener: &EventListener<P>) {
        let mut listeners = self.listeners.lock();
        let attached = listeners
            .get(event)
            .is_some_and(|current| Arc::ptr_eq(current, listener));
        if !attached {
            panic!("removed wrong handler for {event:?}");
        }
        listeners.remove(event);
    }

    fn requires_open(&self) -> bool {
        self.handshake
    }
}

impl<P: Clone + Send + 'static> MessageSink for FakeEndpoint<P> {
    /// Records the payload and loops it back as a `message` event.
    fn post(&self, payload: P) {
        self.sent.lock().push(payload.clone());
        self.emit("message", Some(payload));
    }
}
