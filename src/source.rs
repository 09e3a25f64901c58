//! Source-to-stream bridge.
//!
//! A [`SourceStream`] is cold: building one attaches nothing. Every call to
//! [`SourceStream::subscribe`] attaches a fresh set of listeners to the
//! source and yields an independent [`Subscription`] that ends when the
//! source emits `close`, fails when it emits `error`, and tears down its
//! listeners plus the supplied disposer exactly once on any exit path.

use std::{
    mem,
    pin::Pin,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    task::{Context, Poll},
};

use futures_core::Stream;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::trace;

use crate::endpoint::{Disposer, EventListener, EventTarget};

/// Default event name for message-style sources.
pub const MESSAGE_EVENT: &str = "message";

/// Failure raised when a source emits an `error` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError<P> {
    /// Value delivered with the `error` event, unmodified. `None` when the
    /// source emitted a bare `error`.
    pub value: Option<P>,
}

/// Item type produced by a bridged subscription.
pub type SourceItem<P> = Result<P, SourceError<P>>;

/// Bridge an arbitrary named event from `source` into a cold stream.
///
/// Intended for read-only push sources that deliver under an event name
/// other than `message`. The stream ends when the source emits `close` and
/// fails when it emits `error`; `disposer`, when supplied, runs once per
/// subscription teardown.
pub fn from_source_on<S: EventTarget>(
    event: impl Into<String>,
    source: Arc<S>,
    disposer: Option<Disposer>,
) -> SourceStream<S> {
    SourceStream {
        source,
        event: event.into(),
        disposer,
    }
}

/// Bridge the default `message` event from `source` into a cold stream.
pub fn from_source<S: EventTarget>(source: Arc<S>, disposer: Option<Disposer>) -> SourceStream<S> {
    from_source_on(MESSAGE_EVENT, source, disposer)
}

/// Bridge a WebSocket-style endpoint (or anything compatible).
pub fn from_web_socket<S: EventTarget>(
    source: Arc<S>,
    disposer: Option<Disposer>,
) -> SourceStream<S> {
    from_source(source, disposer)
}

/// Bridge a message-port endpoint.
pub fn from_message_port<S: EventTarget>(
    source: Arc<S>,
    disposer: Option<Disposer>,
) -> SourceStream<S> {
    from_source(source, disposer)
}

/// Bridge a worker endpoint.
pub fn from_worker<S: EventTarget>(source: Arc<S>, disposer: Option<Disposer>) -> SourceStream<S> {
    from_source(source, disposer)
}

/// Cold stream of events delivered by a messaging endpoint.
///
/// Constructed by [`from_source_on`] and its specializations. Nothing is
/// attached to the source until [`SourceStream::subscribe`] is called, and
/// each subscription is fully independent.
pub struct SourceStream<S: EventTarget> {
    source: Arc<S>,
    event: String,
    disposer: Option<Disposer>,
}

impl<S: EventTarget + 'static> SourceStream<S> {
    /// Attach listeners to the source and return a live subscription.
    ///
    /// Sources with an open handshake get only an `open` listener at first;
    /// the `close`, `error`, and named-event listeners attach once the
    /// handshake completes. Everything attached here is recorded so teardown
    /// removes precisely those listeners.
    pub fn subscribe(&self) -> Subscription<S> {
        let (tx, rx) = mpsc::unbounded_channel();
        let teardown = Arc::new(Teardown {
            source: Arc::clone(&self.source),
            attached: Mutex::new(Vec::new()),
            disposer: self.disposer.clone(),
            done: AtomicBool::new(false),
        });

        if self.source.requires_open() {
            let on_open: EventListener<S::Payload> = {
                let teardown = Arc::clone(&teardown);
                let event = self.event.clone();
                let tx = tx.clone();
                Arc::new(move |_| attach_active(&teardown, &event, &tx))
            };
            teardown.record("open", Arc::clone(&on_open));
            self.source.add_listener("open", on_open);
            trace!(event = %self.event, "subscription waiting for open handshake");
        } else {
            attach_active(&teardown, &self.event, &tx);
        }

        Subscription {
            rx,
            teardown,
            finished: false,
        }
    }
}

/// Attach the close/error/named-event listeners for one subscription.
fn attach_active<S: EventTarget + 'static>(
    teardown: &Arc<Teardown<S>>,
    event: &str,
    tx: &mpsc::UnboundedSender<SourceItem<S::Payload>>,
) {
    let on_close: EventListener<S::Payload> = {
        let teardown = Arc::clone(teardown);
        Arc::new(move |_| teardown.run())
    };
    let on_error: EventListener<S::Payload> = {
        let teardown = Arc::clone(teardown);
        let tx = tx.clone();
        Arc::new(move |value| {
            let _ = tx.send(Err(SourceError { value }));
            teardown.run();
        })
    };
    let on_message: EventListener<S::Payload> = {
        let tx = tx.clone();
        Arc::new(move |payload| {
            // A named delivery without a payload carries nothing to forward.
            if let Some(payload) = payload {
                let _ = tx.send(Ok(payload));
            }
        })
    };

    teardown.record("close", Arc::clone(&on_close));
    teardown.source.add_listener("close", on_close);
    teardown.record("error", Arc::clone(&on_error));
    teardown.source.add_listener("error", on_error);
    teardown.record(event, Arc::clone(&on_message));
    teardown.source.add_listener(event, on_message);
    trace!(event = %event, "subscription listeners attached");
}

/// Per-subscription teardown state: the exact listeners attached so far and
/// a once-only guard.
struct Teardown<S: EventTarget> {
    source: Arc<S>,
    attached: Mutex<Vec<(String, EventListener<S::Payload>)>>,
    disposer: Option<Disposer>,
    done: AtomicBool,
}

impl<S: EventTarget> Teardown<S> {
    fn record(&self, event: &str, listener: EventListener<S::Payload>) {
        self.attached.lock().push((event.to_string(), listener));
    }

    /// Detach every recorded listener in attach order, then run the
    /// disposer. Idempotent; later calls return immediately.
    fn run(&self) {
        if self.done.swap(true, Ordering::SeqCst) {
            return;
        }
        // Lock released before talking to the source; close/error listeners
        // call back into here from inside a delivery.
        let attached = mem::take(&mut *self.attached.lock());
        for (event, listener) in &attached {
            self.source.remove_listener(event, listener);
        }
        trace!(listeners = attached.len(), "subscription torn down");
        if let Some(disposer) = &self.disposer {
            disposer();
        }
    }
}

/// Live subscription produced by [`SourceStream::subscribe`].
///
/// Yields `Ok(payload)` per named event in delivery order, then ends after
/// the source's `close`, or yields one `Err` carrying the `error` value and
/// ends. Dropping the subscription detaches its listeners and runs the
/// disposer if teardown has not already happened.
pub struct Subscription<S: EventTarget> {
    rx: mpsc::UnboundedReceiver<SourceItem<S::Payload>>,
    teardown: Arc<Teardown<S>>,
    finished: bool,
}

impl<S: EventTarget> Stream for Subscription<S> {
    type Item = SourceItem<S::Payload>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }
        match this.rx.poll_recv(cx) {
            Poll::Ready(Some(item)) => {
                if item.is_err() {
                    this.finished = true;
                }
                Poll::Ready(Some(item))
            }
            Poll::Ready(None) => {
                this.finished = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<S: EventTarget> Drop for Subscription<S> {
    fn drop(&mut self) {
        self.teardown.run();
    }
}
