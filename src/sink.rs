//! Stream-to-sink drain.
//!
//! [`drain_to_sink`] forwards every stream element to a sink through a send
//! primitive, after an optional readiness handshake, racing the stream
//! against the sink's own `close`/`error` signals. Whichever terminates
//! first decides the result; the race listeners are detached before
//! returning on every path.

use std::sync::Arc;

use futures_core::Stream;
use futures_util::StreamExt;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::debug;

use crate::{
    endpoint::{EventListener, EventTarget, MessageSink},
    source::{SourceError, SourceItem},
};

/// Failure surfaced while draining a stream into a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainError<P> {
    /// The sink emitted `error`, before or after becoming ready; carries the
    /// delivered value unchanged.
    Sink(Option<P>),
    /// The stream itself failed before the sink terminated.
    Stream(SourceError<P>),
}

impl<P> From<SourceError<P>> for DrainError<P> {
    fn from(value: SourceError<P>) -> Self {
        Self::Stream(value)
    }
}

/// Result of a completed drain.
pub type DrainResult<P> = Result<(), DrainError<P>>;

/// First terminating signal observed on the sink while draining.
enum SinkSignal<P> {
    Closed,
    Failed(Option<P>),
}

/// Deferred sink-readiness signal produced by a drain init step.
///
/// Obtained from [`init_open`] for sinks with an open handshake, or from
/// [`InitWatch::ready`] for sinks that accept payloads immediately. Any
/// listeners attached while arming the watch are detached once it settles.
pub struct InitWatch<P> {
    rx: Option<oneshot::Receiver<Result<(), Option<P>>>>,
    attached: Vec<(&'static str, EventListener<P>)>,
}

impl<P: Send + 'static> InitWatch<P> {
    /// Readiness signal that resolves immediately, for sinks without an
    /// open handshake.
    pub fn ready() -> Self {
        Self {
            rx: None,
            attached: Vec::new(),
        }
    }

    /// Wait for the watch to resolve, then detach whatever it attached.
    async fn settle<K>(mut self, sink: &K) -> DrainResult<P>
    where
        K: EventTarget<Payload = P>,
    {
        let outcome = match self.rx.take() {
            None => Ok(()),
            Some(rx) => match rx.await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(value)) => Err(DrainError::Sink(value)),
                // Both handshake listeners vanished without firing.
                Err(_) => Err(DrainError::Sink(None)),
            },
        };
        for (event, listener) in self.attached.drain(..) {
            sink.remove_listener(event, &listener);
        }
        outcome
    }
}

/// Arm a readiness watch over a sink's open handshake.
///
/// Attaches `open` and `error` listeners; the returned watch resolves when
/// `open` fires and fails with the delivered value when `error` fires first.
pub fn init_open<K: EventTarget>(sink: &K) -> InitWatch<K::Payload> {
    let (tx, rx) = oneshot::channel();
    let tx = Arc::new(Mutex::new(Some(tx)));

    let on_open: EventListener<K::Payload> = {
        let tx = Arc::clone(&tx);
        Arc::new(move |_| {
            if let Some(tx) = tx.lock().take() {
                let _ = tx.send(Ok(()));
            }
        })
    };
    let on_error: EventListener<K::Payload> = Arc::new(move |value| {
        if let Some(tx) = tx.lock().take() {
            let _ = tx.send(Err(value));
        }
    });

    sink.add_listener("open", Arc::clone(&on_open));
    sink.add_listener("error", Arc::clone(&on_error));

    InitWatch {
        rx: Some(rx),
        attached: vec![("open", on_open), ("error", on_error)],
    }
}

/// Forward every element of `stream` to `sink` via `send`, in arrival order.
///
/// `init` arms the readiness signal; no payload is sent before it resolves.
/// Once ready, the stream races the sink's `close`/`error` signals: stream
/// completion or a clean sink close fulfills, a sink `error` or a failed
/// stream rejects with the respective value. Already-sent elements are never
/// rolled back.
pub async fn drain_to_sink<K, St, I, SendFn>(
    stream: St,
    init: I,
    send: SendFn,
    sink: &K,
) -> DrainResult<K::Payload>
where
    K: EventTarget,
    St: Stream<Item = SourceItem<K::Payload>>,
    I: FnOnce(&K) -> InitWatch<K::Payload>,
    SendFn: Fn(&K, K::Payload),
{
    init(sink).settle(sink).await?;

    let (signal_tx, mut signal_rx) = oneshot::channel();
    let signal_tx = Arc::new(Mutex::new(Some(signal_tx)));

    let on_close: EventListener<K::Payload> = {
        let signal_tx = Arc::clone(&signal_tx);
        Arc::new(move |_| {
            if let Some(tx) = signal_tx.lock().take() {
                let _ = tx.send(SinkSignal::Closed);
            }
        })
    };
    let on_error: EventListener<K::Payload> = {
        let signal_tx = Arc::clone(&signal_tx);
        Arc::new(move |value| {
            if let Some(tx) = signal_tx.lock().take() {
                let _ = tx.send(SinkSignal::Failed(value));
            }
        })
    };
    sink.add_listener("close", Arc::clone(&on_close));
    sink.add_listener("error", Arc::clone(&on_error));

    tokio::pin!(stream);

    let outcome = loop {
        tokio::select! {
            biased;
            signal = &mut signal_rx => {
                break match signal {
                    Ok(SinkSignal::Failed(value)) => Err(DrainError::Sink(value)),
                    Ok(SinkSignal::Closed) | Err(_) => Ok(()),
                };
            }
            item = stream.next() => match item {
                Some(Ok(payload)) => send(sink, payload),
                Some(Err(failure)) => break Err(DrainError::Stream(failure)),
                None => break Ok(()),
            },
        }
    };

    sink.remove_listener("close", &on_close);
    sink.remove_listener("error", &on_error);
    debug!(ok = outcome.is_ok(), "sink drain finished");

    outcome
}

/// Drain `stream` into a WebSocket-style sink.
///
/// Waits for the sink's own `open`/`error` handshake before sending.
pub async fn to_web_socket<K, St>(stream: St, sink: &K) -> DrainResult<K::Payload>
where
    K: MessageSink,
    St: Stream<Item = SourceItem<K::Payload>>,
{
    drain_to_sink(
        stream,
        init_open::<K>,
        |sink: &K, payload| sink.post(payload),
        sink,
    )
    .await
}

/// Drain `stream` into a message-port sink; no handshake is required.
pub async fn to_message_port<K, St>(stream: St, sink: &K) -> DrainResult<K::Payload>
where
    K: MessageSink,
    St: Stream<Item = SourceItem<K::Payload>>,
{
    drain_to_sink(
        stream,
        |_sink: &K| InitWatch::ready(),
        |sink: &K, payload| sink.post(payload),
        sink,
    )
    .await
}

/// Drain `stream` into a worker sink; no handshake is required.
pub async fn to_worker<K, St>(stream: St, sink: &K) -> DrainResult<K::Payload>
where
    K: MessageSink,
    St: Stream<Item = SourceItem<K::Payload>>,
{
    to_message_port(stream, sink).await
}
