//! Bridges between callback-style messaging endpoints and async streams.
//!
//! Push sources (socket-like objects, server-push channels, message ports)
//! deliver named events to registered listeners; this crate adapts them into
//! cold, re-subscribable async streams, and symmetrically drains a stream
//! back out through an endpoint's transmit primitive. Subscription lifecycle,
//! termination-signal translation, and listener cleanup on every exit path
//! live here; the endpoints themselves are owned by the caller.
//!
//! # Examples
//!
//! Subscribing to a source:
//! ```
//! use std::sync::Arc;
//!
//! use futures_util::StreamExt;
//! use msgbridge::{fakes::FakeEndpoint, source::from_web_socket};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let socket = Arc::new(FakeEndpoint::new());
//! let stream = from_web_socket(Arc::clone(&socket), None);
//! let mut sub = stream.subscribe();
//!
//! socket.emit("message", Some("hello".to_string()));
//! socket.close();
//!
//! assert_eq!(sub.next().await, Some(Ok("hello".to_string())));
//! assert_eq!(sub.next().await, None);
//! # }
//! ```
//!
//! Draining a stream into a sink:
//! ```
//! use std::sync::Arc;
//!
//! use futures_util::stream;
//! use msgbridge::{fakes::FakeEndpoint, sink::to_message_port, source::SourceItem};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let port = Arc::new(FakeEndpoint::new());
//! let items: Vec<SourceItem<String>> = vec![Ok("a".to_string()), Ok("b".to_string())];
//!
//! to_message_port(stream::iter(items), port.as_ref())
//!     .await
//!     .expect("drain");
//! assert_eq!(port.sent(), vec!["a".to_string(), "b".to_string()]);
//! # }
//! ```
#![deny(missing_docs)]

/// Capability traits for event-emitting endpoints.
pub mod endpoint;
/// Scriptable in-memory endpoints for tests and benches.
pub mod fakes;
/// Stream-to-sink drain functions.
pub mod sink;
/// Source-to-stream subscription bridge.
pub mod source;
