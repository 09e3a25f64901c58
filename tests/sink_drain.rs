use std::{sync::Arc, time::Duration};

use futures_util::stream;

use msgbridge::{
    fakes::FakeEndpoint,
    sink::{DrainError, to_message_port, to_web_socket, to_worker},
    source::{SourceError, SourceItem, from_message_port},
};

async fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(1), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {what}"));
}

fn ok_items(payloads: &[&str]) -> Vec<SourceItem<String>> {
    payloads.iter().map(|p| Ok(p.to_string())).collect()
}

#[tokio::test]
async fn drain_forwards_all_payloads_in_order_and_fulfills() {
    let sink = Arc::new(FakeEndpoint::new());
    let items = ok_items(&["a", "b", "c"]);

    to_message_port(stream::iter(items), sink.as_ref())
        .await
        .expect("drain");

    assert_eq!(
        sink.sent(),
        vec!["a".to_string(), "b".to_string(), "c".to_string()]
    );
    assert_eq!(sink.listener_count(), 0);
}

#[tokio::test]
async fn stream_failure_rejects_with_stream_error() {
    let sink = Arc::new(FakeEndpoint::new());
    let items: Vec<SourceItem<String>> = vec![
        Ok("a".to_string()),
        Err(SourceError {
            value: Some("bad".to_string()),
        }),
        Ok("never".to_string()),
    ];

    let result = to_worker(stream::iter(items), sink.as_ref()).await;

    assert_eq!(
        result,
        Err(DrainError::Stream(SourceError {
            value: Some("bad".to_string())
        }))
    );
    assert_eq!(sink.sent(), vec!["a".to_string()]);
    assert_eq!(sink.listener_count(), 0);
}

#[tokio::test]
async fn sink_error_mid_drain_rejects_and_stops_forwarding() {
    let source = Arc::new(FakeEndpoint::new());
    let sub = from_message_port(Arc::clone(&source), None).subscribe();

    let sink = Arc::new(FakeEndpoint::new());
    let drain_sink = Arc::clone(&sink);
    let task = tokio::spawn(async move { to_message_port(sub, drain_sink.as_ref()).await });

    source.emit("message", Some("m1".to_string()));
    source.emit("message", Some("m2".to_string()));
    wait_until("two sends", || sink.sent().len() == 2).await;

    sink.fail("dead".to_string());
    let result = task.await.expect("join");
    assert_eq!(
        result,
        Err(DrainError::Sink(Some("dead".to_string())))
    );

    // The drain is over; later source traffic must not reach the sink.
    source.emit("message", Some("m3".to_string()));
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(sink.sent(), vec!["m1".to_string(), "m2".to_string()]);
    assert_eq!(sink.listener_count(), 0);
}

#[tokio::test]
async fn sink_close_mid_drain_fulfills_early() {
    let source = Arc::new(FakeEndpoint::new());
    let sub = from_message_port(Arc::clone(&source), None).subscribe();

    let sink = Arc::new(FakeEndpoint::new());
    let drain_sink = Arc::clone(&sink);
    let task = tokio::spawn(async move { to_message_port(sub, drain_sink.as_ref()).await });

    source.emit("message", Some("m1".to_string()));
    wait_until("first send", || sink.sent().len() == 1).await;

    sink.close();
    task.await.expect("join").expect("clean close fulfills");

    source.emit("message", Some("m2".to_string()));
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(sink.sent(), vec!["m1".to_string()]);
    assert_eq!(sink.listener_count(), 0);
}

#[tokio::test]
async fn handshake_defers_sends_until_open() {
    let sink = Arc::new(FakeEndpoint::with_handshake());
    let items = ok_items(&["x", "y"]);

    let drain_sink = Arc::clone(&sink);
    let task = tokio::spawn(async move { to_web_socket(stream::iter(items), drain_sink.as_ref()).await });

    // Both handshake listeners armed, nothing sent yet.
    wait_until("handshake listeners", || sink.listener_count() == 2).await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(sink.sent().is_empty());

    sink.open();
    task.await.expect("join").expect("drain after open");
    assert_eq!(sink.sent(), vec!["x".to_string(), "y".to_string()]);
    assert_eq!(sink.listener_count(), 0);
}

#[tokio::test]
async fn sink_error_before_open_rejects() {
    let sink = Arc::new(FakeEndpoint::with_handshake());
    let items = ok_items(&["x"]);

    let drain_sink = Arc::clone(&sink);
    let task = tokio::spawn(async move { to_web_socket(stream::iter(items), drain_sink.as_ref()).await });

    wait_until("handshake listeners", || sink.listener_count() == 2).await;
    sink.fail("refused".to_string());

    let result = task.await.expect("join");
    assert_eq!(
        result,
        Err(DrainError::Sink(Some("refused".to_string())))
    );
    assert!(sink.sent().is_empty());
    assert_eq!(sink.listener_count(), 0);
}

#[tokio::test]
async fn source_to_sink_round_trip_preserves_order() {
    let source = Arc::new(FakeEndpoint::new());
    let sub = from_message_port(Arc::clone(&source), None).subscribe();

    source.emit("message", Some("a".to_string()));
    source.emit("message", Some("b".to_string()));
    source.emit("message", Some("c".to_string()));
    source.close();

    let sink = Arc::new(FakeEndpoint::new());
    to_message_port(sub, sink.as_ref()).await.expect("drain");

    assert_eq!(
        sink.sent(),
        vec!["a".to_string(), "b".to_string(), "c".to_string()]
    );
    assert_eq!(source.listener_count(), 0);
    assert_eq!(sink.listener_count(), 0);
}
