use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};
use futures_util::{StreamExt, stream};

use msgbridge::{
    fakes::FakeEndpoint,
    sink::to_message_port,
    source::{SourceItem, from_source},
};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime")
}

fn bench_source_bridge(c: &mut Criterion) {
    let rt = runtime();
    c.bench_function("bridge_10k_messages", |b| {
        b.iter(|| {
            rt.block_on(async {
                let source = Arc::new(FakeEndpoint::new());
                let sub = from_source(Arc::clone(&source), None).subscribe();
                for i in 0..10_000u32 {
                    source.emit("message", Some(i));
                }
                source.close();

                let items: Vec<_> = sub.collect().await;
                assert_eq!(items.len(), 10_000);
            });
        });
    });
}

fn bench_sink_drain(c: &mut Criterion) {
    let rt = runtime();
    c.bench_function("drain_10k_messages", |b| {
        b.iter(|| {
            rt.block_on(async {
                let sink = Arc::new(FakeEndpoint::new());
                let items: Vec<SourceItem<u32>> = (0..10_000u32).map(Ok).collect();

                to_message_port(stream::iter(items), sink.as_ref())
                    .await
                    .expect("drain");
                assert_eq!(sink.sent().len(), 10_000);
            });
        });
    });
}

criterion_group!(benches, bench_source_bridge, bench_sink_drain);
criterion_main!(benches);
