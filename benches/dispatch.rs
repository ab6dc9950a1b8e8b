use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};

use hcs_notify::{NotificationKind, ObjectHandle, SimulatedService, WatcherHub, WatcherHubConfig, WatcherKey};

fn make_hub(watchers: usize) -> (Arc<WatcherHub>, Vec<hcs_notify::WatcherHandle>, Vec<hcs_notify::Waiter>) {
    let hub = WatcherHub::new(WatcherHubConfig::default(), Arc::new(SimulatedService::new())).unwrap();
    let mut handles = Vec::with_capacity(watchers);
    let mut waiters = Vec::with_capacity(watchers);
    for i in 0..watchers {
        let (handle, waiter) = hub
            .open(ObjectHandle::from_raw(i), NotificationKind::SystemStartCompleted)
            .unwrap();
        handles.push(handle);
        waiters.push(waiter);
    }
    (hub, handles, waiters)
}

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");
    group.throughput(Throughput::Elements(1));

    // Irrelevant kinds leave the wait pending, so the same watchers can be
    // hit repeatedly without resolving them.
    let (hub, handles, _waiters) = make_hub(1024);
    let mut i = 0usize;
    group.bench_function("ignored_live_key", |b| {
        b.iter(|| {
            let key = handles[i % handles.len()].key();
            i = i.wrapping_add(1);
            hub.dispatch(NotificationKind::ProcessExited, key, 0, false)
        });
    });

    group.bench_function("lookup_miss", |b| {
        b.iter(|| hub.dispatch(NotificationKind::ProcessExited, WatcherKey::from_raw(usize::MAX), 0, false));
    });

    group.bench_function("open_resolve_close", |b| {
        b.iter(|| {
            let (handle, waiter) = hub
                .open(ObjectHandle::from_raw(1), NotificationKind::ProcessExited)
                .unwrap();
            hub.dispatch(NotificationKind::ProcessExited, handle.key(), 0, false);
            let outcome = waiter.recv();
            handle.close().unwrap();
            outcome
        });
    });

    group.finish();
}

criterion_group!(benches, bench_dispatch);
criterion_main!(benches);
