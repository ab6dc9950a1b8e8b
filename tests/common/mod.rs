#![allow(dead_code)]

use std::sync::Arc;

use hcs_notify::{SimulatedService, WatcherHub, WatcherHubConfig};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn hub() -> (Arc<WatcherHub>, Arc<SimulatedService>) {
    init_tracing();
    let service = Arc::new(SimulatedService::new());
    let hub = WatcherHub::new(WatcherHubConfig::default(), service.clone()).unwrap();
    (hub, service)
}
