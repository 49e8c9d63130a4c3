//! The process-wide container.
//!
//! A single test, since every step shares the one global slot.

use std::sync::Arc;

use observability_kit::global;

mod common;

#[tokio::test]
async fn test_container_lifecycle() {
    let dir = common::TempDir::new("obs-it-global");
    assert!(global::get().is_none());
    assert!(!global::teardown().await);

    let first = global::initialize(common::quiet_config(dir.path())).await;
    assert!(Arc::ptr_eq(&first, &global::handle()));
    assert!(Arc::ptr_eq(&first, &global::get().unwrap()));

    first.start();
    let second = global::initialize(common::quiet_config(dir.path())).await;
    assert!(!first.is_started(), "replaced context must be shut down");
    assert!(Arc::ptr_eq(&second, &global::handle()));

    second.start();
    assert!(global::teardown().await);
    assert!(!second.is_started());
    assert!(global::get().is_none());
}
