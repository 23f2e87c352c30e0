//! 端到端测试：并发访问
//!
//! 严格模式下同一配额池的判定串行执行，用量不会超过限额；
//! 软限额模式下允许有限超额，但不会丢失扣减。

use crate::common::{at, create_test_meterer, BUCKET, OBJECT_SIZE, URI};
use meterer::config::{EnforcementMode, MeterConfig};
use meterer::policy::PoolLimits;
use std::sync::Arc;

async fn run_concurrent(mode: EnforcementMode, requests: usize) -> (usize, f64) {
    let t = create_test_meterer(MeterConfig::default().enforcement(mode));
    t.meterer
        .set_limits_for_pool(BUCKET, &PoolLimits::new().hour(400).day(10_000)).unwrap();
    let meterer = Arc::new(t.meterer);

    let mut handles = Vec::new();
    for _ in 0..requests {
        let meterer = meterer.clone();
        handles.push(tokio::spawn(async move {
            meterer.allow_resource_access_at(URI, at(0, 0)).await.unwrap()
        }));
    }

    let mut allowed = 0;
    for handle in handles {
        if handle.await.unwrap() {
            allowed += 1;
        }
    }

    let usage = meterer.usage_for_pool(BUCKET, at(0, 0)).await.unwrap();
    (allowed, usage[0].usage_after)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_e2e_strict_mode_exact() {
    let (allowed, hour_usage) = run_concurrent(EnforcementMode::Strict, 64).await;
    assert_eq!(allowed, 10);
    assert_eq!(hour_usage, 400.0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_e2e_soft_mode_counts_every_allowed_access() {
    let (allowed, hour_usage) = run_concurrent(EnforcementMode::Soft, 64).await;
    assert!(allowed >= 10);
    // 每次允许的访问都被计入
    assert_eq!(hour_usage, (allowed as u64 * OBJECT_SIZE) as f64);
}
