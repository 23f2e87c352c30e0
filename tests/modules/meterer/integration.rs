//! 计量器集成测试
//!
//! 验证判定与扣减的原子性、错误透传和执行模式

use crate::common::{
    at, create_object_store, create_test_meterer, CountingObjectStore, FailingCounterStore,
    FailingObjectStore, RecordingCounterStore, BUCKET, URI,
};
use meterer::config::{EnforcementMode, MeterConfig};
use meterer::error::{MetererError, ObjectStoreError, StorageError};
use meterer::meterer::Meterer;
use meterer::period::PeriodKind;
use meterer::policy::PoolLimits;
use meterer::storage::CounterStore;
use std::sync::Arc;

#[tokio::test]
async fn test_deny_performs_no_writes() {
    let store = Arc::new(RecordingCounterStore::new());
    let meterer = Meterer::new(store.clone(), create_object_store(), MeterConfig::default()).unwrap();
    meterer.set_limits_for_pool(BUCKET, &PoolLimits::new().hour(100).day(300).week(1000)).unwrap();

    assert!(meterer.allow_resource_access_at(URI, at(0, 0)).await.unwrap());
    assert!(meterer.allow_resource_access_at(URI, at(0, 1)).await.unwrap());
    store.clear();

    assert!(!meterer.allow_resource_access_at(URI, at(0, 2)).await.unwrap());
    assert!(store.writes().is_empty());
    // 所有已配置周期都被读取
    assert_eq!(store.ops().len(), 3);
}

#[tokio::test]
async fn test_allow_charges_exactly_configured_windows() {
    let store = Arc::new(RecordingCounterStore::new());
    let meterer = Meterer::new(store.clone(), create_object_store(), MeterConfig::default()).unwrap();
    meterer.set_limits_for_pool(BUCKET, &PoolLimits::new().day(300).month(5000)).unwrap();

    let decision = meterer.check_resource_access(URI, at(0, 0)).await.unwrap();
    assert!(decision.allowed);

    let writes = store.writes();
    assert_eq!(writes.len(), 2);
    let keys: Vec<String> = writes
        .iter()
        .map(|op| match op {
            crate::common::CounterOp::Charge(key, amount, _) => {
                assert_eq!(*amount, 40.0);
                key.clone()
            }
            other => panic!("unexpected write {:?}", other),
        })
        .collect();
    assert_eq!(
        keys,
        vec![
            "meterer:bucketname:day:2017-01-01".to_string(),
            "meterer:bucketname:month:2017-01".to_string()
        ]
    );
}

#[tokio::test]
async fn test_exact_limit_is_allowed() {
    let t = create_test_meterer(MeterConfig::default());
    t.meterer
        .set_limits_for_pool(BUCKET, &PoolLimits::new().hour(80)).unwrap();

    assert!(t.meterer.allow_resource_access_at(URI, at(0, 0)).await.unwrap());
    // 40 + 40 == 80，不超过限额
    assert!(t.meterer.allow_resource_access_at(URI, at(0, 0)).await.unwrap());
    assert!(!t.meterer.allow_resource_access_at(URI, at(0, 0)).await.unwrap());
}

#[tokio::test]
async fn test_object_larger_than_limit_is_denied_immediately() {
    let t = create_test_meterer(MeterConfig::default());
    t.objects.put_object(BUCKET, "big", 1_000).unwrap();
    t.meterer
        .set_limits_for_pool(BUCKET, &PoolLimits::new().day(999)).unwrap();

    let decision = t
        .meterer
        .check_resource_access("s3://bucketname/big", at(0, 0))
        .await
        .unwrap();
    assert!(!decision.allowed);
    assert_eq!(decision.denied_by, Some(PeriodKind::Day));
    assert!(t.storage.is_empty());
}

#[tokio::test]
async fn test_invalid_uri_makes_no_external_calls() {
    let store = Arc::new(RecordingCounterStore::new());
    let objects = Arc::new(CountingObjectStore::new(create_object_store()));
    let meterer = Meterer::new(store.clone(), objects.clone(), MeterConfig::default()).unwrap();
    meterer.set_limits_for_pool(BUCKET, &PoolLimits::new().hour(100)).unwrap();

    let err = meterer
        .allow_resource_access_at("s3://bucketname", at(0, 0))
        .await
        .unwrap_err();
    assert!(err.is_invalid_resource());
    assert_eq!(objects.calls(), 0);
    assert!(store.ops().is_empty());
}

#[tokio::test]
async fn test_object_store_errors_propagate_verbatim() {
    let original = ObjectStoreError::ConnectionError("endpoint unreachable".to_string());
    let store = Arc::new(RecordingCounterStore::new());
    let meterer = Meterer::new(
        store.clone(),
        Arc::new(FailingObjectStore::new(original.clone())),
        MeterConfig::default(),
    )
    .unwrap();
    meterer.set_limits_for_pool(BUCKET, &PoolLimits::new().hour(100)).unwrap();

    let err = meterer.allow_resource_access_at(URI, at(0, 0)).await.unwrap_err();
    assert!(matches!(err, MetererError::ObjectStore(ref e) if *e == original));
    assert!(store.ops().is_empty());
}

#[tokio::test]
async fn test_missing_object_is_not_a_decision() {
    let t = create_test_meterer(MeterConfig::default());
    t.meterer
        .set_limits_for_pool(BUCKET, &PoolLimits::new().hour(100)).unwrap();
    let err = t
        .meterer
        .allow_resource_access_at("s3://bucketname/nope", at(0, 0))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MetererError::ObjectStore(ObjectStoreError::ObjectNotFound { .. })
    ));
}

#[tokio::test]
async fn test_storage_read_error_propagates() {
    let meterer = Meterer::new(
        Arc::new(FailingCounterStore::failing_reads()),
        create_object_store(),
        MeterConfig::default(),
    )
    .unwrap();
    meterer.set_limits_for_pool(BUCKET, &PoolLimits::new().hour(100)).unwrap();

    let err = meterer.allow_resource_access_at(URI, at(0, 0)).await.unwrap_err();
    assert!(matches!(err, MetererError::Storage(StorageError::ConnectionError(_))));
    assert_eq!(err.stage(), "ledger");
}

#[tokio::test]
async fn test_charge_failure_after_check_propagates() {
    let store = Arc::new(FailingCounterStore::failing_charge_from(1));
    let meterer = Meterer::new(store.clone(), create_object_store(), MeterConfig::default()).unwrap();
    meterer.set_limits_for_pool(BUCKET, &PoolLimits::new().hour(100).day(300)).unwrap();

    let err = meterer.allow_resource_access_at(URI, at(0, 0)).await.unwrap_err();
    assert!(matches!(err, MetererError::Storage(StorageError::TimeoutError(_))));

    // 第一个周期已扣减，失败不做回滚
    assert_eq!(
        store
            .inner()
            .get("meterer:bucketname:hour:2017-01-01T00")
            .await
            .unwrap(),
        Some("40".to_string())
    );
    assert_eq!(
        store
            .inner()
            .get("meterer:bucketname:day:2017-01-01")
            .await
            .unwrap(),
        None
    );
}

#[tokio::test]
async fn test_custom_prefix_and_grace() {
    let config = MeterConfig::default()
        .key_prefix("tenant-a")
        .ttl_grace(std::time::Duration::from_secs(60));
    let t = create_test_meterer(config);
    t.meterer
        .set_limits_for_pool(BUCKET, &PoolLimits::new().hour(100)).unwrap();
    assert_eq!(t.meterer.key_prefix(), "tenant-a");

    t.meterer.allow_resource_access(URI).await.unwrap();
    assert_eq!(t.storage.len(), 1);
}

#[tokio::test]
async fn test_usage_for_pool_is_read_only() {
    let t = create_test_meterer(MeterConfig::default());
    t.meterer
        .set_limits_for_pool(BUCKET, &PoolLimits::new().hour(100).year(1_000)).unwrap();

    t.meterer.allow_resource_access_at(URI, at(0, 0)).await.unwrap();
    let before = t.storage.len();
    let usage = t.meterer.usage_for_pool(BUCKET, at(0, 10)).await.unwrap();
    assert_eq!(t.storage.len(), before);

    assert_eq!(usage.len(), 2);
    assert_eq!(usage[0].kind, PeriodKind::Hour);
    assert_eq!(usage[0].period_key, "2017-01-01T00");
    assert_eq!(usage[0].usage_after, 40.0);
    assert_eq!(usage[1].kind, PeriodKind::Year);
    assert_eq!(usage[1].remaining(), 960.0);

    assert!(t.meterer.usage_for_pool("other", at(0, 0)).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_decisions_independent_of_enforcement_mode() {
    for mode in [EnforcementMode::Soft, EnforcementMode::Strict] {
        let t = create_test_meterer(MeterConfig::default().enforcement(mode));
        t.meterer
            .set_limits_for_pool(BUCKET, &PoolLimits::new().hour(100)).unwrap();
        let mut results = Vec::new();
        for minute in [0, 59, 59] {
            results.push(
                t.meterer
                    .allow_resource_access_at(URI, at(0, minute))
                    .await
                    .unwrap(),
            );
        }
        results.push(t.meterer.allow_resource_access_at(URI, at(1, 0)).await.unwrap());
        assert_eq!(results, vec![true, true, false, true], "{:?}", mode);
        assert_eq!(t.meterer.enforcement(), mode);
    }
}

#[tokio::test]
async fn test_pools_do_not_share_counters() {
    let t = create_test_meterer(MeterConfig::default());
    t.objects.create_bucket("other");
    t.objects.put_object("other", "key1", 40).unwrap();
    t.meterer
        .set_limits_for_pool(BUCKET, &PoolLimits::new().hour(40)).unwrap();
    t.meterer
        .set_limits_for_pool("other", &PoolLimits::new().hour(40)).unwrap();

    assert!(t.meterer.allow_resource_access_at(URI, at(0, 0)).await.unwrap());
    assert!(!t.meterer.allow_resource_access_at(URI, at(0, 0)).await.unwrap());
    assert!(t
        .meterer
        .allow_resource_access_at("s3://other/key1", at(0, 0))
        .await
        .unwrap());
}
