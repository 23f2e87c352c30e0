//! 端到端测试：小时限额
//!
//! 测试场景：
//! 1. 限额 hour=100，对象 40 字节
//! 2. 00:00 允许（40）
//! 3. 00:59 允许（80）
//! 4. 00:59 拒绝（保持 80）
//! 5. 01:00 允许（新的一小时从 40 开始）

use crate::common::{at, create_test_meterer, BUCKET, URI};
use meterer::config::MeterConfig;
use meterer::period::PeriodKind;
use meterer::policy::PoolLimits;
use meterer::storage::CounterStore;

#[tokio::test]
async fn test_e2e_hourly_quota() {
    let t = create_test_meterer(MeterConfig::default());
    t.meterer
        .set_limits_for_pool(BUCKET, &PoolLimits::new().hour(100)).unwrap();

    let hour0 = "meterer:bucketname:hour:2017-01-01T00";
    let hour1 = "meterer:bucketname:hour:2017-01-01T01";

    // Step 1
    assert!(t.meterer.allow_resource_access_at(URI, at(0, 0)).await.unwrap());
    assert_eq!(t.storage.get(hour0).await.unwrap(), Some("40".to_string()));

    // Step 2
    assert!(t.meterer.allow_resource_access_at(URI, at(0, 59)).await.unwrap());
    assert_eq!(t.storage.get(hour0).await.unwrap(), Some("80".to_string()));

    // Step 3
    let decision = t.meterer.check_resource_access(URI, at(0, 59)).await.unwrap();
    assert!(!decision.allowed);
    assert_eq!(decision.denied_by, Some(PeriodKind::Hour));
    assert_eq!(t.storage.get(hour0).await.unwrap(), Some("80".to_string()));

    // Step 4
    assert!(t.meterer.allow_resource_access_at(URI, at(1, 0)).await.unwrap());
    assert_eq!(t.storage.get(hour1).await.unwrap(), Some("40".to_string()));
    assert_eq!(t.storage.get(hour0).await.unwrap(), Some("80".to_string()));
}

/// 只配置小时限额时，其他周期不产生计数器
#[tokio::test]
async fn test_e2e_hourly_quota_touches_only_hour_counters() {
    let t = create_test_meterer(MeterConfig::default());
    t.meterer
        .set_limits_for_pool(BUCKET, &PoolLimits::new().hour(100)).unwrap();

    for minute in [0, 10, 20] {
        t.meterer
            .allow_resource_access_at(URI, at(0, minute))
            .await
            .unwrap();
    }

    assert_eq!(t.storage.len(), 1);
    assert_eq!(
        t.storage
            .get("meterer:bucketname:day:2017-01-01")
            .await
            .unwrap(),
        None
    );
}
