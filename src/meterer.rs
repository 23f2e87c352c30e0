//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! 计量器
//!
//! 编排资源解析、对象大小查询、周期键推导、限额查询和用量扣减，
//! 回答“这次访问是否允许”，允许时提交扣减。
//!
//! # 判定流程
//!
//! 1. 解析资源标识，失败返回 [`MetererError::InvalidResourceUri`]
//! 2. 查询对象大小，对象存储错误原样返回
//! 3. 推导各周期键
//! 4. 查询配额池限额，没有任何限额时直接允许且不扣减
//! 5. 读取所有已配置周期的用量，任一周期超限即拒绝，不扣减任何计数器
//! 6. 否则按对象大小扣减所有已配置周期
//!
//! [`EnforcementMode::Strict`] 下第 5、6 步按配额池串行执行。

use crate::config::{EnforcementMode, MeterConfig};
use crate::error::MetererError;
use crate::ledger::UsageLedger;
use crate::object_store::ObjectStore;
use crate::period::{PeriodKeys, PeriodKind};
use crate::policy::{PoolLimits, QuotaPolicyStore};
use crate::resource::ResourceLocation;
use crate::storage::CounterStore;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

/// 单个周期的用量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowUsage {
    /// 周期类型
    pub kind: PeriodKind,
    /// 周期键
    pub period_key: String,
    /// 判定前的用量
    pub usage_before: f64,
    /// 限额
    pub limit: u64,
    /// 判定后的用量（拒绝时与判定前相同）
    pub usage_after: f64,
}

impl WindowUsage {
    /// 剩余额度，超限时为 0
    pub fn remaining(&self) -> f64 {
        (self.limit as f64 - self.usage_after).max(0.0)
    }
}

/// 访问判定结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessDecision {
    /// 是否允许
    pub allowed: bool,
    /// 存储桶（配额池）
    pub bucket: String,
    /// 对象键
    pub key: String,
    /// 对象大小（字节）
    pub size: u64,
    /// 已配置周期的用量，按周期从小到大排列
    pub windows: Vec<WindowUsage>,
    /// 第一个超限的周期
    pub denied_by: Option<PeriodKind>,
}

impl AccessDecision {
    /// 获取指定周期的用量
    pub fn window(&self, kind: PeriodKind) -> Option<&WindowUsage> {
        self.windows.iter().find(|w| w.kind == kind)
    }
}

/// 计量器
pub struct Meterer {
    /// 用量账本
    ledger: UsageLedger,
    /// 配额策略
    policies: QuotaPolicyStore,
    /// 对象存储
    object_store: Arc<dyn ObjectStore>,
    /// 执行模式
    enforcement: EnforcementMode,
    /// 严格模式下每个配额池的锁
    pool_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl Meterer {
    /// 创建计量器
    ///
    /// 校验配置，并把配置中的配额池限额加载到策略存储。
    pub fn new(
        counter_store: Arc<dyn CounterStore>,
        object_store: Arc<dyn ObjectStore>,
        config: MeterConfig,
    ) -> Result<Self, MetererError> {
        config.validate().map_err(MetererError::ConfigError)?;

        let ledger = UsageLedger::new(
            counter_store,
            config.key_prefix.clone(),
            config.ttl_grace_duration(),
        );

        let policies = QuotaPolicyStore::new();
        for (pool, limits) in &config.pools {
            policies.set_limits(pool, limits)?;
        }

        info!(
            key_prefix = %config.key_prefix,
            ttl_grace_secs = config.ttl_grace_secs,
            enforcement = ?config.enforcement,
            pools = config.pools.len(),
            "计量器已创建"
        );

        Ok(Self {
            ledger,
            policies,
            object_store,
            enforcement: config.enforcement,
            pool_locks: DashMap::new(),
        })
    }

    /// 执行模式
    pub fn enforcement(&self) -> EnforcementMode {
        self.enforcement
    }

    /// 计数器键前缀
    pub fn key_prefix(&self) -> &str {
        self.ledger.key_prefix()
    }

    /// 已配置的配额池
    pub fn pools(&self) -> Vec<String> {
        self.policies.pools()
    }

    /// 设置配额池限额，未指定的周期保持原值
    ///
    /// 配额池名称不能作为计数器键组件时返回 `ConfigError`。
    pub fn set_limits_for_pool(
        &self,
        pool: &str,
        limits: &PoolLimits,
    ) -> Result<(), MetererError> {
        self.policies.set_limits(pool, limits)
    }

    /// 获取配额池限额，只包含已配置的周期
    pub fn get_limits_for_pool(&self, pool: &str) -> BTreeMap<PeriodKind, u64> {
        self.policies.get_limits(pool)
    }

    /// 按当前时间判定访问
    pub async fn allow_resource_access(&self, resource_uri: &str) -> Result<bool, MetererError> {
        self.allow_resource_access_at(resource_uri, Utc::now()).await
    }

    /// 按指定时间判定访问
    pub async fn allow_resource_access_at(
        &self,
        resource_uri: &str,
        when: DateTime<Utc>,
    ) -> Result<bool, MetererError> {
        let decision = self.check_resource_access(resource_uri, when).await?;
        Ok(decision.allowed)
    }

    /// 判定访问并返回完整的判定结果
    #[instrument(skip(self))]
    pub async fn check_resource_access(
        &self,
        resource_uri: &str,
        when: DateTime<Utc>,
    ) -> Result<AccessDecision, MetererError> {
        let location = ResourceLocation::parse(resource_uri)?;

        // 大小查询在锁外
        let size = self
            .object_store
            .object_size(&location.bucket, &location.key)
            .await
            .map_err(|e| {
                error!(bucket = %location.bucket, key = %location.key, error = %e, "查询对象大小失败");
                e
            })?;

        let keys = PeriodKeys::derive(&when);
        let limits = self.policies.pool_limits(&location.bucket);

        if limits.is_unlimited() {
            debug!(bucket = %location.bucket, size, "配额池未配置限额，直接允许");
            return Ok(AccessDecision {
                allowed: true,
                bucket: location.bucket,
                key: location.key,
                size,
                windows: Vec::new(),
                denied_by: None,
            });
        }

        let (windows, denied_by) = match self.enforcement {
            EnforcementMode::Soft => {
                self.check_and_charge(&location.bucket, &keys, &limits, size)
                    .await?
            }
            EnforcementMode::Strict => {
                let lock = self.pool_lock(&location.bucket);
                let _guard = lock.lock().await;
                self.check_and_charge(&location.bucket, &keys, &limits, size)
                    .await?
            }
        };

        let allowed = denied_by.is_none();
        if allowed {
            debug!(bucket = %location.bucket, key = %location.key, size, "访问已允许");
        }

        Ok(AccessDecision {
            allowed,
            bucket: location.bucket,
            key: location.key,
            size,
            windows,
            denied_by,
        })
    }

    /// 配额池在指定时间的各周期用量（只读）
    pub async fn usage_for_pool(
        &self,
        pool: &str,
        when: DateTime<Utc>,
    ) -> Result<Vec<WindowUsage>, MetererError> {
        let keys = PeriodKeys::derive(&when);
        let limits = self.policies.pool_limits(pool);

        let mut windows = Vec::new();
        for (kind, limit) in limits.configured() {
            let period_key = keys.get(kind);
            let usage = self.ledger.current_usage(pool, kind, period_key).await?;
            windows.push(WindowUsage {
                kind,
                period_key: period_key.to_string(),
                usage_before: usage,
                limit,
                usage_after: usage,
            });
        }

        Ok(windows)
    }

    /// 获取配额池的锁，不存在时创建
    fn pool_lock(&self, pool: &str) -> Arc<Mutex<()>> {
        self.pool_locks
            .entry(pool.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// 先检查全部已配置周期，全部通过后再逐一扣减
    async fn check_and_charge(
        &self,
        pool: &str,
        keys: &PeriodKeys,
        limits: &PoolLimits,
        size: u64,
    ) -> Result<(Vec<WindowUsage>, Option<PeriodKind>), MetererError> {
        let amount = size as f64;
        let mut windows = Vec::new();
        let mut denied_by = None;

        for (kind, limit) in limits.configured() {
            let period_key = keys.get(kind);
            let usage_before = self.ledger.current_usage(pool, kind, period_key).await?;
            let projected = usage_before + amount;

            if projected > limit as f64 && denied_by.is_none() {
                warn!(
                    pool = %pool,
                    kind = %kind,
                    period_key = %period_key,
                    usage = usage_before,
                    size,
                    limit,
                    "配额超限，拒绝访问"
                );
                denied_by = Some(kind);
            }

            windows.push(WindowUsage {
                kind,
                period_key: period_key.to_string(),
                usage_before,
                limit,
                usage_after: usage_before,
            });
        }

        if denied_by.is_some() {
            return Ok((windows, denied_by));
        }

        for window in &mut windows {
            let ttl = self.ledger.ttl_for(window.kind);
            window.usage_after = self
                .ledger
                .charge(pool, window.kind, &window.period_key, amount, ttl)
                .await?;
        }

        Ok((windows, None))
    }
}
