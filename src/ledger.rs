//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! 用量账本模块
//!
//! 在计数存储中维护“配额池 × 周期 × 周期键”的累计字节数。
//!
//! # 键格式
//!
//! `{prefix}:{pool}:{kind}:{period_key}`，例如 `meterer:bucketname:hour:2017-01-01T00`。
//!
//! # 过期
//!
//! 计数器首次扣减时设置过期时间 = 周期长度 + 宽限期，之后不再延长，
//! 因此不需要显式清理。

use crate::constants::{KEY_SEPARATOR, MAX_KEY_COMPONENT_LENGTH, MAX_KEY_LENGTH};
use crate::error::StorageError;
use crate::period::PeriodKind;
use crate::storage::CounterStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, trace};

/// 检查键组件，失败时返回错误描述
pub(crate) fn check_key_component(component: &str) -> Result<(), String> {
    if component.is_empty() {
        return Err("键组件不能为空".to_string());
    }

    if component.len() > MAX_KEY_COMPONENT_LENGTH {
        return Err(format!(
            "键组件长度超过限制（最大 {} 字符）",
            MAX_KEY_COMPONENT_LENGTH
        ));
    }

    if component.contains(KEY_SEPARATOR)
        || component.contains('*')
        || component.contains('?')
        || component.contains('\0')
    {
        return Err(format!("键组件包含非法字符: {}", component));
    }

    Ok(())
}

/// 验证键组件
fn validate_key_component(component: &str) -> Result<(), StorageError> {
    check_key_component(component).map_err(StorageError::QueryError)
}

/// 用量账本
#[derive(Clone)]
pub struct UsageLedger {
    /// 计数存储
    store: Arc<dyn CounterStore>,
    /// 键前缀
    key_prefix: String,
    /// 过期宽限期
    ttl_grace: Duration,
}

impl UsageLedger {
    /// 创建新的用量账本
    pub fn new(store: Arc<dyn CounterStore>, key_prefix: impl Into<String>, ttl_grace: Duration) -> Self {
        Self {
            store,
            key_prefix: key_prefix.into(),
            ttl_grace,
        }
    }

    /// 键前缀
    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    /// 生成计数器键
    pub fn counter_key(
        &self,
        pool: &str,
        kind: PeriodKind,
        period_key: &str,
    ) -> Result<String, StorageError> {
        validate_key_component(pool)?;
        validate_key_component(period_key)?;

        let key = format!(
            "{prefix}{sep}{pool}{sep}{kind}{sep}{period_key}",
            prefix = self.key_prefix,
            sep = KEY_SEPARATOR,
            pool = pool,
            kind = kind.as_str(),
            period_key = period_key
        );

        if key.len() > MAX_KEY_LENGTH {
            return Err(StorageError::QueryError(format!(
                "键长度超过限制（最大 {} 字符）",
                MAX_KEY_LENGTH
            )));
        }

        Ok(key)
    }

    /// 周期计数器的过期时间
    pub fn ttl_for(&self, kind: PeriodKind) -> Duration {
        kind.counter_ttl(self.ttl_grace)
    }

    /// 读取当前用量，计数器不存在或已过期时为 0
    pub async fn current_usage(
        &self,
        pool: &str,
        kind: PeriodKind,
        period_key: &str,
    ) -> Result<f64, StorageError> {
        let key = self.counter_key(pool, kind, period_key)?;
        let raw = self.store.get(&key).await.map_err(|e| {
            error!(key = %key, error = %e, "读取用量失败");
            e
        })?;

        let usage = match raw {
            Some(value) => value
                .trim()
                .parse::<f64>()
                .map_err(|_| StorageError::CorruptValue {
                    key: key.clone(),
                    value,
                })?,
            None => 0.0,
        };

        trace!(key = %key, usage, "读取用量");
        Ok(usage)
    }

    /// 扣减用量，返回新的累计值
    ///
    /// 通过计数存储的单个原子原语完成“自增 + 新建时设置过期”。
    pub async fn charge(
        &self,
        pool: &str,
        kind: PeriodKind,
        period_key: &str,
        amount: f64,
        ttl: Duration,
    ) -> Result<f64, StorageError> {
        let key = self.counter_key(pool, kind, period_key)?;
        // 不足一秒按一秒计，避免 EXPIRE 0 立即删除
        let ttl_secs = ttl.as_secs().max(1);

        let total = self
            .store
            .incr_by_float_with_ttl(&key, amount, ttl_secs)
            .await
            .map_err(|e| {
                error!(key = %key, amount, error = %e, "扣减用量失败");
                e
            })?;

        debug!(key = %key, amount, total, ttl_secs, "用量已扣减");
        Ok(total)
    }
}
