//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! 配额策略模块
//!
//! 按配额池（存储桶）保存每种周期的最大字节数。未配置的周期视为不限量。

use crate::error::MetererError;
use crate::ledger::check_key_component;
use crate::period::PeriodKind;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// 配额池的周期限额
///
/// 每个字段对应一种周期，`None` 表示该周期不限量。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolLimits {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hour: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub week: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<u64>,
}

impl PoolLimits {
    /// 创建空限额（全部不限量）
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置小时限额
    pub fn hour(mut self, bytes: u64) -> Self {
        self.hour = Some(bytes);
        self
    }

    /// 设置天限额
    pub fn day(mut self, bytes: u64) -> Self {
        self.day = Some(bytes);
        self
    }

    /// 设置周限额
    pub fn week(mut self, bytes: u64) -> Self {
        self.week = Some(bytes);
        self
    }

    /// 设置月限额
    pub fn month(mut self, bytes: u64) -> Self {
        self.month = Some(bytes);
        self
    }

    /// 设置年限额
    pub fn year(mut self, bytes: u64) -> Self {
        self.year = Some(bytes);
        self
    }

    /// 获取指定周期的限额
    pub fn get(&self, kind: PeriodKind) -> Option<u64> {
        match kind {
            PeriodKind::Hour => self.hour,
            PeriodKind::Day => self.day,
            PeriodKind::Week => self.week,
            PeriodKind::Month => self.month,
            PeriodKind::Year => self.year,
        }
    }

    /// 设置指定周期的限额
    pub fn set(&mut self, kind: PeriodKind, limit: Option<u64>) {
        let slot = match kind {
            PeriodKind::Hour => &mut self.hour,
            PeriodKind::Day => &mut self.day,
            PeriodKind::Week => &mut self.week,
            PeriodKind::Month => &mut self.month,
            PeriodKind::Year => &mut self.year,
        };
        *slot = limit;
    }

    /// 合并：只用 `other` 中已配置的周期覆盖当前值
    pub fn merge(&mut self, other: &PoolLimits) {
        for (kind, limit) in other.configured() {
            self.set(kind, Some(limit));
        }
    }

    /// 已配置的周期及限额，按 [`PeriodKind::ALL`] 顺序
    pub fn configured(&self) -> Vec<(PeriodKind, u64)> {
        PeriodKind::ALL
            .iter()
            .filter_map(|kind| self.get(*kind).map(|limit| (*kind, limit)))
            .collect()
    }

    /// 是否没有任何限额
    pub fn is_unlimited(&self) -> bool {
        PeriodKind::ALL.iter().all(|kind| self.get(*kind).is_none())
    }

    /// 转换为映射，只包含已配置的周期
    pub fn to_map(&self) -> BTreeMap<PeriodKind, u64> {
        self.configured().into_iter().collect()
    }
}

/// 校验配额池名称
///
/// 名称会成为计数器键的一部分，须满足键组件规则，且不能含 `/`（存储桶名不含 `/`）。
/// 配置加载和运行时设置限额都经过这里。
pub fn validate_pool_name(name: &str) -> Result<(), String> {
    check_key_component(name).map_err(|e| format!("配额池名称无效: {}", e))?;

    if name.contains('/') {
        return Err(format!("配额池名称包含非法字符: {}", name));
    }

    Ok(())
}

/// 配额策略存储
///
/// 仅在进程内保存，重启后需重新配置。
pub struct QuotaPolicyStore {
    pools: DashMap<String, PoolLimits>,
}

impl QuotaPolicyStore {
    /// 创建空的策略存储
    pub fn new() -> Self {
        Self {
            pools: DashMap::new(),
        }
    }

    /// 设置配额池限额
    ///
    /// 只替换 `limits` 中已配置的周期，其余周期保持原值。
    /// 配额池不存在时自动创建。
    pub fn set_limits(&self, pool: &str, limits: &PoolLimits) -> Result<(), MetererError> {
        validate_pool_name(pool).map_err(MetererError::ConfigError)?;

        let mut entry = self.pools.entry(pool.to_string()).or_default();
        entry.merge(limits);

        info!(
            pool = %pool,
            hour = ?entry.hour,
            day = ?entry.day,
            week = ?entry.week,
            month = ?entry.month,
            year = ?entry.year,
            "配额池限额已更新"
        );
        Ok(())
    }

    /// 获取配额池限额映射，配额池不存在时返回空映射
    pub fn get_limits(&self, pool: &str) -> BTreeMap<PeriodKind, u64> {
        self.pool_limits(pool).to_map()
    }

    /// 获取配额池限额结构，配额池不存在时全部为 `None`
    pub fn pool_limits(&self, pool: &str) -> PoolLimits {
        self.pools.get(pool).map(|l| *l).unwrap_or_default()
    }

    /// 已知的配额池名称（排序后）
    pub fn pools(&self) -> Vec<String> {
        let mut names: Vec<String> = self.pools.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

impl Default for QuotaPolicyStore {
    fn default() -> Self {
        Self::new()
    }
}
