//! 存储抽象层
//!
//! 定义计数存储接口和内存实现。接口只包含计量所需的最小操作集：
//! 读取、带过期的写入、原子浮点自增，以及“自增并在新建时设置过期”的原子原语。

use crate::error::StorageError;
use async_trait::async_trait;
use std::time::{Duration, Instant};

/// 计数存储接口
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// 获取值，不存在或已过期时返回 `None`
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// 设置值
    ///
    /// `ttl` 为秒数，不足 1 秒按 1 秒计；`None` 表示清除已有的过期时间。
    async fn set(&self, key: &str, value: &str, ttl: Option<u64>) -> Result<(), StorageError>;

    /// 原子浮点自增，键不存在时从 0 开始
    async fn incr_by_float(&self, key: &str, amount: f64) -> Result<f64, StorageError>;

    /// 原子浮点自增，并在键新建或没有过期时间时设置 `ttl` 秒过期
    ///
    /// 自增与过期设置必须在同一个原子操作内完成。
    async fn incr_by_float_with_ttl(
        &self,
        key: &str,
        amount: f64,
        ttl: u64,
    ) -> Result<f64, StorageError>;
}

/// 内存条目
#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    expires_at: Option<Instant>,
}

/// 计算过期时刻，不足一秒按一秒计
fn expiry_after(now: Instant, ttl: u64) -> Result<Instant, StorageError> {
    now.checked_add(Duration::from_secs(ttl.max(1)))
        .ok_or_else(|| StorageError::QueryError(format!("过期时间超出范围: {} 秒", ttl)))
}

impl MemoryEntry {
    fn new(value: String, ttl: Option<u64>) -> Result<Self, StorageError> {
        let expires_at = match ttl {
            Some(secs) => Some(expiry_after(Instant::now(), secs)?),
            None => None,
        };
        Ok(Self { value, expires_at })
    }

    fn persistent(value: String) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(at) if now >= at)
    }
}

/// 解析计数值
fn parse_counter(key: &str, value: &str) -> Result<f64, StorageError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| StorageError::CorruptValue {
            key: key.to_string(),
            value: value.to_string(),
        })
}

/// 内存存储实现
///
/// 每个键的读改写在 DashMap 分片锁内完成，因此单键操作是原子的。
/// 过期采用惰性删除：读取时发现过期即移除，也可调用 [`MemoryStorage::cleanup_expired`]。
pub struct MemoryStorage {
    data: dashmap::DashMap<String, MemoryEntry>,
}

impl MemoryStorage {
    /// 创建新的内存存储
    pub fn new() -> Self {
        Self {
            data: dashmap::DashMap::new(),
        }
    }

    /// 当前键数量（包含尚未清理的过期键）
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 键的剩余存活时间，不存在、已过期或没有过期时间时返回 `None`
    pub fn remaining_ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        self.data
            .get(key)
            .and_then(|entry| entry.expires_at)
            .and_then(|at| at.checked_duration_since(now))
    }

    /// 清理过期键，返回清理数量
    pub fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let mut count = 0;
        self.data.retain(|_, entry| {
            if entry.is_expired(now) {
                count += 1;
                false
            } else {
                true
            }
        });
        count
    }

    /// 在单键锁内执行自增
    fn increment(&self, key: &str, amount: f64, ttl: Option<u64>) -> Result<f64, StorageError> {
        let now = Instant::now();
        let expiry = ttl.map(|ttl| expiry_after(now, ttl)).transpose()?;
        let mut fresh = false;
        let mut entry = self.data.entry(key.to_string()).or_insert_with(|| {
            fresh = true;
            MemoryEntry::persistent("0".to_string())
        });

        if entry.is_expired(now) {
            *entry = MemoryEntry::persistent("0".to_string());
            fresh = true;
        }

        let current = parse_counter(key, &entry.value)?;
        let updated = current + amount;
        entry.value = updated.to_string();

        if expiry.is_some() && (fresh || entry.expires_at.is_none()) {
            entry.expires_at = expiry;
        }

        Ok(updated)
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CounterStore for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let now = Instant::now();
        if let Some(entry) = self.data.get(key) {
            if !entry.is_expired(now) {
                return Ok(Some(entry.value.clone()));
            }
        } else {
            return Ok(None);
        }

        // 过期了，删除记录
        self.data.remove_if(key, |_, entry| entry.is_expired(now));
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<u64>) -> Result<(), StorageError> {
        let entry = MemoryEntry::new(value.to_string(), ttl)?;
        self.data.insert(key.to_string(), entry);
        Ok(())
    }

    async fn incr_by_float(&self, key: &str, amount: f64) -> Result<f64, StorageError> {
        self.increment(key, amount, None)
    }

    async fn incr_by_float_with_ttl(
        &self,
        key: &str,
        amount: f64,
        ttl: u64,
    ) -> Result<f64, StorageError> {
        self.increment(key, amount, Some(ttl))
    }
}
