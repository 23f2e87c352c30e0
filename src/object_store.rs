//! 对象存储抽象
//!
//! 计量只需要对象存储回答一个问题：某个对象有多少字节。
//! 凭证、会话等配置由具体实现自行持有，不影响计量算法。

use crate::error::ObjectStoreError;
use ahash::AHashMap as HashMap;
use async_trait::async_trait;
use dashmap::DashMap;
use tracing::trace;

/// 对象存储接口
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// 查询对象字节数
    ///
    /// 对象或存储桶不存在、连接失败时返回对应的 [`ObjectStoreError`]，
    /// 调用方应原样透传。
    async fn object_size(&self, bucket: &str, key: &str) -> Result<u64, ObjectStoreError>;
}

/// 内存对象存储
///
/// 只记录对象大小，不保存内容。
pub struct MemoryObjectStore {
    buckets: DashMap<String, HashMap<String, u64>>,
}

impl MemoryObjectStore {
    /// 创建空的对象存储
    pub fn new() -> Self {
        Self {
            buckets: DashMap::new(),
        }
    }

    /// 创建存储桶，已存在时不做任何事
    pub fn create_bucket(&self, bucket: &str) {
        self.buckets.entry(bucket.to_string()).or_default();
    }

    /// 写入对象（只记录大小）
    pub fn put_object(&self, bucket: &str, key: &str, size: u64) -> Result<(), ObjectStoreError> {
        let mut objects = self
            .buckets
            .get_mut(bucket)
            .ok_or_else(|| ObjectStoreError::BucketNotFound(bucket.to_string()))?;
        objects.insert(key.to_string(), size);
        Ok(())
    }

    /// 删除对象，返回是否存在
    pub fn delete_object(&self, bucket: &str, key: &str) -> bool {
        self.buckets
            .get_mut(bucket)
            .map(|mut objects| objects.remove(key).is_some())
            .unwrap_or(false)
    }
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn object_size(&self, bucket: &str, key: &str) -> Result<u64, ObjectStoreError> {
        let objects = self
            .buckets
            .get(bucket)
            .ok_or_else(|| ObjectStoreError::BucketNotFound(bucket.to_string()))?;

        let size = objects
            .get(key)
            .copied()
            .ok_or_else(|| ObjectStoreError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })?;

        trace!(bucket, key, size, "对象大小");
        Ok(size)
    }
}
