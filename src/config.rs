//! 配置模块
//!
//! 定义计量器的配置结构，支持 YAML、TOML、JSON 三种格式。
//!
//! ```yaml
//! key_prefix: meterer
//! ttl_grace_secs: 3600
//! enforcement: soft
//! pools:
//!   bucketname:
//!     hour: 100
//!     day: 300
//! ```

use crate::constants::{
    DEFAULT_KEY_PREFIX, DEFAULT_TTL_GRACE_SECS, SECONDS_PER_LONGEST_YEAR,
};
use crate::error::MetererError;
use crate::policy::{validate_pool_name, PoolLimits};
use ahash::AHashMap as HashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// 限额执行模式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnforcementMode {
    /// 软限额：先检查全部周期再扣减全部周期，请求之间不加锁。
    /// 并发请求可能让用量略微超过限额。
    #[default]
    Soft,
    /// 严格限额：同一配额池的“检查 + 扣减”串行执行。
    /// 对象大小查询不在锁内。代价是同一配额池的判定无法并行。
    Strict,
}

/// 计量器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeterConfig {
    /// 计数器键前缀
    pub key_prefix: String,
    /// 计数器过期宽限期（秒）
    pub ttl_grace_secs: u64,
    /// 限额执行模式
    pub enforcement: EnforcementMode,
    /// 启动时加载的配额池限额
    pub pools: HashMap<String, PoolLimits>,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            ttl_grace_secs: DEFAULT_TTL_GRACE_SECS,
            enforcement: EnforcementMode::Soft,
            pools: HashMap::new(),
        }
    }
}

impl MeterConfig {
    /// 设置键前缀
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// 设置宽限期
    pub fn ttl_grace(mut self, grace: Duration) -> Self {
        self.ttl_grace_secs = grace.as_secs();
        self
    }

    /// 设置执行模式
    pub fn enforcement(mut self, mode: EnforcementMode) -> Self {
        self.enforcement = mode;
        self
    }

    /// 添加配额池限额
    pub fn pool(mut self, name: impl Into<String>, limits: PoolLimits) -> Self {
        self.pools.insert(name.into(), limits);
        self
    }

    /// 宽限期
    pub fn ttl_grace_duration(&self) -> Duration {
        Duration::from_secs(self.ttl_grace_secs)
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), String> {
        if self.key_prefix.is_empty() {
            return Err("键前缀不能为空".to_string());
        }

        if self.key_prefix.contains('*') || self.key_prefix.contains('?') {
            return Err(format!("键前缀包含非法字符: {}", self.key_prefix));
        }

        if self.ttl_grace_secs == 0 {
            return Err("宽限期必须大于0".to_string());
        }

        if self.ttl_grace_secs > SECONDS_PER_LONGEST_YEAR {
            return Err(format!(
                "宽限期过大: {} 秒（最大 {} 秒）",
                self.ttl_grace_secs, SECONDS_PER_LONGEST_YEAR
            ));
        }

        for name in self.pools.keys() {
            validate_pool_name(name)?;
        }

        Ok(())
    }

    /// 从 YAML 字符串加载
    pub fn from_yaml_str(s: &str) -> Result<Self, MetererError> {
        let config: MeterConfig = serde_yaml::from_str(s)?;
        config.validate().map_err(MetererError::ConfigError)?;
        Ok(config)
    }

    /// 从 TOML 字符串加载
    pub fn from_toml_str(s: &str) -> Result<Self, MetererError> {
        let config: MeterConfig = toml::from_str(s)?;
        config.validate().map_err(MetererError::ConfigError)?;
        Ok(config)
    }

    /// 从 JSON 字符串加载
    pub fn from_json_str(s: &str) -> Result<Self, MetererError> {
        let config: MeterConfig = serde_json::from_str(s)?;
        config.validate().map_err(MetererError::ConfigError)?;
        Ok(config)
    }

    /// 从文件加载，按扩展名选择格式
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, MetererError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content),
            Some("toml") => Self::from_toml_str(&content),
            Some("json") => Self::from_json_str(&content),
            other => Err(MetererError::ConfigError(format!(
                "不支持的配置文件格式: {:?}",
                other
            ))),
        }
    }
}
