//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! 错误类型定义
//!
//! 使用thiserror定义所有错误类型。解析、对象存储、计数存储三类错误彼此独立，
//! 调用方可以据此判断失败发生在哪个阶段。

use thiserror::Error;

/// Meterer 错误类型
#[derive(Error, Debug)]
pub enum MetererError {
    /// 资源标识格式错误
    #[error("无效的资源标识: {0}")]
    InvalidResourceUri(String),

    /// 对象存储错误（原样透传）
    #[error("对象存储错误: {0}")]
    ObjectStore(#[from] ObjectStoreError),

    /// 计数存储错误（原样透传）
    #[error("存储错误: {0}")]
    Storage(#[from] StorageError),

    /// 配置错误
    #[error("配置错误: {0}")]
    ConfigError(String),

    /// IO错误
    #[error("IO错误: {0}")]
    IoError(#[from] std::io::Error),

    /// 序列化错误
    #[error("序列化错误: {0}")]
    SerdeError(#[from] serde_json::Error),

    /// YAML解析错误
    #[error("YAML解析错误: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// TOML解析错误
    #[error("TOML解析错误: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl MetererError {
    /// 是否为资源标识错误
    pub fn is_invalid_resource(&self) -> bool {
        matches!(self, MetererError::InvalidResourceUri(_))
    }

    /// 失败发生的阶段
    pub fn stage(&self) -> &'static str {
        match self {
            MetererError::InvalidResourceUri(_) => "parse",
            MetererError::ObjectStore(_) => "resolve",
            MetererError::Storage(_) => "ledger",
            MetererError::ConfigError(_)
            | MetererError::IoError(_)
            | MetererError::SerdeError(_)
            | MetererError::YamlError(_)
            | MetererError::TomlError(_) => "config",
        }
    }
}

/// 计数存储错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    /// 连接错误
    #[error("连接错误: {0}")]
    ConnectionError(String),

    /// 查询错误
    #[error("查询错误: {0}")]
    QueryError(String),

    /// 超时错误
    #[error("超时错误: {0}")]
    TimeoutError(String),

    /// 未找到
    #[error("未找到: {0}")]
    NotFound(String),

    /// 计数值无法解析为数字
    #[error("计数值损坏: key={key}, value={value}")]
    CorruptValue { key: String, value: String },
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for StorageError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_timeout() {
            StorageError::TimeoutError(err.to_string())
        } else if err.is_connection_dropped() || err.is_connection_refusal() || err.is_io_error()
        {
            StorageError::ConnectionError(err.to_string())
        } else {
            StorageError::QueryError(err.to_string())
        }
    }
}

/// 对象存储错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ObjectStoreError {
    /// 对象不存在
    #[error("对象不存在: {bucket}/{key}")]
    ObjectNotFound { bucket: String, key: String },

    /// 存储桶不存在
    #[error("存储桶不存在: {0}")]
    BucketNotFound(String),

    /// 连接错误
    #[error("连接错误: {0}")]
    ConnectionError(String),

    /// 响应无法解析
    #[error("无效的响应: {0}")]
    InvalidResponse(String),
}
