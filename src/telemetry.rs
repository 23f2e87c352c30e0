//! 日志初始化
//!
//! 为使用计量器的进程安装 `tracing-subscriber` 格式化输出。
//! 库本身只通过 `tracing` 宏记录事件，是否输出由调用方决定。
//!
//! # 示例
//!
//! ```rust
//! use meterer::telemetry::{init_tracing, TelemetryConfig};
//!
//! let config = TelemetryConfig::new("meterer=debug");
//! // 重复初始化返回错误，不会 panic
//! let _ = init_tracing(&config);
//! ```

use crate::error::MetererError;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 日志配置
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// 过滤指令，`RUST_LOG` 已设置时优先使用环境变量
    pub filter: String,
    /// 是否输出事件目标
    pub with_target: bool,
    /// 是否输出线程 ID
    pub with_thread_ids: bool,
    /// 是否使用 ANSI 颜色
    pub ansi: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            with_target: true,
            with_thread_ids: false,
            ansi: true,
        }
    }
}

impl TelemetryConfig {
    /// 创建新的配置
    pub fn new(filter: impl Into<String>) -> Self {
        Self {
            filter: filter.into(),
            ..Default::default()
        }
    }

    /// 设置是否输出事件目标
    pub fn with_target(mut self, enabled: bool) -> Self {
        self.with_target = enabled;
        self
    }

    /// 设置是否输出线程 ID
    pub fn with_thread_ids(mut self, enabled: bool) -> Self {
        self.with_thread_ids = enabled;
        self
    }

    /// 设置是否使用 ANSI 颜色
    pub fn with_ansi(mut self, enabled: bool) -> Self {
        self.ansi = enabled;
        self
    }

    /// 构造过滤器
    fn env_filter(&self) -> Result<EnvFilter, MetererError> {
        if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
            return Ok(EnvFilter::from_default_env());
        }

        EnvFilter::try_new(&self.filter)
            .map_err(|e| MetererError::ConfigError(format!("无效的日志过滤指令: {}", e)))
    }
}

/// 安装全局日志订阅器
///
/// 全局订阅器只能安装一次，重复调用返回 [`MetererError::ConfigError`]。
pub fn init_tracing(config: &TelemetryConfig) -> Result<(), MetererError> {
    let filter = config.env_filter()?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.with_target)
        .with_thread_ids(config.with_thread_ids)
        .with_ansi(config.ansi)
        .try_init()
        .map_err(|e| MetererError::ConfigError(format!("日志订阅器初始化失败: {}", e)))?;

    info!(filter = %config.filter, "日志已初始化");
    Ok(())
}
