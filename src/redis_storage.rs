//! Redis计数存储
//!
//! 基于 `ConnectionManager` 的 [`CounterStore`] 实现。
//!
//! - `get` / `set` / `incr_by_float` 直接映射到 `GET`、`SET EX`、`INCRBYFLOAT`
//! - `incr_by_float_with_ttl` 通过预加载的 Lua 脚本原子执行
//! - 不做重试：所有错误原样返回给调用方

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client, IntoConnectionInfo};
use secrecy::{ExposeSecret, Secret};
use std::time::Duration;
use tracing::{error, info, trace};

use crate::error::StorageError;
use crate::lua_scripts::ChargeScript;
use crate::storage::CounterStore;

/// Redis配置
#[derive(Clone)]
pub struct RedisConfig {
    /// Redis连接URL
    pub url: String,
    /// 数据库索引
    pub db: i64,
    /// 密码（使用 Secret 包装以防止意外泄露）
    pub password: Option<Secret<String>>,
    /// 连接超时
    pub connection_timeout: Duration,
}

impl std::fmt::Debug for RedisConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisConfig")
            .field("url", &self.url)
            .field("db", &self.db)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("connection_timeout", &self.connection_timeout)
            .finish()
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            db: 0,
            password: None,
            connection_timeout: Duration::from_secs(5),
        }
    }
}

impl RedisConfig {
    /// 创建新的Redis配置
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// 设置数据库索引
    pub fn db(mut self, db: i64) -> Self {
        self.db = db;
        self
    }

    /// 设置密码
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(Secret::new(password.into()));
        self
    }

    /// 设置密码（使用 Secret）
    pub fn password_secret(mut self, password: Secret<String>) -> Self {
        self.password = Some(password);
        self
    }

    /// 设置连接超时
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// 生成连接信息，配置中的 db 和密码优先于 URL 中的值
    fn connection_info(&self) -> Result<redis::ConnectionInfo, StorageError> {
        let mut info = self.url.as_str().into_connection_info().map_err(|e| {
            StorageError::ConnectionError(format!("无效的Redis URL: {}", e))
        })?;

        info.redis.db = self.db;
        if let Some(password) = &self.password {
            info.redis.password = Some(password.expose_secret().clone());
        }

        Ok(info)
    }
}

/// 解析 Redis 返回的浮点数
fn parse_float_reply(key: &str, value: String) -> Result<f64, StorageError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| StorageError::CorruptValue {
            key: key.to_string(),
            value,
        })
}

/// Redis存储实现
#[derive(Clone)]
pub struct RedisStorage {
    /// 连接管理器（内部自动重连）
    conn: ConnectionManager,
    /// 配置
    config: RedisConfig,
    /// 扣减脚本
    charge_script: ChargeScript,
}

impl RedisStorage {
    /// 创建新的Redis存储并预加载脚本
    pub async fn new(config: RedisConfig) -> Result<Self, StorageError> {
        info!("创建Redis存储, URL: {}", config.url);

        let client = Client::open(config.connection_info()?).map_err(|e| {
            error!("创建Redis客户端失败: {}", e);
            StorageError::ConnectionError(format!("创建Redis客户端失败: {}", e))
        })?;

        let mut conn = tokio::time::timeout(config.connection_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| {
                error!("连接Redis超时: {:?}", config.connection_timeout);
                StorageError::TimeoutError(format!(
                    "连接Redis超时（{:?}）",
                    config.connection_timeout
                ))
            })?
            .map_err(|e| {
                error!("创建Redis连接管理器失败: {}", e);
                StorageError::ConnectionError(format!("创建Redis连接管理器失败: {}", e))
            })?;

        let charge_script = ChargeScript::new();
        charge_script.load(&mut conn).await?;

        info!("Redis存储创建成功");
        Ok(Self {
            conn,
            config,
            charge_script,
        })
    }

    /// 获取配置
    pub fn config(&self) -> &RedisConfig {
        &self.config
    }

    /// 检查Redis连接
    pub async fn ping(&self) -> Result<(), StorageError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                error!("Redis PING失败: {}", e);
                StorageError::from(e)
            })?;
        Ok(())
    }
}

#[async_trait]
impl CounterStore for RedisStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut conn = self.conn.clone();
        let result: Option<String> = conn.get(key).await.map_err(|e| {
            error!("Redis GET失败: {}", e);
            StorageError::from(e)
        })?;

        trace!("GET key={}, result={:?}", key, result);
        Ok(result)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<u64>) -> Result<(), StorageError> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = ttl {
            cmd.arg("EX").arg(ttl.max(1));
        }

        let _: () = cmd.query_async(&mut conn).await.map_err(|e| {
            error!("Redis SET失败: {}", e);
            StorageError::from(e)
        })?;

        trace!("SET key={}, value={:?}, ttl={:?}", key, value, ttl);
        Ok(())
    }

    async fn incr_by_float(&self, key: &str, amount: f64) -> Result<f64, StorageError> {
        let mut conn = self.conn.clone();
        let reply: String = redis::cmd("INCRBYFLOAT")
            .arg(key)
            .arg(amount)
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                error!("Redis INCRBYFLOAT失败: {}", e);
                StorageError::from(e)
            })?;

        trace!("INCRBYFLOAT key={}, amount={}, result={}", key, amount, reply);
        parse_float_reply(key, reply)
    }

    async fn incr_by_float_with_ttl(
        &self,
        key: &str,
        amount: f64,
        ttl: u64,
    ) -> Result<f64, StorageError> {
        let mut conn = self.conn.clone();
        let reply = self
            .charge_script
            .execute(&mut conn, key, amount, ttl.max(1))
            .await?;

        trace!("CHARGE key={}, amount={}, ttl={}, result={}", key, amount, ttl, reply);
        parse_float_reply(key, reply)
    }
}
