//! Lua脚本管理器
//!
//! 提供计数器扣减脚本的预加载、SHA缓存和 NOSCRIPT 后的自动重新加载。
//!
//! 计数器扣减需要“INCRBYFLOAT + 新建时设置过期”在同一个原子操作内完成，
//! Redis 没有现成的单条命令，因此用脚本实现。

use redis::{aio::ConnectionLike, Script};
use tracing::{debug, error, info, trace};

use crate::error::StorageError;

/// 计数器扣减Lua脚本
///
/// 参数: KEYS[1] - key, ARGV[1] - amount, ARGV[2] - ttl (秒)
/// 返回: 扣减后的累计值（字符串）
///
/// `TTL` 返回 -1 表示键存在但没有过期时间，新建的键也属于这种情况。
pub const CHARGE_COUNTER_SCRIPT: &str = r#"
local key = KEYS[1]
local amount = ARGV[1]
local ttl = tonumber(ARGV[2])

local total = redis.call('INCRBYFLOAT', key, amount)

if redis.call('TTL', key) == -1 then
    redis.call('EXPIRE', key, ttl)
end

return total
"#;

/// 扣减脚本，SHA 在创建时算好
#[derive(Debug, Clone)]
pub struct ChargeScript {
    sha: String,
}

impl ChargeScript {
    pub fn new() -> Self {
        Self {
            sha: Script::new(CHARGE_COUNTER_SCRIPT).get_hash().to_string(),
        }
    }

    /// 脚本SHA
    pub fn sha(&self) -> &str {
        &self.sha
    }

    /// 把脚本加载到Redis
    pub async fn load<C>(&self, conn: &mut C) -> Result<(), StorageError>
    where
        C: ConnectionLike,
    {
        let sha: String = redis::cmd("SCRIPT")
            .arg("LOAD")
            .arg(CHARGE_COUNTER_SCRIPT)
            .query_async(conn)
            .await
            .map_err(|e| {
                error!("预加载扣减脚本失败: {}", e);
                StorageError::from(e)
            })?;

        if sha != self.sha {
            return Err(StorageError::QueryError(format!(
                "脚本SHA不一致: 本地 {}, 服务端 {}",
                self.sha, sha
            )));
        }

        info!("扣减脚本已加载, SHA: {}", sha);
        Ok(())
    }

    /// 执行扣减（NOSCRIPT 时重新加载一次）
    pub async fn execute<C>(
        &self,
        conn: &mut C,
        key: &str,
        amount: f64,
        ttl: u64,
    ) -> Result<String, StorageError>
    where
        C: ConnectionLike,
    {
        let amount = amount.to_string();
        let ttl = ttl.to_string();
        trace!("执行扣减脚本: key={}, SHA: {}", key, self.sha);

        match self.evalsha(conn, key, &amount, &ttl).await {
            Ok(result) => Ok(result),
            Err(e) if e.kind() == redis::ErrorKind::NoScriptError => {
                // 服务端脚本缓存被清空（重启或 SCRIPT FLUSH）
                debug!("脚本SHA不存在，重新加载");
                self.load(conn).await?;

                self.evalsha(conn, key, &amount, &ttl).await.map_err(|e| {
                    error!("扣减脚本执行失败: {}", e);
                    StorageError::from(e)
                })
            }
            Err(e) => {
                error!("扣减脚本执行失败: {}", e);
                Err(StorageError::from(e))
            }
        }
    }

    async fn evalsha<C>(
        &self,
        conn: &mut C,
        key: &str,
        amount: &str,
        ttl: &str,
    ) -> redis::RedisResult<String>
    where
        C: ConnectionLike,
    {
        redis::cmd("EVALSHA")
            .arg(&self.sha)
            .arg(1)
            .arg(key)
            .arg(amount)
            .arg(ttl)
            .query_async(conn)
            .await
    }
}

impl Default for ChargeScript {
    fn default() -> Self {
        Self::new()
    }
}
