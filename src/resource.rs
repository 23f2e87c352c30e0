//! 资源标识解析
//!
//! 把 `s3://bucket/key` 形式的资源标识解析为存储桶和对象键。
//! 只做基本的结构检查，不做任何规范化。

use crate::constants::RESOURCE_SCHEME;
use crate::error::MetererError;
use std::fmt;
use std::str::FromStr;

/// 解析后的资源位置
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceLocation {
    /// 存储桶（同时是配额池名称）
    pub bucket: String,
    /// 对象键
    pub key: String,
}

impl ResourceLocation {
    /// 解析资源标识
    ///
    /// # 示例
    /// ```rust
    /// use meterer::resource::ResourceLocation;
    ///
    /// let loc = ResourceLocation::parse("s3://bucketname/path/to/key1").unwrap();
    /// assert_eq!(loc.bucket, "bucketname");
    /// assert_eq!(loc.key, "path/to/key1");
    /// assert!(ResourceLocation::parse("s3://foo").is_err());
    /// ```
    pub fn parse(uri: &str) -> Result<Self, MetererError> {
        let rest = uri
            .strip_prefix(RESOURCE_SCHEME)
            .and_then(|r| r.strip_prefix("://"))
            .ok_or_else(|| {
                MetererError::InvalidResourceUri(format!("缺少 {}:// 前缀: {}", RESOURCE_SCHEME, uri))
            })?;

        let (bucket, key) = rest
            .split_once('/')
            .ok_or_else(|| MetererError::InvalidResourceUri(format!("缺少对象键: {}", uri)))?;

        if bucket.is_empty() {
            return Err(MetererError::InvalidResourceUri(format!(
                "存储桶不能为空: {}",
                uri
            )));
        }

        if key.is_empty() {
            return Err(MetererError::InvalidResourceUri(format!(
                "对象键不能为空: {}",
                uri
            )));
        }

        Ok(Self {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }
}

impl FromStr for ResourceLocation {
    type Err = MetererError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ResourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}", RESOURCE_SCHEME, self.bucket, self.key)
    }
}

/// 解析资源标识为 `(bucket, key)`
pub fn parse_resource_uri(uri: &str) -> Result<(String, String), MetererError> {
    let loc = ResourceLocation::parse(uri)?;
    Ok((loc.bucket, loc.key))
}
