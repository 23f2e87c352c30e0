//! HTTP 对象存储
//!
//! 通过 `HEAD {endpoint}/{bucket}/{key}`（路径风格）查询对象大小，适用于 S3 兼容网关。
//! 鉴权头按原样透传，本模块不做签名。

use async_trait::async_trait;
use reqwest::{header, StatusCode, Url};
use secrecy::{ExposeSecret, Secret};
use std::time::Duration;
use tracing::{debug, error};

use crate::error::{MetererError, ObjectStoreError};
use crate::object_store::ObjectStore;

/// HTTP 对象存储配置
#[derive(Clone)]
pub struct HttpObjectStoreConfig {
    /// 端点，例如 `http://127.0.0.1:9000`
    pub endpoint: String,
    /// 原样透传的 Authorization 头
    pub authorization: Option<Secret<String>>,
    /// 请求超时
    pub timeout: Duration,
}

impl std::fmt::Debug for HttpObjectStoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpObjectStoreConfig")
            .field("endpoint", &self.endpoint)
            .field("authorization", &self.authorization.as_ref().map(|_| "***"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for HttpObjectStoreConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:9000".to_string(),
            authorization: None,
            timeout: Duration::from_secs(5),
        }
    }
}

impl HttpObjectStoreConfig {
    /// 创建新的配置
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// 设置 Authorization 头
    pub fn authorization(mut self, value: impl Into<String>) -> Self {
        self.authorization = Some(Secret::new(value.into()));
        self
    }

    /// 设置请求超时
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// 基于 HTTP HEAD 的对象存储
#[derive(Clone)]
pub struct HttpObjectStore {
    client: reqwest::Client,
    endpoint: Url,
    config: HttpObjectStoreConfig,
}

impl HttpObjectStore {
    /// 创建新的 HTTP 对象存储
    pub fn new(config: HttpObjectStoreConfig) -> Result<Self, MetererError> {
        let endpoint = Url::parse(&config.endpoint)
            .map_err(|e| MetererError::ConfigError(format!("无效的对象存储端点: {}", e)))?;

        if endpoint.cannot_be_a_base() {
            return Err(MetererError::ConfigError(format!(
                "对象存储端点不能作为基础URL: {}",
                config.endpoint
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| MetererError::ConfigError(format!("创建HTTP客户端失败: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            config,
        })
    }

    /// 对象的路径风格 URL
    fn object_url(&self, bucket: &str, key: &str) -> Result<Url, ObjectStoreError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| ObjectStoreError::ConnectionError("端点不能作为基础URL".to_string()))?
            .pop_if_empty()
            .push(bucket)
            .extend(key.split('/'));
        Ok(url)
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn object_size(&self, bucket: &str, key: &str) -> Result<u64, ObjectStoreError> {
        let url = self.object_url(bucket, key)?;

        let mut request = self.client.head(url.clone());
        if let Some(auth) = &self.config.authorization {
            request = request.header(header::AUTHORIZATION, auth.expose_secret().as_str());
        }

        let response = request.send().await.map_err(|e| {
            error!("对象存储 HEAD 失败: {}", e);
            ObjectStoreError::ConnectionError(e.to_string())
        })?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => {
                return Err(ObjectStoreError::ObjectNotFound {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                })
            }
            status => {
                return Err(ObjectStoreError::InvalidResponse(format!(
                    "HEAD {} 返回状态码 {}",
                    url, status
                )))
            }
        }

        let size = response
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .ok_or_else(|| {
                ObjectStoreError::InvalidResponse(format!("HEAD {} 缺少 Content-Length", url))
            })?;

        debug!(bucket, key, size, "对象大小查询成功");
        Ok(size)
    }
}
