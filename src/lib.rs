//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! Meterer - Multi-window bandwidth quotas for object-store buckets
//!
//! Enforces per-bucket byte quotas over hour, day, week, month and year windows,
//! backed by a shared counter store.
//!
//! # API Layers
//!
//! ## Prelude (Quick Start)
//!
//! Use `use meterer::prelude::*;` to import all commonly used types.
//!
//! ## Core API
//!
//! - [`Meterer`] - Decides and charges object accesses
//! - [`MeterConfig`] - Key prefix, TTL grace, enforcement mode, initial pool limits
//! - [`PoolLimits`] - Optional byte limit per period kind
//! - [`AccessDecision`] - Full decision record with per-window usage
//! - [`MetererError`] - Error types
//!
//! ## Building Blocks
//!
//! - [`period`] - Canonical period keys (ISO weeks included)
//! - [`resource`] - `s3://bucket/key` parsing
//! - [`ledger`] - Per-pool per-period usage counters with expiry
//! - [`storage`] / [`object_store`] - Collaborator traits and in-memory implementations
//!
//! ## Backends (feature-gated)
//!
//! - Redis counter store (requires `redis` feature)
//! - HTTP HEAD object store (requires `http-object-store` feature)
//! - tracing-subscriber setup (requires `telemetry` feature)
//!
//! # Examples
//!
//! ```rust
//! use meterer::prelude::*;
//! use chrono::{TimeZone, Utc};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let objects = Arc::new(MemoryObjectStore::new());
//!     objects.create_bucket("bucketname");
//!     objects.put_object("bucketname", "key1", 40).unwrap();
//!
//!     let meterer = Meterer::new(
//!         Arc::new(MemoryStorage::new()),
//!         objects,
//!         MeterConfig::default(),
//!     )
//!     .unwrap();
//!     meterer.set_limits_for_pool("bucketname", &PoolLimits::new().hour(100)).unwrap();
//!
//!     let when = Utc.with_ymd_and_hms(2017, 1, 1, 0, 0, 0).unwrap();
//!     let uri = "s3://bucketname/key1";
//!     assert!(meterer.allow_resource_access_at(uri, when).await.unwrap());
//!     assert!(meterer.allow_resource_access_at(uri, when).await.unwrap());
//!     assert!(!meterer.allow_resource_access_at(uri, when).await.unwrap());
//! }
//! ```

pub mod prelude;

pub mod config;
pub mod constants;
pub mod error;
#[cfg(feature = "http-object-store")]
pub mod http_object_store;
pub mod ledger;
#[cfg(feature = "redis")]
pub mod lua_scripts;
pub mod meterer;
pub mod object_store;
pub mod period;
pub mod policy;
#[cfg(feature = "redis")]
pub mod redis_storage;
pub mod resource;
pub mod storage;
#[cfg(feature = "telemetry")]
pub mod telemetry;

// 重新导出常用类型
pub use config::{EnforcementMode, MeterConfig};
pub use error::{MetererError, ObjectStoreError, StorageError};
#[cfg(feature = "http-object-store")]
pub use http_object_store::{HttpObjectStore, HttpObjectStoreConfig};
pub use ledger::UsageLedger;
pub use meterer::{AccessDecision, Meterer, WindowUsage};
pub use object_store::{MemoryObjectStore, ObjectStore};
pub use period::{derive_period_keys, PeriodKeys, PeriodKind};
pub use policy::{PoolLimits, QuotaPolicyStore};
#[cfg(feature = "redis")]
pub use redis_storage::{RedisConfig, RedisStorage};
pub use resource::{parse_resource_uri, ResourceLocation};
pub use storage::{CounterStore, MemoryStorage};
#[cfg(feature = "telemetry")]
pub use telemetry::{init_tracing, TelemetryConfig};
