//! Prelude module - Commonly used types for quick imports
//!
//! Re-exports the types most callers need, so a single
//! `use meterer::prelude::*;` is enough to build and drive a [`Meterer`].

// Core types - always available
pub use crate::config::{EnforcementMode, MeterConfig};
pub use crate::error::{MetererError, ObjectStoreError, StorageError};
pub use crate::meterer::{AccessDecision, Meterer, WindowUsage};
pub use crate::period::PeriodKind;
pub use crate::policy::PoolLimits;

// Collaborator traits and in-memory implementations
pub use crate::object_store::{MemoryObjectStore, ObjectStore};
pub use crate::storage::{CounterStore, MemoryStorage};

// Feature-gated exports
#[cfg(feature = "redis")]
pub use crate::redis_storage::{RedisConfig, RedisStorage};

#[cfg(feature = "http-object-store")]
pub use crate::http_object_store::{HttpObjectStore, HttpObjectStoreConfig};
