//! 内存对象存储单元测试

use meterer::error::ObjectStoreError;
use meterer::object_store::{MemoryObjectStore, ObjectStore};
use std::sync::Arc;

#[tokio::test]
async fn test_size_lookup_through_trait_object() {
    let store = MemoryObjectStore::new();
    store.create_bucket("bucketname");
    store.put_object("bucketname", "a/b/c.bin", 1024).unwrap();

    let store: Arc<dyn ObjectStore> = Arc::new(store);
    assert_eq!(store.object_size("bucketname", "a/b/c.bin").await.unwrap(), 1024);
}

#[tokio::test]
async fn test_bucket_and_object_errors_differ() {
    let store = MemoryObjectStore::new();
    store.create_bucket("b");

    assert!(matches!(
        store.object_size("b", "k").await,
        Err(ObjectStoreError::ObjectNotFound { .. })
    ));
    assert!(matches!(
        store.object_size("x", "k").await,
        Err(ObjectStoreError::BucketNotFound(_))
    ));
}

#[tokio::test]
async fn test_create_bucket_keeps_objects() {
    let store = MemoryObjectStore::new();
    store.create_bucket("b");
    store.put_object("b", "k", 5).unwrap();
    store.create_bucket("b");
    assert_eq!(store.object_size("b", "k").await.unwrap(), 5);
}
