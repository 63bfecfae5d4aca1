//! Persistence abstraction for lot and history records.

use anyhow::Result;
use async_trait::async_trait;

/// A named bag of byte keys and values. Entries come back ordered by key.
#[async_trait]
pub trait KeyValueCollection: Send + Sync {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;
    async fn put(&self, key: &[u8], value: Vec<u8>) -> Result<()>;
    async fn remove(&self, key: &[u8]) -> Result<()>;
    async fn entries(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;
}
