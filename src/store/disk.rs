use crate::core::store::KeyValueCollection;
use anyhow::{Context, Result};
use async_trait::async_trait;
use fjall::{Keyspace, PartitionHandle, PersistMode};
use tracing::debug;

/// Collection backed by a partition of a `fjall` keyspace.
pub struct DiskCollection {
    keyspace: Keyspace,
    partition: PartitionHandle,
}

impl DiskCollection {
    pub fn new(keyspace: Keyspace, partition: PartitionHandle) -> Self {
        Self {
            keyspace,
            partition,
        }
    }

    fn sync(&self) -> Result<()> {
        self.keyspace
            .persist(PersistMode::SyncAll)
            .context("Failed to persist keyspace")
    }
}

#[async_trait]
impl KeyValueCollection for DiskCollection {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let value = self
            .partition
            .get(key)
            .with_context(|| format!("Failed to read key {:?}", String::from_utf8_lossy(key)))?;
        Ok(value.map(|v| v.to_vec()))
    }

    async fn put(&self, key: &[u8], value: Vec<u8>) -> Result<()> {
        self.partition
            .insert(key, value)
            .with_context(|| format!("Failed to write key {:?}", String::from_utf8_lossy(key)))?;
        debug!("DiskCollection PUT for key: {:?}", String::from_utf8_lossy(key));
        self.sync()
    }

    async fn remove(&self, key: &[u8]) -> Result<()> {
        self.partition
            .remove(key)
            .with_context(|| format!("Failed to remove key {:?}", String::from_utf8_lossy(key)))?;
        debug!("DiskCollection REMOVE for key: {:?}", String::from_utf8_lossy(key));
        self.sync()
    }

    async fn entries(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        self.partition
            .iter()
            .map(|item| {
                let (k, v) = item.context("Failed to iterate partition")?;
                Ok((k.to_vec(), v.to_vec()))
            })
            .collect()
    }
}
