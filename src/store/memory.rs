use crate::core::store::KeyValueCollection;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::Mutex;
use tracing::debug;

/// Collection that lives for the lifetime of the process.
#[derive(Default)]
pub struct MemoryCollection {
    inner: Mutex<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryCollection {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueCollection for MemoryCollection {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let map = self.inner.lock().await;
        Ok(map.get(key).cloned())
    }

    async fn put(&self, key: &[u8], value: Vec<u8>) -> Result<()> {
        let mut map = self.inner.lock().await;
        debug!("MemoryCollection PUT for key: {:?}", String::from_utf8_lossy(key));
        map.insert(key.to_vec(), value);
        Ok(())
    }

    async fn remove(&self, key: &[u8]) -> Result<()> {
        let mut map = self.inner.lock().await;
        map.remove(key);
        Ok(())
    }

    async fn entries(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let map = self.inner.lock().await;
        Ok(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }
}
