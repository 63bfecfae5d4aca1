pub mod disk;
pub mod memory;

use crate::core::store::KeyValueCollection;
use anyhow::{Context, Result, anyhow};
use disk::DiskCollection;
use fjall::{Keyspace, PartitionCreateOptions};
use memory::MemoryCollection;
use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, Mutex},
};

/// Hands out named collections, either persisted in a `fjall` keyspace or
/// kept in memory. Asking twice for the same name yields the same collection.
pub struct KeyValueStore {
    collections: Mutex<HashMap<String, Arc<dyn KeyValueCollection>>>,
    keyspace: Option<Keyspace>,
}

impl KeyValueStore {
    /// Opens (or creates) a keyspace under `path`.
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
        let keyspace = fjall::Config::new(path.join("db"))
            .open()
            .with_context(|| format!("Failed to open store at {}", path.display()))?;

        Ok(Self {
            collections: Mutex::new(HashMap::new()),
            keyspace: Some(keyspace),
        })
    }

    /// A store whose collections vanish with the process.
    pub fn in_memory() -> Self {
        Self {
            collections: Mutex::new(HashMap::new()),
            keyspace: None,
        }
    }

    pub fn collection(&self, name: &str) -> Result<Arc<dyn KeyValueCollection>> {
        let mut collections = self
            .collections
            .lock()
            .map_err(|_| anyhow!("Collection registry lock poisoned"))?;
        if let Some(existing) = collections.get(name) {
            return Ok(Arc::clone(existing));
        }

        let collection: Arc<dyn KeyValueCollection> = match &self.keyspace {
            Some(keyspace) => {
                let partition = keyspace
                    .open_partition(name, PartitionCreateOptions::default())
                    .with_context(|| format!("Failed to open collection {name}"))?;
                Arc::new(DiskCollection::new(keyspace.clone(), partition))
            }
            None => Arc::new(MemoryCollection::new()),
        };
        collections.insert(name.to_string(), Arc::clone(&collection));
        Ok(collection)
    }
}
