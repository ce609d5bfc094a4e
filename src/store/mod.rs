pub mod disk;
pub mod memory;

use crate::core::config::{AppConfig, StoreBackend};
use crate::core::store::SubscriberStore;
use anyhow::Result;
use disk::DiskStore;
use memory::MemoryStore;
use std::sync::Arc;
use tracing::info;

/// Builds the subscriber store selected in the configuration.
pub fn open_store(config: &AppConfig) -> Result<Arc<dyn SubscriberStore>> {
    match config.store.backend {
        StoreBackend::Memory => {
            info!("Using in-memory subscriber store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Disk => {
            let path = config.default_data_path()?.join("subscribers");
            info!(path = %path.display(), "Using disk subscriber store");
            Ok(Arc::new(DiskStore::open(&path)?))
        }
    }
}
