pub mod http;
pub mod local;
pub mod traits;

pub use http::HttpObjectStore;
pub use local::LocalObjectStore;
pub use traits::{ObjectReader, ObjectStore, StoreError};

use crate::config::types::ObjectStoreConfig;
use std::sync::Arc;

/// Build the object store described by `config`
pub fn from_config(config: &ObjectStoreConfig) -> Result<Arc<dyn ObjectStore>, StoreError> {
    let store: Arc<dyn ObjectStore> = match config {
        ObjectStoreConfig::Local { root } => Arc::new(LocalObjectStore::new(root.clone())),
        ObjectStoreConfig::Http {
            base_url,
            connect_timeout,
        } => Arc::new(HttpObjectStore::new(base_url.clone(), *connect_timeout)?),
    };
    Ok(store)
}
