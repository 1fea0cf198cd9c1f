use async_trait::async_trait;
use std::pin::Pin;
use tokio::io::AsyncRead;

/// Streaming body of a retrieved object
pub type ObjectReader = Pin<Box<dyn AsyncRead + Send>>;

/// Read access to the object store holding compressed log objects.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Open the object `key` in `container` for streaming reads.
    async fn get_object(&self, container: &str, key: &str) -> Result<ObjectReader, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("object {container}/{key} not found")]
    NotFound { container: String, key: String },

    #[error("invalid object location {container}/{key}: {reason}")]
    InvalidLocation {
        container: String,
        key: String,
        reason: String,
    },

    #[error("io error reading {container}/{key}: {source}")]
    Io {
        container: String,
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("object store returned error status {status} for {container}/{key}")]
    Status {
        status: u16,
        container: String,
        key: String,
    },
}
