use super::traits::{ObjectReader, ObjectStore, StoreError};
use async_trait::async_trait;
use futures::TryStreamExt;
use std::time::Duration;
use tokio_util::io::StreamReader;
use tracing::debug;

/// Object store reachable over plain HTTP with path-style addressing.
///
/// `GET <base_url>/<container>/<key>`; the body is streamed, never buffered.
#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    base_url: String,
    client: reqwest::Client,
}

impl HttpObjectStore {
    /// `connect_timeout` bounds connection setup. Body reads have no deadline.
    pub fn new(base_url: String, connect_timeout: Duration) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn object_url(&self, container: &str, key: &str) -> String {
        let encoded_key: Vec<String> = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();

        format!(
            "{}/{}/{}",
            self.base_url,
            urlencoding::encode(container),
            encoded_key.join("/")
        )
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn get_object(&self, container: &str, key: &str) -> Result<ObjectReader, StoreError> {
        let url = self.object_url(container, key);
        debug!(url = %url, "Fetching object");

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound {
                container: container.to_string(),
                key: key.to_string(),
            });
        }
        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
                container: container.to_string(),
                key: key.to_string(),
            });
        }

        let body = response
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));

        Ok(Box::pin(StreamReader::new(body)))
    }
}
