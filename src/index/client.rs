use super::signer::{RequestSigner, SigningError, Unsigned};
use crate::config::types::IndexConfig;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("request signing failed: {0}")]
    Signing(#[from] SigningError),

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("indexing backend returned error status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("document serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Document-creation endpoint of the indexing backend.
#[async_trait]
pub trait IndexBackend: Send + Sync {
    /// Create one document from a JSON `body` in `index` under `doc_type`.
    async fn create_document(&self, index: &str, doc_type: &str, body: String)
        -> Result<(), IndexError>;
}

/// HTTP client for an Elasticsearch-compatible document API
pub struct HttpIndexClient {
    endpoint: String,
    client: reqwest::Client,
    signer: Arc<dyn RequestSigner>,
}

impl std::fmt::Debug for HttpIndexClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpIndexClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl HttpIndexClient {
    pub fn new(config: &IndexConfig, signer: Arc<dyn RequestSigner>) -> Result<Self, IndexError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            client,
            signer,
        })
    }

    pub fn unsigned(config: &IndexConfig) -> Result<Self, IndexError> {
        Self::new(config, Arc::new(Unsigned))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// URL of the document-creation endpoint for `index` and `doc_type`
    pub fn document_url(&self, index: &str, doc_type: &str) -> String {
        format!("{}/{}/{}", self.endpoint, index, doc_type)
    }
}

#[async_trait]
impl IndexBackend for HttpIndexClient {
    async fn create_document(
        &self,
        index: &str,
        doc_type: &str,
        body: String,
    ) -> Result<(), IndexError> {
        let url = self.document_url(index, doc_type);
        let mut request = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .build()?;

        self.signer.sign(&mut request)?;

        let response = self.client.execute(request).await?;
        let status = response.status();

        if !status.is_success() {
            return Err(IndexError::Rejected {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        debug!(url = %url, status = status.as_u16(), "Document indexed");
        Ok(())
    }
}
