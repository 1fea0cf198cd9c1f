use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub index: IndexConfig,
    pub object_store: ObjectStoreConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub web: WebConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Base URL of the indexing backend, e.g. `https://search.example.com`
    pub endpoint: String,
    /// Index names are `<prefix>-<YYYY.MM.DD>`
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_doc_type")]
    pub doc_type: String,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
    /// Upper bound on concurrent document requests; unbounded when absent
    #[serde(default)]
    pub max_in_flight: Option<usize>,
    #[serde(default)]
    pub auth: AuthConfig,
}

fn default_prefix() -> String {
    "elblogs".to_string()
}

fn default_doc_type() -> String {
    "elb-access-logs".to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AuthConfig {
    #[default]
    None,
    /// Static header added to every request
    Header { name: String, value: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ObjectStoreConfig {
    /// Objects under `<root>/<container>/<key>`
    Local { root: PathBuf },
    /// Objects at `<base_url>/<container>/<key>`
    Http {
        base_url: String,
        /// Bounds connection setup only; a body that keeps arriving is never cut off
        #[serde(
            default = "default_connect_timeout",
            with = "humantime_serde",
            alias = "timeout"
        )]
        connect_timeout: Duration,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Decompressed lines buffered between the reader and the dispatcher
    #[serde(default = "default_line_buffer")]
    pub line_buffer: usize,
    /// Longest accepted log line; longer lines fail the object
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            line_buffer: default_line_buffer(),
            max_line_bytes: default_max_line_bytes(),
        }
    }
}

fn default_line_buffer() -> usize {
    1024
}

fn default_max_line_bytes() -> usize {
    crate::source::reader::DEFAULT_MAX_LINE_BYTES
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

fn default_listen() -> String {
    "127.0.0.1:7878".to_string()
}
