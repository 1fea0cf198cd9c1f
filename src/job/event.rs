use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventError {
    #[error("failed to parse trigger event: {0}")]
    Json(#[from] serde_json::Error),

    #[error("record {index}: object key '{key}' is not valid percent-encoding")]
    InvalidKey { index: usize, key: String },

    #[error("record {index}: empty bucket name or object key")]
    EmptyLocation { index: usize },
}

/// Object-store notification naming the objects to ingest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<TriggerRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerRecord {
    pub s3: ObjectNotification,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectNotification {
    pub bucket: BucketRef,
    pub object: ObjectRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketRef {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectRef {
    /// Form-encoded key: `+` for spaces, `%XX` for everything else
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// One object location to process
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IngestionUnit {
    pub container: String,
    pub key: String,
}

impl IngestionUnit {
    pub fn new(container: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for IngestionUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.container, self.key)
    }
}

impl TriggerEvent {
    pub fn from_json(text: &str) -> Result<Self, EventError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Decode every record into an ingestion unit.
    ///
    /// Fails as a whole if any key cannot be decoded, before anything runs.
    pub fn units(&self) -> Result<Vec<IngestionUnit>, EventError> {
        self.records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                let bucket = &record.s3.bucket.name;
                let key = decode_object_key(&record.s3.object.key).ok_or_else(|| {
                    EventError::InvalidKey {
                        index,
                        key: record.s3.object.key.clone(),
                    }
                })?;

                if bucket.is_empty() || key.is_empty() {
                    return Err(EventError::EmptyLocation { index });
                }

                Ok(IngestionUnit::new(bucket.clone(), key))
            })
            .collect()
    }
}

/// Decode a form-encoded object key (`+` is a space, then `%XX` escapes)
pub fn decode_object_key(raw: &str) -> Option<String> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced).ok().map(|key| key.into_owned())
}
