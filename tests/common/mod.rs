#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use elbindex::index::{DocumentPublisher, IndexBackend, IndexError, IndexName, IndexTarget};
use elbindex::job::{CompletionSignal, IngestionUnit};
use elbindex::pipeline::{SubmissionGate, UnitError, UnitPipeline};
use elbindex::source::RecordParser;
use elbindex::storage::{ObjectReader, ObjectStore, StoreError};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot, Notify};

pub fn gzip(content: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(content.as_bytes()).unwrap();
    encoder.finish().unwrap()
}

/// Well-formed application load balancer line for the given balancer name
pub fn alb_line(balancer: &str) -> String {
    format!(
        "https 2016-08-10T22:08:42.945958Z {} 192.168.131.39:2817 10.0.0.1:80 \
         0.086 0.048 0.037 200 200 0 57 \
         \"GET https://www.example.com:443/ HTTP/1.1\" \"curl/7.46.0\" \
         ECDHE-RSA-AES128-GCM-SHA256 TLSv1.2 \
         arn:aws:elasticloadbalancing:us-east-2:123456789012:\
         targetgroup/my-targets/73e2d6bc24d8a067 \
         \"Root=1-58337262-36d228ad5d99923122bbe354\" \"-\" \"-\"",
        balancer
    )
}

pub fn alb_object(balancers: &[&str]) -> Vec<u8> {
    let content: String = balancers
        .iter()
        .map(|b| format!("{}\n", alb_line(b)))
        .collect();
    gzip(&content)
}

#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
}

impl MemoryObjectStore {
    pub fn insert(&self, container: &str, key: &str, data: Vec<u8>) {
        self.objects
            .lock()
            .unwrap()
            .insert((container.to_string(), key.to_string()), data);
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get_object(&self, container: &str, key: &str) -> Result<ObjectReader, StoreError> {
        let data = self
            .objects
            .lock()
            .unwrap()
            .get(&(container.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                container: container.to_string(),
                key: key.to_string(),
            })?;
        Ok(Box::pin(Cursor::new(data)))
    }
}

/// Backend that acknowledges every document immediately
#[derive(Default)]
pub struct RecordingBackend {
    pub documents: Mutex<Vec<(String, String, serde_json::Value)>>,
}

#[async_trait]
impl IndexBackend for RecordingBackend {
    async fn create_document(
        &self,
        index: &str,
        doc_type: &str,
        body: String,
    ) -> Result<(), IndexError> {
        let value = serde_json::from_str(&body)?;
        self.documents
            .lock()
            .unwrap()
            .push((index.to_string(), doc_type.to_string(), value));
        Ok(())
    }
}

/// A document waiting for the test to decide its acknowledgment
pub struct PendingDocument {
    pub body: serde_json::Value,
    pub respond: oneshot::Sender<Result<(), IndexError>>,
}

impl PendingDocument {
    pub fn balancer(&self) -> String {
        self.body["elb"].as_str().unwrap_or_default().to_string()
    }

    pub fn ack(self) {
        let _ = self.respond.send(Ok(()));
    }

    pub fn reject(self, status: u16) {
        let _ = self.respond.send(Err(IndexError::Rejected {
            status,
            message: "rejected by test".to_string(),
        }));
    }
}

/// Backend whose responses are released by the test, in any order
pub struct ControlledBackend {
    requests: mpsc::UnboundedSender<PendingDocument>,
}

impl ControlledBackend {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PendingDocument>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { requests: tx }, rx)
    }
}

#[async_trait]
impl IndexBackend for ControlledBackend {
    async fn create_document(
        &self,
        _index: &str,
        _doc_type: &str,
        body: String,
    ) -> Result<(), IndexError> {
        let (respond, response) = oneshot::channel();
        let body = serde_json::from_str(&body)?;
        let _ = self.requests.send(PendingDocument { body, respond });

        response.await.unwrap_or_else(|_| {
            Err(IndexError::Rejected {
                status: 499,
                message: "test dropped the request".to_string(),
            })
        })
    }
}

pub fn test_index() -> IndexName {
    IndexName::for_date("elblogs", Utc.with_ymd_and_hms(2016, 3, 31, 12, 0, 0).unwrap())
}

pub fn build_pipeline(store: Arc<dyn ObjectStore>, backend: Arc<dyn IndexBackend>) -> UnitPipeline {
    let publisher = DocumentPublisher::new(
        backend,
        IndexTarget {
            index: test_index(),
            doc_type: "elb-access-logs".to_string(),
        },
        SubmissionGate::unbounded(),
    );
    UnitPipeline::new(store, Arc::new(RecordParser::new()), publisher, 4)
}

/// Signal that records every call it receives
#[derive(Default)]
pub struct RecordingSignal {
    pub calls: Mutex<Vec<String>>,
    pub notify: Notify,
}

impl RecordingSignal {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl CompletionSignal for RecordingSignal {
    fn succeed(&self, units: usize) {
        self.calls.lock().unwrap().push(format!("succeed:{}", units));
        self.notify.notify_one();
    }

    fn fail(&self, unit: &IngestionUnit, _error: &UnitError) {
        self.calls.lock().unwrap().push(format!("fail:{}", unit));
        self.notify.notify_one();
    }
}
