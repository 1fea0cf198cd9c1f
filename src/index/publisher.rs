use super::client::{IndexBackend, IndexError};
use super::naming::IndexName;
use crate::pipeline::backpressure::SubmissionGate;
use crate::source::record::LogRecord;
use std::sync::Arc;

/// Where published documents go
#[derive(Debug, Clone)]
pub struct IndexTarget {
    pub index: IndexName,
    pub doc_type: String,
}

/// Serializes records and submits them to the indexing backend.
///
/// Each submission runs in its own task; nothing is awaited by the caller.
#[derive(Clone)]
pub struct DocumentPublisher {
    backend: Arc<dyn IndexBackend>,
    target: Arc<IndexTarget>,
    gate: SubmissionGate,
}

impl DocumentPublisher {
    pub fn new(backend: Arc<dyn IndexBackend>, target: IndexTarget, gate: SubmissionGate) -> Self {
        Self {
            backend,
            target: Arc::new(target),
            gate,
        }
    }

    pub fn target(&self) -> &IndexTarget {
        &self.target
    }

    /// Submit `record` and report the outcome through `on_done`.
    ///
    /// `on_done` runs exactly once, from the spawned submission task and never
    /// before this call has returned. Must be called from within a tokio
    /// runtime.
    pub fn submit<F>(&self, record: &LogRecord, on_done: F)
    where
        F: FnOnce(Result<(), IndexError>) + Send + 'static,
    {
        let body = serde_json::to_string(record);
        let backend = Arc::clone(&self.backend);
        let target = Arc::clone(&self.target);
        let gate = self.gate.clone();

        tokio::spawn(async move {
            let result = match body {
                Ok(body) => {
                    let _permit = gate.acquire().await;
                    backend
                        .create_document(target.index.as_str(), &target.doc_type, body)
                        .await
                }
                Err(e) => Err(IndexError::Serialization(e)),
            };
            on_done(result);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    #[derive(Default)]
    struct RecordingBackend {
        calls: Mutex<Vec<(String, String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl IndexBackend for RecordingBackend {
        async fn create_document(
            &self,
            index: &str,
            doc_type: &str,
            body: String,
        ) -> Result<(), IndexError> {
            self.calls
                .lock()
                .unwrap()
                .push((index.to_string(), doc_type.to_string(), body));
            if self.fail {
                Err(IndexError::Rejected {
                    status: 400,
                    message: "mapper_parsing_exception".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    fn record() -> LogRecord {
        LogRecord {
            schema: "https".to_string(),
            timestamp: "2016-08-10T22:08:42.945958Z".to_string(),
            source_identifier: "app/my-loadbalancer/50dc6c495c0c9188".to_string(),
            client_address: "192.168.131.39:2817".to_string(),
            http_status_code: "200".to_string(),
            request_url: "\"GET https://www.example.com:443/ HTTP/1.1\"".to_string(),
            user_agent: "\"curl/7.46.0\"".to_string(),
        }
    }

    fn target() -> IndexTarget {
        IndexTarget {
            index: IndexName::for_date(
                "elblogs",
                Utc.with_ymd_and_hms(2016, 3, 31, 0, 0, 0).unwrap(),
            ),
            doc_type: "elb-access-logs".to_string(),
        }
    }

    #[tokio::test]
    async fn test_submit_posts_serialized_record() {
        let backend = Arc::new(RecordingBackend::default());
        let publisher =
            DocumentPublisher::new(backend.clone(), target(), SubmissionGate::unbounded());

        let (tx, rx) = oneshot::channel();
        publisher.submit(&record(), move |result| {
            let _ = tx.send(result.is_ok());
        });
        assert!(rx.await.unwrap());

        let calls = backend.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "elblogs-2016.03.31");
        assert_eq!(calls[0].1, "elb-access-logs");
        let body: serde_json::Value = serde_json::from_str(&calls[0].2).unwrap();
        assert_eq!(body["elb"], "app/my-loadbalancer/50dc6c495c0c9188");
        assert_eq!(body["http_response"], "200");
    }

    #[tokio::test]
    async fn test_submit_reports_backend_failure() {
        let backend = Arc::new(RecordingBackend {
            fail: true,
            ..Default::default()
        });
        let publisher = DocumentPublisher::new(backend, target(), SubmissionGate::new(Some(1)));

        let (tx, rx) = oneshot::channel();
        publisher.submit(&record(), move |result| {
            let _ = tx.send(result);
        });

        let result = rx.await.unwrap();
        assert!(matches!(result, Err(IndexError::Rejected { status: 400, .. })));
    }

    #[tokio::test]
    async fn test_on_done_not_called_synchronously() {
        let backend = Arc::new(RecordingBackend::default());
        let publisher = DocumentPublisher::new(backend, target(), SubmissionGate::unbounded());
        let called = Arc::new(Mutex::new(false));

        let flag = called.clone();
        let (tx, rx) = oneshot::channel();
        publisher.submit(&record(), move |_| {
            *flag.lock().unwrap() = true;
            let _ = tx.send(());
        });
        assert!(!*called.lock().unwrap());

        rx.await.unwrap();
        assert!(*called.lock().unwrap());
    }
}
