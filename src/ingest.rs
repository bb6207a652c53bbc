//! Telemetry ingest worker
//!
//! Inbound device messages are fed through a bounded channel to a single
//! tokio task that runs them through a [`SensorProcessor`] and appends the
//! resulting documents to a store. Cancelling the token stops the task after
//! the message in flight; queued messages are not processed.

use crate::error::ComputeError;
use crate::pipeline::SensorProcessor;
use crate::store::DocumentStore;
use crate::types::{NormalizedPayload, SensorDocument};
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Default inbound queue depth
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// One raw message as received from a device transport
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub source: String,
    pub body: String,
    pub received_at: DateTime<Utc>,
}

impl InboundMessage {
    pub fn new(source: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            body: body.into(),
            received_at: Utc::now(),
        }
    }
}

/// Counters reported when the worker exits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestStats {
    pub received: u64,
    pub stored: u64,
    pub passthrough: u64,
    pub rejected: u64,
    pub store_errors: u64,
}

/// What the worker hands back on exit
pub struct IngestReport {
    pub stats: IngestStats,
    /// Processor with the trend state accumulated during the run
    pub processor: SensorProcessor,
}

/// Where processed documents go
pub struct IngestSinks {
    pub store: Option<Box<dyn DocumentStore + Send>>,
    pub output: Option<mpsc::UnboundedSender<SensorDocument>>,
}

/// Handle to a running ingest task
pub struct IngestWorker {
    sender: Option<mpsc::Sender<InboundMessage>>,
    cancel_token: CancellationToken,
    handle: JoinHandle<IngestReport>,
}

impl IngestWorker {
    /// Spawn the worker on the current tokio runtime
    pub fn spawn(processor: SensorProcessor, sinks: IngestSinks, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let cancel_token = CancellationToken::new();

        let handle = tokio::spawn(ingest_loop(
            processor,
            sinks,
            receiver,
            cancel_token.clone(),
        ));

        Self {
            sender: Some(sender),
            cancel_token,
            handle,
        }
    }

    /// A sender for feeding messages to the worker
    pub fn sender(&self) -> Option<mpsc::Sender<InboundMessage>> {
        self.sender.clone()
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Queue one message, waiting for capacity
    pub async fn submit(&self, message: InboundMessage) -> Result<(), ComputeError> {
        let Some(sender) = &self.sender else {
            return Err(ComputeError::WorkerError(
                "worker input is closed".to_string(),
            ));
        };
        sender
            .send(message)
            .await
            .map_err(|_| ComputeError::WorkerError("worker has stopped".to_string()))
    }

    /// Close the input and wait until every queued message is processed.
    ///
    /// Other senders obtained from [`IngestWorker::sender`] keep the channel
    /// open until they are dropped.
    pub async fn finish(mut self) -> Result<IngestReport, ComputeError> {
        self.sender.take();
        self.join().await
    }

    /// Cancel the worker and wait for it to exit
    pub async fn stop(self) -> Result<IngestReport, ComputeError> {
        self.cancel_token.cancel();
        self.join().await
    }

    async fn join(self) -> Result<IngestReport, ComputeError> {
        self.handle
            .await
            .map_err(|e| ComputeError::WorkerError(format!("ingest task failed to join: {e}")))
    }
}

async fn ingest_loop(
    mut processor: SensorProcessor,
    mut sinks: IngestSinks,
    mut receiver: mpsc::Receiver<InboundMessage>,
    cancel_token: CancellationToken,
) -> IngestReport {
    let mut stats = IngestStats::default();
    info!("ingest worker started");

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                info!("ingest worker cancelled");
                break;
            }
            message = receiver.recv() => {
                let Some(message) = message else {
                    info!("ingest channel closed");
                    break;
                };
                handle_message(&mut processor, &mut sinks, &mut stats, message).await;
            }
        }
    }

    info!(
        "ingest worker stopped: {} received, {} stored, {} rejected",
        stats.received, stats.stored, stats.rejected
    );
    IngestReport { stats, processor }
}

async fn handle_message(
    processor: &mut SensorProcessor,
    sinks: &mut IngestSinks,
    stats: &mut IngestStats,
    message: InboundMessage,
) {
    stats.received += 1;

    let document = serde_json::from_str::<Value>(&message.body)
        .map_err(ComputeError::from)
        .and_then(|payload| {
            processor.process_at(&message.source, &payload, message.received_at)
        });

    let document = match document {
        Ok(document) => document,
        Err(e) => {
            warn!("rejected {} message: {}", message.source, e);
            stats.rejected += 1;
            return;
        }
    };

    if matches!(document.data, NormalizedPayload::Passthrough(_)) {
        stats.passthrough += 1;
    }

    let document = match sinks.store.take() {
        Some(store) => match store_document(sinks, stats, store, document).await {
            Some(document) => document,
            None => return,
        },
        None => document,
    };

    if let Some(output) = &sinks.output {
        if output.send(document).is_err() {
            warn!("document output receiver dropped");
            sinks.output = None;
        }
    }
}

/// Insert on the blocking pool. The store and document are handed back
/// unless the blocking task itself fails, which drops both.
async fn store_document(
    sinks: &mut IngestSinks,
    stats: &mut IngestStats,
    mut store: Box<dyn DocumentStore + Send>,
    document: SensorDocument,
) -> Option<SensorDocument> {
    let id = document.id.clone();
    let inserted = tokio::task::spawn_blocking(move || {
        let result = store.insert(&document);
        (store, document, result)
    })
    .await;

    match inserted {
        Ok((store, document, result)) => {
            sinks.store = Some(store);
            match result {
                Ok(()) => stats.stored += 1,
                Err(e) => {
                    error!("failed to store document {}: {}", document.id, e);
                    stats.store_errors += 1;
                }
            }
            Some(document)
        }
        Err(e) => {
            error!(
                "store task failed on document {}, dropping store: {}",
                id, e
            );
            stats.store_errors += 1;
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DocumentQuery, NdjsonStore};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn sinks_with_output() -> (IngestSinks, mpsc::UnboundedReceiver<SensorDocument>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            IngestSinks {
                store: None,
                output: Some(tx),
            },
            rx,
        )
    }

    #[tokio::test]
    async fn test_processes_until_input_closes() {
        let (sinks, mut output) = sinks_with_output();
        let worker = IngestWorker::spawn(SensorProcessor::new(), sinks, 8);

        worker
            .submit(InboundMessage::new("kaiteki", r#"{"DeviceNo": "K-1", "Temperature": 22}"#))
            .await
            .unwrap();
        worker
            .submit(InboundMessage::new("aitrios", r#"{"personCount": 2}"#))
            .await
            .unwrap();
        worker
            .submit(InboundMessage::new("thermostat", r#"{"setpoint": 21}"#))
            .await
            .unwrap();
        worker
            .submit(InboundMessage::new("kaiteki", "not json"))
            .await
            .unwrap();
        worker
            .submit(InboundMessage::new("kaiteki", "[1, 2]"))
            .await
            .unwrap();

        let report = worker.finish().await.unwrap();
        assert_eq!(
            report.stats,
            IngestStats {
                received: 5,
                stored: 0,
                passthrough: 1,
                rejected: 2,
                store_errors: 0,
            }
        );
        assert_eq!(
            report.processor.trend_store().history("K-1", "temperature"),
            vec![22.0]
        );

        let mut devices = Vec::new();
        while let Some(document) = output.recv().await {
            devices.push(document.device_id);
        }
        assert_eq!(devices, vec!["K-1", "person-counter-unknown", "unknown"]);
    }

    #[tokio::test]
    async fn test_documents_are_stored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("documents.ndjson");
        let sinks = IngestSinks {
            store: Some(Box::new(NdjsonStore::open(&path))),
            output: None,
        };
        let worker = IngestWorker::spawn(SensorProcessor::new(), sinks, 4);

        for i in 0..3 {
            let body = format!(r#"{{"DeviceNo": "K-{i}", "CO2": 600}}"#);
            worker.submit(InboundMessage::new("kaiteki", body)).await.unwrap();
        }
        let report = worker.finish().await.unwrap();
        assert_eq!(report.stats.stored, 3);

        let documents = NdjsonStore::open(&path)
            .query(&DocumentQuery::default())
            .unwrap();
        assert_eq!(documents.len(), 3);
        assert!(documents.iter().all(|d| d.signals.is_some()));
    }

    #[tokio::test]
    async fn test_cancel_stops_worker() {
        let (sinks, _output) = sinks_with_output();
        let worker = IngestWorker::spawn(SensorProcessor::new(), sinks, 4);
        let _sender = worker.sender();

        let report = worker.stop().await.unwrap();
        assert_eq!(report.stats.received, 0);
    }

    #[tokio::test]
    async fn test_cancel_from_token() {
        let (sinks, _output) = sinks_with_output();
        let worker = IngestWorker::spawn(SensorProcessor::new(), sinks, 4);
        let token = worker.cancel_token();
        let sender = worker.sender().unwrap();

        token.cancel();
        let report = worker.finish().await.unwrap();
        assert_eq!(report.stats, IngestStats::default());
        drop(sender);
    }

    struct ReadOnlyStore;

    impl DocumentStore for ReadOnlyStore {
        fn insert(&mut self, _document: &SensorDocument) -> Result<(), ComputeError> {
            Err(ComputeError::StoreError("read-only".to_string()))
        }

        fn query(&self, _query: &DocumentQuery) -> Result<Vec<SensorDocument>, ComputeError> {
            Ok(Vec::new())
        }

        fn delete(&mut self, _id: &str) -> Result<bool, ComputeError> {
            Ok(false)
        }
    }

    #[tokio::test]
    async fn test_store_errors_are_counted_and_documents_still_forwarded() {
        let (tx, mut output) = mpsc::unbounded_channel();
        let sinks = IngestSinks {
            store: Some(Box::new(ReadOnlyStore)),
            output: Some(tx),
        };
        let worker = IngestWorker::spawn(SensorProcessor::new(), sinks, 4);

        for device in ["K-1", "K-2"] {
            let body = format!(r#"{{"DeviceNo": "{device}", "CO2": 600}}"#);
            worker.submit(InboundMessage::new("kaiteki", body)).await.unwrap();
        }
        let report = worker.finish().await.unwrap();

        assert_eq!(report.stats.stored, 0);
        assert_eq!(report.stats.store_errors, 2);
        assert_eq!(output.recv().await.unwrap().device_id, "K-1");
        assert_eq!(output.recv().await.unwrap().device_id, "K-2");
    }
}
