//! smartspace-flux - Environmental signal processing for smart-space IoT devices
//!
//! Flux turns heterogeneous raw device payloads into canonical readings and
//! derived signals through a deterministic pipeline: device adaptation →
//! normalization → scoring → evaluation → document encoding.
//!
//! ## Modules
//!
//! - **Signal core**: [`normalizer`], [`scoring`], [`anomaly`] and [`trend`]
//! - **Window analysis**: [`aggregate`] folds stored documents into a summary
//! - **Storage**: [`encoder`] builds storage documents, [`store`] persists them
//! - **Ingest**: [`ingest`] runs the pipeline as a cancellable tokio task

pub mod adapters;
pub mod aggregate;
pub mod anomaly;
pub mod config;
pub mod encoder;
pub mod error;
pub mod ingest;
pub mod normalizer;
pub mod pipeline;
pub mod scoring;
pub mod store;
pub mod trend;
pub mod types;

pub use aggregate::{aggregate, WindowAggregator};
pub use anomaly::{evaluate, recommend, AnomalyEngine, EvaluationInput};
pub use config::EngineConfig;
pub use encoder::RecordEncoder;
pub use error::ComputeError;
pub use ingest::{InboundMessage, IngestStats, IngestWorker};
pub use normalizer::Normalizer;
pub use pipeline::{process_payload, SensorProcessor};
pub use scoring::{comfort_score, quality_score, score};
pub use store::{DocumentQuery, DocumentStore, MemoryStore, NdjsonStore};
pub use trend::{classify_trend, TrendStore};

/// Flux version embedded in all stored documents
pub const FLUX_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for stored documents
pub const PRODUCER_NAME: &str = "smartspace-flux";

/// Normalize a raw device payload received now
pub fn normalize(
    source: &str,
    payload: &serde_json::Value,
) -> Result<types::NormalizedPayload, ComputeError> {
    Normalizer::normalize(source, payload)
}

/// Normalize a raw device payload with an explicit receive time
pub fn normalize_at(
    source: &str,
    payload: &serde_json::Value,
    received_at: chrono::DateTime<chrono::Utc>,
) -> Result<types::NormalizedPayload, ComputeError> {
    Normalizer::normalize_at(source, payload, received_at)
}
