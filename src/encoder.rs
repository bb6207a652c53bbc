//! Document encoding
//!
//! This module wraps normalized payloads and analysis summaries in the
//! append-only storage envelope. Every document carries producer metadata
//! so stored records can be traced back to the encoder instance.

use crate::error::ComputeError;
use crate::types::{
    AnalysisDocument, AnalysisPeriod, AnalysisSummary, DerivedSignals, NormalizedPayload,
    ProducerInfo, SensorDocument,
};
use crate::{FLUX_VERSION, PRODUCER_NAME};
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// Document type of a stored sensor reading
pub const SENSOR_DATA_TYPE: &str = "sensor_data";

/// Document type of a stored analysis run
pub const ANALYSIS_DATA_TYPE: &str = "analysis_data";

/// Encoder for storage documents
pub struct RecordEncoder {
    instance_id: String,
}

impl Default for RecordEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn producer(&self) -> ProducerInfo {
        ProducerInfo {
            name: PRODUCER_NAME.to_string(),
            version: FLUX_VERSION.to_string(),
            instance_id: self.instance_id.clone(),
        }
    }

    /// Wrap a normalized payload in a sensor document with a fresh id
    pub fn encode(
        &self,
        source: &str,
        data: NormalizedPayload,
        signals: Option<DerivedSignals>,
        processed_at: DateTime<Utc>,
    ) -> Result<SensorDocument, ComputeError> {
        let source = source.trim();
        if source.is_empty() {
            return Err(ComputeError::EncodingError(
                "sensor document requires a source".to_string(),
            ));
        }

        Ok(SensorDocument {
            id: Uuid::new_v4().to_string(),
            source: source.to_string(),
            timestamp: processed_at.to_rfc3339(),
            device_id: data.device_id().to_string(),
            doc_type: SENSOR_DATA_TYPE.to_string(),
            data,
            signals,
            producer: self.producer(),
        })
    }

    /// Wrap an analysis summary. The id is derived from the end of the window
    /// at minute resolution, so re-running within the same minute overwrites.
    pub fn encode_analysis(
        &self,
        summary: AnalysisSummary,
        end: DateTime<Utc>,
        hours: Option<u32>,
    ) -> AnalysisDocument {
        let start = hours
            .and_then(|h| window_start(end, h))
            .map(|start| start.to_rfc3339());

        AnalysisDocument {
            id: format!("analysis-{}", end.format("%Y%m%d-%H%M")),
            doc_type: ANALYSIS_DATA_TYPE.to_string(),
            timestamp: end.to_rfc3339(),
            analysis_period: AnalysisPeriod {
                start,
                end: end.to_rfc3339(),
                hours,
            },
            summary,
            producer: self.producer(),
        }
    }

    /// Encode a sensor document as a single JSON line
    pub fn to_json_line(document: &SensorDocument) -> Result<String, ComputeError> {
        serde_json::to_string(document).map_err(ComputeError::JsonError)
    }

    /// Encode an analysis document as pretty JSON
    pub fn analysis_to_json(document: &AnalysisDocument) -> Result<String, ComputeError> {
        serde_json::to_string_pretty(document).map_err(ComputeError::JsonError)
    }
}

/// Start of the window of `hours` ending at `end`. `None` when it falls
/// before the earliest representable time, which leaves the window unbounded.
pub fn window_start(end: DateTime<Utc>, hours: u32) -> Option<DateTime<Utc>> {
    Duration::try_hours(i64::from(hours)).and_then(|span| end.checked_sub_signed(span))
}
