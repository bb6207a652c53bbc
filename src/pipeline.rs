//! Pipeline orchestration
//!
//! This module provides the public API for smartspace-flux.
//! It orchestrates the full pipeline from a raw device payload to a stored
//! sensor document.

use crate::aggregate::WindowAggregator;
use crate::anomaly::AnomalyEngine;
use crate::config::EngineConfig;
use crate::encoder::{window_start, RecordEncoder};
use crate::error::ComputeError;
use crate::normalizer::Normalizer;
use crate::scoring::{comfort_score, productivity_index, quality_score, ScoreInputs};
use crate::trend::TrendStore;
use crate::types::{
    AirQualityLevel, AnalysisDocument, CanonicalReading, ComfortRating, DerivedSignals,
    NormalizedPayload, SensorDocument,
};
use chrono::{DateTime, Utc};
use log::debug;
use serde_json::Value;

/// Convert one raw device payload into a sensor document JSON line.
///
/// # Arguments
/// * `source` - Source type tag (e.g. "comfort-sensor", "kaiteki")
/// * `raw_json` - Raw device payload JSON (a single object)
///
/// # Example
/// ```ignore
/// let document = process_payload("comfort-sensor", r#"{"Temperature": 23.5}"#)?;
/// ```
pub fn process_payload(source: &str, raw_json: &str) -> Result<String, ComputeError> {
    let payload: Value = serde_json::from_str(raw_json)?;
    let document = SensorProcessor::new().process(source, &payload)?;
    RecordEncoder::to_json_line(&document)
}

/// Stateful processor carrying configuration and per-device trend history.
///
/// Pipeline stages:
/// 1. Normalizer - Dispatch to the device adapter
/// 2. Scorer - Comfort and quality scores
/// 3. AnomalyEngine - Recommendations for the current values
/// 4. TrendStore - Per-metric trend over the device history
/// 5. RecordEncoder - Wrap in the storage envelope
pub struct SensorProcessor {
    config: EngineConfig,
    engine: AnomalyEngine,
    trend_store: TrendStore,
    encoder: RecordEncoder,
}

impl Default for SensorProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorProcessor {
    /// Create a new processor with default settings
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create a processor from a configuration
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            engine: AnomalyEngine::new(config.anomaly.clone()),
            trend_store: TrendStore::new(config.trend_window)
                .with_max_devices(config.trend_max_devices),
            encoder: RecordEncoder::new(),
            config,
        }
    }

    /// Replace the encoder, e.g. to pin the producer instance id
    pub fn with_encoder(mut self, encoder: RecordEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn trend_store(&self) -> &TrendStore {
        &self.trend_store
    }

    /// Load trend state from JSON. The configured window size and device cap
    /// win over the stored ones.
    pub fn load_trends(&mut self, json: &str) -> Result<(), ComputeError> {
        let mut store =
            TrendStore::from_json(json).map_err(|e| ComputeError::ParseError(e.to_string()))?;
        store.set_window_size(self.config.trend_window);
        store.set_max_devices(self.config.trend_max_devices);
        self.trend_store = store;
        Ok(())
    }

    /// Save trend state to JSON
    pub fn save_trends(&self) -> Result<String, ComputeError> {
        self.trend_store
            .to_json()
            .map_err(|e| ComputeError::EncodingError(e.to_string()))
    }

    /// Process a payload received now
    pub fn process(
        &mut self,
        source: &str,
        payload: &Value,
    ) -> Result<SensorDocument, ComputeError> {
        self.process_at(source, payload, Utc::now())
    }

    /// Process a payload with an explicit receive time
    pub fn process_at(
        &mut self,
        source: &str,
        payload: &Value,
        received_at: DateTime<Utc>,
    ) -> Result<SensorDocument, ComputeError> {
        let normalized = Normalizer::normalize_at(source, payload, received_at)?;
        let signals = match &normalized {
            NormalizedPayload::Reading(reading) => self.derive_signals(reading),
            NormalizedPayload::Passthrough(_) => None,
        };

        self.encoder.encode(source, normalized, signals, received_at)
    }

    /// Process a raw JSON string into a sensor document JSON line
    pub fn process_json(&mut self, source: &str, raw_json: &str) -> Result<String, ComputeError> {
        let payload: Value = serde_json::from_str(raw_json)?;
        let document = self.process(source, &payload)?;
        RecordEncoder::to_json_line(&document)
    }

    /// Scores, evaluation and trends for environment readings; other
    /// readings carry no derived signals.
    pub fn derive_signals(&mut self, reading: &CanonicalReading) -> Option<DerivedSignals> {
        let env = reading.as_environment()?;
        let inputs = ScoreInputs::from(reading);
        let comfort = comfort_score(&inputs);
        let quality = quality_score(&inputs);
        let trends = self.trend_store.update(env, &self.config.history_trend);

        debug!(
            "device {}: comfort {} quality {}",
            env.device_id, comfort.score, quality.score
        );

        Some(DerivedSignals {
            comfort_rating: ComfortRating::from_score(comfort.score),
            air_quality: AirQualityLevel::from_co2(env.co2),
            productivity_index: productivity_index(&inputs),
            evaluation: self.engine.evaluate_reading(reading),
            comfort,
            quality,
            trends,
        })
    }

    /// Aggregate stored documents over the window ending at `end` and
    /// evaluate it. Without `hours` every document is considered.
    pub fn analyze(
        &self,
        documents: &[SensorDocument],
        end: DateTime<Utc>,
        hours: Option<u32>,
    ) -> AnalysisDocument {
        let mut aggregator = WindowAggregator::new(self.config.anomaly.clone());
        if let Some(since) = hours.and_then(|h| window_start(end, h)) {
            aggregator = aggregator.since(since);
        }
        aggregator.extend(documents);

        self.encoder.encode_analysis(aggregator.summary(), end, hours)
    }
}
