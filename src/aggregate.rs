//! Window aggregation
//!
//! Folds stored sensor documents into an [`AnalysisSummary`]: per-source and
//! per-device-type counts, environmental averages and occupancy totals. The
//! averages are then handed to the anomaly engine.

use crate::anomaly::AnomalyEngine;
use crate::config::AnomalyThresholds;
use crate::types::{
    AnalysisSummary, CanonicalReading, EnvironmentalAggregate, OccupancySummary, SensorDocument,
};
use chrono::{DateTime, Utc};
use log::warn;
use std::collections::BTreeMap;

/// Label used when a document carries no recognised device type
const UNKNOWN: &str = "unknown";

/// Streaming aggregator over sensor documents
#[derive(Debug, Clone, Default)]
pub struct WindowAggregator {
    engine: AnomalyEngine,
    since: Option<DateTime<Utc>>,
    total_records: u64,
    sources: BTreeMap<String, u64>,
    device_types: BTreeMap<String, u64>,
    temperature_sum: f64,
    humidity_sum: f64,
    co2_sum: f64,
    light_sum: f64,
    environment_count: u64,
    person_sum: u64,
    confidence_sum: f64,
}

impl WindowAggregator {
    pub fn new(thresholds: AnomalyThresholds) -> Self {
        Self {
            engine: AnomalyEngine::new(thresholds),
            ..Default::default()
        }
    }

    /// Only accept documents stamped at or after `since`
    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    /// Add one document. Returns false when it falls outside the window.
    pub fn add(&mut self, document: &SensorDocument) -> bool {
        if let Some(since) = self.since {
            match DateTime::parse_from_rfc3339(&document.timestamp) {
                Ok(stamped) if stamped.with_timezone(&Utc) >= since => {}
                Ok(_) => return false,
                Err(e) => {
                    warn!(
                        "skipping document {} with unreadable timestamp '{}': {}",
                        document.id, document.timestamp, e
                    );
                    return false;
                }
            }
        }

        self.total_records += 1;
        *self.sources.entry(document.source.clone()).or_insert(0) += 1;

        let device_type = document
            .data
            .reading()
            .map(|reading| reading.device_type().as_str())
            .unwrap_or(UNKNOWN);
        *self.device_types.entry(device_type.to_string()).or_insert(0) += 1;

        match document.data.reading() {
            Some(CanonicalReading::ComfortSensor(env)) => {
                self.temperature_sum += env.temperature;
                self.humidity_sum += env.humidity;
                self.co2_sum += env.co2;
                self.light_sum += env.illuminance;
                self.environment_count += 1;
            }
            Some(CanonicalReading::PersonCounter(counter)) => {
                self.person_sum += u64::from(counter.person_count);
                self.confidence_sum += counter.confidence;
            }
            _ => {}
        }

        true
    }

    /// Number of accepted documents so far
    pub fn len(&self) -> u64 {
        self.total_records
    }

    pub fn is_empty(&self) -> bool {
        self.total_records == 0
    }

    /// Window averages; all zero when no environment readings were seen
    pub fn environmental(&self) -> EnvironmentalAggregate {
        if self.environment_count == 0 {
            return EnvironmentalAggregate::default();
        }
        let n = self.environment_count as f64;
        EnvironmentalAggregate {
            avg_temperature: round2(self.temperature_sum / n),
            avg_humidity: round2(self.humidity_sum / n),
            avg_co2: round2(self.co2_sum / n),
            avg_light_level: round2(self.light_sum / n),
            sample_count: self.environment_count,
        }
    }

    /// Summarize the window and evaluate its averages.
    ///
    /// Anomalies and recommendations are only produced when at least one
    /// environment reading contributed to the averages.
    pub fn summary(&self) -> AnalysisSummary {
        let environmental = self.environmental();

        let occupancy = OccupancySummary {
            total_person_count: self.person_sum,
            avg_confidence: if self.total_records == 0 {
                0.0
            } else {
                round2(self.confidence_sum / self.total_records as f64)
            },
        };

        let (anomalies, recommendations) = if environmental.sample_count > 0 {
            let evaluation = self.engine.evaluate_aggregate(&environmental);
            (evaluation.anomalies, evaluation.recommendations)
        } else {
            (Vec::new(), Vec::new())
        };

        AnalysisSummary {
            total_records: self.total_records,
            sources: self.sources.clone(),
            device_types: self.device_types.clone(),
            environmental,
            occupancy,
            anomalies,
            recommendations,
        }
    }
}

impl<'a> Extend<&'a SensorDocument> for WindowAggregator {
    fn extend<I: IntoIterator<Item = &'a SensorDocument>>(&mut self, documents: I) {
        for document in documents {
            self.add(document);
        }
    }
}

/// Summarize a slice of documents with the given thresholds
pub fn aggregate(documents: &[SensorDocument], thresholds: &AnomalyThresholds) -> AnalysisSummary {
    let mut aggregator = WindowAggregator::new(thresholds.clone());
    aggregator.extend(documents);
    aggregator.summary()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
