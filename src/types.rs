//! Core types for the smartspace-flux pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: canonical readings, scores, anomalies, recommendations and the
//! storage documents wrapping them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Source device type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceType {
    /// Comfort/environment sensor (temperature, humidity, CO2, light)
    ComfortSensor,
    /// Person-counting camera
    PersonCounter,
    /// Behavioral-analysis service
    BehaviorAnalyzer,
}

impl DeviceType {
    pub const ALL: [DeviceType; 3] = [
        DeviceType::ComfortSensor,
        DeviceType::PersonCounter,
        DeviceType::BehaviorAnalyzer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::ComfortSensor => "comfort-sensor",
            DeviceType::PersonCounter => "person-counter",
            DeviceType::BehaviorAnalyzer => "behavior-analyzer",
        }
    }

    /// Resolve a source tag, accepting the legacy vendor route names.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "comfort-sensor" | "kaiteki" => Some(DeviceType::ComfortSensor),
            "person-counter" | "aitrios" => Some(DeviceType::PersonCounter),
            "behavior-analyzer" | "gemini" => Some(DeviceType::BehaviorAnalyzer),
            _ => None,
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical reading from a comfort/environment sensor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnvironmentReading {
    pub device_id: String,
    pub timestamp: String,
    /// Temperature (°C)
    pub temperature: f64,
    /// Relative humidity (%, 0-100)
    pub humidity: f64,
    /// CO2 concentration (ppm)
    pub co2: f64,
    /// Illuminance (lux)
    pub illuminance: f64,
    /// Barometric pressure (hPa)
    pub pressure: f64,
    /// Noise level (dB)
    pub noise_level: f64,
    /// Externally supplied air-quality index
    pub air_quality_index: f64,
    pub person_count: u32,
    /// Direct human-presence sensor output
    pub human: bool,
    /// Human OR (Illuminance > 100)
    pub occupancy: bool,
    pub rssi: f64,
    pub voltage: f64,
    pub power: f64,
    /// Reporting interval (seconds)
    pub interval: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measure_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    /// Original payload, preserved for audit
    pub raw_data: serde_json::Value,
}

/// Canonical reading from a person-counting camera
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonCountReading {
    pub device_id: String,
    pub timestamp: String,
    pub person_count: u32,
    /// Ordered age bucket values
    pub age_distribution: Vec<f64>,
    pub gender_distribution: Vec<f64>,
    /// Detection confidence (0-1)
    pub confidence: f64,
    pub location: serde_json::Map<String, serde_json::Value>,
    pub raw_data: serde_json::Value,
}

/// Canonical reading from the behavioral-analysis service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BehaviorReading {
    pub device_id: String,
    pub timestamp: String,
    pub behavior_analysis: serde_json::Map<String, serde_json::Value>,
    pub emotion_analysis: serde_json::Map<String, serde_json::Value>,
    pub interaction_patterns: Vec<String>,
    /// Analysis confidence (0-1)
    pub confidence: f64,
    pub raw_data: serde_json::Value,
}

/// Normalized sensor record, tagged by device type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "deviceType", rename_all = "kebab-case")]
pub enum CanonicalReading {
    ComfortSensor(EnvironmentReading),
    PersonCounter(PersonCountReading),
    BehaviorAnalyzer(BehaviorReading),
}

impl CanonicalReading {
    pub fn device_type(&self) -> DeviceType {
        match self {
            CanonicalReading::ComfortSensor(_) => DeviceType::ComfortSensor,
            CanonicalReading::PersonCounter(_) => DeviceType::PersonCounter,
            CanonicalReading::BehaviorAnalyzer(_) => DeviceType::BehaviorAnalyzer,
        }
    }

    pub fn device_id(&self) -> &str {
        match self {
            CanonicalReading::ComfortSensor(r) => &r.device_id,
            CanonicalReading::PersonCounter(r) => &r.device_id,
            CanonicalReading::BehaviorAnalyzer(r) => &r.device_id,
        }
    }

    pub fn timestamp(&self) -> &str {
        match self {
            CanonicalReading::ComfortSensor(r) => &r.timestamp,
            CanonicalReading::PersonCounter(r) => &r.timestamp,
            CanonicalReading::BehaviorAnalyzer(r) => &r.timestamp,
        }
    }

    pub fn raw_data(&self) -> &serde_json::Value {
        match self {
            CanonicalReading::ComfortSensor(r) => &r.raw_data,
            CanonicalReading::PersonCounter(r) => &r.raw_data,
            CanonicalReading::BehaviorAnalyzer(r) => &r.raw_data,
        }
    }

    pub fn as_environment(&self) -> Option<&EnvironmentReading> {
        match self {
            CanonicalReading::ComfortSensor(r) => Some(r),
            _ => None,
        }
    }
}

/// Result of normalizing a payload
///
/// Unknown source types are passed through untouched. Both variants serialize
/// as a bare object, so reading one back needs the source tag it was
/// normalized under; see [`NormalizedPayload::from_stored`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NormalizedPayload {
    Reading(CanonicalReading),
    Passthrough(serde_json::Value),
}

impl NormalizedPayload {
    /// Rebuild a stored payload. Known source tags hold a canonical reading;
    /// anything else was passed through and is returned as-is, even when it
    /// happens to carry a `deviceType` key.
    pub fn from_stored(source: &str, data: serde_json::Value) -> Result<Self, serde_json::Error> {
        match DeviceType::from_tag(source) {
            Some(_) => Ok(NormalizedPayload::Reading(serde_json::from_value(data)?)),
            None => Ok(NormalizedPayload::Passthrough(data)),
        }
    }

    pub fn reading(&self) -> Option<&CanonicalReading> {
        match self {
            NormalizedPayload::Reading(r) => Some(r),
            NormalizedPayload::Passthrough(_) => None,
        }
    }

    pub fn device_id(&self) -> &str {
        match self {
            NormalizedPayload::Reading(r) => r.device_id(),
            NormalizedPayload::Passthrough(raw) => raw
                .get("deviceId")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown"),
        }
    }
}

/// Which scoring rule produced a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreVariant {
    /// Deduction-based comfort score
    Comfort,
    /// Mean of normalized sub-scores
    Quality,
}

/// A 0-100 score and the components that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub variant: ScoreVariant,
    pub score: u8,
    pub components: BTreeMap<String, f64>,
}

/// Comfort score label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComfortRating {
    Excellent,
    Good,
    Fair,
    Poor,
}

/// Air quality label derived from CO2
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AirQualityLevel {
    Excellent,
    Good,
    Fair,
    Poor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    HighTemperature,
    LowTemperature,
    HighCo2,
    LowLight,
}

/// Threshold breach over a window average
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    #[serde(rename = "type")]
    pub kind: AnomalyKind,
    pub value: f64,
    pub threshold: f64,
    pub severity: Severity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    Temperature,
    Humidity,
    Ventilation,
    AirQuality,
    General,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: RecommendationKind,
    pub action: String,
    pub priority: Priority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Stable,
    Up,
    Down,
}

/// Window averages computed by the aggregation step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentalAggregate {
    pub avg_temperature: f64,
    pub avg_humidity: f64,
    #[serde(rename = "avgCO2", alias = "avgCo2")]
    pub avg_co2: f64,
    pub avg_light_level: f64,
    /// Number of readings that contributed to the averages
    #[serde(default)]
    pub sample_count: u64,
}

/// Instantaneous environmental values; absent values are not evaluated
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrentConditions {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub co2: Option<f64>,
    #[serde(alias = "airQualityIndex")]
    pub aqi: Option<f64>,
}

impl From<&EnvironmentReading> for CurrentConditions {
    fn from(reading: &EnvironmentReading) -> Self {
        Self {
            temperature: Some(reading.temperature),
            humidity: Some(reading.humidity),
            co2: Some(reading.co2),
            aqi: Some(reading.air_quality_index),
        }
    }
}

impl From<&EnvironmentalAggregate> for CurrentConditions {
    fn from(aggregate: &EnvironmentalAggregate) -> Self {
        Self {
            temperature: Some(aggregate.avg_temperature),
            humidity: Some(aggregate.avg_humidity),
            co2: Some(aggregate.avg_co2),
            aqi: None,
        }
    }
}

/// Output of the anomaly & recommendation engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub anomalies: Vec<AnomalyRecord>,
    /// Never empty
    pub recommendations: Vec<Recommendation>,
}

/// Signals derived from an environment reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedSignals {
    pub comfort: ScoreResult,
    pub quality: ScoreResult,
    pub comfort_rating: ComfortRating,
    pub air_quality: AirQualityLevel,
    pub productivity_index: u8,
    pub evaluation: Evaluation,
    /// Per-metric trend over the device's recent history
    pub trends: BTreeMap<String, Trend>,
}

/// Producer metadata attached to every stored document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProducerInfo {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Append-only storage envelope for one inbound payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "StoredDocument")]
pub struct SensorDocument {
    pub id: String,
    pub source: String,
    /// Processing time (UTC, RFC 3339)
    pub timestamp: String,
    pub device_id: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub data: NormalizedPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signals: Option<DerivedSignals>,
    pub producer: ProducerInfo,
}

/// Wire shape of a [`SensorDocument`] before `data` is resolved by source
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredDocument {
    id: String,
    source: String,
    timestamp: String,
    device_id: String,
    #[serde(rename = "type")]
    doc_type: String,
    data: serde_json::Value,
    #[serde(default)]
    signals: Option<DerivedSignals>,
    producer: ProducerInfo,
}

impl TryFrom<StoredDocument> for SensorDocument {
    type Error = serde_json::Error;

    fn try_from(stored: StoredDocument) -> Result<Self, Self::Error> {
        Ok(SensorDocument {
            data: NormalizedPayload::from_stored(&stored.source, stored.data)?,
            id: stored.id,
            source: stored.source,
            timestamp: stored.timestamp,
            device_id: stored.device_id,
            doc_type: stored.doc_type,
            signals: stored.signals,
            producer: stored.producer,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OccupancySummary {
    pub total_person_count: u64,
    pub avg_confidence: f64,
}

/// Aggregated view over a window of stored readings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    pub total_records: u64,
    pub sources: BTreeMap<String, u64>,
    pub device_types: BTreeMap<String, u64>,
    pub environmental: EnvironmentalAggregate,
    pub occupancy: OccupancySummary,
    pub anomalies: Vec<AnomalyRecord>,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisPeriod {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    pub end: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hours: Option<u32>,
}

/// Stored result of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisDocument {
    pub id: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub timestamp: String,
    pub analysis_period: AnalysisPeriod,
    pub summary: AnalysisSummary,
    pub producer: ProducerInfo,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_device_type_tags() {
        let cases = [
            ("comfort-sensor", Some(DeviceType::ComfortSensor)),
            (" Kaiteki ", Some(DeviceType::ComfortSensor)),
            ("aitrios", Some(DeviceType::PersonCounter)),
            ("gemini", Some(DeviceType::BehaviorAnalyzer)),
            ("thermostat", None),
        ];
        for (tag, expected) in cases {
            assert_eq!(DeviceType::from_tag(tag), expected);
        }

        for device_type in DeviceType::ALL {
            let tag = device_type.as_str();
            assert_eq!(DeviceType::from_tag(tag), Some(device_type));
        }
    }

    #[test]
    fn test_canonical_reading_tagged_by_device_type() {
        let reading = CanonicalReading::PersonCounter(PersonCountReading {
            device_id: "cam-1".to_string(),
            person_count: 3,
            ..Default::default()
        });

        let value = serde_json::to_value(&reading).unwrap();
        assert_eq!(value["deviceType"], "person-counter");
        assert_eq!(value["deviceId"], "cam-1");
        assert_eq!(value["personCount"], 3);

        let back: CanonicalReading = serde_json::from_value(value).unwrap();
        assert_eq!(back, reading);
    }

    #[test]
    fn test_anomaly_wire_names() {
        let anomaly = AnomalyRecord {
            kind: AnomalyKind::HighCo2,
            value: 1200.0,
            threshold: 1000.0,
            severity: Severity::Critical,
        };
        let value = serde_json::to_value(&anomaly).unwrap();
        assert_eq!(value["type"], "high_co2");
        assert_eq!(value["severity"], "critical");
    }

    #[test]
    fn test_aggregate_reads_wire_field_names() {
        let aggregate: EnvironmentalAggregate = serde_json::from_str(
            r#"{"avgTemperature": 35, "avgHumidity": 40, "avgCO2": 1200, "avgLightLevel": 50}"#,
        )
        .unwrap();
        assert_eq!(aggregate.avg_co2, 1200.0);
        assert_eq!(aggregate.sample_count, 0);
    }

    fn stored(source: &str, data: serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "id": "doc-1",
            "source": source,
            "timestamp": "2024-01-15T10:30:00+00:00",
            "deviceId": "x",
            "type": "sensor_data",
            "data": data,
            "producer": {"name": "smartspace-flux", "version": "0.1.0", "instanceId": "i"}
        })
    }

    #[test]
    fn test_passthrough_with_device_type_key_stays_passthrough() {
        let data = serde_json::json!({
            "deviceType": "person-counter",
            "deviceId": "x",
            "personCount": 7
        });
        let document: SensorDocument =
            serde_json::from_value(stored("thermostat", data.clone())).unwrap();

        assert_eq!(document.data, NormalizedPayload::Passthrough(data));
        assert!(document.signals.is_none());
    }

    #[test]
    fn test_known_source_reads_canonical_reading() {
        let data = serde_json::json!({
            "deviceType": "person-counter",
            "deviceId": "x",
            "timestamp": "2024-01-15T10:30:00+00:00",
            "personCount": 7,
            "rawData": {"personCount": 7}
        });
        let document: SensorDocument = serde_json::from_value(stored("aitrios", data)).unwrap();
        let reading = document.data.reading().unwrap();

        assert_eq!(reading.device_type(), DeviceType::PersonCounter);
        assert_eq!(reading.raw_data()["personCount"], 7);
    }

    #[test]
    fn test_known_source_with_foreign_data_is_rejected() {
        let document = stored("kaiteki", serde_json::json!("reading"));
        assert!(serde_json::from_value::<SensorDocument>(document).is_err());
    }
}
