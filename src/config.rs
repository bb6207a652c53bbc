//! Engine configuration
//!
//! All thresholds default to the values the anomaly engine and trend store
//! were calibrated with. A JSON file may override any subset of fields.

use crate::error::ComputeError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default number of values kept per metric in the trend store
pub const DEFAULT_TREND_WINDOW: usize = 48;

/// Default number of devices tracked by the trend store
pub const DEFAULT_TREND_MAX_DEVICES: usize = 1024;

/// Thresholds for anomaly detection over window averages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnomalyThresholds {
    /// avg temperature above this is `high_temperature` (°C)
    pub high_temperature: f64,
    /// avg temperature below this is `low_temperature` (°C)
    pub low_temperature: f64,
    /// avg CO2 above this is `high_co2` (ppm)
    pub high_co2: f64,
    /// avg light level below this is `low_light` (lux)
    pub low_light: f64,
}

impl Default for AnomalyThresholds {
    fn default() -> Self {
        Self {
            high_temperature: 30.0,
            low_temperature: 10.0,
            high_co2: 1000.0,
            low_light: 100.0,
        }
    }
}

/// Minimum change between early and late history means before a trend is reported
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HistoryTrendThresholds {
    pub temperature: f64,
    pub humidity: f64,
    /// Used for every other metric (co2, illuminance, ...)
    pub other: f64,
}

impl Default for HistoryTrendThresholds {
    fn default() -> Self {
        Self {
            temperature: 0.5,
            humidity: 2.0,
            other: 10.0,
        }
    }
}

impl HistoryTrendThresholds {
    pub fn for_metric(&self, metric: &str) -> f64 {
        match metric {
            "temperature" => self.temperature,
            "humidity" => self.humidity,
            _ => self.other,
        }
    }
}

/// Top-level configuration for the sensor processor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub anomaly: AnomalyThresholds,
    pub history_trend: HistoryTrendThresholds,
    /// Values kept per device and metric
    pub trend_window: usize,
    /// Devices tracked before the least recently updated one is evicted
    pub trend_max_devices: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            anomaly: AnomalyThresholds::default(),
            history_trend: HistoryTrendThresholds::default(),
            trend_window: DEFAULT_TREND_WINDOW,
            trend_max_devices: DEFAULT_TREND_MAX_DEVICES,
        }
    }
}

impl EngineConfig {
    /// Parse configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: EngineConfig =
            serde_json::from_str(json).map_err(|e| ComputeError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_path(path: &Path) -> Result<Self, ComputeError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), ComputeError> {
        if self.trend_window == 0 {
            return Err(ComputeError::ConfigError(
                "trendWindow must be at least 1".to_string(),
            ));
        }
        if self.trend_max_devices == 0 {
            return Err(ComputeError::ConfigError(
                "trendMaxDevices must be at least 1".to_string(),
            ));
        }
        if self.anomaly.low_temperature >= self.anomaly.high_temperature {
            return Err(ComputeError::ConfigError(format!(
                "lowTemperature ({}) must be below highTemperature ({})",
                self.anomaly.low_temperature, self.anomaly.high_temperature
            )));
        }
        let trend = &self.history_trend;
        if trend.temperature < 0.0 || trend.humidity < 0.0 || trend.other < 0.0 {
            return Err(ComputeError::ConfigError(
                "historyTrend thresholds must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}
