//! Trend classification
//!
//! Rolling per-device, per-metric value windows. A trend is classified
//! either against a single baseline value or over the recent history kept
//! in the store.

use crate::config::{HistoryTrendThresholds, DEFAULT_TREND_MAX_DEVICES, DEFAULT_TREND_WINDOW};
use log::debug;
use crate::types::{EnvironmentReading, Trend};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Values considered by the history trend
pub const HISTORY_TREND_SPAN: usize = 5;

/// Relative band around the baseline that counts as stable
const STABLE_BAND: f64 = 0.05;

/// Metrics tracked for every environment reading
pub const TRACKED_METRICS: [&str; 4] = ["temperature", "humidity", "co2", "illuminance"];

/// Classify `current` against a baseline.
///
/// Stable when the change is within 5% of the baseline magnitude; an
/// unchanged value is always stable.
pub fn classify_trend(current: f64, baseline: f64) -> Trend {
    let change = current - baseline;
    if change == 0.0 || change.abs() < STABLE_BAND * baseline.abs() {
        Trend::Stable
    } else if change > 0.0 {
        Trend::Up
    } else {
        Trend::Down
    }
}

/// Classify the last five values: mean of the last two against the mean of
/// the first two. Fewer than five values is stable.
pub fn trend_over_history(values: &[f64], threshold: f64) -> Trend {
    if values.len() < HISTORY_TREND_SPAN {
        return Trend::Stable;
    }

    let recent = &values[values.len() - HISTORY_TREND_SPAN..];
    let earlier = (recent[0] + recent[1]) / 2.0;
    let later = (recent[3] + recent[4]) / 2.0;
    let change = later - earlier;

    if change == 0.0 || change.abs() < threshold {
        Trend::Stable
    } else if change > 0.0 {
        Trend::Up
    } else {
        Trend::Down
    }
}

/// Rolling value windows keyed by device id, then metric name.
///
/// At most `max_devices` devices are tracked; pushing a value for a new
/// device past the cap evicts the least recently updated one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendStore {
    series: BTreeMap<String, BTreeMap<String, VecDeque<f64>>>,
    window_size: usize,
    #[serde(default = "default_max_devices")]
    max_devices: usize,
    /// Device ids, least recently updated first
    #[serde(default)]
    recency: VecDeque<String>,
}

fn default_max_devices() -> usize {
    DEFAULT_TREND_MAX_DEVICES
}

impl Default for TrendStore {
    fn default() -> Self {
        Self::new(DEFAULT_TREND_WINDOW)
    }
}

impl TrendStore {
    /// Create a store keeping at most `window_size` values per series
    pub fn new(window_size: usize) -> Self {
        Self {
            series: BTreeMap::new(),
            window_size: window_size.max(1),
            max_devices: DEFAULT_TREND_MAX_DEVICES,
            recency: VecDeque::new(),
        }
    }

    /// Cap the number of tracked devices
    pub fn with_max_devices(mut self, max_devices: usize) -> Self {
        self.set_max_devices(max_devices);
        self
    }

    pub fn max_devices(&self) -> usize {
        self.max_devices
    }

    /// Change the device cap, evicting the least recently updated devices
    /// that no longer fit
    pub fn set_max_devices(&mut self, max_devices: usize) {
        self.max_devices = max_devices.max(1);
        self.evict();
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Change the window size, dropping the oldest values that no longer fit
    pub fn set_window_size(&mut self, window_size: usize) {
        self.window_size = window_size.max(1);
        self.enforce_window();
    }

    /// Append a value to a series
    pub fn push(&mut self, device_id: &str, metric: &str, value: f64) {
        self.touch(device_id);
        let window_size = self.window_size;
        let window = self
            .series
            .entry(device_id.to_string())
            .or_default()
            .entry(metric.to_string())
            .or_insert_with(|| VecDeque::with_capacity(window_size));

        window.push_back(value);
        while window.len() > window_size {
            window.pop_front();
        }

        self.evict();
    }

    fn touch(&mut self, device_id: &str) {
        if self.recency.back().map(String::as_str) == Some(device_id) {
            return;
        }
        if let Some(position) = self.recency.iter().position(|id| id == device_id) {
            self.recency.remove(position);
        }
        self.recency.push_back(device_id.to_string());
    }

    fn evict(&mut self) {
        while self.series.len() > self.max_devices {
            let Some(device_id) = self.recency.pop_front() else {
                break;
            };
            if self.series.remove(&device_id).is_some() {
                debug!("trend store full, evicted device {}", device_id);
            }
        }
    }

    /// Values kept for a series, oldest first
    pub fn history(&self, device_id: &str, metric: &str) -> Vec<f64> {
        self.series
            .get(device_id)
            .and_then(|metrics| metrics.get(metric))
            .map(|window| window.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Rolling average of a series
    pub fn baseline(&self, device_id: &str, metric: &str) -> Option<f64> {
        let window = self.series.get(device_id)?.get(metric)?;
        if window.is_empty() {
            return None;
        }
        Some(window.iter().sum::<f64>() / window.len() as f64)
    }

    /// History trend of a single series
    pub fn trend(
        &self,
        device_id: &str,
        metric: &str,
        thresholds: &HistoryTrendThresholds,
    ) -> Trend {
        trend_over_history(
            &self.history(device_id, metric),
            thresholds.for_metric(metric),
        )
    }

    /// Record the tracked metrics of a reading and classify each series
    pub fn update(
        &mut self,
        reading: &EnvironmentReading,
        thresholds: &HistoryTrendThresholds,
    ) -> BTreeMap<String, Trend> {
        let values = [
            reading.temperature,
            reading.humidity,
            reading.co2,
            reading.illuminance,
        ];

        TRACKED_METRICS
            .iter()
            .zip(values)
            .map(|(metric, value)| {
                self.push(&reading.device_id, metric, value);
                (
                    metric.to_string(),
                    self.trend(&reading.device_id, metric, thresholds),
                )
            })
            .collect()
    }

    /// Number of devices with at least one series
    pub fn device_count(&self) -> usize {
        self.series.len()
    }

    pub fn clear(&mut self) {
        self.series.clear();
        self.recency.clear();
    }

    fn enforce_window(&mut self) {
        for metrics in self.series.values_mut() {
            for window in metrics.values_mut() {
                while window.len() > self.window_size {
                    window.pop_front();
                }
            }
        }
    }

    /// Load a trend store from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut store: TrendStore = serde_json::from_str(json)?;
        store.window_size = store.window_size.max(1);
        store.enforce_window();

        let TrendStore { series, recency, .. } = &mut store;
        recency.retain(|id| series.contains_key(id));
        for id in series.keys() {
            if !recency.contains(id) {
                recency.push_front(id.clone());
            }
        }
        store.set_max_devices(store.max_devices);
        Ok(store)
    }

    /// Serialize the trend store to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn reading(device_id: &str, temperature: f64, co2: f64) -> EnvironmentReading {
        EnvironmentReading {
            device_id: device_id.to_string(),
            temperature,
            humidity: 50.0,
            co2,
            illuminance: 300.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_classify_trend() {
        assert_eq!(classify_trend(100.0, 100.0), Trend::Stable);
        assert_eq!(classify_trend(104.9, 100.0), Trend::Stable);
        assert_eq!(classify_trend(95.1, 100.0), Trend::Stable);
        assert_eq!(classify_trend(106.0, 100.0), Trend::Up);
        assert_eq!(classify_trend(90.0, 100.0), Trend::Down);
    }

    #[test]
    fn test_classify_trend_zero_baseline() {
        assert_eq!(classify_trend(0.0, 0.0), Trend::Stable);
        assert_eq!(classify_trend(0.1, 0.0), Trend::Up);
        assert_eq!(classify_trend(-0.1, 0.0), Trend::Down);
    }

    #[test]
    fn test_history_needs_five_values() {
        assert_eq!(trend_over_history(&[], 0.5), Trend::Stable);
        assert_eq!(
            trend_over_history(&[20.0, 21.0, 22.0, 23.0], 0.5),
            Trend::Stable
        );
    }

    #[test]
    fn test_history_trend_uses_last_five() {
        // Only the last five count: 20, 20, x, 22, 22
        let values = [40.0, 40.0, 20.0, 20.0, 99.0, 22.0, 22.0];
        assert_eq!(trend_over_history(&values, 0.5), Trend::Up);

        let falling = [24.0, 24.0, 23.0, 22.0, 22.0];
        assert_eq!(trend_over_history(&falling, 0.5), Trend::Down);

        let flat = [22.0, 22.2, 30.0, 22.3, 22.1];
        assert_eq!(trend_over_history(&flat, 0.5), Trend::Stable);
    }

    #[test]
    fn test_window_rolling() {
        let mut store = TrendStore::new(3);
        for i in 0..5 {
            store.push("room-1", "co2", 400.0 + i as f64 * 100.0);
        }

        assert_eq!(store.history("room-1", "co2"), vec![600.0, 700.0, 800.0]);
        assert_eq!(store.baseline("room-1", "co2"), Some(700.0));
        assert_eq!(store.baseline("room-1", "humidity"), None);
        assert_eq!(store.baseline("room-2", "co2"), None);
    }

    #[test]
    fn test_update_classifies_every_metric() {
        let thresholds = HistoryTrendThresholds::default();
        let mut store = TrendStore::default();

        let mut trends = BTreeMap::new();
        let samples = [
            (20.0, 500.0),
            (20.0, 520.0),
            (21.0, 600.0),
            (22.0, 700.0),
            (22.0, 720.0),
        ];
        for (temperature, co2) in samples {
            trends = store.update(&reading("room-1", temperature, co2), &thresholds);
        }

        assert_eq!(trends["temperature"], Trend::Up);
        assert_eq!(trends["co2"], Trend::Up);
        assert_eq!(trends["humidity"], Trend::Stable);
        assert_eq!(trends["illuminance"], Trend::Stable);
        assert_eq!(store.device_count(), 1);
    }

    #[test]
    fn test_devices_are_independent() {
        let thresholds = HistoryTrendThresholds::default();
        let mut store = TrendStore::default();
        for t in [20.0, 20.0, 21.0, 22.0, 22.0] {
            store.update(&reading("room-1", t, 500.0), &thresholds);
        }
        let trends = store.update(&reading("room-2", 30.0, 500.0), &thresholds);

        assert_eq!(trends["temperature"], Trend::Stable);
        assert_eq!(store.history("room-2", "temperature"), vec![30.0]);
    }

    #[test]
    fn test_serialization() {
        let mut store = TrendStore::new(4);
        store.push("room-1", "temperature", 21.5);
        store.push("room-1", "temperature", 22.5);

        let json = store.to_json().unwrap();
        assert!(json.contains("\"windowSize\":4"));

        let loaded = TrendStore::from_json(&json).unwrap();
        assert_eq!(loaded, store);
        assert_eq!(loaded.baseline("room-1", "temperature"), Some(22.0));
    }

    #[test]
    fn test_loaded_windows_are_trimmed() {
        let json = r#"{"series":{"room-1":{"co2":[1,2,3,4,5]}},"windowSize":2}"#;
        let store = TrendStore::from_json(json).unwrap();
        assert_eq!(store.history("room-1", "co2"), vec![4.0, 5.0]);
    }

    #[test]
    fn test_shrinking_window() {
        let mut store = TrendStore::new(5);
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            store.push("d", "co2", v);
        }
        store.set_window_size(2);
        assert_eq!(store.history("d", "co2"), vec![4.0, 5.0]);
    }

    #[test]
    fn test_least_recently_updated_device_is_evicted() {
        let mut store = TrendStore::new(4).with_max_devices(2);
        store.push("room-1", "co2", 400.0);
        store.push("room-2", "co2", 500.0);
        store.push("room-1", "co2", 410.0);
        store.push("room-3", "co2", 600.0);

        assert_eq!(store.device_count(), 2);
        assert_eq!(store.history("room-1", "co2"), vec![400.0, 410.0]);
        assert!(store.history("room-2", "co2").is_empty());
        assert_eq!(store.history("room-3", "co2"), vec![600.0]);
    }

    #[test]
    fn test_loaded_store_respects_device_cap() {
        let json = r#"{"series":{"a":{"co2":[1]},"b":{"co2":[2]},"c":{"co2":[3]}},
            "windowSize":4,"maxDevices":2,"recency":["b","c","a"]}"#;
        let store = TrendStore::from_json(json).unwrap();

        assert_eq!(store.device_count(), 2);
        assert!(store.history("b", "co2").is_empty());
        assert_eq!(store.history("a", "co2"), vec![1.0]);
    }

    proptest! {
        #[test]
        fn prop_window_never_exceeds_size(
            window in 1usize..16,
            values in proptest::collection::vec(-100.0f64..100.0, 0..64),
        ) {
            let mut store = TrendStore::new(window);
            for v in &values {
                store.push("d", "temperature", *v);
                prop_assert!(store.history("d", "temperature").len() <= window);
            }
        }

        #[test]
        fn prop_device_count_never_exceeds_cap(
            cap in 1usize..8,
            devices in proptest::collection::vec(0u8..32, 0..64),
        ) {
            let mut store = TrendStore::new(4).with_max_devices(cap);
            for device in &devices {
                store.push(&format!("room-{device}"), "co2", 500.0);
                prop_assert!(store.device_count() <= cap);
            }
        }

        #[test]
        fn prop_unchanged_value_is_stable(value in -1000.0f64..1000.0) {
            prop_assert_eq!(classify_trend(value, value), Trend::Stable);
        }
    }
}
