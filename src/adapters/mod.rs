//! Device payload adapters
//!
//! This module provides adapters that map raw device payloads onto canonical,
//! device-agnostic readings.

mod behavior;
mod comfort;
pub(crate) mod fields;
mod person_counter;

pub use behavior::BehaviorAnalyzerAdapter;
pub use comfort::ComfortSensorAdapter;
pub use person_counter::PersonCounterAdapter;

use crate::types::{CanonicalReading, DeviceType};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// Trait for device payload adapters
pub trait DevicePayloadAdapter {
    /// Device type this adapter produces
    fn device_type(&self) -> DeviceType;

    /// Map a raw payload object to a canonical reading.
    ///
    /// Never fails: absent or malformed fields take their zero-values.
    fn adapt(&self, payload: &Map<String, Value>, received_at: DateTime<Utc>) -> CanonicalReading;
}

/// Adapter for a device type
pub fn adapter_for(device_type: DeviceType) -> &'static dyn DevicePayloadAdapter {
    match device_type {
        DeviceType::ComfortSensor => &ComfortSensorAdapter,
        DeviceType::PersonCounter => &PersonCounterAdapter,
        DeviceType::BehaviorAnalyzer => &BehaviorAnalyzerAdapter,
    }
}
