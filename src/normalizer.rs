//! Payload normalization
//!
//! Entry point of the signal core. Dispatches a raw payload to the adapter for
//! its source type and returns a fully populated canonical reading.
//! - Unknown source types are passed through unchanged
//! - Non-object payloads and blank source tags are rejected
//! - Absent fields never fail, they default

use crate::adapters::adapter_for;
use crate::error::ComputeError;
use crate::types::{DeviceType, NormalizedPayload};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde_json::Value;

/// Normalizer for converting raw device payloads to canonical readings
pub struct Normalizer;

impl Normalizer {
    /// Normalize a payload, using the current time when it carries no timestamp
    pub fn normalize(source: &str, payload: &Value) -> Result<NormalizedPayload, ComputeError> {
        Self::normalize_at(source, payload, Utc::now())
    }

    /// Normalize a payload with an explicit receive time.
    ///
    /// Deterministic: identical inputs give identical output.
    pub fn normalize_at(
        source: &str,
        payload: &Value,
        received_at: DateTime<Utc>,
    ) -> Result<NormalizedPayload, ComputeError> {
        if source.trim().is_empty() {
            return Err(ComputeError::InvalidPayload(
                "missing source type".to_string(),
            ));
        }

        let Some(fields) = payload.as_object() else {
            return Err(ComputeError::InvalidPayload(format!(
                "expected a JSON object, got {}",
                json_kind(payload)
            )));
        };

        match DeviceType::from_tag(source) {
            Some(device_type) => {
                debug!(
                    "normalizing {} payload ({} fields)",
                    device_type,
                    fields.len()
                );
                let reading = adapter_for(device_type).adapt(fields, received_at);
                Ok(NormalizedPayload::Reading(reading))
            }
            None => {
                warn!("unknown source type '{}', passing payload through", source);
                Ok(NormalizedPayload::Passthrough(payload.clone()))
            }
        }
    }

    /// Parse a JSON string and normalize it
    pub fn normalize_json(source: &str, raw_json: &str) -> Result<NormalizedPayload, ComputeError> {
        let payload: Value = serde_json::from_str(raw_json)?;
        Self::normalize(source, &payload)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
