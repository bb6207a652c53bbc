//! Person-counting camera adapter

use super::fields::{self, Payload};
use super::DevicePayloadAdapter;
use crate::types::{CanonicalReading, DeviceType, PersonCountReading};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Person-counter payload adapter
pub struct PersonCounterAdapter;

impl DevicePayloadAdapter for PersonCounterAdapter {
    fn device_type(&self) -> DeviceType {
        DeviceType::PersonCounter
    }

    fn adapt(&self, payload: &Payload, received_at: DateTime<Utc>) -> CanonicalReading {
        CanonicalReading::PersonCounter(PersonCountReading {
            device_id: fields::device_id(payload, &["deviceId"], "person-counter-unknown"),
            timestamp: fields::timestamp(payload, received_at),
            person_count: fields::count(payload, &["personCount"]),
            age_distribution: fields::number_list(payload, &["ageDistribution"]),
            gender_distribution: fields::number_list(payload, &["genderDistribution"]),
            confidence: fields::ratio(payload, &["confidence"]),
            location: fields::object(payload, &["location"]),
            raw_data: Value::Object(payload.clone()),
        })
    }
}
