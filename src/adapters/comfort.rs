//! Comfort sensor adapter
//!
//! The sensor publishes capitalized field names over MQTT (`Temperature`,
//! `CO2`, `Human`, ...). The HTTP ingestion route forwards lower-camel names
//! instead; both are accepted, the capitalized name taking precedence.

use super::fields::{self, Payload};
use super::DevicePayloadAdapter;
use crate::types::{CanonicalReading, DeviceType, EnvironmentReading};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Illuminance above which a room is assumed to be in use (lux)
pub const OCCUPANCY_ILLUMINANCE_LUX: f64 = 100.0;

/// Comfort sensor payload adapter
pub struct ComfortSensorAdapter;

impl DevicePayloadAdapter for ComfortSensorAdapter {
    fn device_type(&self) -> DeviceType {
        DeviceType::ComfortSensor
    }

    fn adapt(&self, payload: &Payload, received_at: DateTime<Utc>) -> CanonicalReading {
        let human = fields::flag(payload, &["Human", "human"]);
        let illuminance = fields::number(payload, &["Illuminance", "illuminance", "lightLevel"]);

        CanonicalReading::ComfortSensor(EnvironmentReading {
            device_id: fields::device_id(
                payload,
                &["DeviceNo", "deviceId"],
                "comfort-sensor-unknown",
            ),
            timestamp: fields::timestamp(payload, received_at),
            temperature: fields::number(payload, &["Temperature", "temperature"]),
            humidity: fields::number(payload, &["Humidity", "humidity"]),
            co2: fields::number(payload, &["CO2", "co2"]),
            illuminance,
            pressure: fields::number(payload, &["Pressure", "pressure"]),
            noise_level: fields::number(payload, &["NoiseLevel", "noiseLevel"]),
            air_quality_index: fields::number(payload, &["AQI", "aqi", "airQualityIndex"]),
            person_count: fields::count(payload, &["PersonCount", "personCount"]),
            human,
            occupancy: occupancy(human, illuminance),
            rssi: fields::number(payload, &["Rssi", "rssi"]),
            voltage: fields::number(payload, &["Voltage", "voltage"]),
            power: fields::number(payload, &["Power", "power"]),
            interval: fields::count(payload, &["Interval", "interval"]),
            device_no: fields::text(payload, &["DeviceNo"]),
            data_no: fields::text(payload, &["DataNo"]),
            version: fields::text(payload, &["Ver"]),
            measure_time: fields::text(payload, &["MeasureTime"]),
            mac: fields::text(payload, &["MAC", "mac"]),
            ssid: fields::text(payload, &["SSID", "ssid"]),
            device_name: fields::text(payload, &["DeviceName", "DeciceName"]),
            raw_data: Value::Object(payload.clone()),
        })
    }
}

/// Room occupancy: the presence sensor fired, or the lights are on
pub fn occupancy(human: bool, illuminance: f64) -> bool {
    human || illuminance > OCCUPANCY_ILLUMINANCE_LUX
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn adapt(value: Value) -> EnvironmentReading {
        let payload = value.as_object().cloned().unwrap();
        match ComfortSensorAdapter.adapt(&payload, Utc::now()) {
            CanonicalReading::ComfortSensor(reading) => reading,
            other => panic!("unexpected reading: {:?}", other),
        }
    }

    #[test]
    fn test_parse_mqtt_payload() {
        let reading = adapt(json!({
            "DeviceNo": "K-0042",
            "DataNo": 118,
            "Ver": "1.2",
            "MeasureTime": "2024/01/15 10:30:00",
            "Temperature": 23.4,
            "Humidity": 48.0,
            "CO2": 640,
            "Illuminance": 320,
            "Pressure": 1012.3,
            "Human": false,
            "Rssi": -61,
            "Voltage": 3.3,
            "Power": 0.8,
            "Interval": 60,
            "MAC": "AA:BB:CC:DD:EE:FF",
            "SSID": "office-iot",
            "DeciceName": "meeting-room-a"
        }));

        assert_eq!(reading.device_id, "K-0042");
        assert_eq!(reading.device_no.as_deref(), Some("K-0042"));
        assert_eq!(reading.data_no.as_deref(), Some("118"));
        assert_eq!(reading.temperature, 23.4);
        assert_eq!(reading.co2, 640.0);
        assert_eq!(reading.pressure, 1012.3);
        assert_eq!(reading.rssi, -61.0);
        assert_eq!(reading.interval, 60);
        assert_eq!(reading.mac.as_deref(), Some("AA:BB:CC:DD:EE:FF"));
        assert_eq!(reading.device_name.as_deref(), Some("meeting-room-a"));
        assert_eq!(reading.measure_time.as_deref(), Some("2024/01/15 10:30:00"));
        // lights on, nobody detected
        assert!(!reading.human);
        assert!(reading.occupancy);
        assert_eq!(reading.raw_data["DeciceName"], "meeting-room-a");
    }

    #[test]
    fn test_hot_dark_room_is_unoccupied() {
        let reading = adapt(json!({
            "Temperature": 32, "Humidity": 50, "CO2": 500, "Human": false, "Illuminance": 50
        }));
        assert!(!reading.occupancy);
        assert_eq!(reading.temperature, 32.0);
    }

    #[test]
    fn test_presence_sensor_sets_occupancy() {
        let reading = adapt(json!({"Human": true, "Illuminance": 0}));
        assert!(reading.occupancy);
    }

    #[test]
    fn test_illuminance_boundary_is_exclusive() {
        assert!(!adapt(json!({"Illuminance": 100})).occupancy);
        assert!(adapt(json!({"Illuminance": 100.5})).occupancy);
    }

    #[test]
    fn test_lower_camel_fallbacks() {
        let reading = adapt(json!({
            "deviceId": "kaiteki-7",
            "timestamp": "2024-01-15T10:30:00Z",
            "temperature": 21.0,
            "humidity": 55.0,
            "co2": 700,
            "lightLevel": 450,
            "noiseLevel": 38,
            "personCount": 3,
            "aqi": 42
        }));
        assert_eq!(reading.device_id, "kaiteki-7");
        assert_eq!(reading.timestamp, "2024-01-15T10:30:00Z");
        assert_eq!(reading.illuminance, 450.0);
        assert_eq!(reading.noise_level, 38.0);
        assert_eq!(reading.person_count, 3);
        assert_eq!(reading.air_quality_index, 42.0);
        assert!(reading.occupancy);
    }

    #[test]
    fn test_capitalized_name_wins() {
        let reading = adapt(json!({"Temperature": 25.0, "temperature": 19.0}));
        assert_eq!(reading.temperature, 25.0);
    }

    #[test]
    fn test_explicit_occupancy_field_is_ignored() {
        let reading = adapt(json!({"occupancy": true, "Human": false, "Illuminance": 10}));
        assert!(!reading.occupancy);
    }

    #[test]
    fn test_empty_payload_defaults() {
        let reading = adapt(json!({}));
        assert_eq!(reading.device_id, "comfort-sensor-unknown");
        assert_eq!(reading.temperature, 0.0);
        assert_eq!(reading.humidity, 0.0);
        assert_eq!(reading.co2, 0.0);
        assert_eq!(reading.person_count, 0);
        assert!(!reading.human);
        assert!(!reading.occupancy);
        assert_eq!(reading.mac, None);
        assert_eq!(reading.raw_data, json!({}));
    }
}
