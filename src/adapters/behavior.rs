//! Behavioral-analysis service adapter

use super::fields::{self, Payload};
use super::DevicePayloadAdapter;
use crate::types::{BehaviorReading, CanonicalReading, DeviceType};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Behavior-analyzer payload adapter
pub struct BehaviorAnalyzerAdapter;

impl DevicePayloadAdapter for BehaviorAnalyzerAdapter {
    fn device_type(&self) -> DeviceType {
        DeviceType::BehaviorAnalyzer
    }

    fn adapt(&self, payload: &Payload, received_at: DateTime<Utc>) -> CanonicalReading {
        CanonicalReading::BehaviorAnalyzer(BehaviorReading {
            device_id: fields::device_id(payload, &["deviceId"], "behavior-analyzer-unknown"),
            timestamp: fields::timestamp(payload, received_at),
            behavior_analysis: fields::object(payload, &["behaviorAnalysis"]),
            emotion_analysis: fields::object(payload, &["emotionAnalysis"]),
            interaction_patterns: fields::string_list(payload, &["interactionPatterns"]),
            confidence: fields::ratio(payload, &["confidence"]),
            raw_data: Value::Object(payload.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_parse_behavior_payload() {
        let payload = json!({
            "deviceId": "analyzer-1",
            "behaviorAnalysis": {"interestLevel": 75, "dwellSeconds": 140},
            "emotionAnalysis": {"dominant": "curious"},
            "interactionPatterns": ["browse", "photograph"],
            "confidence": 0.81
        });
        let reading = BehaviorAnalyzerAdapter.adapt(payload.as_object().unwrap(), Utc::now());

        let CanonicalReading::BehaviorAnalyzer(reading) = reading else {
            panic!("expected behavior reading");
        };
        assert_eq!(reading.device_id, "analyzer-1");
        assert_eq!(reading.behavior_analysis["interestLevel"], 75);
        assert_eq!(reading.emotion_analysis["dominant"], "curious");
        assert_eq!(reading.interaction_patterns, vec!["browse", "photograph"]);
        assert_eq!(reading.confidence, 0.81);
        assert_eq!(reading.raw_data, payload);
    }

    #[test]
    fn test_non_object_analysis_defaults_to_empty() {
        let payload = json!({"behaviorAnalysis": "n/a", "interactionPatterns": "browse"});
        let reading = BehaviorAnalyzerAdapter.adapt(payload.as_object().unwrap(), Utc::now());

        let CanonicalReading::BehaviorAnalyzer(reading) = reading else {
            panic!("expected behavior reading");
        };
        assert!(reading.behavior_analysis.is_empty());
        assert!(reading.emotion_analysis.is_empty());
        assert!(reading.interaction_patterns.is_empty());
    }
}
