//! Anomaly detection and recommendations
//!
//! Two deliberately separate threshold sets:
//! - Anomalies are classified over window averages produced by an aggregation step
//! - Recommendations use finer thresholds over instantaneous values
//!
//! Neither performs any aggregation of its own.

use crate::config::AnomalyThresholds;
use crate::types::{
    AnomalyKind, AnomalyRecord, CanonicalReading, CurrentConditions, EnvironmentalAggregate,
    Evaluation, Priority, Recommendation, RecommendationKind, Severity,
};

/// Input to the engine: an optional window aggregate and the current values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationInput {
    pub aggregate: Option<EnvironmentalAggregate>,
    pub current: CurrentConditions,
}

/// Anomaly & recommendation engine
#[derive(Debug, Clone, Default)]
pub struct AnomalyEngine {
    thresholds: AnomalyThresholds,
}

impl AnomalyEngine {
    pub fn new(thresholds: AnomalyThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &AnomalyThresholds {
        &self.thresholds
    }

    /// Evaluate anomalies (when an aggregate is given) and recommendations
    pub fn evaluate(&self, input: &EvaluationInput) -> Evaluation {
        let anomalies = input
            .aggregate
            .as_ref()
            .map(|aggregate| self.detect_anomalies(aggregate))
            .unwrap_or_default();

        Evaluation {
            anomalies,
            recommendations: recommend(&input.current),
        }
    }

    /// Recommendations for a single reading; single readings raise no anomalies
    pub fn evaluate_reading(&self, reading: &CanonicalReading) -> Evaluation {
        let current = reading
            .as_environment()
            .map(CurrentConditions::from)
            .unwrap_or_default();

        self.evaluate(&EvaluationInput {
            aggregate: None,
            current,
        })
    }

    /// Anomalies over the window, with the averages standing in for current values
    pub fn evaluate_aggregate(&self, aggregate: &EnvironmentalAggregate) -> Evaluation {
        self.evaluate(&EvaluationInput {
            aggregate: Some(aggregate.clone()),
            current: CurrentConditions::from(aggregate),
        })
    }

    /// Classify window averages against the anomaly thresholds
    pub fn detect_anomalies(&self, env: &EnvironmentalAggregate) -> Vec<AnomalyRecord> {
        let t = &self.thresholds;
        let mut anomalies = Vec::new();

        if env.avg_temperature > t.high_temperature {
            anomalies.push(AnomalyRecord {
                kind: AnomalyKind::HighTemperature,
                value: env.avg_temperature,
                threshold: t.high_temperature,
                severity: Severity::Warning,
            });
        } else if env.avg_temperature < t.low_temperature {
            anomalies.push(AnomalyRecord {
                kind: AnomalyKind::LowTemperature,
                value: env.avg_temperature,
                threshold: t.low_temperature,
                severity: Severity::Warning,
            });
        }

        if env.avg_co2 > t.high_co2 {
            anomalies.push(AnomalyRecord {
                kind: AnomalyKind::HighCo2,
                value: env.avg_co2,
                threshold: t.high_co2,
                severity: Severity::Critical,
            });
        }

        if env.avg_light_level < t.low_light {
            anomalies.push(AnomalyRecord {
                kind: AnomalyKind::LowLight,
                value: env.avg_light_level,
                threshold: t.low_light,
                severity: Severity::Info,
            });
        }

        anomalies
    }
}

/// Evaluate with the default thresholds
pub fn evaluate(input: &EvaluationInput) -> Evaluation {
    AnomalyEngine::default().evaluate(input)
}

fn escalated(high: bool) -> Priority {
    if high {
        Priority::High
    } else {
        Priority::Medium
    }
}

/// Recommendations over instantaneous values. Never empty.
pub fn recommend(current: &CurrentConditions) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    if let Some(t) = current.temperature {
        if t > 25.0 {
            recommendations.push(Recommendation {
                kind: RecommendationKind::Temperature,
                action: "lower the cooling setpoint by 1°C".to_string(),
                priority: escalated(t > 27.0),
            });
        } else if t < 20.0 {
            recommendations.push(Recommendation {
                kind: RecommendationKind::Temperature,
                action: "raise the heating setpoint by 1°C".to_string(),
                priority: escalated(t < 18.0),
            });
        }
    }

    if let Some(h) = current.humidity {
        if h > 60.0 {
            recommendations.push(Recommendation {
                kind: RecommendationKind::Humidity,
                action: "dehumidify or ventilate".to_string(),
                priority: Priority::Medium,
            });
        } else if h < 40.0 {
            recommendations.push(Recommendation {
                kind: RecommendationKind::Humidity,
                action: "run a humidifier".to_string(),
                priority: Priority::Medium,
            });
        }
    }

    if let Some(ppm) = current.co2 {
        if ppm > 1000.0 {
            recommendations.push(Recommendation {
                kind: RecommendationKind::Ventilation,
                action: "ventilate now".to_string(),
                priority: Priority::High,
            });
        } else if ppm > 800.0 {
            recommendations.push(Recommendation {
                kind: RecommendationKind::Ventilation,
                action: "ventilate in 30 minutes".to_string(),
                priority: Priority::Medium,
            });
        }
    }

    if let Some(aqi) = current.aqi {
        if aqi > 75.0 {
            recommendations.push(Recommendation {
                kind: RecommendationKind::AirQuality,
                action: "run an air purifier".to_string(),
                priority: escalated(aqi > 100.0),
            });
        }
    }

    if recommendations.is_empty() {
        recommendations.push(Recommendation {
            kind: RecommendationKind::General,
            action: "maintain current settings".to_string(),
            priority: Priority::Low,
        });
    }

    recommendations
}
