//! Comfort and quality scoring
//!
//! Two independent 0-100 scores are computed from the same environmental inputs:
//! - Comfort score: starts at 100 and subtracts fixed penalties per out-of-range band
//! - Quality score: mean of four normalized sub-scores (temperature, humidity, CO2, AQI)
//!
//! Neither is derived from the other; callers pick the one they report.

use crate::types::{
    AirQualityLevel, CanonicalReading, ComfortRating, ScoreResult, ScoreVariant,
};
use std::collections::BTreeMap;

/// Environmental inputs shared by both scoring variants
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoreInputs {
    /// °C
    pub temperature: f64,
    /// %
    pub humidity: f64,
    /// ppm
    pub co2: f64,
    pub person_count: u32,
    pub aqi: f64,
}

impl From<&CanonicalReading> for ScoreInputs {
    fn from(reading: &CanonicalReading) -> Self {
        match reading {
            CanonicalReading::ComfortSensor(r) => Self {
                temperature: r.temperature,
                humidity: r.humidity,
                co2: r.co2,
                person_count: r.person_count,
                aqi: r.air_quality_index,
            },
            CanonicalReading::PersonCounter(r) => Self {
                person_count: r.person_count,
                ..Default::default()
            },
            CanonicalReading::BehaviorAnalyzer(_) => Self::default(),
        }
    }
}

/// Comfort score of a canonical reading (deduction variant)
pub fn score(reading: &CanonicalReading) -> ScoreResult {
    comfort_score(&ScoreInputs::from(reading))
}

/// Deduction-based comfort score.
///
/// Optimal bands: 22-24 °C, 40-60 % humidity, CO2 at or below 600 ppm, at most
/// two people.
pub fn comfort_score(inputs: &ScoreInputs) -> ScoreResult {
    let temperature = temperature_penalty(inputs.temperature);
    let humidity = humidity_penalty(inputs.humidity);
    let co2 = co2_penalty(inputs.co2);
    let occupancy = occupancy_penalty(inputs.person_count);

    let total = temperature + humidity + co2 + occupancy;
    let score = 100u8.saturating_sub(total);

    let mut components = BTreeMap::new();
    components.insert("temperaturePenalty".to_string(), f64::from(temperature));
    components.insert("humidityPenalty".to_string(), f64::from(humidity));
    components.insert("co2Penalty".to_string(), f64::from(co2));
    components.insert("occupancyPenalty".to_string(), f64::from(occupancy));

    ScoreResult {
        variant: ScoreVariant::Comfort,
        score,
        components,
    }
}

fn temperature_penalty(t: f64) -> u8 {
    if t < 18.0 || t > 30.0 {
        30
    } else if t < 20.0 || t > 26.0 {
        15
    } else if t < 22.0 || t > 24.0 {
        5
    } else {
        0
    }
}

fn humidity_penalty(h: f64) -> u8 {
    if h < 30.0 || h > 80.0 {
        20
    } else if h < 40.0 || h > 60.0 {
        10
    } else {
        0
    }
}

fn co2_penalty(ppm: f64) -> u8 {
    if ppm > 1000.0 {
        25
    } else if ppm > 800.0 {
        15
    } else if ppm > 600.0 {
        5
    } else {
        0
    }
}

fn occupancy_penalty(people: u32) -> u8 {
    if people > 4 {
        10
    } else if people > 2 {
        5
    } else {
        0
    }
}

/// Normalized environmental quality score: mean of four sub-scores in [0, 100]
pub fn quality_score(inputs: &ScoreInputs) -> ScoreResult {
    let temperature = clamp_score(100.0 - (inputs.temperature - 22.0).abs() * 10.0);
    let humidity = clamp_score(100.0 - (inputs.humidity - 50.0).abs() * 2.0);
    let co2 = clamp_score((1200.0 - inputs.co2) / 8.0);
    let aqi = clamp_score((150.0 - inputs.aqi) * 2.0);

    let overall = (temperature + humidity + co2 + aqi) / 4.0;

    let mut components = BTreeMap::new();
    components.insert("temperatureScore".to_string(), temperature);
    components.insert("humidityScore".to_string(), humidity);
    components.insert("co2Score".to_string(), co2);
    components.insert("aqiScore".to_string(), aqi);
    components.insert("overall".to_string(), overall);

    ScoreResult {
        variant: ScoreVariant::Quality,
        score: overall.round() as u8,
        components,
    }
}

fn clamp_score(value: f64) -> f64 {
    value.max(0.0).min(100.0)
}

/// Productivity index: distance from 22 °C / 50 % plus a CO2 penalty, kept in [60, 100]
pub fn productivity_index(inputs: &ScoreInputs) -> u8 {
    let mut score: f64 = 100.0;
    score -= (inputs.temperature - 22.0).abs() * 5.0;
    score -= (inputs.humidity - 50.0).abs() * 0.5;

    if inputs.co2 > 1000.0 {
        score -= 20.0;
    } else if inputs.co2 > 800.0 {
        score -= 10.0;
    }

    score.round().max(60.0).min(100.0) as u8
}

impl ComfortRating {
    pub fn from_score(score: u8) -> Self {
        if score >= 80 {
            ComfortRating::Excellent
        } else if score >= 60 {
            ComfortRating::Good
        } else if score >= 40 {
            ComfortRating::Fair
        } else {
            ComfortRating::Poor
        }
    }
}

impl AirQualityLevel {
    pub fn from_co2(ppm: f64) -> Self {
        if ppm < 500.0 {
            AirQualityLevel::Excellent
        } else if ppm < 800.0 {
            AirQualityLevel::Good
        } else if ppm < 1000.0 {
            AirQualityLevel::Fair
        } else {
            AirQualityLevel::Poor
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EnvironmentReading, PersonCountReading};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn inputs(temperature: f64, humidity: f64, co2: f64, person_count: u32) -> ScoreInputs {
        ScoreInputs {
            temperature,
            humidity,
            co2,
            person_count,
            aqi: 0.0,
        }
    }

    #[test]
    fn test_hot_room_loses_thirty() {
        let result = comfort_score(&inputs(32.0, 50.0, 500.0, 0));
        assert_eq!(result.score, 70);
        assert_eq!(result.components["temperaturePenalty"], 30.0);
        assert_eq!(result.components["humidityPenalty"], 0.0);
        assert_eq!(result.components["co2Penalty"], 0.0);
        assert_eq!(result.components["occupancyPenalty"], 0.0);
    }

    #[test]
    fn test_optimal_room_scores_full() {
        assert_eq!(comfort_score(&inputs(23.0, 50.0, 450.0, 1)).score, 100);
    }

    #[test]
    fn test_temperature_band_edges() {
        let t = |temp| comfort_score(&inputs(temp, 50.0, 400.0, 0)).score;
        assert_eq!(t(17.9), 70);
        assert_eq!(t(18.0), 85);
        assert_eq!(t(20.0), 95);
        assert_eq!(t(22.0), 100);
        assert_eq!(t(24.0), 100);
        assert_eq!(t(24.1), 95);
        assert_eq!(t(26.0), 95);
        assert_eq!(t(26.1), 85);
        assert_eq!(t(30.0), 85);
        assert_eq!(t(30.1), 70);
    }

    #[test]
    fn test_humidity_band_edges() {
        let h = |humidity| comfort_score(&inputs(23.0, humidity, 400.0, 0)).score;
        assert_eq!(h(29.0), 80);
        assert_eq!(h(30.0), 90);
        assert_eq!(h(40.0), 100);
        assert_eq!(h(60.0), 100);
        assert_eq!(h(60.5), 90);
        assert_eq!(h(80.0), 90);
        assert_eq!(h(81.0), 80);
    }

    #[test]
    fn test_co2_and_occupancy_bands() {
        let c = |co2| comfort_score(&inputs(23.0, 50.0, co2, 0)).score;
        assert_eq!(c(600.0), 100);
        assert_eq!(c(601.0), 95);
        assert_eq!(c(800.0), 95);
        assert_eq!(c(1000.0), 85);
        assert_eq!(c(1001.0), 75);

        let p = |people| comfort_score(&inputs(23.0, 50.0, 400.0, people)).score;
        assert_eq!(p(2), 100);
        assert_eq!(p(3), 95);
        assert_eq!(p(4), 95);
        assert_eq!(p(5), 90);
    }

    #[test]
    fn test_worst_case_floor() {
        let result = comfort_score(&inputs(40.0, 95.0, 3000.0, 20));
        assert_eq!(result.score, 15);
    }

    #[test]
    fn test_quality_score_components() {
        let result = quality_score(&ScoreInputs {
            temperature: 24.0,
            humidity: 40.0,
            co2: 800.0,
            person_count: 0,
            aqi: 110.0,
        });
        assert_eq!(result.variant, ScoreVariant::Quality);
        assert_eq!(result.components["temperatureScore"], 80.0);
        assert_eq!(result.components["humidityScore"], 80.0);
        assert_eq!(result.components["co2Score"], 50.0);
        assert_eq!(result.components["aqiScore"], 80.0);
        assert_eq!(result.components["overall"], 72.5);
        assert_eq!(result.score, 73);
    }

    #[test]
    fn test_quality_sub_scores_are_clamped() {
        let result = quality_score(&ScoreInputs {
            temperature: 45.0,
            humidity: 50.0,
            co2: 0.0,
            person_count: 0,
            aqi: 0.0,
        });
        assert_eq!(result.components["temperatureScore"], 0.0);
        assert_eq!(result.components["co2Score"], 100.0);
        assert_eq!(result.components["aqiScore"], 100.0);
    }

    #[test]
    fn test_score_from_readings() {
        let comfort = CanonicalReading::ComfortSensor(EnvironmentReading {
            temperature: 32.0,
            humidity: 50.0,
            co2: 500.0,
            ..Default::default()
        });
        assert_eq!(score(&comfort).score, 70);

        // only the person count is known; the zero-valued climate fields skew the score
        let camera = CanonicalReading::PersonCounter(PersonCountReading {
            person_count: 6,
            ..Default::default()
        });
        assert_eq!(score(&camera).score, 100 - 30 - 20 - 10);
    }

    #[test]
    fn test_productivity_index() {
        assert_eq!(productivity_index(&inputs(22.0, 50.0, 500.0, 0)), 100);
        assert_eq!(productivity_index(&inputs(24.0, 60.0, 900.0, 0)), 75);
        assert_eq!(productivity_index(&inputs(35.0, 90.0, 1500.0, 0)), 60);
    }

    #[test]
    fn test_rating_and_air_quality_labels() {
        assert_eq!(ComfortRating::from_score(100), ComfortRating::Excellent);
        assert_eq!(ComfortRating::from_score(80), ComfortRating::Excellent);
        assert_eq!(ComfortRating::from_score(79), ComfortRating::Good);
        assert_eq!(ComfortRating::from_score(40), ComfortRating::Fair);
        assert_eq!(ComfortRating::from_score(39), ComfortRating::Poor);

        assert_eq!(AirQualityLevel::from_co2(499.0), AirQualityLevel::Excellent);
        assert_eq!(AirQualityLevel::from_co2(500.0), AirQualityLevel::Good);
        assert_eq!(AirQualityLevel::from_co2(999.0), AirQualityLevel::Fair);
        assert_eq!(AirQualityLevel::from_co2(1000.0), AirQualityLevel::Poor);
    }

    proptest! {
        #[test]
        fn prop_comfort_score_bounded(
            t in -1e6f64..1e6,
            h in -1e6f64..1e6,
            c in -1e6f64..1e6,
            p in any::<u32>(),
        ) {
            let result = comfort_score(&inputs(t, h, c, p));
            prop_assert!(result.score <= 100);
            let again = comfort_score(&inputs(t, h, c, p));
            prop_assert_eq!(result, again);
        }

        #[test]
        fn prop_comfort_non_increasing_away_from_band(
            start in 22.0f64..=24.0,
            step_a in 0.0f64..20.0,
            step_b in 0.0f64..20.0,
        ) {
            let (near, far) = if step_a <= step_b {
                (step_a, step_b)
            } else {
                (step_b, step_a)
            };
            let s = |t| comfort_score(&inputs(t, 50.0, 400.0, 0)).score;

            // upward from the band
            prop_assert!(s(24.0 + far) <= s(24.0 + near));
            // downward from the band
            prop_assert!(s(22.0 - far) <= s(22.0 - near));
            prop_assert_eq!(s(start), 100);
        }

        #[test]
        fn prop_quality_score_bounded(
            t in -1e4f64..1e4,
            h in -1e4f64..1e4,
            c in -1e4f64..1e4,
            a in -1e4f64..1e4,
        ) {
            let result = quality_score(&ScoreInputs {
                temperature: t,
                humidity: h,
                co2: c,
                person_count: 0,
                aqi: a,
            });
            prop_assert!(result.score <= 100);
            for value in result.components.values() {
                prop_assert!((0.0..=100.0).contains(value));
            }
        }
    }
}
