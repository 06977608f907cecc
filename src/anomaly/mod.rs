//! Anomaly evaluation over the latest live readings.
//!
//! The feature vector reproduces the training pipeline exactly: two of
//! the columns are fixed placeholders and the intensity column is a
//! fixed multiple of the energy reading. That numeric policy is a known
//! approximation inherited from training, kept as-is so the persisted
//! artifacts stay compatible; it is not a physical relation.

mod artifacts;

use chrono::{DateTime, Datelike, Local, Timelike};
use log::debug;
use std::path::Path;

use crate::error::EvalError;
use crate::live::LatestReadings;
use crate::models::{KIND_ENERGY, KIND_HUMIDITY, KIND_TEMPERATURE};

pub use artifacts::{AnomalyModel, StandardScaler, FEATURE_COUNT};

pub const REACTIVE_POWER_PLACEHOLDER: f64 = 0.1;
pub const VOLTAGE_PLACEHOLDER: f64 = 230.0;
pub const INTENSITY_MULTIPLIER: f64 = 4.0;

/// Outcome of one evaluation. `Insufficient` is the expected steady
/// state before the first full set of readings arrives, not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Anomalous,
    Normal,
    Insufficient,
}

/// The eight ordered classifier inputs. Built fresh for every
/// evaluation, never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    pub temperature: f64,
    pub humidity: f64,
    pub hour: f64,
    pub day: f64,
    pub month: f64,
    pub reactive_power: f64,
    pub voltage: f64,
    pub intensity: f64,
}

impl FeatureVector {
    /// Assemble from the latest readings, or `None` when any of energy,
    /// temperature, humidity has not been seen yet. Clock features use
    /// local time, matching how the training data was labeled.
    pub fn assemble(state: &LatestReadings, now: DateTime<Local>) -> Option<Self> {
        let energy = state.get(KIND_ENERGY)?;
        let temperature = state.get(KIND_TEMPERATURE)?;
        let humidity = state.get(KIND_HUMIDITY)?;

        Some(Self {
            temperature,
            humidity,
            hour: f64::from(now.hour()),
            day: f64::from(now.day()),
            month: f64::from(now.month()),
            reactive_power: REACTIVE_POWER_PLACEHOLDER,
            voltage: VOLTAGE_PLACEHOLDER,
            intensity: energy * INTENSITY_MULTIPLIER,
        })
    }

    pub fn as_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.temperature,
            self.humidity,
            self.hour,
            self.day,
            self.month,
            self.reactive_power,
            self.voltage,
            self.intensity,
        ]
    }
}

/// Scaler + classifier pair, loaded once at dashboard startup.
#[derive(Debug, Clone)]
pub struct AnomalyEvaluator {
    scaler: StandardScaler,
    model: AnomalyModel,
}

impl AnomalyEvaluator {
    /// Load both artifacts. Failure here is fatal for the dashboard:
    /// there is no meaningful anomaly section without them.
    pub fn load(scaler_path: &Path, model_path: &Path) -> anyhow::Result<Self> {
        Ok(Self {
            scaler: StandardScaler::load(scaler_path)?,
            model: AnomalyModel::load(model_path)?,
        })
    }

    pub fn from_parts(scaler: StandardScaler, model: AnomalyModel) -> Self {
        Self { scaler, model }
    }

    pub fn evaluate(&self, state: &LatestReadings) -> Result<Verdict, EvalError> {
        self.evaluate_at(state, Local::now())
    }

    pub fn evaluate_at(
        &self,
        state: &LatestReadings,
        now: DateTime<Local>,
    ) -> Result<Verdict, EvalError> {
        let Some(features) = FeatureVector::assemble(state, now) else {
            return Ok(Verdict::Insufficient);
        };

        let scaled = self.scaler.transform(&features.as_array())?;
        let label = self.model.predict(&scaled)?;
        debug!("Anomaly prediction: {label} for features {features:?}");

        Ok(if label == 1 {
            Verdict::Anomalous
        } else {
            Verdict::Normal
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn identity_evaluator() -> AnomalyEvaluator {
        AnomalyEvaluator::from_parts(
            StandardScaler {
                mean: vec![0.0; FEATURE_COUNT],
                scale: vec![1.0; FEATURE_COUNT],
            },
            AnomalyModel {
                // Fires on the intensity column alone.
                coefficients: vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0],
                intercept: -10.0,
            },
        )
    }

    fn full_state(energy: f64) -> LatestReadings {
        let mut state = LatestReadings::new();
        state.apply(KIND_ENERGY.into(), energy);
        state.apply(KIND_TEMPERATURE.into(), 19.0);
        state.apply(KIND_HUMIDITY.into(), 70.0);
        state
    }

    fn fixed_now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 15, 14, 0, 0).unwrap()
    }

    #[test]
    fn assemble_uses_fixed_placeholders_and_intensity_proxy() {
        let features = FeatureVector::assemble(&full_state(2.0), fixed_now()).unwrap();
        assert_eq!(features.intensity, 8.0);
        assert_eq!(features.reactive_power, 0.1);
        assert_eq!(features.voltage, 230.0);
        assert_eq!(features.hour, 14.0);
        assert_eq!(features.day, 15.0);
        assert_eq!(features.month, 3.0);
    }

    #[test]
    fn assemble_requires_all_three_kinds() {
        let mut state = LatestReadings::new();
        state.apply(KIND_ENERGY.into(), 1.0);
        state.apply(KIND_TEMPERATURE.into(), 20.0);
        assert!(FeatureVector::assemble(&state, fixed_now()).is_none());
    }

    #[test]
    fn evaluate_is_insufficient_until_all_kinds_arrive() {
        let evaluator = identity_evaluator();
        let mut state = LatestReadings::new();
        assert_eq!(
            evaluator.evaluate_at(&state, fixed_now()).unwrap(),
            Verdict::Insufficient
        );

        state.apply(KIND_HUMIDITY.into(), 65.0);
        assert_eq!(
            evaluator.evaluate_at(&state, fixed_now()).unwrap(),
            Verdict::Insufficient
        );
    }

    #[test]
    fn evaluate_classifies_once_state_is_complete() {
        let evaluator = identity_evaluator();

        // intensity = 1.0 * 4 = 4.0, below the decision threshold of 10
        assert_eq!(
            evaluator.evaluate_at(&full_state(1.0), fixed_now()).unwrap(),
            Verdict::Normal
        );

        // intensity = 5.0 * 4 = 20.0
        assert_eq!(
            evaluator.evaluate_at(&full_state(5.0), fixed_now()).unwrap(),
            Verdict::Anomalous
        );
    }

    #[test]
    fn shape_mismatch_is_an_eval_error_not_a_panic() {
        let evaluator = AnomalyEvaluator::from_parts(
            StandardScaler {
                mean: vec![0.0; 2],
                scale: vec![1.0; 2],
            },
            AnomalyModel {
                coefficients: vec![0.0; FEATURE_COUNT],
                intercept: 0.0,
            },
        );
        let err = evaluator
            .evaluate_at(&full_state(1.0), fixed_now())
            .unwrap_err();
        assert!(matches!(err, EvalError::ShapeMismatch { .. }));
    }
}
