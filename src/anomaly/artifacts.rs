//! Pre-trained artifacts, exported as JSON by the training pipeline and
//! treated as opaque here: a standard scaler and a logistic classifier.
//! Both are loaded once at dashboard startup; a missing or unreadable
//! artifact is fatal because the anomaly section cannot render without
//! them.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::EvalError;

/// Number of inputs the classifier was trained on.
pub const FEATURE_COUNT: usize = 8;

/// Z-score normalization fitted during training: `(x - mean) / scale`
/// per column.
#[derive(Debug, Clone, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read scaler artifact {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("invalid scaler artifact {}", path.display()))
    }

    pub fn transform(
        &self,
        features: &[f64; FEATURE_COUNT],
    ) -> Result<[f64; FEATURE_COUNT], EvalError> {
        if self.mean.len() != FEATURE_COUNT {
            return Err(EvalError::ShapeMismatch {
                expected: FEATURE_COUNT,
                got: self.mean.len(),
            });
        }
        if self.scale.len() != FEATURE_COUNT {
            return Err(EvalError::ShapeMismatch {
                expected: FEATURE_COUNT,
                got: self.scale.len(),
            });
        }

        let mut scaled = [0.0; FEATURE_COUNT];
        for (i, value) in features.iter().enumerate() {
            if self.scale[i] == 0.0 {
                return Err(EvalError::DegenerateScale(i));
            }
            scaled[i] = (value - self.mean[i]) / self.scale[i];
        }
        Ok(scaled)
    }
}

/// Logistic classifier over scaled features. The decision rule is the
/// standard 0.5 threshold, i.e. label 1 exactly when `w . x + b >= 0`.
#[derive(Debug, Clone, Deserialize)]
pub struct AnomalyModel {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl AnomalyModel {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read model artifact {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("invalid model artifact {}", path.display()))
    }

    /// Binary label: 1 = anomalous consumption, 0 = normal.
    pub fn predict(&self, features: &[f64; FEATURE_COUNT]) -> Result<u8, EvalError> {
        if self.coefficients.len() != FEATURE_COUNT {
            return Err(EvalError::ShapeMismatch {
                expected: FEATURE_COUNT,
                got: self.coefficients.len(),
            });
        }

        let score: f64 = self
            .coefficients
            .iter()
            .zip(features.iter())
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.intercept;

        Ok(u8::from(score >= 0.0))
    }
}
