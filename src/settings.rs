use std::{fs, path::Path, path::PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Runtime configuration shared by the collector and dashboard binaries.
///
/// Loaded from a JSON file when one exists, otherwise every field falls
/// back to the defaults below (a local broker and a database file in the
/// working directory). Nothing mutates settings after startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub broker_host: String,
    pub broker_port: u16,
    pub subscribe_topic: String,
    pub db_path: PathBuf,
    pub scaler_path: PathBuf,
    pub model_path: PathBuf,
    pub chart_limit: u32,
    pub refresh_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            broker_host: "localhost".into(),
            broker_port: 1883,
            subscribe_topic: "sensors/#".into(),
            db_path: PathBuf::from("energy_data.db"),
            scaler_path: PathBuf::from("artifacts/scaler.json"),
            model_path: PathBuf::from("artifacts/model.json"),
            chart_limit: 100,
            refresh_secs: 5,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("invalid settings file {}", path.display()))
    }
}
