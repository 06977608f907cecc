//! Dashboard frame building: what each section shows on one refresh.
//!
//! A frame is pure data; rendering it is the host's concern (here, the
//! terminal render loop in [`render`]). No state survives between cycles
//! except [`LatestReadings`] and whatever the store persisted.

mod render;

use log::error;

use crate::anomaly::{AnomalyEvaluator, Verdict};
use crate::db::Database;
use crate::error::StoreError;
use crate::live::{LatestReadings, LiveUpdates};
use crate::models::{StoredReading, KIND_ENERGY, KIND_HUMIDITY, KIND_TEMPERATURE};

pub use render::render_loop;

pub const SIMULATED_TEMPERATURE: f64 = 22.0;
pub const SIMULATED_HUMIDITY: f64 = 65.0;

/// Usage chart data: newest-first energy rows, or an explicit no-data
/// marker (never an empty chart).
#[derive(Debug)]
pub enum UsageSection {
    Series(Vec<StoredReading>),
    NoData,
}

/// Exactly one of four mutually exclusive anomaly states per cycle.
#[derive(Debug, PartialEq)]
pub enum AnomalySection {
    Alert,
    AllClear,
    Waiting,
    Warning(String),
}

#[derive(Debug, PartialEq)]
pub struct WeatherSection {
    pub temperature: f64,
    pub humidity: f64,
    /// True when the values are the fixed placeholders, not live data.
    pub simulated: bool,
}

#[derive(Debug)]
pub struct DashboardFrame {
    pub usage: UsageSection,
    pub anomaly: AnomalySection,
    pub weather: WeatherSection,
    /// Live-channel items applied this cycle.
    pub drained: usize,
}

/// One refresh cycle: drain the live channel, query the store for chart
/// data, evaluate anomalies. Store failures propagate; evaluation
/// failures degrade to a warning section.
pub async fn build_frame(
    db: &Database,
    evaluator: &AnomalyEvaluator,
    updates: &LiveUpdates,
    state: &mut LatestReadings,
    chart_limit: u32,
) -> Result<DashboardFrame, StoreError> {
    let drained = updates.drain_into(state);

    let rows = db.recent_readings(KIND_ENERGY, chart_limit).await?;
    let usage = if rows.is_empty() {
        UsageSection::NoData
    } else {
        UsageSection::Series(rows)
    };

    let anomaly = match evaluator.evaluate(state) {
        Ok(Verdict::Anomalous) => AnomalySection::Alert,
        Ok(Verdict::Normal) => AnomalySection::AllClear,
        Ok(Verdict::Insufficient) => AnomalySection::Waiting,
        Err(err) => {
            error!("Anomaly evaluation failed: {err}");
            AnomalySection::Warning(err.to_string())
        }
    };

    let weather = match (state.get(KIND_TEMPERATURE), state.get(KIND_HUMIDITY)) {
        (Some(temperature), Some(humidity)) => WeatherSection {
            temperature,
            humidity,
            simulated: false,
        },
        _ => WeatherSection {
            temperature: SIMULATED_TEMPERATURE,
            humidity: SIMULATED_HUMIDITY,
            simulated: true,
        },
    };

    Ok(DashboardFrame {
        usage,
        anomaly,
        weather,
        drained,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::{AnomalyModel, StandardScaler, FEATURE_COUNT};
    use crate::live;
    use crate::models::Reading;
    use chrono::Utc;

    fn evaluator() -> AnomalyEvaluator {
        AnomalyEvaluator::from_parts(
            StandardScaler {
                mean: vec![0.0; FEATURE_COUNT],
                scale: vec![1.0; FEATURE_COUNT],
            },
            AnomalyModel {
                coefficients: vec![0.0; FEATURE_COUNT],
                intercept: -1.0,
            },
        )
    }

    fn temp_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("frames.db")).unwrap();
        (dir, db)
    }

    #[tokio::test]
    async fn empty_store_and_channel_renders_no_data_and_waiting() {
        let (_dir, db) = temp_db();
        let (_tx, updates) = live::channel();
        let mut state = LatestReadings::new();

        let frame = build_frame(&db, &evaluator(), &updates, &mut state, 10)
            .await
            .unwrap();

        assert!(matches!(frame.usage, UsageSection::NoData));
        assert_eq!(frame.anomaly, AnomalySection::Waiting);
        assert!(frame.weather.simulated);
        assert_eq!(frame.weather.temperature, SIMULATED_TEMPERATURE);
        assert_eq!(frame.weather.humidity, SIMULATED_HUMIDITY);
        assert_eq!(frame.drained, 0);
    }

    #[tokio::test]
    async fn live_updates_flow_into_weather_and_verdict() {
        let (_dir, db) = temp_db();
        let (tx, updates) = live::channel();
        let mut state = LatestReadings::new();

        tx.push("temperature".into(), 19.0);
        tx.push("humidity".into(), 70.0);
        tx.push("energy".into(), 2.0);

        let frame = build_frame(&db, &evaluator(), &updates, &mut state, 10)
            .await
            .unwrap();

        assert_eq!(frame.drained, 3);
        // Intercept of -1 with zero coefficients always scores negative.
        assert_eq!(frame.anomaly, AnomalySection::AllClear);
        assert_eq!(
            frame.weather,
            WeatherSection {
                temperature: 19.0,
                humidity: 70.0,
                simulated: false
            }
        );
    }

    #[tokio::test]
    async fn persisted_energy_rows_feed_the_usage_chart() {
        let (_dir, db) = temp_db();
        let (_tx, updates) = live::channel();
        let mut state = LatestReadings::new();

        db.insert_reading(&Reading {
            sensor_kind: "energy".into(),
            value: 3.5,
            observed_at: Utc::now(),
        })
        .await
        .unwrap();

        let frame = build_frame(&db, &evaluator(), &updates, &mut state, 10)
            .await
            .unwrap();

        match frame.usage {
            UsageSection::Series(rows) => {
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0].value, 3.5);
            }
            UsageSection::NoData => panic!("expected chart data"),
        }
    }

    #[tokio::test]
    async fn eval_fault_degrades_to_warning_section() {
        let (_dir, db) = temp_db();
        let (tx, updates) = live::channel();
        let mut state = LatestReadings::new();

        tx.push("temperature".into(), 19.0);
        tx.push("humidity".into(), 70.0);
        tx.push("energy".into(), 2.0);

        let broken = AnomalyEvaluator::from_parts(
            StandardScaler {
                mean: vec![0.0; 2],
                scale: vec![1.0; 2],
            },
            AnomalyModel {
                coefficients: vec![0.0; FEATURE_COUNT],
                intercept: 0.0,
            },
        );

        let frame = build_frame(&db, &broken, &updates, &mut state, 10)
            .await
            .unwrap();
        assert!(matches!(frame.anomaly, AnomalySection::Warning(_)));
    }
}
