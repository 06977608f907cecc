use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const KIND_ENERGY: &str = "energy";
pub const KIND_TEMPERATURE: &str = "temperature";
pub const KIND_HUMIDITY: &str = "humidity";

/// One sensor observation, as decoded off the bus.
///
/// `observed_at` is assigned at receipt (ingestion time, not producer
/// time). Immutable once created; it is either persisted or queued for
/// the dashboard, never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reading {
    pub sensor_kind: String,
    pub value: f64,
    pub observed_at: DateTime<Utc>,
}

/// A [`Reading`] plus its row identity in the durable store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredReading {
    pub id: i64,
    pub sensor_kind: String,
    pub value: f64,
    pub observed_at: DateTime<Utc>,
}
