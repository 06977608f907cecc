//! Ingestion loop: bus -> decode -> durable store.
//!
//! Runs until cancelled. Per-message failures (a bad payload, a single
//! failed insert) are isolated: log and keep consuming. Only a failed
//! connection setup is fatal.

use log::{error, info};
use tokio_util::sync::CancellationToken;

use crate::bus::BusSubscriber;
use crate::db::Database;
use crate::error::ConnectError;
use crate::settings::Settings;

pub async fn run(
    settings: &Settings,
    db: Database,
    cancel: CancellationToken,
) -> Result<(), ConnectError> {
    let mut bus = BusSubscriber::connect(settings, "gridpulse-collector");
    let result = ingest_loop(&mut bus, &db, &cancel).await;
    // Disconnect must run even when we are bailing out on an error.
    bus.disconnect().await;
    result
}

async fn ingest_loop(
    bus: &mut BusSubscriber,
    db: &Database,
    cancel: &CancellationToken,
) -> Result<(), ConnectError> {
    loop {
        tokio::select! {
            reading = bus.next_reading() => {
                let reading = reading?;
                match db.insert_reading(&reading).await {
                    Ok(()) => info!(
                        "Stored: {} {} = {}",
                        reading.observed_at, reading.sensor_kind, reading.value
                    ),
                    Err(err) => error!(
                        "Failed to persist {} reading: {err}",
                        reading.sensor_kind
                    ),
                }
            }
            _ = cancel.cancelled() => {
                info!("Ingestion loop shutting down");
                return Ok(());
            }
        }
    }
}
