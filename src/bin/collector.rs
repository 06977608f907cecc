use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use gridpulse::{db::Database, ingest, settings::Settings};

fn settings_path() -> PathBuf {
    std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("gridpulse.json"))
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("GridPulse collector starting up...");

    let settings = Settings::load(&settings_path())?;
    let db = Database::new(settings.db_path.clone())?;

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Ctrl-C received; stopping collector");
            signal_token.cancel();
        }
    });

    ingest::run(&settings, db, cancel)
        .await
        .context("ingestion failed")?;

    Ok(())
}
