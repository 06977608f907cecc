use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use gridpulse::{
    anomaly::AnomalyEvaluator, dashboard::render_loop, db::Database, live, settings::Settings,
};

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

    log::info!("GridPulse dashboard starting up...");

    let settings = Settings::load(&settings_path())?;

    // Artifacts load before anything renders; without them there is no
    // meaningful anomaly section, so failure here is fatal.
    let evaluator = AnomalyEvaluator::load(&settings.scaler_path, &settings.model_path)
        .context("model or scaler artifact failed to load; export artifacts from training first")?;

    let db = Database::new(settings.db_path.clone())?;

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Ctrl-C received; stopping dashboard");
            signal_token.cancel();
        }
    });

    let (sender, updates) = live::channel();
    let feed = {
        let settings = settings.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let result = live::feed(settings, sender, cancel.clone()).await;
            // A fatal feed error must also stop the render loop.
            if result.is_err() {
                cancel.cancel();
            }
            result
        })
    };

    render_loop(db, evaluator, updates, &settings, cancel.clone()).await;

    cancel.cancel();
    feed.await
        .context("live feed task panicked")?
        .context("live feed failed")?;

    Ok(())
}
