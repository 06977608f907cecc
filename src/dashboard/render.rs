//! Terminal render loop: the stand-in for a host UI's redraw cycle.
//!
//! Each tick builds one frame and prints its sections. A failed cycle
//! (store unavailable) is logged and the loop keeps ticking; the next
//! refresh gets a fresh chance.

use log::{debug, error, info};
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::anomaly::AnomalyEvaluator;
use crate::db::Database;
use crate::live::{LatestReadings, LiveUpdates};
use crate::settings::Settings;

use super::{build_frame, AnomalySection, DashboardFrame, UsageSection};

pub async fn render_loop(
    db: Database,
    evaluator: AnomalyEvaluator,
    updates: LiveUpdates,
    settings: &Settings,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(Duration::from_secs(settings.refresh_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut state = LatestReadings::new();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match build_frame(&db, &evaluator, &updates, &mut state, settings.chart_limit).await {
                    Ok(frame) => {
                        debug!("Refresh applied {} live updates", frame.drained);
                        print_frame(&frame);
                    }
                    Err(err) => error!("Refresh cycle failed: {err}"),
                }
            }
            _ = cancel.cancelled() => {
                info!("Render loop shutting down");
                break;
            }
        }
    }
}

fn print_frame(frame: &DashboardFrame) {
    println!("== Energy Usage ==");
    match &frame.usage {
        UsageSection::Series(rows) => {
            // Rows arrive newest-first; the headline is the latest one.
            let latest = &rows[0];
            println!(
                "Latest: {:.2} kW at {} ({} points charted)",
                latest.value,
                latest.observed_at.format("%Y-%m-%d %H:%M:%S"),
                rows.len()
            );
        }
        UsageSection::NoData => println!("No energy data available."),
    }

    println!("== Anomaly Alerts ==");
    match &frame.anomaly {
        AnomalySection::Alert => {
            println!("High consumption detected! Consider reducing appliance usage.")
        }
        AnomalySection::AllClear => println!("No anomalies detected."),
        AnomalySection::Waiting => println!("Waiting for sensor data..."),
        AnomalySection::Warning(message) => println!("Prediction error: {message}"),
    }

    println!("== Weather ==");
    let marker = if frame.weather.simulated {
        " (simulated)"
    } else {
        ""
    };
    println!("Temperature: {:.2}\u{b0}C{marker}", frame.weather.temperature);
    println!("Humidity: {:.2}%{marker}", frame.weather.humidity);
    println!();
}
