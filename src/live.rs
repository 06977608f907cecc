//! Live update channel between the bus task and the render loop.
//!
//! The bus connection runs on its own task and must never block while
//! servicing keep-alives, so producers push into an unbounded mpsc queue.
//! The render loop is the single consumer: once per refresh cycle it
//! drains everything queued so far, non-blockingly, and folds the items
//! into [`LatestReadings`] in arrival order.

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use log::{info, warn};
use tokio_util::sync::CancellationToken;

use crate::bus::BusSubscriber;
use crate::error::ConnectError;
use crate::settings::Settings;

/// Producer half. Cloneable; any number of bus tasks may push.
#[derive(Clone)]
pub struct LiveSender {
    tx: Sender<(String, f64)>,
}

impl LiveSender {
    /// Never blocks. A push after the consumer is gone is dropped with a
    /// warning; that only happens during shutdown.
    pub fn push(&self, sensor_kind: String, value: f64) {
        if self.tx.send((sensor_kind, value)).is_err() {
            warn!("Live channel consumer is gone; dropping update");
        }
    }
}

/// Consumer half. Exactly one exists; items are handed off, not broadcast.
pub struct LiveUpdates {
    rx: Receiver<(String, f64)>,
}

impl LiveUpdates {
    /// Drain everything queued so far into `state`, in arrival order.
    /// Returns the number of items applied. Never blocks: an empty
    /// channel (or one whose producers have all gone) yields zero.
    pub fn drain_into(&self, state: &mut LatestReadings) -> usize {
        let mut applied = 0;
        loop {
            match self.rx.try_recv() {
                Ok((kind, value)) => {
                    state.apply(kind, value);
                    applied += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        applied
    }
}

pub fn channel() -> (LiveSender, LiveUpdates) {
    let (tx, rx) = mpsc::channel();
    (LiveSender { tx }, LiveUpdates { rx })
}

/// Most recently observed value per sensor kind, as seen on the live
/// channel. Owned and mutated exclusively by the render thread after
/// draining, so it needs no locking. Lives for the dashboard session;
/// never persisted.
#[derive(Debug, Default)]
pub struct LatestReadings {
    values: HashMap<String, f64>,
}

impl LatestReadings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, sensor_kind: String, value: f64) {
        self.values.insert(sensor_kind, value);
    }

    pub fn get(&self, sensor_kind: &str) -> Option<f64> {
        self.values.get(sensor_kind).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// The dashboard's own bus subscription: pushes every decoded reading
/// into the live channel as a `(kind, value)` pair. Fatal only when the
/// initial connect fails; otherwise runs until cancelled, and always
/// disconnects on the way out.
pub async fn feed(
    settings: Settings,
    sender: LiveSender,
    cancel: CancellationToken,
) -> Result<(), ConnectError> {
    let mut bus = BusSubscriber::connect(&settings, "gridpulse-dashboard");
    let result = feed_loop(&mut bus, &sender, &cancel).await;
    bus.disconnect().await;
    result
}

async fn feed_loop(
    bus: &mut BusSubscriber,
    sender: &LiveSender,
    cancel: &CancellationToken,
) -> Result<(), ConnectError> {
    loop {
        tokio::select! {
            reading = bus.next_reading() => {
                let reading = reading?;
                sender.push(reading.sensor_kind, reading.value);
            }
            _ = cancel.cancelled() => {
                info!("Live feed shutting down");
                return Ok(());
            }
        }
    }
}
