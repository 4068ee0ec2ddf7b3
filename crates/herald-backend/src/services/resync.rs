use std::time::Duration;

use herald_bridge::signal::ReloadReason;
use tokio::{
    sync::mpsc::Sender,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};

use crate::app::EngineMessage;

/// Fixed-interval timer that requests a periodic reload, bounding how stale
/// the feed can get when change signals go missing.
#[derive(Debug)]
pub struct PeriodicResync {
    period: Duration,
    task: Option<JoinHandle<()>>,
}

impl PeriodicResync {
    /// Starts ticking one `period` from now. A zero period disables the
    /// timer.
    pub(crate) fn start(period: Duration, tx: Sender<EngineMessage>) -> Option<Self> {
        if period.is_zero() {
            log::warn!("Periodic resync is disabled");
            return None;
        }

        let task = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                log::debug!("Periodic resync tick");
                let signal = EngineMessage::Signal {
                    reason: ReloadReason::Periodic,
                    source: None,
                };
                if tx.send(signal).await.is_err() {
                    break;
                }
            }
        });

        Some(Self {
            period,
            task: Some(task),
        })
    }

    /// Cancels the timer and waits until it is gone.
    pub async fn stop(mut self) {
        log::debug!("Stopping the {:?} resync timer", self.period);
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
    }
}

impl Drop for PeriodicResync {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}
