use herald_bridge::{config::WatcherBinding, notification::SourceKind, signal::ReloadReason};
use tokio::{sync::mpsc::Sender, task::JoinHandle};

use crate::app::{AppContext, EngineMessage};
use crate::error::RepositoryError;
use crate::ports::ChangeChannel;
use crate::services::{reload_service, scan_service};

/// A live subscription to one upstream change category that forwards every
/// delivered signal into the engine.
///
/// The subscription is held by the forwarding task, so releasing the watcher
/// unsubscribes. Dropping it without [`WatcherHandle::release`] aborts the
/// task as well, only without waiting for it.
#[derive(Debug)]
pub struct WatcherHandle {
    binding: WatcherBinding,
    task: Option<JoinHandle<()>>,
}

impl WatcherHandle {
    pub(crate) async fn spawn(
        changes: &dyn ChangeChannel,
        binding: WatcherBinding,
        tx: Sender<EngineMessage>,
    ) -> Result<Self, RepositoryError> {
        let mut subscription = changes.subscribe(&binding.table, binding.event).await?;
        log::debug!(
            "Watching `{}` {:?} changes as {}",
            binding.table,
            binding.event,
            binding.reason
        );

        let (table, reason, source) = (binding.table.clone(), binding.reason, binding.source);
        let task = tokio::spawn(async move {
            while let Some(signal) = subscription.recv().await {
                log::debug!("Change on `{table}`: {:?} {:?}", signal.event, signal.record_id);
                if tx.send(EngineMessage::Signal { reason, source }).await.is_err() {
                    break;
                }
            }
            log::debug!("Watcher for `{table}` finished");
        });

        Ok(Self {
            binding,
            task: Some(task),
        })
    }

    /// Cancels the forwarding task and waits until its subscription is gone.
    pub async fn release(mut self) {
        log::debug!("Releasing watcher for `{}`", self.binding.table);
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}

/// Handles a signal from a watcher or the resync timer. With client-side
/// creation enabled, upstream signals scan their source first; the scan
/// schedules the reload once it created something.
pub(crate) fn handle_signal(
    context: &mut AppContext,
    reason: ReloadReason,
    source: Option<SourceKind>,
) {
    match source {
        Some(kind) if context.config.client_side_creation => {
            scan_service::handle_scan_request(context, Some(kind));
        }
        _ => reload_service::schedule(context, reason),
    }
}
