use herald_bridge::{
    notification::{Notice, Notification},
    signal::ReloadReason,
};
use tokio::time::Instant;

use crate::app::{AppContext, EngineMessage};
use crate::error::RepositoryError;

/// Requests a reload for `reason`. The request is dropped when the tag's
/// debounce window has not elapsed since its last executed reload.
pub(crate) fn schedule(context: &mut AppContext, reason: ReloadReason) {
    if context.state.reconciler.admit(reason, Instant::now()) {
        start_reload(context, reason);
    }
}

fn start_reload(context: &mut AppContext, reason: ReloadReason) {
    let seq = context.state.store.begin_reload();
    log::debug!("Starting {reason} reload #{seq}");

    let repository = context.deps.notifications.clone();
    context.spawn_request(async move {
        let result = repository.list().await;
        EngineMessage::ReloadFinished {
            seq,
            reason,
            result,
        }
    });
}

/// Applies a reload response: replaces the authoritative set, settles the
/// overlay against it and publishes the merged feed. Superseded responses and
/// failures leave the current feed untouched.
pub(crate) fn handle_reload_finished(
    context: &mut AppContext,
    seq: u64,
    reason: ReloadReason,
    result: Result<Vec<Notification>, RepositoryError>,
) {
    let notifications = match result {
        Ok(notifications) => notifications,
        Err(error) => {
            if !context.state.store.is_latest(seq) {
                log::debug!("Ignoring failure of superseded reload #{seq}: {error}");
                return;
            }
            log::warn!("The {reason} reload #{seq} failed, keeping the last known feed: {error}");
            if reason == ReloadReason::Manual {
                context.notify(Notice::warning(format!(
                    "Failed to refresh notifications: {error}"
                )));
            }
            return;
        }
    };

    let count = notifications.len();
    if !context.state.store.accept(seq, notifications) {
        log::debug!("Discarding stale reload #{seq}");
        return;
    }

    let outcome = context.state.overlay.reconcile(
        context.state.store.authoritative(),
        Instant::now(),
        context.config.overlay_ttl(),
    );
    log::debug!(
        "Applied {reason} reload #{seq} with {count} notifications ({outcome:?}, {} edits pending)",
        context.state.overlay.len()
    );
    context.publish_view();
}
