use herald_bridge::{feed::Mutation, notification::Notice, signal::ReloadReason};
use tokio::time::Instant;

use crate::app::{AppContext, EngineMessage};
use crate::error::RepositoryError;
use crate::overlay::{self, MutationId, PendingEdit};
use crate::services::reload_service;

/// Handles a local edit (see [`herald_bridge::MessageToEngine::Mutate`]).
///
/// The edit is applied to the visible feed immediately and the matching
/// repository request is sent in the background. Target sets are resolved
/// now, so a notification that becomes read after a `ClearRead` was issued is
/// not deleted by it.
pub(crate) fn handle_mutation(context: &mut AppContext, mutation: Mutation) {
    let view = context.state.view();
    let Some((edit, ids)) = overlay::plan(&mutation, &view) else {
        log::debug!("Nothing to do for `{mutation}`");
        return;
    };

    log::info!("Applying `{mutation}` to {} notification(s)", ids.len());
    let mutation_id = context
        .state
        .overlay
        .record(mutation, edit, ids.clone(), Instant::now());
    context.publish_view();

    let repository = context.deps.notifications.clone();
    context.spawn_request(async move {
        let result = match edit {
            PendingEdit::Read => repository.update_read_status(&ids, true).await,
            PendingEdit::Deleted => repository.delete_by_ids(&ids).await,
        };
        EngineMessage::MutationFinished {
            mutation: mutation_id,
            result,
        }
    });
}

/// Settles a completed mutation request. Success keeps the local edit until a
/// reload confirms it; failure reverts it and tells the consumer. A failed
/// batch also reloads, since the store may have applied part of it.
pub(crate) fn handle_mutation_finished(
    context: &mut AppContext,
    mutation_id: MutationId,
    result: Result<(), RepositoryError>,
) {
    match result {
        Ok(()) => {
            if let Some(pending) = context.state.overlay.acknowledge(mutation_id) {
                log::debug!("`{}` acknowledged by the store", pending.mutation);
            }
        }
        Err(error) => {
            let Some(pending) = context.state.overlay.revert(mutation_id) else {
                return;
            };
            log::error!("Failed to {}: {error}", pending.mutation);
            context.publish_view();
            context.notify(Notice::error(format!("Failed to {}: {error}", pending.mutation)));

            if pending.mutation.is_batch() {
                reload_service::schedule(context, ReloadReason::Recovery);
            }
        }
    }
}
