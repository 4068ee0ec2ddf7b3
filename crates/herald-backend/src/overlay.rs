//! Optimistic mutation overlay.
//!
//! Local edits are recorded here the moment the consumer issues them and are
//! layered over the authoritative notifications until a reload confirms them
//! or the mutation request fails. Per notification the lifecycle is
//!
//! ```text
//! Confirmed(old) -> PendingLocalEdit -> Confirmed(new) | Reverted(old)
//! ```
//!
//! Only `PendingLocalEdit` lives in the overlay; every other state is owned
//! by the store.

use std::collections::HashMap;
use std::time::Duration;

use herald_bridge::{
    feed::Mutation,
    notification::{Notification, NotificationId},
};
use tokio::time::Instant;

/// Identifier of one issued mutation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MutationId(u64);

/// The state a pending entry forces onto its notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingEdit {
    Read,
    Deleted,
}

#[derive(Debug, Clone)]
pub struct OverlayEntry {
    pub notification_id: NotificationId,
    pub edit: PendingEdit,
    pub submitted_at: Instant,
    pub mutation: MutationId,
    /// Set once the mutation request succeeded.
    pub acknowledged: bool,
}

/// A mutation whose request has not completed yet.
#[derive(Debug, Clone)]
pub struct PendingMutation {
    pub mutation: Mutation,
    pub edit: PendingEdit,
    pub ids: Vec<NotificationId>,
}

/// What a reload did to the overlay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Entries whose edit the authoritative data now reflects.
    pub confirmed: usize,
    /// Entries whose notification no longer exists.
    pub dropped: usize,
    /// Acknowledged entries that outlived the overlay TTL.
    pub expired: usize,
}

/// Resolves a mutation against the currently visible notifications into the
/// edit to apply and the exact set of ids it targets. Returns `None` when
/// there is nothing to do.
pub fn plan(mutation: &Mutation, view: &[Notification]) -> Option<(PendingEdit, Vec<NotificationId>)> {
    let ids: Vec<NotificationId> = match mutation {
        Mutation::MarkRead(id) => view
            .iter()
            .filter(|n| &n.id == id && !n.is_read)
            .map(|n| n.id.clone())
            .collect(),
        Mutation::MarkAllRead => view
            .iter()
            .filter(|n| !n.is_read)
            .map(|n| n.id.clone())
            .collect(),
        Mutation::Delete(id) => view
            .iter()
            .filter(|n| &n.id == id)
            .map(|n| n.id.clone())
            .collect(),
        Mutation::ClearRead => view
            .iter()
            .filter(|n| n.is_read)
            .map(|n| n.id.clone())
            .collect(),
        Mutation::ClearAll => view.iter().map(|n| n.id.clone()).collect(),
    };
    if ids.is_empty() {
        return None;
    }

    let edit = match mutation {
        Mutation::MarkRead(_) | Mutation::MarkAllRead => PendingEdit::Read,
        Mutation::Delete(_) | Mutation::ClearRead | Mutation::ClearAll => PendingEdit::Deleted,
    };
    Some((edit, ids))
}

#[derive(Debug, Default)]
pub struct Overlay {
    entries: HashMap<NotificationId, OverlayEntry>,
    in_flight: HashMap<MutationId, PendingMutation>,
    next_mutation: u64,
}

impl Overlay {
    /// Records a pending edit for every id and returns the identifier of the
    /// mutation request that carries it. A newer edit of the same
    /// notification replaces the older entry.
    pub fn record(
        &mut self,
        mutation: Mutation,
        edit: PendingEdit,
        ids: Vec<NotificationId>,
        now: Instant,
    ) -> MutationId {
        self.next_mutation += 1;
        let mutation_id = MutationId(self.next_mutation);

        for id in &ids {
            self.entries.insert(
                id.clone(),
                OverlayEntry {
                    notification_id: id.clone(),
                    edit,
                    submitted_at: now,
                    mutation: mutation_id,
                    acknowledged: false,
                },
            );
        }
        self.in_flight
            .insert(mutation_id, PendingMutation { mutation, edit, ids });
        mutation_id
    }

    /// Marks the entries of a successful mutation as acknowledged. They stay
    /// in place until a reload shows the matching state.
    pub fn acknowledge(&mut self, mutation_id: MutationId) -> Option<PendingMutation> {
        let pending = self.in_flight.remove(&mutation_id)?;
        for entry in self.entries.values_mut() {
            if entry.mutation == mutation_id {
                entry.acknowledged = true;
            }
        }
        Some(pending)
    }

    /// Drops the entries of a failed mutation so the affected notifications
    /// fall back to their authoritative state. Entries already superseded by
    /// a newer edit are left alone.
    pub fn revert(&mut self, mutation_id: MutationId) -> Option<PendingMutation> {
        let pending = self.in_flight.remove(&mutation_id)?;
        self.entries.retain(|_, entry| entry.mutation != mutation_id);
        Some(pending)
    }

    /// Settles entries against freshly loaded authoritative data.
    pub fn reconcile(
        &mut self,
        authoritative: &[Notification],
        now: Instant,
        ttl: Duration,
    ) -> ReconcileOutcome {
        let mut outcome = ReconcileOutcome::default();
        self.entries.retain(|id, entry| {
            let Some(current) = authoritative.iter().find(|n| &n.id == id) else {
                outcome.dropped += 1;
                return false;
            };
            if !entry.acknowledged {
                return true;
            }
            if entry.edit == PendingEdit::Read && current.is_read {
                outcome.confirmed += 1;
                return false;
            }
            if now.saturating_duration_since(entry.submitted_at) >= ttl {
                outcome.expired += 1;
                return false;
            }
            true
        });
        outcome
    }

    /// Applies pending entries over authoritative notifications, keeping
    /// their order.
    pub fn project(&self, authoritative: &[Notification]) -> Vec<Notification> {
        authoritative
            .iter()
            .filter_map(|notification| match self.entries.get(&notification.id) {
                Some(entry) if entry.edit == PendingEdit::Deleted => None,
                Some(_) => Some(Notification {
                    is_read: true,
                    ..notification.clone()
                }),
                None => Some(notification.clone()),
            })
            .collect()
    }

    pub fn entry(&self, id: &NotificationId) -> Option<&OverlayEntry> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}
