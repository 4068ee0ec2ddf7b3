//! Interfaces of the external collaborators the engine consumes.
//!
//! The engine never talks to a data store directly: reads and writes of
//! notification records go through [`NotificationRepository`], upstream
//! business events come from [`CandidateSource`]s and change signals from a
//! [`ChangeChannel`]. In-memory and PostgREST implementations live in
//! [`crate::memory`] and [`crate::rest`].

use async_trait::async_trait;
use herald_bridge::{
    notification::{NewNotification, Notification, NotificationId, SourceEvent, SourceKind},
    signal::{ChangeEventType, ChangeSignal},
};
use tokio::sync::mpsc;

use crate::error::RepositoryError;

/// Authoritative storage of notification records.
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Returns every notification currently stored.
    async fn list(&self) -> Result<Vec<Notification>, RepositoryError>;

    /// Inserts a new unread notification and returns the stored record.
    async fn insert(&self, draft: NewNotification) -> Result<Notification, RepositoryError>;

    async fn update_read_status(
        &self,
        ids: &[NotificationId],
        is_read: bool,
    ) -> Result<(), RepositoryError>;

    async fn delete_by_ids(&self, ids: &[NotificationId]) -> Result<(), RepositoryError>;

    /// Returns the notification created for the given upstream event, if any.
    async fn find_for_source(
        &self,
        source_id: &str,
        source_kind: SourceKind,
    ) -> Result<Option<Notification>, RepositoryError>;

    /// Whether a notification was already created for the given upstream
    /// event.
    async fn exists_for_source(
        &self,
        source_id: &str,
        source_kind: SourceKind,
    ) -> Result<bool, RepositoryError> {
        Ok(self.find_for_source(source_id, source_kind).await?.is_some())
    }
}

/// One category of upstream business events (e.g. unread inbound messages).
#[async_trait]
pub trait CandidateSource: Send + Sync {
    fn source_kind(&self) -> SourceKind;

    /// Events that may still need a notification.
    async fn list_candidates(&self) -> Result<Vec<SourceEvent>, RepositoryError>;
}

/// Live subscription to table changes. Dropping it unsubscribes.
#[derive(Debug)]
pub struct ChangeSubscription {
    rx: mpsc::Receiver<ChangeSignal>,
}

impl ChangeSubscription {
    pub fn new(rx: mpsc::Receiver<ChangeSignal>) -> Self {
        Self { rx }
    }

    /// Waits for the next signal. Returns `None` once the channel closed the
    /// subscription.
    pub async fn recv(&mut self) -> Option<ChangeSignal> {
        self.rx.recv().await
    }
}

/// Source of near-real-time "something changed" signals.
#[async_trait]
pub trait ChangeChannel: Send + Sync {
    async fn subscribe(
        &self,
        table: &str,
        event: ChangeEventType,
    ) -> Result<ChangeSubscription, RepositoryError>;
}
