//! Consumer handle to a running engine.

use herald_bridge::{
    MessageFromEngine, MessageToEngine,
    feed::{FeedSnapshot, Lifecycle, Mutation},
    notification::{Notification, NotificationId, SourceKind},
};
use tokio::sync::{broadcast, mpsc::Sender, watch};

use crate::error::EngineError;

/// Cheaply cloneable handle through which views read the feed and issue
/// commands. Commands return once the engine has accepted them; their
/// effect shows up in the feed and, on failure, as a
/// [`MessageFromEngine::Notice`].
#[derive(Debug, Clone)]
pub struct FeedClient {
    tx: Sender<MessageToEngine>,
    events: broadcast::Sender<MessageFromEngine>,
    feed: watch::Receiver<FeedSnapshot>,
    lifecycle: watch::Receiver<Lifecycle>,
}

impl FeedClient {
    pub(crate) fn new(
        tx: Sender<MessageToEngine>,
        events: broadcast::Sender<MessageFromEngine>,
        feed: watch::Receiver<FeedSnapshot>,
        lifecycle: watch::Receiver<Lifecycle>,
    ) -> Self {
        Self {
            tx,
            events,
            feed,
            lifecycle,
        }
    }

    /// The current merged feed.
    pub fn snapshot(&self) -> FeedSnapshot {
        self.feed.borrow().clone()
    }

    pub fn list(&self) -> Vec<Notification> {
        self.feed.borrow().notifications.clone()
    }

    pub fn unread_count(&self) -> usize {
        self.feed.borrow().unread_count()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        *self.lifecycle.borrow()
    }

    /// Subscribes to engine events emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<MessageFromEngine> {
        self.events.subscribe()
    }

    /// A receiver that wakes on every published feed change.
    pub fn watch_feed(&self) -> watch::Receiver<FeedSnapshot> {
        self.feed.clone()
    }

    pub fn watch_lifecycle(&self) -> watch::Receiver<Lifecycle> {
        self.lifecycle.clone()
    }

    pub async fn mark_read(&self, id: impl Into<NotificationId>) -> Result<(), EngineError> {
        self.mutate(Mutation::MarkRead(id.into())).await
    }

    pub async fn mark_all_read(&self) -> Result<(), EngineError> {
        self.mutate(Mutation::MarkAllRead).await
    }

    pub async fn delete_one(&self, id: impl Into<NotificationId>) -> Result<(), EngineError> {
        self.mutate(Mutation::Delete(id.into())).await
    }

    /// Deletes the notifications that are read right now. Ones marked read
    /// afterwards are kept.
    pub async fn clear_read(&self) -> Result<(), EngineError> {
        self.mutate(Mutation::ClearRead).await
    }

    pub async fn clear_all(&self) -> Result<(), EngineError> {
        self.mutate(Mutation::ClearAll).await
    }

    /// Requests a reload now, bypassing any debounce.
    pub async fn refresh(&self) -> Result<(), EngineError> {
        self.send(MessageToEngine::Refresh).await
    }

    /// Creates missing notifications for upstream events of `only`, or of
    /// every source when `None`.
    pub async fn scan_sources(&self, only: Option<SourceKind>) -> Result<(), EngineError> {
        self.send(MessageToEngine::ScanSources(only)).await
    }

    pub async fn mutate(&self, mutation: Mutation) -> Result<(), EngineError> {
        self.send(MessageToEngine::Mutate(mutation)).await
    }

    pub(crate) async fn request_shutdown(&self) -> Result<(), EngineError> {
        self.send(MessageToEngine::Shutdown).await
    }

    /// Best effort variant of [`Self::request_shutdown`] for use in `Drop`.
    pub(crate) fn try_request_shutdown(&self) {
        let _ = self.tx.try_send(MessageToEngine::Shutdown);
    }

    async fn send(&self, message: MessageToEngine) -> Result<(), EngineError> {
        self.tx.send(message).await.map_err(|_| EngineError::Closed)
    }
}
