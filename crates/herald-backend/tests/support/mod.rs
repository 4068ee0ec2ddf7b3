//! Shared fixtures for engine scenario tests.

#![allow(dead_code)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use herald_backend::{
    EngineDeps,
    error::RepositoryError,
    memory::InMemoryChangeChannel,
    ports::{CandidateSource, ChangeChannel, ChangeSubscription, NotificationRepository},
};
use herald_bridge::{
    feed::FeedSnapshot,
    notification::{
        NewNotification, Notification, NotificationId, NotificationKind, SourceEvent, SourceKind,
    },
    signal::ChangeEventType,
};
use tokio::sync::watch;

pub fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 10, minute, 0).unwrap()
}

pub fn notification(id: &str, minute: u32, is_read: bool) -> Notification {
    Notification {
        id: NotificationId::new(id),
        title: format!("Notification {id}"),
        message: "Something happened".to_string(),
        kind: NotificationKind::Info,
        is_read,
        created_at: at(minute),
        source: None,
    }
}

pub fn ids(notifications: &[Notification]) -> Vec<&str> {
    notifications.iter().map(|n| n.id.as_str()).collect()
}

/// Lets every spawned task run to completion. With a paused clock the sleep
/// only finishes once the runtime has nothing else to do.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

pub async fn wait_for_feed(
    feed: &mut watch::Receiver<FeedSnapshot>,
    predicate: impl FnMut(&FeedSnapshot) -> bool,
) -> FeedSnapshot {
    tokio::time::timeout(Duration::from_secs(5), feed.wait_for(predicate))
        .await
        .expect("feed did not reach the expected state")
        .expect("engine stopped")
        .clone()
}

/// Repository wrapper that counts calls and injects failures or delays.
pub struct FaultyRepository {
    inner: Arc<dyn NotificationRepository>,
    pub fail_list: AtomicBool,
    pub fail_update: AtomicBool,
    pub fail_delete: AtomicBool,
    list_calls: AtomicUsize,
    deleted: Mutex<Vec<Vec<NotificationId>>>,
    gate: watch::Sender<bool>,
}

impl FaultyRepository {
    pub fn new(inner: Arc<dyn NotificationRepository>) -> Self {
        Self {
            inner,
            fail_list: AtomicBool::new(false),
            fail_update: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
            list_calls: AtomicUsize::new(0),
            deleted: Mutex::default(),
            gate: watch::Sender::new(true),
        }
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Id batches passed to `delete_by_ids`, in call order.
    pub fn deleted(&self) -> Vec<Vec<NotificationId>> {
        self.deleted.lock().unwrap().clone()
    }

    /// While closed, `list` reads its data and then waits, so the response
    /// it eventually returns may be stale.
    pub fn close_list_gate(&self) {
        self.gate.send_replace(false);
    }

    pub fn open_list_gate(&self) {
        self.gate.send_replace(true);
    }

    fn injected(flag: &AtomicBool) -> Result<(), RepositoryError> {
        if flag.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("injected failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationRepository for FaultyRepository {
    async fn list(&self) -> Result<Vec<Notification>, RepositoryError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let result = self.inner.list().await;
        let mut gate = self.gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;
        Self::injected(&self.fail_list)?;
        result
    }

    async fn insert(&self, draft: NewNotification) -> Result<Notification, RepositoryError> {
        self.inner.insert(draft).await
    }

    async fn update_read_status(
        &self,
        ids: &[NotificationId],
        is_read: bool,
    ) -> Result<(), RepositoryError> {
        Self::injected(&self.fail_update)?;
        self.inner.update_read_status(ids, is_read).await
    }

    async fn delete_by_ids(&self, ids: &[NotificationId]) -> Result<(), RepositoryError> {
        self.deleted.lock().unwrap().push(ids.to_vec());
        Self::injected(&self.fail_delete)?;
        self.inner.delete_by_ids(ids).await
    }

    async fn find_for_source(
        &self,
        source_id: &str,
        source_kind: SourceKind,
    ) -> Result<Option<Notification>, RepositoryError> {
        self.inner.find_for_source(source_id, source_kind).await
    }
}

/// Candidate source that takes `delay` to list its candidates.
pub struct SlowSource {
    pub inner: Arc<dyn CandidateSource>,
    pub delay: Duration,
}

#[async_trait]
impl CandidateSource for SlowSource {
    fn source_kind(&self) -> SourceKind {
        self.inner.source_kind()
    }

    async fn list_candidates(&self) -> Result<Vec<SourceEvent>, RepositoryError> {
        tokio::time::sleep(self.delay).await;
        self.inner.list_candidates().await
    }
}

/// Change channel that refuses subscriptions to one table.
pub struct RefusingChannel {
    pub inner: Arc<InMemoryChangeChannel>,
    pub refused_table: String,
}

#[async_trait]
impl ChangeChannel for RefusingChannel {
    async fn subscribe(
        &self,
        table: &str,
        event: ChangeEventType,
    ) -> Result<ChangeSubscription, RepositoryError> {
        if table == self.refused_table {
            return Err(RepositoryError::Unavailable("realtime disabled".to_string()));
        }
        self.inner.subscribe(table, event).await
    }
}

pub fn deps(
    notifications: Arc<dyn NotificationRepository>,
    sources: Vec<Arc<dyn CandidateSource>>,
    changes: Arc<dyn ChangeChannel>,
) -> EngineDeps {
    EngineDeps {
        notifications,
        sources,
        changes,
    }
}
