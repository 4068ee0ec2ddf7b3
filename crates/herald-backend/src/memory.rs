//! In-memory implementations of the engine's collaborators.
//!
//! They behave like a small realtime-enabled database: every write publishes
//! a change signal on the shared [`InMemoryChangeChannel`], and the
//! notification table enforces uniqueness of `(source id, source kind)`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use herald_bridge::{
    NOTIFICATIONS_TABLE,
    notification::{NewNotification, Notification, NotificationId, SourceEvent, SourceKind},
    signal::{ChangeEventType, ChangeSignal},
};
use tokio::sync::mpsc;

use crate::error::RepositoryError;
use crate::ports::{CandidateSource, ChangeChannel, ChangeSubscription, NotificationRepository};
use crate::sources::{ContactMessage, Subscriber};

const SUBSCRIPTION_BUFFER: usize = 32;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Registration {
    table: String,
    event: ChangeEventType,
    tx: mpsc::Sender<ChangeSignal>,
}

/// Process-local change-signal channel.
#[derive(Default)]
pub struct InMemoryChangeChannel {
    registrations: Mutex<Vec<Registration>>,
}

impl InMemoryChangeChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers a signal to every live subscription matching the table and
    /// change type. Signals for a subscriber whose buffer is full are dropped.
    pub fn publish(&self, table: &str, event: ChangeEventType, record_id: Option<String>) {
        let mut registrations = lock(&self.registrations);
        registrations.retain(|registration| !registration.tx.is_closed());

        let signal = ChangeSignal {
            table: table.to_string(),
            event,
            record_id,
        };
        for registration in registrations.iter() {
            if registration.table == table && registration.event.matches(event) {
                if registration.tx.try_send(signal.clone()).is_err() {
                    log::warn!("Dropping `{table}` change signal for a saturated subscriber");
                }
            }
        }
    }

    /// Number of subscriptions that are still held by someone.
    pub fn subscriber_count(&self) -> usize {
        let mut registrations = lock(&self.registrations);
        registrations.retain(|registration| !registration.tx.is_closed());
        registrations.len()
    }
}

#[async_trait]
impl ChangeChannel for InMemoryChangeChannel {
    async fn subscribe(
        &self,
        table: &str,
        event: ChangeEventType,
    ) -> Result<ChangeSubscription, RepositoryError> {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        lock(&self.registrations).push(Registration {
            table: table.to_string(),
            event,
            tx,
        });
        Ok(ChangeSubscription::new(rx))
    }
}

/// Notification table kept in memory.
#[derive(Default)]
pub struct InMemoryNotificationRepository {
    records: Mutex<Vec<Notification>>,
    changes: Option<Arc<InMemoryChangeChannel>>,
}

impl InMemoryNotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository that publishes its writes on `changes`.
    pub fn with_changes(changes: Arc<InMemoryChangeChannel>) -> Self {
        Self {
            records: Mutex::default(),
            changes: Some(changes),
        }
    }

    /// Stores records as-is, bypassing creation rules. Meant for fixtures.
    pub fn seed(&self, notifications: impl IntoIterator<Item = Notification>) {
        lock(&self.records).extend(notifications);
    }

    fn publish(&self, event: ChangeEventType, id: &NotificationId) {
        if let Some(changes) = &self.changes {
            changes.publish(NOTIFICATIONS_TABLE, event, Some(id.to_string()));
        }
    }
}

#[async_trait]
impl NotificationRepository for InMemoryNotificationRepository {
    async fn list(&self) -> Result<Vec<Notification>, RepositoryError> {
        let mut notifications = lock(&self.records).clone();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(notifications)
    }

    async fn insert(&self, draft: NewNotification) -> Result<Notification, RepositoryError> {
        let notification = {
            let mut records = lock(&self.records);
            if let Some(source) = &draft.source {
                if records.iter().any(|n| n.source.as_ref() == Some(source)) {
                    return Err(RepositoryError::Conflict(format!(
                        "notification for {} {} already exists",
                        source.kind, source.id
                    )));
                }
            }

            let notification = Notification {
                id: NotificationId::new(uuid::Uuid::new_v4().to_string()),
                title: draft.title,
                message: draft.message,
                kind: draft.kind,
                is_read: false,
                created_at: Utc::now(),
                source: draft.source,
            };
            records.push(notification.clone());
            notification
        };

        self.publish(ChangeEventType::Insert, &notification.id);
        Ok(notification)
    }

    async fn update_read_status(
        &self,
        ids: &[NotificationId],
        is_read: bool,
    ) -> Result<(), RepositoryError> {
        let changed: Vec<NotificationId> = {
            let mut records = lock(&self.records);
            records
                .iter_mut()
                .filter(|n| ids.contains(&n.id) && n.is_read != is_read)
                .map(|n| {
                    n.is_read = is_read;
                    n.id.clone()
                })
                .collect()
        };

        for id in &changed {
            self.publish(ChangeEventType::Update, id);
        }
        Ok(())
    }

    async fn delete_by_ids(&self, ids: &[NotificationId]) -> Result<(), RepositoryError> {
        let removed: Vec<NotificationId> = {
            let mut records = lock(&self.records);
            let (removed, kept): (Vec<Notification>, Vec<Notification>) =
                records.drain(..).partition(|n| ids.contains(&n.id));
            *records = kept;
            removed.into_iter().map(|n| n.id).collect()
        };

        for id in &removed {
            self.publish(ChangeEventType::Delete, id);
        }
        Ok(())
    }

    async fn find_for_source(
        &self,
        source_id: &str,
        source_kind: SourceKind,
    ) -> Result<Option<Notification>, RepositoryError> {
        Ok(lock(&self.records)
            .iter()
            .find(|n| {
                n.source
                    .as_ref()
                    .is_some_and(|s| s.id == source_id && s.kind == source_kind)
            })
            .cloned())
    }
}

/// Contact form inbox kept in memory.
#[derive(Default)]
pub struct InMemoryContactMessages {
    messages: Mutex<Vec<ContactMessage>>,
    changes: Option<Arc<InMemoryChangeChannel>>,
}

impl InMemoryContactMessages {
    pub fn with_changes(changes: Arc<InMemoryChangeChannel>) -> Self {
        Self {
            messages: Mutex::default(),
            changes: Some(changes),
        }
    }

    pub fn push(&self, message: ContactMessage) {
        let id = message.id.clone();
        lock(&self.messages).push(message);
        if let Some(changes) = &self.changes {
            changes.publish(
                SourceKind::ContactMessage.table(),
                ChangeEventType::Insert,
                Some(id),
            );
        }
    }
}

#[async_trait]
impl CandidateSource for InMemoryContactMessages {
    fn source_kind(&self) -> SourceKind {
        SourceKind::ContactMessage
    }

    async fn list_candidates(&self) -> Result<Vec<SourceEvent>, RepositoryError> {
        Ok(lock(&self.messages)
            .iter()
            .filter(|m| m.is_candidate())
            .map(ContactMessage::to_source_event)
            .collect())
    }
}

/// Registrant list kept in memory.
pub struct InMemorySubscribers {
    subscribers: Mutex<Vec<Subscriber>>,
    lookback: chrono::Duration,
    changes: Option<Arc<InMemoryChangeChannel>>,
}

impl InMemorySubscribers {
    pub fn new(lookback: std::time::Duration, changes: Option<Arc<InMemoryChangeChannel>>) -> Self {
        Self {
            subscribers: Mutex::default(),
            lookback: chrono::Duration::from_std(lookback).unwrap_or(chrono::Duration::MAX),
            changes,
        }
    }

    pub fn push(&self, subscriber: Subscriber) {
        let id = subscriber.id.clone();
        lock(&self.subscribers).push(subscriber);
        if let Some(changes) = &self.changes {
            changes.publish(
                SourceKind::Subscriber.table(),
                ChangeEventType::Insert,
                Some(id),
            );
        }
    }
}

#[async_trait]
impl CandidateSource for InMemorySubscribers {
    fn source_kind(&self) -> SourceKind {
        SourceKind::Subscriber
    }

    async fn list_candidates(&self) -> Result<Vec<SourceEvent>, RepositoryError> {
        let now = Utc::now();
        Ok(lock(&self.subscribers)
            .iter()
            .filter(|s| s.is_candidate(now, self.lookback))
            .map(Subscriber::to_source_event)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use herald_bridge::notification::{NotificationKind, SourceRef};

    use super::*;

    fn draft(source_id: &str) -> NewNotification {
        NewNotification {
            title: "New contact message".to_string(),
            message: "Message from visitor: no subject".to_string(),
            kind: NotificationKind::Contact,
            source: Some(SourceRef::new(source_id, SourceKind::ContactMessage)),
        }
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_source() {
        let repository = InMemoryNotificationRepository::new();
        repository.insert(draft("42")).await.expect("first insert");

        let duplicate = repository.insert(draft("42")).await;
        assert!(matches!(duplicate, Err(RepositoryError::Conflict(_))));
        assert_eq!(repository.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn existence_is_keyed_by_source_id_and_kind() {
        let repository = InMemoryNotificationRepository::new();
        repository.insert(draft("42")).await.unwrap();

        assert!(repository.exists_for_source("42", SourceKind::ContactMessage).await.unwrap());
        assert!(!repository.exists_for_source("42", SourceKind::Subscriber).await.unwrap());
        assert!(!repository.exists_for_source("43", SourceKind::ContactMessage).await.unwrap());
    }

    #[tokio::test]
    async fn writes_publish_change_signals() {
        let changes = Arc::new(InMemoryChangeChannel::new());
        let repository = InMemoryNotificationRepository::with_changes(changes.clone());
        let mut all = changes
            .subscribe(NOTIFICATIONS_TABLE, ChangeEventType::Any)
            .await
            .unwrap();
        let mut updates = changes
            .subscribe(NOTIFICATIONS_TABLE, ChangeEventType::Update)
            .await
            .unwrap();

        let created = repository.insert(draft("1")).await.unwrap();
        repository
            .update_read_status(&[created.id.clone()], true)
            .await
            .unwrap();
        repository.delete_by_ids(&[created.id.clone()]).await.unwrap();

        let events: Vec<_> = [
            all.recv().await.unwrap(),
            all.recv().await.unwrap(),
            all.recv().await.unwrap(),
        ]
        .into_iter()
        .map(|signal| signal.event)
        .collect();
        assert_eq!(
            events,
            [
                ChangeEventType::Insert,
                ChangeEventType::Update,
                ChangeEventType::Delete
            ]
        );
        assert_eq!(updates.recv().await.unwrap().record_id, Some(created.id.to_string()));
    }

    #[tokio::test]
    async fn dropped_subscriptions_are_released() {
        let changes = InMemoryChangeChannel::new();
        let subscription = changes
            .subscribe("contact_messages", ChangeEventType::Insert)
            .await
            .unwrap();
        assert_eq!(changes.subscriber_count(), 1);

        drop(subscription);
        assert_eq!(changes.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn read_contact_messages_are_not_candidates() {
        let messages = InMemoryContactMessages::default();
        for (id, is_read) in [("1", false), ("2", true)] {
            messages.push(ContactMessage {
                id: id.to_string(),
                name: Some("Amina".to_string()),
                subject: Some("Question".to_string()),
                is_read,
                created_at: Utc::now(),
            });
        }

        let candidates = messages.list_candidates().await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].message, "Message from Amina: Question");
    }
}
