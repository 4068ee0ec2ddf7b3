use herald_bridge::notification::{NewNotification, Notification, SourceEvent};

use crate::error::RepositoryError;
use crate::ports::NotificationRepository;

/// Result of [`ensure_notification_for_event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Creation {
    /// No notification existed for the event; this one was inserted.
    Created(Notification),
    /// A notification for the event already existed and was left unchanged.
    Existing(Notification),
}

impl Creation {
    pub fn notification(&self) -> &Notification {
        match self {
            Self::Created(notification) | Self::Existing(notification) => notification,
        }
    }

    pub fn into_notification(self) -> Notification {
        match self {
            Self::Created(notification) | Self::Existing(notification) => notification,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Makes sure exactly one notification exists for an upstream event.
///
/// The existence check runs before every insert, so repeated deliveries of the
/// same event are no-ops. When a concurrent writer wins the race between the
/// check and the insert, the repository's uniqueness constraint rejects the
/// second insert and the winner's record is returned instead.
///
/// Storage errors are returned to the caller and are retryable; nothing is
/// cached locally.
pub async fn ensure_notification_for_event(
    repository: &dyn NotificationRepository,
    event: &SourceEvent,
) -> Result<Creation, RepositoryError> {
    let source = &event.source;
    if let Some(existing) = repository.find_for_source(&source.id, source.kind).await? {
        log::debug!("Notification already exists for {} {}", source.kind, source.id);
        return Ok(Creation::Existing(existing));
    }

    match repository.insert(NewNotification::from(event)).await {
        Ok(created) => {
            log::info!(
                "Created notification {} for {} {}",
                created.id,
                source.kind,
                source.id
            );
            Ok(Creation::Created(created))
        }
        Err(RepositoryError::Conflict(reason)) => {
            log::debug!("Lost creation race for {} {}: {reason}", source.kind, source.id);
            repository
                .find_for_source(&source.id, source.kind)
                .await?
                .map(Creation::Existing)
                .ok_or(RepositoryError::Conflict(reason))
        }
        Err(error) => Err(error),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use herald_bridge::notification::{NotificationId, NotificationKind, SourceKind, SourceRef};

    use super::*;
    use crate::memory::InMemoryNotificationRepository;

    /// Counts inserts and can hide existing records from the first lookup,
    /// which reproduces a check-then-insert race.
    #[derive(Default)]
    struct CountingRepository {
        inner: InMemoryNotificationRepository,
        inserts: AtomicUsize,
        stale_first_lookup: AtomicBool,
        unavailable: AtomicBool,
    }

    #[async_trait]
    impl NotificationRepository for CountingRepository {
        async fn list(&self) -> Result<Vec<Notification>, RepositoryError> {
            self.inner.list().await
        }

        async fn insert(&self, draft: NewNotification) -> Result<Notification, RepositoryError> {
            self.inserts.fetch_add(1, Ordering::SeqCst);
            self.inner.insert(draft).await
        }

        async fn update_read_status(
            &self,
            ids: &[NotificationId],
            is_read: bool,
        ) -> Result<(), RepositoryError> {
            self.inner.update_read_status(ids, is_read).await
        }

        async fn delete_by_ids(&self, ids: &[NotificationId]) -> Result<(), RepositoryError> {
            self.inner.delete_by_ids(ids).await
        }

        async fn find_for_source(
            &self,
            source_id: &str,
            source_kind: SourceKind,
        ) -> Result<Option<Notification>, RepositoryError> {
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(RepositoryError::Unavailable("connection reset".to_string()));
            }
            if self.stale_first_lookup.swap(false, Ordering::SeqCst) {
                return Ok(None);
            }
            self.inner.find_for_source(source_id, source_kind).await
        }
    }

    fn contact_event(id: &str) -> SourceEvent {
        SourceEvent {
            source: SourceRef::new(id, SourceKind::ContactMessage),
            title: "New message".to_string(),
            message: "...".to_string(),
            kind: NotificationKind::Contact,
        }
    }

    #[tokio::test]
    async fn creates_unread_notification_for_new_event() {
        let repository = CountingRepository::default();

        let creation = ensure_notification_for_event(&repository, &contact_event("42"))
            .await
            .unwrap();

        assert!(creation.was_created());
        let notification = creation.notification();
        assert!(!notification.is_read);
        assert_eq!(notification.title, "New message");
        assert_eq!(
            notification.source,
            Some(SourceRef::new("42", SourceKind::ContactMessage))
        );
    }

    #[tokio::test]
    async fn repeated_calls_return_the_same_notification() {
        let repository = CountingRepository::default();
        let event = contact_event("42");

        let mut ids = Vec::new();
        for _ in 0..5 {
            let creation = ensure_notification_for_event(&repository, &event).await.unwrap();
            ids.push(creation.into_notification().id);
        }

        assert_eq!(repository.inserts.load(Ordering::SeqCst), 1);
        assert!(ids.iter().all(|id| id == &ids[0]));
        assert_eq!(repository.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn lost_race_resolves_to_existing_record() {
        let repository = CountingRepository::default();
        let first = ensure_notification_for_event(&repository, &contact_event("42"))
            .await
            .unwrap()
            .into_notification();

        repository.stale_first_lookup.store(true, Ordering::SeqCst);
        let second = ensure_notification_for_event(&repository, &contact_event("42"))
            .await
            .unwrap();

        assert_eq!(second, Creation::Existing(first));
        assert_eq!(repository.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn storage_errors_are_reported() {
        let repository = CountingRepository::default();
        repository.unavailable.store(true, Ordering::SeqCst);

        let result = ensure_notification_for_event(&repository, &contact_event("42")).await;

        assert!(matches!(result, Err(RepositoryError::Unavailable(_))));
        assert_eq!(repository.inserts.load(Ordering::SeqCst), 0);
    }
}
