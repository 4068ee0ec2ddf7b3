use std::sync::Arc;

use futures_util::future::join_all;
use herald_bridge::{
    MessageFromEngine, feed::ScanReport, notification::SourceKind, signal::ReloadReason,
};

use crate::app::{AppContext, EngineMessage};
use crate::ports::{CandidateSource, NotificationRepository};
use crate::services::{
    creator::{Creation, ensure_notification_for_event},
    reload_service,
};

/// Runs the idempotent creator over every candidate event of the selected
/// sources. Candidate lists are fetched concurrently; creations run one after
/// another.
pub async fn scan_sources(
    repository: &dyn NotificationRepository,
    sources: &[Arc<dyn CandidateSource>],
    only: Option<SourceKind>,
) -> ScanReport {
    let selected = sources
        .iter()
        .filter(|source| only.is_none_or(|kind| source.source_kind() == kind));
    let listings = join_all(selected.map(|source| async move {
        (source.source_kind(), source.list_candidates().await)
    }))
    .await;

    let mut report = ScanReport::default();
    for (kind, listing) in listings {
        report.sources.push(kind);
        let candidates = match listing {
            Ok(candidates) => candidates,
            Err(error) => {
                log::warn!("Failed to list {kind} candidates: {error}");
                report.failed += 1;
                continue;
            }
        };

        log::debug!("Found {} {kind} candidate(s)", candidates.len());
        for event in &candidates {
            match ensure_notification_for_event(repository, event).await {
                Ok(Creation::Created(_)) => report.created += 1,
                Ok(Creation::Existing(_)) => report.existing += 1,
                Err(error) => {
                    log::warn!("Failed to ensure notification for {kind} {}: {error}", event.source.id);
                    report.failed += 1;
                }
            }
        }
    }
    report
}

/// Widens a queued scan scope so it also covers `only`.
fn merge_scope(queued: Option<Option<SourceKind>>, only: Option<SourceKind>) -> Option<SourceKind> {
    match queued {
        None => only,
        Some(queued) if queued == only => queued,
        Some(_) => None,
    }
}

/// Handles an incoming scan request (see
/// [`herald_bridge::MessageToEngine::ScanSources`]). Only one scan runs at a
/// time; requests arriving meanwhile are merged into a single follow-up scan.
pub(crate) fn handle_scan_request(context: &mut AppContext, only: Option<SourceKind>) {
    if context.state.scan_in_flight {
        let scope = merge_scope(context.state.pending_scan.take(), only);
        log::debug!("A source scan is already running, queueing a follow-up for {scope:?}");
        context.state.pending_scan = Some(scope);
        return;
    }
    context.state.scan_in_flight = true;

    let repository = context.deps.notifications.clone();
    let sources = context.deps.sources.clone();
    context.spawn_request(async move {
        EngineMessage::ScanFinished(scan_sources(repository.as_ref(), &sources, only).await)
    });
}

pub(crate) fn handle_scan_finished(context: &mut AppContext, report: ScanReport) {
    context.state.scan_in_flight = false;
    log::info!(
        "Source scan finished: {} created, {} existing, {} failed",
        report.created,
        report.existing,
        report.failed
    );

    let created = report.created;
    context.emit(MessageFromEngine::ScanFinished(report));
    if created > 0 {
        reload_service::schedule(context, ReloadReason::CreationSignal);
    }
    if let Some(scope) = context.state.pending_scan.take() {
        handle_scan_request(context, scope);
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::Utc;
    use herald_bridge::notification::SourceEvent;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::RepositoryError;
    use crate::memory::{InMemoryContactMessages, InMemoryNotificationRepository, InMemorySubscribers};
    use crate::sources::{ContactMessage, Subscriber};

    struct BrokenSource;

    #[async_trait]
    impl CandidateSource for BrokenSource {
        fn source_kind(&self) -> SourceKind {
            SourceKind::Subscriber
        }

        async fn list_candidates(&self) -> Result<Vec<SourceEvent>, RepositoryError> {
            Err(RepositoryError::Unavailable("timeout".to_string()))
        }
    }

    fn contact(id: &str) -> ContactMessage {
        ContactMessage {
            id: id.to_string(),
            name: None,
            subject: None,
            is_read: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn queued_scopes_widen_to_every_source() {
        let contacts = Some(SourceKind::ContactMessage);
        assert_eq!(merge_scope(None, contacts), contacts);
        assert_eq!(merge_scope(Some(contacts), contacts), contacts);
        assert_eq!(merge_scope(Some(contacts), Some(SourceKind::Subscriber)), None);
        assert_eq!(merge_scope(Some(None), contacts), None);
        assert_eq!(merge_scope(Some(contacts), None), None);
    }

    #[tokio::test]
    async fn rescanning_creates_nothing_new() {
        let repository = InMemoryNotificationRepository::new();
        let messages = Arc::new(InMemoryContactMessages::default());
        let subscribers = Arc::new(InMemorySubscribers::new(
            std::time::Duration::from_secs(24 * 60 * 60),
            None,
        ));
        messages.push(contact("1"));
        messages.push(contact("2"));
        subscribers.push(Subscriber {
            id: "s-1".to_string(),
            whatsapp_number: Some("+100200300".to_string()),
            telegram_username: None,
            subscribed_at: Utc::now(),
        });
        let sources: Vec<Arc<dyn CandidateSource>> = vec![messages, subscribers];

        let first = scan_sources(&repository, &sources, None).await;
        assert_eq!(first.created, 3);
        assert_eq!(first.existing, 0);

        let second = scan_sources(&repository, &sources, None).await;
        assert_eq!(second.created, 0);
        assert_eq!(second.existing, 3);
        assert_eq!(repository.list().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn scan_can_target_one_source_and_survives_failures() {
        let repository = InMemoryNotificationRepository::new();
        let messages = Arc::new(InMemoryContactMessages::default());
        messages.push(contact("1"));
        let sources: Vec<Arc<dyn CandidateSource>> = vec![messages, Arc::new(BrokenSource)];

        let only_contacts = scan_sources(&repository, &sources, Some(SourceKind::ContactMessage)).await;
        assert_eq!(only_contacts.sources, vec![SourceKind::ContactMessage]);
        assert_eq!(only_contacts.created, 1);

        let everything = scan_sources(&repository, &sources, None).await;
        assert_eq!(everything.existing, 1);
        assert_eq!(everything.failed, 1);
    }
}
