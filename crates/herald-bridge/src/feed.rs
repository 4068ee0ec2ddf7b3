use std::fmt;

use crate::notification::{Notification, NotificationId, SourceKind, badge_label};

/// Consumer-visible state of the feed: authoritative data with pending local
/// edits applied, ordered newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedSnapshot {
    pub notifications: Vec<Notification>,
    /// Whether at least one authoritative load has completed.
    pub loaded: bool,
}

impl FeedSnapshot {
    pub fn list(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn unread_count(&self) -> usize {
        self.notifications.iter().filter(|n| !n.is_read).count()
    }

    /// Newest unread notifications, at most `limit` of them.
    pub fn latest_unread(&self, limit: usize) -> Vec<&Notification> {
        self.notifications
            .iter()
            .filter(|n| !n.is_read)
            .take(limit)
            .collect()
    }

    pub fn badge(&self) -> Option<String> {
        badge_label(self.unread_count())
    }

    pub fn get(&self, id: &NotificationId) -> Option<&Notification> {
        self.notifications.iter().find(|n| &n.id == id)
    }
}

/// A user-initiated change to the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    MarkRead(NotificationId),
    MarkAllRead,
    Delete(NotificationId),
    /// Deletes every notification that is read at the moment of invocation.
    ClearRead,
    /// Deletes every notification visible at the moment of invocation.
    ClearAll,
}

impl Mutation {
    /// Whether the mutation targets a set of notifications rather than one.
    pub fn is_batch(&self) -> bool {
        matches!(self, Self::MarkAllRead | Self::ClearRead | Self::ClearAll)
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MarkRead(id) => write!(f, "mark notification {id} as read"),
            Self::MarkAllRead => f.write_str("mark all notifications as read"),
            Self::Delete(id) => write!(f, "delete notification {id}"),
            Self::ClearRead => f.write_str("clear read notifications"),
            Self::ClearAll => f.write_str("clear all notifications"),
        }
    }
}

/// Outcome of a scan of upstream sources for events lacking a notification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Source kinds that were scanned.
    pub sources: Vec<SourceKind>,
    /// Notifications created by this scan.
    pub created: usize,
    /// Candidates that already had a notification.
    pub existing: usize,
    /// Candidates or sources that could not be processed.
    pub failed: usize,
}

/// Lifecycle of the engine. Transitions only move forward through
/// `Stopped -> Starting -> Running -> Stopping -> Stopped`, except that a
/// failed start falls back from `Starting` to `Stopped`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Lifecycle {
    #[default]
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl Lifecycle {
    pub fn can_transition_to(self, next: Lifecycle) -> bool {
        matches!(
            (self, next),
            (Self::Stopped, Self::Starting)
                | (Self::Starting, Self::Running)
                | (Self::Starting, Self::Stopped)
                | (Self::Running, Self::Stopping)
                | (Self::Stopping, Self::Stopped)
        )
    }

    pub fn is_running(self) -> bool {
        self == Self::Running
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::notification::NotificationKind;

    fn notification(id: &str, is_read: bool) -> Notification {
        Notification {
            id: NotificationId::from(id),
            title: format!("title {id}"),
            message: String::new(),
            kind: NotificationKind::Info,
            is_read,
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            source: None,
        }
    }

    #[test]
    fn latest_unread_skips_read_items() {
        let snapshot = FeedSnapshot {
            notifications: vec![
                notification("a", true),
                notification("b", false),
                notification("c", false),
                notification("d", false),
            ],
            loaded: true,
        };

        let ids: Vec<_> = snapshot
            .latest_unread(2)
            .into_iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(ids, ["b", "c"]);
        assert_eq!(snapshot.unread_count(), 3);
        assert_eq!(snapshot.badge().as_deref(), Some("3"));
        assert!(snapshot.get(&NotificationId::from("a")).is_some_and(|n| n.is_read));
        assert_eq!(snapshot.get(&NotificationId::from("z")), None);
    }

    #[test]
    fn lifecycle_rejects_skipping_states() {
        assert!(Lifecycle::Stopped.can_transition_to(Lifecycle::Starting));
        assert!(Lifecycle::Starting.can_transition_to(Lifecycle::Stopped));
        assert!(!Lifecycle::Stopped.can_transition_to(Lifecycle::Running));
        assert!(!Lifecycle::Running.can_transition_to(Lifecycle::Starting));
        assert!(!Lifecycle::Stopping.can_transition_to(Lifecycle::Running));
    }
}
