use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque identifier of a notification, assigned by the repository at
/// creation time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(transparent)]
pub struct NotificationId(String);

impl NotificationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NotificationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Category of a notification, determining how the feed presents it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// Neutral informational message.
    Info,
    /// A successful operation or positive outcome.
    Success,
    /// A non-critical issue the admin should be aware of.
    Warning,
    /// A failure that may need attention.
    Error,
    /// A new inbound contact message.
    Contact,
    /// A new registrant.
    Subscriber,
    /// Any category this client does not know.
    #[serde(other)]
    Other,
}

/// Display attributes of a [`NotificationKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindDescriptor {
    /// Short human readable label.
    pub label: &'static str,
    /// Icon name understood by the presentation layer.
    pub icon: &'static str,
    /// Accent color name understood by the presentation layer.
    pub accent: &'static str,
}

impl NotificationKind {
    pub fn descriptor(self) -> KindDescriptor {
        match self {
            Self::Info => KindDescriptor {
                label: "Info",
                icon: "bell",
                accent: "blue",
            },
            Self::Success => KindDescriptor {
                label: "Success",
                icon: "check",
                accent: "green",
            },
            Self::Warning => KindDescriptor {
                label: "Warning",
                icon: "bell",
                accent: "amber",
            },
            Self::Error => KindDescriptor {
                label: "Error",
                icon: "bell",
                accent: "red",
            },
            Self::Contact => KindDescriptor {
                label: "Contact message",
                icon: "message-square",
                accent: "purple",
            },
            Self::Subscriber => KindDescriptor {
                label: "New subscriber",
                icon: "user-plus",
                accent: "teal",
            },
            Self::Other => KindDescriptor {
                label: "Notification",
                icon: "bell",
                accent: "gray",
            },
        }
    }
}

/// Kind of upstream business event a notification can be derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    ContactMessage,
    Subscriber,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ContactMessage => "contact_message",
            Self::Subscriber => "subscriber",
        }
    }

    /// Parses the stored name of a source kind. Unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "contact_message" => Some(Self::ContactMessage),
            "subscriber" => Some(Self::Subscriber),
            _ => None,
        }
    }

    /// Name of the upstream table whose changes signal new events of this
    /// kind.
    pub fn table(self) -> &'static str {
        match self {
            Self::ContactMessage => "contact_messages",
            Self::Subscriber => "subscribers",
        }
    }

    /// The notification kind used for notifications created from events of
    /// this source.
    pub fn notification_kind(self) -> NotificationKind {
        match self {
            Self::ContactMessage => NotificationKind::Contact,
            Self::Subscriber => NotificationKind::Subscriber,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of the upstream event a notification was created for. At most one
/// notification exists per `(id, kind)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct SourceRef {
    pub id: String,
    pub kind: SourceKind,
}

impl SourceRef {
    pub fn new(id: impl Into<String>, kind: SourceKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }
}

/// A single item of the admin attention feed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Notification {
    pub id: NotificationId,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    /// Upstream event this notification was created for, absent for purely
    /// informational notifications.
    pub source: Option<SourceRef>,
}

impl Notification {
    /// Dashboard route the notification points at, if any.
    pub fn link(&self) -> Option<String> {
        let source = self.source.as_ref()?;
        match source.kind {
            SourceKind::ContactMessage => Some(format!("/admin/contact-form?id={}", source.id)),
            SourceKind::Subscriber => Some("/admin/subscribers".to_string()),
        }
    }
}

/// An upstream event that may warrant a notification, together with the
/// display content derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEvent {
    pub source: SourceRef,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
}

/// Fields supplied when inserting a new notification. The repository assigns
/// the id and creation timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub source: Option<SourceRef>,
}

impl From<&SourceEvent> for NewNotification {
    fn from(event: &SourceEvent) -> Self {
        Self {
            title: event.title.clone(),
            message: event.message.clone(),
            kind: event.kind,
            source: Some(event.source.clone()),
        }
    }
}

/// Compact label for an unread counter badge. Returns `None` when there is
/// nothing to show.
pub fn badge_label(unread: usize) -> Option<String> {
    match unread {
        0 => None,
        1..=9 => Some(unread.to_string()),
        10..=99 => Some("9+".to_string()),
        _ => Some("99+".to_string()),
    }
}

/// Severity of a user-visible notice emitted by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Neutral informational message that does not indicate success or failure.
    Info,
    /// Indicates a successful operation or positive outcome.
    Success,
    /// Indicates a non-critical issue that the user should be aware of.
    Warning,
    /// Indicates a failure of a user-initiated action.
    Error,
}

/// A transient, non-blocking notice intended for the user interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }
}
