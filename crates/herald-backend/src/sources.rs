//! Upstream business records that notifications are derived from.

use chrono::{DateTime, Duration, Utc};
use herald_bridge::notification::{SourceEvent, SourceKind, SourceRef};
use serde::{Deserialize, Serialize};

fn present(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// An inbound message sent through the public contact form.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ContactMessage {
    pub id: String,
    pub name: Option<String>,
    pub subject: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl ContactMessage {
    /// Only unread messages still warrant a notification.
    pub fn is_candidate(&self) -> bool {
        !self.is_read
    }

    pub fn to_source_event(&self) -> SourceEvent {
        let name = present(&self.name).unwrap_or("visitor");
        let subject = present(&self.subject).unwrap_or("no subject");
        SourceEvent {
            source: SourceRef::new(self.id.clone(), SourceKind::ContactMessage),
            title: "New contact message".to_string(),
            message: format!("Message from {name}: {subject}"),
            kind: SourceKind::ContactMessage.notification_kind(),
        }
    }
}

/// A registrant of the messaging channels.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Subscriber {
    pub id: String,
    pub whatsapp_number: Option<String>,
    pub telegram_username: Option<String>,
    pub subscribed_at: DateTime<Utc>,
}

impl Subscriber {
    /// Registrants older than `lookback` are no longer announced.
    pub fn is_candidate(&self, now: DateTime<Utc>, lookback: Duration) -> bool {
        now.checked_sub_signed(lookback)
            .is_none_or(|cutoff| self.subscribed_at >= cutoff)
    }

    pub fn to_source_event(&self) -> SourceEvent {
        let contact = present(&self.whatsapp_number)
            .or_else(|| present(&self.telegram_username))
            .unwrap_or("no number");
        SourceEvent {
            source: SourceRef::new(self.id.clone(), SourceKind::Subscriber),
            title: "New subscriber".to_string(),
            message: format!("New subscriber joined: {contact}"),
            kind: SourceKind::Subscriber.notification_kind(),
        }
    }
}
