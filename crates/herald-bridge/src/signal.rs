use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of row change delivered by a change-signal channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeEventType {
    Insert,
    Update,
    Delete,
    /// Matches every change on the table.
    #[serde(rename = "*", alias = "any")]
    Any,
}

impl ChangeEventType {
    /// Whether a subscription for `self` should receive a change of type
    /// `event`.
    pub fn matches(self, event: ChangeEventType) -> bool {
        self == ChangeEventType::Any || self == event
    }
}

/// Opaque "something changed" signal. Delivery is at-least-once, possibly
/// duplicated and possibly delayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSignal {
    pub table: String,
    pub event: ChangeEventType,
    /// Identifier of the changed row, when the channel provides one.
    pub record_id: Option<String>,
}

/// Tag of a reload request. Each tag has its own debounce window so unrelated
/// signal classes do not starve each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReloadReason {
    /// A new upstream event may have produced a notification.
    CreationSignal,
    /// An existing notification changed elsewhere.
    UpdateSignal,
    /// Fixed-interval resync; never coalesced.
    Periodic,
    /// Explicit refresh requested by the consumer.
    Manual,
    /// Reload after a failed batch mutation to learn the actual server state.
    Recovery,
}

impl fmt::Display for ReloadReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::CreationSignal => "creation-signal",
            Self::UpdateSignal => "update-signal",
            Self::Periodic => "periodic",
            Self::Manual => "manual",
            Self::Recovery => "recovery",
        };
        f.write_str(tag)
    }
}
