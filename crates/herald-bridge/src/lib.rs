//! Communication bridge between the notification engine and its consumers.
//!
//! This crate defines the types and protocols shared by the reconciliation
//! engine and whatever presents the admin attention feed:
//! - The consumer sends commands (mark read, delete, clear read, refresh).
//! - The engine publishes events (view changed, error notices, scan results)
//!   and a current [`feed::FeedSnapshot`].
//!
//! Commands travel over a bounded [`tokio::sync::mpsc`] channel, events over
//! a [`tokio::sync::broadcast`] channel so any number of views can follow the
//! feed. Both are bundled in [`BridgeChannels`].

pub mod config;
pub mod feed;
pub mod notification;
pub mod signal;

use tokio::sync::{
    broadcast,
    mpsc::{self, Receiver, Sender},
};

/// Table holding the notification records themselves.
pub const NOTIFICATIONS_TABLE: &str = "notifications";

/// Messages emitted by the engine to inform consumers of state changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageFromEngine {
    /// The merged feed changed; the new snapshot is available from the client.
    ViewChanged {
        /// Number of visible notifications.
        total: usize,
        /// Number of visible unread notifications.
        unread: usize,
    },
    /// User-visible, non-blocking notice (typically a failed action).
    Notice(notification::Notice),
    /// A scan of upstream sources completed.
    ScanFinished(feed::ScanReport),
    /// The engine moved to another lifecycle state.
    LifecycleChanged(feed::Lifecycle),
}

/// Commands issued by a consumer to drive the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageToEngine {
    /// Apply a local edit optimistically and send it to the repository.
    Mutate(feed::Mutation),
    /// Reload the feed now.
    Refresh,
    /// Create missing notifications for upstream events, optionally for a
    /// single source kind.
    ScanSources(Option<notification::SourceKind>),
    /// Release subscriptions and timers and stop the event loop.
    Shutdown,
}

/// Channels connecting consumers to the engine.
pub struct BridgeChannels {
    /// Sender used by consumers to send commands to the engine.
    pub client_tx: Sender<MessageToEngine>,
    /// Receiver used by the engine to get commands from consumers.
    pub engine_rx: Receiver<MessageToEngine>,
    /// Sender used by the engine to publish events; consumers subscribe to it.
    pub events_tx: broadcast::Sender<MessageFromEngine>,
}

impl BridgeChannels {
    /// Creates the channels with the given buffer capacity.
    pub fn new(buffer: usize) -> Self {
        let (client_tx, engine_rx) = mpsc::channel(buffer);
        let (events_tx, _) = broadcast::channel(buffer);
        Self {
            client_tx,
            engine_rx,
            events_tx,
        }
    }
}

impl Default for BridgeChannels {
    fn default() -> Self {
        Self::new(64)
    }
}
