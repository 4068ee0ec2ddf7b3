use herald_bridge::{
    config::ReloadWindows,
    feed::Lifecycle,
    notification::{Notification, SourceKind},
};

use crate::overlay::Overlay;
use crate::reconciler::Reconciler;
use crate::services::{resync::PeriodicResync, watcher::WatcherHandle};
use crate::store::NotificationStore;

/// The engine state that holds the feed and every scoped resource of a run.
///
/// It is owned by the engine event loop and only ever mutated there, so it
/// needs no locking: the interesting concurrency is the interleaving of
/// asynchronous completions, which the store's sequence guard and the
/// overlay handle.
#[derive(Debug)]
pub struct State {
    /// Current lifecycle state; changed only through
    /// [`crate::app::AppContext::transition`].
    pub lifecycle: Lifecycle,
    /// Last authoritative notifications.
    pub store: NotificationStore,
    /// Local edits not yet confirmed by a reload.
    pub overlay: Overlay,
    /// Debounce state of reload tags.
    pub reconciler: Reconciler,
    /// Change subscriptions acquired at start.
    pub watchers: Vec<WatcherHandle>,
    /// Unconditional resync timer, if enabled.
    pub resync: Option<PeriodicResync>,
    /// Whether a scan of upstream sources is running.
    pub scan_in_flight: bool,
    /// Scope of the scan to run once the current one finishes. The inner
    /// `None` means every source.
    pub pending_scan: Option<Option<SourceKind>>,
}

impl State {
    pub fn new(windows: ReloadWindows) -> Self {
        Self {
            lifecycle: Lifecycle::Stopped,
            store: NotificationStore::default(),
            overlay: Overlay::default(),
            reconciler: Reconciler::new(windows),
            watchers: Vec::new(),
            resync: None,
            scan_in_flight: false,
            pending_scan: None,
        }
    }

    /// The merged, consumer-visible feed.
    pub fn view(&self) -> Vec<Notification> {
        self.overlay.project(self.store.authoritative())
    }
}
