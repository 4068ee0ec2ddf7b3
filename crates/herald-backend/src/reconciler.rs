//! Debounced reload admission.
//!
//! Watcher signals tend to arrive in bursts (a batch of rows inserted
//! together). The reconciler admits the first request of a burst and drops
//! every further request of the same tag until the tag's window has elapsed
//! since the last executed reload. The periodic tag is always admitted.

use std::collections::HashMap;

use herald_bridge::{config::ReloadWindows, signal::ReloadReason};
use tokio::time::Instant;

/// Debounce state of all reload tags. Not persisted.
#[derive(Debug, Clone)]
pub struct Reconciler {
    windows: ReloadWindows,
    last_reload_at: HashMap<ReloadReason, Instant>,
}

impl Reconciler {
    pub fn new(windows: ReloadWindows) -> Self {
        Self {
            windows,
            last_reload_at: HashMap::new(),
        }
    }

    /// Decides whether a reload requested for `reason` at `now` should run.
    /// An admitted request is recorded as the tag's last reload.
    pub fn admit(&mut self, reason: ReloadReason, now: Instant) -> bool {
        if reason != ReloadReason::Periodic {
            let window = self.windows.window_for(reason);
            if let Some(last) = self.last_reload_at.get(&reason) {
                if now.saturating_duration_since(*last) < window {
                    log::debug!("Coalescing {reason} reload request");
                    return false;
                }
            }
        }

        self.last_reload_at.insert(reason, now);
        true
    }

    pub fn last_reload_at(&self, reason: ReloadReason) -> Option<Instant> {
        self.last_reload_at.get(&reason).copied()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn burst_within_window_admits_one_reload() {
        let mut reconciler = Reconciler::new(ReloadWindows::default());
        let start = Instant::now();

        let admitted = (0..10)
            .filter(|i| {
                reconciler.admit(
                    ReloadReason::CreationSignal,
                    start + Duration::from_millis(200 * i),
                )
            })
            .count();
        assert_eq!(admitted, 1);

        assert!(reconciler.admit(ReloadReason::CreationSignal, start + Duration::from_secs(5)));
        assert!(!reconciler.admit(ReloadReason::CreationSignal, start + Duration::from_secs(6)));
    }

    #[test]
    fn tags_do_not_share_windows() {
        let mut reconciler = Reconciler::new(ReloadWindows::default());
        let now = Instant::now();

        assert!(reconciler.admit(ReloadReason::CreationSignal, now));
        assert!(reconciler.admit(ReloadReason::UpdateSignal, now));
        assert!(!reconciler.admit(ReloadReason::UpdateSignal, now + Duration::from_secs(9)));
        assert!(reconciler.admit(ReloadReason::CreationSignal, now + Duration::from_secs(9)));
    }

    #[test]
    fn periodic_is_never_coalesced() {
        let mut reconciler = Reconciler::new(ReloadWindows::default());
        let now = Instant::now();

        assert!(reconciler.admit(ReloadReason::Periodic, now));
        assert!(reconciler.admit(ReloadReason::Periodic, now));
        assert_eq!(reconciler.last_reload_at(ReloadReason::Periodic), Some(now));
    }
}
