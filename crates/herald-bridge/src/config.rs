use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::notification::SourceKind;
use crate::signal::{ChangeEventType, ReloadReason};

/// Debounce windows per reload tag, in milliseconds. The periodic tag has no
/// window: it always reloads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ReloadWindows {
    pub creation_signal_ms: u64,
    pub update_signal_ms: u64,
    pub manual_ms: u64,
    pub recovery_ms: u64,
}

impl ReloadWindows {
    /// Minimum interval between two executed reloads of the given tag.
    pub fn window_for(&self, reason: ReloadReason) -> Duration {
        let millis = match reason {
            ReloadReason::CreationSignal => self.creation_signal_ms,
            ReloadReason::UpdateSignal => self.update_signal_ms,
            ReloadReason::Manual => self.manual_ms,
            ReloadReason::Recovery => self.recovery_ms,
            ReloadReason::Periodic => 0,
        };
        Duration::from_millis(millis)
    }
}

impl Default for ReloadWindows {
    fn default() -> Self {
        Self {
            creation_signal_ms: 5_000,
            update_signal_ms: 10_000,
            manual_ms: 0,
            recovery_ms: 0,
        }
    }
}

/// Binds one upstream change subscription to the reload tag it schedules.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct WatcherBinding {
    /// Table whose changes are watched.
    pub table: String,
    /// Change type that is watched.
    pub event: ChangeEventType,
    /// Reload tag scheduled for each delivered signal.
    pub reason: ReloadReason,
    /// Upstream source the table feeds, used when the client creates
    /// notifications itself.
    #[serde(default)]
    pub source: Option<SourceKind>,
}

impl WatcherBinding {
    fn upstream(source: SourceKind) -> Self {
        Self {
            table: source.table().to_string(),
            event: ChangeEventType::Insert,
            reason: ReloadReason::CreationSignal,
            source: Some(source),
        }
    }
}

/// Connection settings for a PostgREST-compatible remote data store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RemoteConfig {
    /// Base URL of the project, without the `/rest/v1` suffix.
    pub base_url: String,
    /// Key sent with every request.
    pub api_key: String,
}

/// Global engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Debounce windows per reload tag.
    pub windows: ReloadWindows,
    /// Interval of the unconditional resync, in seconds. Configuration files
    /// setting zero are rejected; an engine started with zero runs without
    /// the resync timer.
    pub periodic_resync_secs: u64,
    /// Age after which an acknowledged but unconfirmed local edit yields to
    /// the authoritative state, in seconds.
    pub overlay_ttl_secs: u64,
    /// How far back a registrant still counts as new, in hours.
    pub subscriber_lookback_hours: u64,
    /// Whether this client creates notifications for upstream events itself.
    /// When disabled, only server-side triggers create notifications.
    pub client_side_creation: bool,
    /// Change subscriptions held while the engine runs.
    pub watchers: Vec<WatcherBinding>,
    /// Remote data store, if the engine talks to one.
    pub remote: Option<RemoteConfig>,
}

impl Config {
    pub fn periodic_resync(&self) -> Duration {
        Duration::from_secs(self.periodic_resync_secs)
    }

    pub fn overlay_ttl(&self) -> Duration {
        Duration::from_secs(self.overlay_ttl_secs)
    }

    pub fn subscriber_lookback(&self) -> Duration {
        Duration::from_secs(self.subscriber_lookback_hours * 60 * 60)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            windows: ReloadWindows::default(),
            periodic_resync_secs: 300,
            overlay_ttl_secs: 600,
            subscriber_lookback_hours: 24,
            client_side_creation: false,
            watchers: vec![
                WatcherBinding::upstream(SourceKind::ContactMessage),
                WatcherBinding::upstream(SourceKind::Subscriber),
                WatcherBinding {
                    table: crate::NOTIFICATIONS_TABLE.to_string(),
                    event: ChangeEventType::Any,
                    reason: ReloadReason::UpdateSignal,
                    source: None,
                },
            ],
            remote: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn default_windows_match_signal_classes() {
        let windows = ReloadWindows::default();
        assert_eq!(
            windows.window_for(ReloadReason::CreationSignal),
            Duration::from_secs(5)
        );
        assert_eq!(
            windows.window_for(ReloadReason::UpdateSignal),
            Duration::from_secs(10)
        );
        assert_eq!(windows.window_for(ReloadReason::Periodic), Duration::ZERO);
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config: Config = toml::from_str(
            r#"
            periodic_resync_secs = 60

            [windows]
            creation_signal_ms = 1500

            [[watchers]]
            table = "notifications"
            event = "*"
            reason = "update-signal"
            "#,
        )
        .expect("valid config");

        assert_eq!(config.periodic_resync(), Duration::from_secs(60));
        assert_eq!(config.windows.creation_signal_ms, 1500);
        assert_eq!(config.windows.update_signal_ms, 10_000);
        assert_eq!(config.watchers.len(), 1);
        assert_eq!(config.watchers[0].event, ChangeEventType::Any);
        assert_eq!(config.watchers[0].source, None);
        assert!(!config.client_side_creation);
    }

    #[test]
    fn default_config_survives_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).expect("serializable");
        let parsed: Config = toml::from_str(&text).expect("parsable");
        assert_eq!(parsed, config);
    }
}
