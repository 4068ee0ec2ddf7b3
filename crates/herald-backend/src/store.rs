use herald_bridge::notification::Notification;

/// Last authoritative set of notifications and the sequence guard that keeps
/// late reload responses from overwriting newer ones.
#[derive(Debug, Clone, Default)]
pub struct NotificationStore {
    authoritative: Vec<Notification>,
    issued_seq: u64,
    applied_seq: u64,
    loaded: bool,
}

impl NotificationStore {
    /// Registers a new reload request and returns its sequence number.
    pub fn begin_reload(&mut self) -> u64 {
        self.issued_seq += 1;
        self.issued_seq
    }

    /// Whether a response for `seq` would still be applied.
    pub fn is_latest(&self, seq: u64) -> bool {
        seq == self.issued_seq && seq > self.applied_seq
    }

    /// Replaces the authoritative set with a reload response. Responses that
    /// are not for the latest issued request are discarded and `false` is
    /// returned.
    pub fn accept(&mut self, seq: u64, mut notifications: Vec<Notification>) -> bool {
        if !self.is_latest(seq) {
            return false;
        }

        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        self.authoritative = notifications;
        self.applied_seq = seq;
        self.loaded = true;
        true
    }

    /// Authoritative notifications, newest first.
    pub fn authoritative(&self) -> &[Notification] {
        &self.authoritative
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn reloads_in_flight(&self) -> bool {
        self.issued_seq > self.applied_seq
    }
}
