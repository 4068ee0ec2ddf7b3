use chrono::{DateTime, Utc};
use herald_bridge::notification::Notification;

/// Formats how long ago `created_at` was, in the coarsest whole unit.
pub fn format_age(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - created_at).num_seconds().max(0);
    match seconds {
        0..60 => "just now".to_string(),
        60..3_600 => format!("{}m ago", seconds / 60),
        3_600..86_400 => format!("{}h ago", seconds / 3_600),
        _ => format!("{}d ago", seconds / 86_400),
    }
}

/// One feed row: unread marker, kind icon, title, body, age and link.
pub fn format_notification(notification: &Notification, now: DateTime<Utc>) -> String {
    let descriptor = notification.kind.descriptor();
    let marker = if notification.is_read { ' ' } else { '*' };
    let mut line = format!(
        "{marker} [{}] {}: {} ({})",
        descriptor.icon,
        notification.title,
        notification.message,
        format_age(notification.created_at, now)
    );
    if let Some(link) = notification.link() {
        line.push_str(" -> ");
        line.push_str(&link);
    }
    line
}
