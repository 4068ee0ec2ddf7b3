mod formatting;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use herald_backend::{
    Engine, EngineDeps, FeedClient, ensure_notification_for_event,
    memory::{
        InMemoryChangeChannel, InMemoryContactMessages, InMemoryNotificationRepository,
        InMemorySubscribers,
    },
    ports::{CandidateSource, NotificationRepository},
    rest::RestNotificationRepository,
    sources::{ContactMessage, Subscriber},
};
use herald_bridge::{MessageFromEngine, config::Config, notification::NoticeLevel};

/// Logs every published feed and engine event until the engine stops.
fn spawn_feed_printer(client: &FeedClient) {
    let mut feed = client.watch_feed();
    tokio::spawn(async move {
        while feed.changed().await.is_ok() {
            let snapshot = feed.borrow_and_update().clone();
            let now = Utc::now();
            log::info!(
                "Feed: {} notification(s), badge {}",
                snapshot.notifications.len(),
                snapshot.badge().unwrap_or_else(|| "-".to_string())
            );
            for notification in snapshot.list() {
                log::info!("  {}", formatting::format_notification(notification, now));
            }
        }
    });

    let mut events = client.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                MessageFromEngine::Notice(notice) if notice.level == NoticeLevel::Error => {
                    log::error!("{}", notice.message);
                }
                MessageFromEngine::Notice(notice) => log::warn!("{}", notice.message),
                MessageFromEngine::ScanFinished(report) => log::info!("Scan finished: {report:?}"),
                MessageFromEngine::LifecycleChanged(lifecycle) => {
                    log::info!("Engine is {lifecycle:?}");
                }
                MessageFromEngine::ViewChanged { .. } => {}
            }
        }
    });
}

/// Plays a short session against in-memory adapters: upstream events arrive,
/// a stand-in for the server trigger creates their notifications, and the
/// admin reads and clears them.
async fn run_demo(config: Config) -> anyhow::Result<()> {
    let changes = Arc::new(InMemoryChangeChannel::new());
    let memory_store = Arc::new(InMemoryNotificationRepository::with_changes(changes.clone()));
    let notifications: Arc<dyn NotificationRepository> = match &config.remote {
        Some(remote) => {
            log::info!("Using the remote notification store at {}", remote.base_url);
            Arc::new(RestNotificationRepository::new(remote)?)
        }
        None => memory_store,
    };
    let messages = Arc::new(InMemoryContactMessages::with_changes(changes.clone()));
    let subscribers = Arc::new(InMemorySubscribers::new(
        config.subscriber_lookback(),
        Some(changes.clone()),
    ));
    let sources: Vec<Arc<dyn CandidateSource>> = vec![messages.clone(), subscribers.clone()];
    let server_side = !config.client_side_creation;

    let engine = Engine::start(
        config,
        EngineDeps {
            notifications: notifications.clone(),
            sources,
            changes,
        },
    )
    .await?;
    let client = engine.client();
    spawn_feed_printer(&client);

    let message = ContactMessage {
        id: "1001".to_string(),
        name: Some("Ada".to_string()),
        subject: Some("Partnership".to_string()),
        is_read: false,
        created_at: Utc::now(),
    };
    let subscriber = Subscriber {
        id: "2001".to_string(),
        whatsapp_number: Some("+15550100".to_string()),
        telegram_username: None,
        subscribed_at: Utc::now(),
    };
    messages.push(message.clone());
    subscribers.push(subscriber.clone());
    if server_side {
        for event in [message.to_source_event(), subscriber.to_source_event()] {
            ensure_notification_for_event(notifications.as_ref(), &event).await?;
        }
    }
    tokio::time::sleep(Duration::from_millis(200)).await;

    // Catches up on anything the triggers missed.
    client.scan_sources(None).await?;
    tokio::time::sleep(Duration::from_millis(200)).await;

    client.refresh().await?;
    tokio::time::sleep(Duration::from_millis(200)).await;
    log::info!("{} unread notification(s)", client.unread_count());

    client.mark_all_read().await?;
    tokio::time::sleep(Duration::from_millis(200)).await;
    client.clear_read().await?;
    tokio::time::sleep(Duration::from_millis(200)).await;

    engine.shutdown().await;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    simple_logger::SimpleLogger::new()
        .with_colors(true)
        .with_threads(true)
        .with_local_timestamps()
        .init()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async {
        let config = herald_backend::config::load_config().await?;
        run_demo(config).await
    })
}
