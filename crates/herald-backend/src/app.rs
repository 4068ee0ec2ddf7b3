//! Engine context and message dispatching.
//!
//! The context owns the engine [`State`] and runs the single event loop that
//! mutates it. Consumer commands and the completions of spawned requests
//! (reloads, mutations, scans) are both delivered to that loop as messages,
//! so every state change happens in one place and in arrival order.

use std::future::Future;
use std::sync::Arc;

use herald_bridge::{
    MessageFromEngine, MessageToEngine,
    config::Config,
    feed::{FeedSnapshot, Lifecycle, ScanReport},
    notification::{Notice, Notification, SourceKind},
    signal::ReloadReason,
};
use tokio::sync::{
    broadcast,
    mpsc::{Receiver, Sender},
    watch,
};

use crate::error::{EngineError, RepositoryError};
use crate::overlay::MutationId;
use crate::ports::{CandidateSource, ChangeChannel, NotificationRepository};
use crate::services::{
    self, mutation_service, reload_service, resync::PeriodicResync, scan_service,
    watcher::WatcherHandle,
};
use crate::state::State;

/// External collaborators the engine is wired to.
#[derive(Clone)]
pub struct EngineDeps {
    pub notifications: Arc<dyn NotificationRepository>,
    pub sources: Vec<Arc<dyn CandidateSource>>,
    pub changes: Arc<dyn ChangeChannel>,
}

/// Messages produced inside the engine: watcher and timer signals and the
/// completions of spawned requests.
#[derive(Debug)]
pub(crate) enum EngineMessage {
    Signal {
        reason: ReloadReason,
        source: Option<SourceKind>,
    },
    ReloadFinished {
        seq: u64,
        reason: ReloadReason,
        result: Result<Vec<Notification>, RepositoryError>,
    },
    MutationFinished {
        mutation: MutationId,
        result: Result<(), RepositoryError>,
    },
    ScanFinished(ScanReport),
}

/// Engine context passed to service handlers.
pub(crate) struct AppContext {
    /// Engine state, owned by the event loop.
    pub state: State,
    pub config: Config,
    pub deps: EngineDeps,
    /// Inbound channel for signals and request completions.
    pub tx: Sender<EngineMessage>,
    /// Outbound events for consumers.
    pub events: broadcast::Sender<MessageFromEngine>,
    /// Current merged feed for consumers.
    pub feed: watch::Sender<FeedSnapshot>,
    pub lifecycle: watch::Sender<Lifecycle>,
}

impl AppContext {
    pub fn new(
        config: Config,
        deps: EngineDeps,
        tx: Sender<EngineMessage>,
        events: broadcast::Sender<MessageFromEngine>,
        feed: watch::Sender<FeedSnapshot>,
        lifecycle: watch::Sender<Lifecycle>,
    ) -> Self {
        Self {
            state: State::new(config.windows.clone()),
            config,
            deps,
            tx,
            events,
            feed,
            lifecycle,
        }
    }

    /// Acquires watchers and the resync timer and issues the initial load.
    pub async fn start(&mut self) -> Result<(), EngineError> {
        self.transition(Lifecycle::Starting)?;

        for binding in self.config.watchers.clone() {
            let table = binding.table.clone();
            match WatcherHandle::spawn(self.deps.changes.as_ref(), binding, self.tx.clone()).await {
                Ok(watcher) => self.state.watchers.push(watcher),
                Err(source) => {
                    log::error!("Failed to watch `{table}`: {source}");
                    self.release_resources().await;
                    self.transition(Lifecycle::Stopped)?;
                    return Err(EngineError::Subscribe { table, source });
                }
            }
        }
        self.state.resync = PeriodicResync::start(self.config.periodic_resync(), self.tx.clone());

        self.transition(Lifecycle::Running)?;
        reload_service::schedule(self, ReloadReason::Manual);
        Ok(())
    }

    /// Processes consumer commands and internal messages until shutdown is
    /// requested or every consumer handle is gone, then tears down.
    pub async fn run(
        mut self,
        mut commands: Receiver<MessageToEngine>,
        mut internal: Receiver<EngineMessage>,
    ) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(MessageToEngine::Shutdown) | None => break,
                    Some(command) => {
                        log::debug!("Got a consumer command: {command:?}");
                        self.dispatch_command(command);
                    }
                },
                Some(message) = internal.recv() => self.dispatch_internal(message),
            }
        }

        self.teardown().await;
    }

    /// Dispatches a consumer command down to the service handlers.
    fn dispatch_command(&mut self, command: MessageToEngine) {
        match command {
            MessageToEngine::Mutate(mutation) => {
                mutation_service::handle_mutation(self, mutation);
            }
            MessageToEngine::Refresh => reload_service::schedule(self, ReloadReason::Manual),
            MessageToEngine::ScanSources(only) => scan_service::handle_scan_request(self, only),
            MessageToEngine::Shutdown => log::warn!("Shutdown must be handled by the event loop"),
        }
    }

    fn dispatch_internal(&mut self, message: EngineMessage) {
        if !self.state.lifecycle.is_running() {
            log::debug!("Discarding {message:?} received while {:?}", self.state.lifecycle);
            return;
        }

        match message {
            EngineMessage::Signal { reason, source } => {
                services::watcher::handle_signal(self, reason, source);
            }
            EngineMessage::ReloadFinished {
                seq,
                reason,
                result,
            } => reload_service::handle_reload_finished(self, seq, reason, result),
            EngineMessage::MutationFinished { mutation, result } => {
                mutation_service::handle_mutation_finished(self, mutation, result);
            }
            EngineMessage::ScanFinished(report) => {
                scan_service::handle_scan_finished(self, report);
            }
        }
    }

    /// Runs a request off the event loop and feeds its result back in. A
    /// result arriving after teardown is dropped.
    pub fn spawn_request<F>(&self, request: F)
    where
        F: Future<Output = EngineMessage> + Send + 'static,
    {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let message = request.await;
            if tx.send(message).await.is_err() {
                log::debug!("Engine stopped before a request completed, dropping its result");
            }
        });
    }

    /// Publish an event to every subscribed consumer.
    pub fn emit(&self, message: MessageFromEngine) {
        // No subscribers is fine.
        let _ = self.events.send(message);
    }

    /// Publish a user-visible notice.
    pub fn notify(&self, notice: Notice) {
        self.emit(MessageFromEngine::Notice(notice));
    }

    /// Recomputes the merged feed and publishes it when it differs from what
    /// consumers currently see.
    pub fn publish_view(&self) {
        let snapshot = FeedSnapshot {
            notifications: self.state.view(),
            loaded: self.state.store.is_loaded(),
        };
        let (total, unread) = (snapshot.notifications.len(), snapshot.unread_count());

        let changed = self.feed.send_if_modified(|current| {
            if *current == snapshot {
                return false;
            }
            *current = snapshot;
            true
        });
        if changed {
            self.emit(MessageFromEngine::ViewChanged { total, unread });
        }
    }

    pub fn transition(&mut self, next: Lifecycle) -> Result<(), EngineError> {
        let current = self.state.lifecycle;
        if !current.can_transition_to(next) {
            return Err(EngineError::InvalidTransition {
                from: current,
                to: next,
            });
        }

        log::info!("Engine lifecycle {current:?} -> {next:?}");
        self.state.lifecycle = next;
        self.lifecycle.send_replace(next);
        self.emit(MessageFromEngine::LifecycleChanged(next));
        Ok(())
    }

    async fn release_resources(&mut self) {
        for watcher in self.state.watchers.drain(..) {
            watcher.release().await;
        }
        if let Some(resync) = self.state.resync.take() {
            resync.stop().await;
        }
    }

    async fn teardown(&mut self) {
        if let Err(error) = self.transition(Lifecycle::Stopping) {
            log::error!("Cannot tear down engine: {error}");
            return;
        }
        let pending = self.state.overlay.in_flight();
        if pending > 0 {
            log::debug!("Stopping with {pending} mutation request(s) in flight");
        }
        self.release_resources().await;
        if let Err(error) = self.transition(Lifecycle::Stopped) {
            log::error!("Cannot finish engine teardown: {error}");
        }
    }
}
