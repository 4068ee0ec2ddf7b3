//! Engine runtime setup and orchestration.
//!
//! This module wires together configuration, collaborators and channels,
//! brings the engine up and spawns the event loop that serves consumers.

use herald_bridge::{
    BridgeChannels,
    config::Config,
    feed::{FeedSnapshot, Lifecycle},
};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};

use crate::app::{AppContext, EngineDeps};
use crate::client::FeedClient;
use crate::error::EngineError;

const INTERNAL_BUFFER: usize = 256;

/// A running engine. Obtain [`FeedClient`]s from it and call
/// [`Engine::shutdown`] to release its subscriptions and timer.
#[derive(Debug)]
pub struct Engine {
    client: FeedClient,
    task: Option<JoinHandle<()>>,
}

impl Engine {
    /// Starts the engine on the current tokio runtime: subscribes the
    /// configured watchers, arms the resync timer and issues the initial
    /// load. Fails, with nothing left running, if a subscription cannot be
    /// acquired.
    pub async fn start(config: Config, deps: EngineDeps) -> Result<Self, EngineError> {
        let channels = BridgeChannels::default();
        let (tx, internal_rx) = mpsc::channel(INTERNAL_BUFFER);
        let (feed_tx, feed_rx) = watch::channel(FeedSnapshot::default());
        let (lifecycle_tx, lifecycle_rx) = watch::channel(Lifecycle::Stopped);

        let client = FeedClient::new(
            channels.client_tx,
            channels.events_tx.clone(),
            feed_rx,
            lifecycle_rx,
        );
        let mut context =
            AppContext::new(config, deps, tx, channels.events_tx, feed_tx, lifecycle_tx);
        context.start().await?;

        let task = tokio::spawn(context.run(channels.engine_rx, internal_rx));
        Ok(Self {
            client,
            task: Some(task),
        })
    }

    pub fn client(&self) -> FeedClient {
        self.client.clone()
    }

    /// Stops the engine and waits until every subscription and the timer are
    /// released. Results of requests still in flight are discarded.
    pub async fn shutdown(mut self) {
        if self.client.request_shutdown().await.is_err() {
            log::debug!("Engine loop already stopped");
        }
        if let Some(task) = self.task.take()
            && let Err(error) = task.await
        {
            log::error!("Engine loop ended abnormally: {error}");
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if self.task.is_some() {
            self.client.try_request_shutdown();
        }
    }
}

