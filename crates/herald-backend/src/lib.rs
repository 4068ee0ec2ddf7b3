//! Notification reconciliation engine.
//!
//! The engine keeps a consumer-visible feed of notifications consistent with
//! an authoritative repository while change signals arrive out of order,
//! reloads overlap and the consumer edits the feed optimistically. Start it
//! with [`Engine::start`] and drive it through a [`FeedClient`].

mod app;
mod client;
pub mod config;
pub mod error;
pub mod memory;
pub mod overlay;
pub mod ports;
pub mod reconciler;
pub mod rest;
mod runtime;
mod services;
pub mod sources;
mod state;
pub mod store;

pub use crate::app::EngineDeps;
pub use crate::client::FeedClient;
pub use crate::runtime::Engine;
pub use crate::services::creator::{Creation, ensure_notification_for_event};
pub use crate::services::scan_service::scan_sources;
