//! Engine service handlers.
//!
//! This module groups the handlers that operate on the [`AppContext`] owned by
//! the event loop, start asynchronous requests (reloads, mutations, scans)
//! and publish the merged feed and notices back to consumers.
//!
//! [`AppContext`]: crate::app::AppContext

pub mod creator;
pub mod mutation_service;
pub mod reload_service;
pub mod resync;
pub mod scan_service;
pub mod watcher;
