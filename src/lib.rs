//! # simdeck
//!
//! Client-side runtime for an operator console over a stepped, server-resident
//! simulation.
//!
//! The server owns the simulation and exposes status, incremental state
//! history, mutable configuration, and enactable policies over HTTP. This crate
//! polls it on a fixed cadence, accumulates chart-ready visualization data, and
//! stages operator edits (configuration, policy queues) for submission between
//! runs. It renders nothing itself; every binding exposes plain point
//! collections a frontend can draw.
//!
//! ## Quick Start
//!
//! ```no_run
//! use simdeck::prelude::*;
//! use std::sync::Arc;
//! use tokio::sync::RwLock;
//!
//! # async fn run() -> Result<(), simdeck::client::ClientError> {
//! let client = ApiClient::new("http://127.0.0.1:8000")?;
//! let dashboard = Arc::new(RwLock::new(Dashboard::with_catalog()));
//! let controller = SyncController::new(client, Arc::clone(&dashboard));
//!
//! controller.load_initial().await;
//! let handle = controller.start(500);
//!
//! // ... observe dashboard state, dispatch operator commands ...
//! handle.abort();
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`keypath`]: dotted key-path resolution over untyped JSON trees
//! - [`history`]: the append-only per-step state log
//! - [`charts`]: declarative chart/scatter bindings and scrub windowing
//! - [`sync`]: the polling state machine and shared dashboard state
//! - [`config`]: config staging and dirty tracking
//! - [`policy`]: policy argument validation and staging
//! - [`client`]: the HTTP API client
//! - [`catalog`]: the dashboard's startup catalog (charts, fields, policies)

#[path = "core/keypath.rs"]
pub mod keypath;

#[path = "core/history.rs"]
pub mod history;

#[path = "core/charts.rs"]
pub mod charts;

#[path = "core/config.rs"]
pub mod config;

#[path = "core/policy.rs"]
pub mod policy;

#[path = "core/client.rs"]
pub mod client;

#[path = "core/catalog.rs"]
pub mod catalog;

#[path = "core/sync.rs"]
pub mod sync;

/// Prelude module for convenient imports.
///
/// ```
/// use simdeck::prelude::*;
/// ```
pub mod prelude {
    pub use crate::charts::{ChartBindings, ChartSpec, DatasetSpec, ScatterSpec};
    pub use crate::client::ApiClient;
    pub use crate::config::{ConfigCommand, ConfigTracker};
    pub use crate::history::{HistoryLog, StepRecord};
    pub use crate::policy::{PolicyInvocation, PolicyTracker};
    pub use crate::sync::{Dashboard, SimulationStatus, SyncController};
}
