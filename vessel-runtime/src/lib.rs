//! Vessel Tracker runtime
//!
//! Wires the sources together:
//! - [`TrackerConfig`]: one explicit configuration object, loadable from TOML
//! - [`Tracker`]: validated, deadline-bounded lookups
//! - [`server`]: the axum HTTP API and AIS stream relay

pub mod config;
pub mod server;
pub mod tracker;

pub use config::*;
pub use tracker::*;
