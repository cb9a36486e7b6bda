//! Vessel Tracker Core - domain model and source reconciliation
//!
//! This crate provides the pure, network-free pieces:
//! - IMO identifier validation
//! - Vessel identity records and the merged API report
//! - Position candidates, bounding boxes and coordinate precision
//! - Free-text observation age parsing
//! - The reconciliation policy choosing between position sources

pub mod age;
pub mod imo;
pub mod policy;
pub mod position;
pub mod vessel;

pub use age::*;
pub use imo::*;
pub use policy::*;
pub use position::*;
pub use vessel::*;

/// Age assigned to observations whose freshness is unknown
pub const STALE_AGE_MINUTES: u32 = 999;

/// Default staleness threshold for the primary source (minutes)
pub const DEFAULT_STALENESS_THRESHOLD: u32 = 60;

/// Default freshness floor below which precision never overrides the primary (minutes)
pub const DEFAULT_FRESHNESS_FLOOR: u32 = 5;
