//! Vessel Tracker position sources
//!
//! One adapter interface, [`PositionSource`], with a variant per slot:
//! - **Primary**: vessel detail page scrape
//! - **BoundingBox**: nearby-vessels query around the primary fix
//! - **LiveFeed**: first matching message from the AIS stream
//!
//! Adapters never fail a lookup; [`PositionSource::fetch_or_absent`] logs
//! errors and turns them into absence.

pub mod bounding_box;
pub mod live_feed;
pub mod primary;
pub mod traits;

pub use bounding_box::*;
pub use live_feed::*;
pub use primary::*;
pub use traits::*;
