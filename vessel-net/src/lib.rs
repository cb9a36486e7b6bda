//! Vessel Tracker network layer
//!
//! Transport for the three position sources:
//! - Browser-like HTTP client with bounded retry
//! - Vessel detail page scraping
//! - Bounding-box nearby-vessels query
//! - Live AIS websocket stream

pub mod client;
pub mod nearby;
pub mod page;
pub mod retry;
pub mod stream;

pub use client::*;
pub use nearby::*;
pub use page::*;
pub use retry::*;
pub use stream::*;
