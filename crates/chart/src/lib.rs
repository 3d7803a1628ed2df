//! One interactive sky chart: view, tiles, scheduling and picking.

pub mod chart;
pub mod config;
pub mod source;

pub use chart::*;
pub use config::*;
pub use source::*;
