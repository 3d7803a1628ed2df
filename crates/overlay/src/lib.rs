//! Time-varying markers over still images and video.

pub mod marker;
pub mod path;
pub mod scale;

pub use marker::*;
pub use path::*;
pub use scale::*;
