pub mod picking;
pub mod pointer;
pub mod raster;

pub use picking::*;
pub use pointer::*;
