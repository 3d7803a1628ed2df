pub mod grid;
pub mod labels;
pub mod sky;
pub mod surface;
pub mod svg;
pub mod symbology;

pub use sky::*;
pub use surface::*;
pub use symbology::*;
