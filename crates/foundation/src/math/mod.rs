pub mod celestial;
pub mod distortion;
pub mod gnomonic;
pub mod precision;
pub mod vec;

pub use celestial::*;
pub use distortion::*;
pub use gnomonic::*;
pub use precision::*;
pub use vec::*;
