//! Sky tile streaming: wire types, tile selection and the per-chart tile cache.

pub mod backoff;
pub mod cache;
pub mod protocol;
pub mod request;
pub mod residency;
pub mod selection;
pub mod slot;

pub use backoff::*;
pub use cache::*;
pub use protocol::*;
pub use request::*;
pub use residency::*;
pub use selection::*;
pub use slot::*;
