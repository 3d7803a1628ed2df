pub mod frame;
pub mod scheduler;

pub use frame::*;
pub use scheduler::*;
