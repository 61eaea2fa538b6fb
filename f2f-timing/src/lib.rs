pub mod schedule;
pub mod timer;

pub use schedule::DeferredQueue;
pub use timer::{HighPrecisionTimer, ManualTimer, Timer};
