//! Brings a sensing session up around the presenter: builds the device
//! plan, starts the coordinator service, and tears it down again.

pub mod config;
pub mod console;
pub mod error;
pub mod plan;
pub mod process;
pub mod session;

pub use config::{CommandSpec, DeviceSpec, Endpoint, LauncherConfig, PreprocessSpec};
pub use console::wait_for_quit;
pub use error::LaunchError;
pub use plan::DevicePlan;
pub use process::ProcessBackend;
pub use session::{AssembledSession, RunningSession, SensingBackend, StoppedSession};
