pub mod config;
pub mod coordinator;
pub mod driver;
pub mod logging;
pub mod order;
pub mod state;

pub use config::{AssetPaths, ConfigError, SequencerConfig};
pub use coordinator::{Coordinator, CoordinatorCall, HttpCoordinator, NullCoordinator, RecordingCoordinator};
pub use driver::{Presenter, Sequencer};
pub use order::{OrderError, StimulusOrder};
pub use state::{Effect, SequenceEvent, SessionState, StateMachine, Transition};
