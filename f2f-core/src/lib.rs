pub mod display;
pub mod error;
pub mod marker;
pub mod phase;
pub mod session;
pub mod stimulus;

pub use display::{DisplayImage, Surface};
pub use error::DataError;
pub use marker::{ControlMessage, Marker, MarkerKind};
pub use phase::{Prompt, Stage};
pub use session::{ExperimentId, ParticipantId};
pub use stimulus::{EmotionQuadrant, StimulusId};
