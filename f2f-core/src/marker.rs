use serde::{Deserialize, Serialize};

use crate::stimulus::StimulusId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkerKind {
    Start,
    Stop,
}

/// Start/stop signal aligning recorded signal files with the experiment timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub experiment_id: String,
    pub stimulus_id: String,
    pub kind: MarkerKind,
}

impl Marker {
    pub fn start(experiment_id: &str, stimulus: &StimulusId) -> Self {
        Self::new(experiment_id, stimulus, MarkerKind::Start)
    }

    pub fn stop(experiment_id: &str, stimulus: &StimulusId) -> Self {
        Self::new(experiment_id, stimulus, MarkerKind::Stop)
    }

    fn new(experiment_id: &str, stimulus: &StimulusId, kind: MarkerKind) -> Self {
        Self {
            experiment_id: experiment_id.to_string(),
            stimulus_id: stimulus.stem().to_string(),
            kind,
        }
    }
}

/// Control message as understood by the sensing coordinator's HTTP endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    Start {
        experiment_id: String,
        stimulus_id: String,
    },
    Stop {
        experiment_id: String,
        stimulus_id: String,
    },
    Terminate,
}

impl From<Marker> for ControlMessage {
    fn from(marker: Marker) -> Self {
        let Marker {
            experiment_id,
            stimulus_id,
            kind,
        } = marker;
        match kind {
            MarkerKind::Start => ControlMessage::Start {
                experiment_id,
                stimulus_id,
            },
            MarkerKind::Stop => ControlMessage::Stop {
                experiment_id,
                stimulus_id,
            },
        }
    }
}
