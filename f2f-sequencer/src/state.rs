use std::time::Duration;

use f2f_core::{DisplayImage, Marker, Prompt, Stage, StimulusId};

use crate::config::SequencerConfig;
use crate::order::StimulusOrder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceEvent {
    /// The delay scheduled on entering the current stage has passed.
    DwellElapsed,
    /// The message or timer window was closed.
    Dismissed,
}

/// Side effects requested by a transition, applied in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Show an image on both surfaces.
    Show(DisplayImage),
    OpenMessage(String),
    OpenTimer {
        label: &'static str,
        limit: Option<Duration>,
    },
    Dispatch(Marker),
    Terminate,
    /// Deliver `DwellElapsed` after the delay.
    Schedule(Duration),
    /// Tear the windows down; the program ends.
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionState {
    pub stage: Stage,
    /// Index of the current stimulus. Only ever increases.
    pub cursor: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub next: SessionState,
    pub effects: Vec<Effect>,
}

/// Pure stimulus-sequence transition function.
pub struct StateMachine {
    config: SequencerConfig,
    order: StimulusOrder,
    experiment_id: String,
}

impl StateMachine {
    pub fn new(config: SequencerConfig, order: StimulusOrder, experiment_id: impl Into<String>) -> Self {
        Self {
            config,
            order,
            experiment_id: experiment_id.into(),
        }
    }

    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    pub fn order(&self) -> &StimulusOrder {
        &self.order
    }

    pub fn experiment_id(&self) -> &str {
        &self.experiment_id
    }

    /// Entry into the background stage at construction.
    pub fn initial(&self) -> Transition {
        Transition {
            next: SessionState::default(),
            effects: vec![
                Effect::Show(DisplayImage::Background),
                Effect::Schedule(self.config.background()),
            ],
        }
    }

    /// Returns `None` when `event` does not advance `state`.
    pub fn step(&self, state: &SessionState, event: SequenceEvent) -> Option<Transition> {
        use SequenceEvent::*;

        let cursor = state.cursor;
        match (state.stage, event) {
            (Stage::Background, DwellElapsed) => {
                if self.order.is_empty() {
                    Some(self.enter_done(cursor, Vec::new()))
                } else {
                    Some(self.enter_message(cursor, Prompt::Start, Vec::new()))
                }
            }

            (Stage::Message(_), Dismissed) => {
                let stimulus = self.current(cursor)?;
                Some(Transition {
                    next: SessionState {
                        stage: Stage::Fixation,
                        cursor,
                    },
                    effects: vec![
                        Effect::Show(DisplayImage::FixationCross),
                        Effect::Dispatch(Marker::start(&self.experiment_id, stimulus)),
                        Effect::Schedule(self.config.fixation()),
                    ],
                })
            }

            (Stage::Fixation, DwellElapsed) => {
                let stimulus = self.current(cursor)?;
                Some(Transition {
                    next: SessionState {
                        stage: Stage::Stimulus,
                        cursor,
                    },
                    effects: vec![
                        Effect::Show(DisplayImage::Stimulus(stimulus.clone())),
                        Effect::Schedule(self.config.stimulus()),
                    ],
                })
            }

            (Stage::Stimulus, DwellElapsed) => {
                let stimulus = self.current(cursor)?;
                Some(Transition {
                    next: SessionState {
                        stage: Stage::Timer,
                        cursor,
                    },
                    effects: vec![Effect::OpenTimer {
                        label: stimulus.quadrant().label(),
                        limit: self.config.conversation_limit(),
                    }],
                })
            }

            (Stage::Timer, Dismissed) => {
                let stimulus = self.current(cursor)?;
                let stop = vec![Effect::Dispatch(Marker::stop(&self.experiment_id, stimulus))];
                let next = cursor + 1;
                if next >= self.order.len() {
                    Some(self.enter_done(next, stop))
                } else {
                    Some(self.enter_message(next, Prompt::Questionnaire, stop))
                }
            }

            (Stage::Done, DwellElapsed) => Some(Transition {
                next: SessionState {
                    stage: Stage::Finished,
                    cursor,
                },
                effects: vec![Effect::Close],
            }),

            _ => None,
        }
    }

    fn current(&self, cursor: usize) -> Option<&StimulusId> {
        self.order.get(cursor)
    }

    fn enter_message(&self, cursor: usize, prompt: Prompt, mut effects: Vec<Effect>) -> Transition {
        effects.push(Effect::OpenMessage(
            self.config.prompt_text(prompt).to_string(),
        ));
        Transition {
            next: SessionState {
                stage: Stage::Message(prompt),
                cursor,
            },
            effects,
        }
    }

    fn enter_done(&self, cursor: usize, mut effects: Vec<Effect>) -> Transition {
        effects.extend([
            Effect::Terminate,
            Effect::Show(DisplayImage::Done),
            Effect::Schedule(self.config.done()),
        ]);
        Transition {
            next: SessionState {
                stage: Stage::Done,
                cursor,
            },
            effects,
        }
    }
}
