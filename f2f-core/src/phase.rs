/// Instructional message shown before each fixation cross
#[derive(Copy, Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    Start,
    Questionnaire,
}

/// Stages of the stimulus sequence, cycled once per stimulus
#[derive(Copy, Debug, Clone, PartialEq, Eq, Default)]
pub enum Stage {
    #[default]
    Background,
    Message(Prompt),
    Fixation,
    Stimulus,
    Timer,
    Done,
    Finished,
}

impl Stage {
    /// Left after a fixed delay scheduled on entry.
    pub fn advances_on_dwell(&self) -> bool {
        matches!(
            self,
            Self::Background | Self::Fixation | Self::Stimulus | Self::Done
        )
    }

    /// Left when a blocking sub-window is dismissed.
    pub fn advances_on_dismissal(&self) -> bool {
        matches!(self, Self::Message(_) | Self::Timer)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished)
    }

    /// True while a stimulus index is being worked through.
    pub fn is_trial(&self) -> bool {
        matches!(self, Self::Fixation | Self::Stimulus | Self::Timer)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Background => "background",
            Self::Message(Prompt::Start) => "message:start",
            Self::Message(Prompt::Questionnaire) => "message:questionnaire",
            Self::Fixation => "fixation",
            Self::Stimulus => "stimulus",
            Self::Timer => "timer",
            Self::Done => "done",
            Self::Finished => "finished",
        }
    }
}
