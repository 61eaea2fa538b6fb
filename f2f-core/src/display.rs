use crate::stimulus::StimulusId;

/// Physical display a window is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Surface {
    Participant,
    Navigator,
}

/// What both surfaces currently show.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DisplayImage {
    #[default]
    Background,
    FixationCross,
    Stimulus(StimulusId),
    Done,
}
