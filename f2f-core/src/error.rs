use thiserror::Error;

/// Malformed stimulus data. These are never recoverable: the order file has
/// to be fixed before a session can run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataError {
    #[error("unknown emotion code {code:?} in stimulus {stimulus:?} (expected 1-4)")]
    UnknownEmotionCode { code: char, stimulus: String },

    #[error("empty stimulus identifier")]
    EmptyStimulusId,
}
