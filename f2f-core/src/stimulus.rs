use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DataError;

/// Valence/arousal category encoded by the first character of a stimulus file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmotionQuadrant {
    HighValenceHighArousal,
    HighValenceLowArousal,
    LowValenceHighArousal,
    LowValenceLowArousal,
}

impl EmotionQuadrant {
    pub const ALL: [EmotionQuadrant; 4] = [
        EmotionQuadrant::HighValenceHighArousal,
        EmotionQuadrant::HighValenceLowArousal,
        EmotionQuadrant::LowValenceHighArousal,
        EmotionQuadrant::LowValenceLowArousal,
    ];

    /// Decodes a quadrant code. Only `'1'..='4'` are valid.
    pub fn from_code(code: char) -> Option<Self> {
        use EmotionQuadrant::*;
        Some(match code {
            '1' => HighValenceHighArousal,
            '2' => HighValenceLowArousal,
            '3' => LowValenceHighArousal,
            '4' => LowValenceLowArousal,
            _ => return None,
        })
    }

    pub fn code(&self) -> char {
        match self {
            Self::HighValenceHighArousal => '1',
            Self::HighValenceLowArousal => '2',
            Self::LowValenceHighArousal => '3',
            Self::LowValenceLowArousal => '4',
        }
    }

    /// Label shown on the conversation timer.
    pub fn label(&self) -> &'static str {
        match self {
            Self::HighValenceHighArousal => "High-Valence, High-Arousal",
            Self::HighValenceLowArousal => "High-Valence, Low-Arousal",
            Self::LowValenceHighArousal => "Low-Valence, High-Arousal",
            Self::LowValenceLowArousal => "Low-Valence, Low-Arousal",
        }
    }
}

impl fmt::Display for EmotionQuadrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A stimulus image file name, e.g. `1a.jpg`.
///
/// The quadrant is decoded when the identifier is parsed, so every
/// `StimulusId` in a loaded order is known to carry a valid code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StimulusId {
    file_name: String,
    quadrant: EmotionQuadrant,
}

impl StimulusId {
    pub fn parse(file_name: &str) -> Result<Self, DataError> {
        let file_name = file_name.trim();
        let code = file_name.chars().next().ok_or(DataError::EmptyStimulusId)?;
        let quadrant =
            EmotionQuadrant::from_code(code).ok_or_else(|| DataError::UnknownEmotionCode {
                code,
                stimulus: file_name.to_string(),
            })?;

        Ok(Self {
            file_name: file_name.to_string(),
            quadrant,
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn quadrant(&self) -> EmotionQuadrant {
        self.quadrant
    }

    /// File name without its extension; this is what markers carry.
    pub fn stem(&self) -> &str {
        match self.file_name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => &self.file_name,
        }
    }
}

impl FromStr for StimulusId {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for StimulusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name)
    }
}
