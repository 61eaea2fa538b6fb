use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use f2f_core::{DisplayImage, Prompt};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Image locations. Stimuli are resolved relative to `stimuli_dir`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetPaths {
    pub stimuli_dir: PathBuf,
    pub order_dir: PathBuf,
    pub background: PathBuf,
    pub fixation_cross: PathBuf,
    pub done: PathBuf,
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self {
            stimuli_dir: "stimuli/all_images".into(),
            order_dir: "stimuli/f2f".into(),
            background: "images/gray_image.jpg".into(),
            fixation_cross: "images/fixation_cross.jpg".into(),
            done: "images/done_image.jpg".into(),
        }
    }
}

impl AssetPaths {
    pub fn resolve(&self, image: &DisplayImage) -> PathBuf {
        match image {
            DisplayImage::Background => self.background.clone(),
            DisplayImage::FixationCross => self.fixation_cross.clone(),
            DisplayImage::Stimulus(id) => self.stimuli_dir.join(id.file_name()),
            DisplayImage::Done => self.done.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    pub background_ms: u64,
    pub fixation_ms: u64,
    pub stimulus_ms: u64,
    pub done_ms: u64,
    /// Countdown on the conversation timer; `None` counts up until dismissed.
    pub conversation_limit_ms: Option<u64>,
    pub start_message: String,
    pub questionnaire_message: String,
    /// Keep this many stimuli per quadrant when generating a missing order.
    pub stimuli_per_quadrant: Option<usize>,
    pub assets: AssetPaths,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            background_ms: 3_000,
            fixation_ms: 3_000,
            stimulus_ms: 6_000,
            done_ms: 3_000,
            conversation_limit_ms: Some(300_000),
            start_message: "Start".to_string(),
            questionnaire_message: "Please answer the questionnaire.".to_string(),
            stimuli_per_quadrant: None,
            assets: AssetPaths::default(),
        }
    }
}

impl SequencerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn prompt_text(&self, prompt: Prompt) -> &str {
        match prompt {
            Prompt::Start => &self.start_message,
            Prompt::Questionnaire => &self.questionnaire_message,
        }
    }

    pub fn background(&self) -> Duration {
        Duration::from_millis(self.background_ms)
    }

    pub fn fixation(&self) -> Duration {
        Duration::from_millis(self.fixation_ms)
    }

    pub fn stimulus(&self) -> Duration {
        Duration::from_millis(self.stimulus_ms)
    }

    pub fn done(&self) -> Duration {
        Duration::from_millis(self.done_ms)
    }

    pub fn conversation_limit(&self) -> Option<Duration> {
        self.conversation_limit_ms.map(Duration::from_millis)
    }
}
