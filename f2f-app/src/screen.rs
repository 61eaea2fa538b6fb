use std::path::{Path, PathBuf};
use std::time::Duration;

use f2f_core::DisplayImage;
use f2f_render::Overlay;
use f2f_sequencer::{AssetPaths, Presenter};
use f2f_timing::Timer;

enum Modal {
    None,
    Message(String),
    Timer {
        label: String,
        limit: Option<Duration>,
        opened_at: u64,
    },
}

/// What the windows should be showing, as told by the sequencer.
///
/// The event loop reads it back to draw frames; nothing here touches a
/// window directly.
pub struct ScreenState<T: Timer<Timestamp = u64>> {
    assets: AssetPaths,
    timer: T,
    image: PathBuf,
    modal: Modal,
    shown_clock: Option<String>,
    dirty: bool,
    closed: bool,
}

impl<T: Timer<Timestamp = u64>> ScreenState<T> {
    pub fn new(assets: AssetPaths, timer: T) -> Self {
        let image = assets.resolve(&DisplayImage::Background);
        Self {
            assets,
            timer,
            image,
            modal: Modal::None,
            shown_clock: None,
            dirty: true,
            closed: false,
        }
    }

    pub fn image_path(&self) -> &Path {
        &self.image
    }

    pub fn overlay(&self) -> Overlay {
        match &self.modal {
            Modal::None => Overlay::None,
            Modal::Message(text) => Overlay::Message(text.clone()),
            Modal::Timer { label, .. } => Overlay::Timer {
                label: label.clone(),
                clock: self.clock().unwrap_or_default(),
            },
        }
    }

    /// Counts down to the limit, or up from zero when there is none.
    fn clock(&self) -> Option<String> {
        let Modal::Timer {
            limit, opened_at, ..
        } = &self.modal
        else {
            return None;
        };
        let elapsed = self.timer.elapsed(*opened_at);
        Some(match limit {
            Some(limit) => {
                let left = limit.saturating_sub(elapsed);
                // Round up so the clock reads 00:00 only when time is up.
                let secs = left.as_secs() + u64::from(left.subsec_nanos() > 0);
                format_clock(secs)
            }
            None => format_clock(elapsed.as_secs()),
        })
    }

    /// The conversation timer has run out and should close itself.
    pub fn timer_expired(&self) -> bool {
        match &self.modal {
            Modal::Timer {
                limit: Some(limit),
                opened_at,
                ..
            } => self.timer.elapsed(*opened_at) >= *limit,
            _ => false,
        }
    }

    /// How long until the visible clock changes or the timer runs out.
    pub fn next_tick(&self) -> Option<Duration> {
        let Modal::Timer {
            limit, opened_at, ..
        } = &self.modal
        else {
            return None;
        };
        let elapsed = self.timer.elapsed(*opened_at);
        let to_next_second = Duration::from_secs(1) - Duration::from_nanos(u64::from(elapsed.subsec_nanos()));
        Some(match limit {
            Some(limit) => to_next_second.min(limit.saturating_sub(elapsed)),
            None => to_next_second,
        })
    }

    /// Returns whether a redraw is needed and clears the flag.
    pub fn take_dirty(&mut self) -> bool {
        let clock = self.clock();
        if clock != self.shown_clock {
            self.shown_clock = clock;
            self.dirty = true;
        }
        std::mem::take(&mut self.dirty)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl<T: Timer<Timestamp = u64>> Presenter for ScreenState<T> {
    fn show(&mut self, image: &DisplayImage) {
        self.image = self.assets.resolve(image);
        self.modal = Modal::None;
        self.dirty = true;
    }

    fn open_message(&mut self, text: &str) {
        self.modal = Modal::Message(text.to_string());
        self.dirty = true;
    }

    fn open_timer(&mut self, label: &str, limit: Option<Duration>) {
        self.modal = Modal::Timer {
            label: label.to_string(),
            limit,
            opened_at: self.timer.now(),
        };
        self.dirty = true;
    }

    fn close(&mut self) {
        self.modal = Modal::None;
        self.closed = true;
        self.dirty = true;
    }
}

pub fn format_clock(total_secs: u64) -> String {
    format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
}
