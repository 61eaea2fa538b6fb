use std::time::Duration;

use chrono::Local;
use f2f_core::{DisplayImage, Stage};
use f2f_timing::{DeferredQueue, Timer};
use tracing::{debug, info};

use crate::coordinator::Coordinator;
use crate::state::{Effect, SequenceEvent, SessionState, StateMachine, Transition};

/// Display side of the sequence: the two image surfaces plus the blocking
/// message and timer windows.
pub trait Presenter {
    fn show(&mut self, image: &DisplayImage);
    fn open_message(&mut self, text: &str);
    fn open_timer(&mut self, label: &str, limit: Option<Duration>);
    fn close(&mut self);
}

/// Drives a [`StateMachine`] on a cooperative loop.
///
/// Dwell transitions are queued as deferred events and fired by [`poll`];
/// dismissals come in through [`dismiss`]. Both go through the same
/// transition function and effect handling.
///
/// [`poll`]: Sequencer::poll
/// [`dismiss`]: Sequencer::dismiss
pub struct Sequencer<C, T>
where
    C: Coordinator,
    T: Timer<Timestamp = u64>,
{
    machine: StateMachine,
    state: SessionState,
    coordinator: C,
    timer: T,
    pending: DeferredQueue<SequenceEvent>,
    history: Vec<SessionState>,
    started: bool,
}

impl<C, T> Sequencer<C, T>
where
    C: Coordinator,
    T: Timer<Timestamp = u64>,
{
    pub fn new(machine: StateMachine, coordinator: C, timer: T) -> Self {
        Self {
            machine,
            state: SessionState::default(),
            coordinator,
            timer,
            pending: DeferredQueue::new(),
            history: Vec::new(),
            started: false,
        }
    }

    /// Enters the background stage. Calling it again has no effect.
    pub fn start(&mut self, presenter: &mut impl Presenter) {
        if self.started {
            return;
        }
        self.started = true;
        info!(
            experiment = self.machine.experiment_id(),
            stimuli = self.machine.order().len(),
            "emotion order is {:?}",
            self.machine
                .order()
                .iter()
                .map(|s| s.file_name())
                .collect::<Vec<_>>()
        );
        let transition = self.machine.initial();
        self.apply(transition, presenter);
    }

    /// The message or timer window was closed.
    pub fn dismiss(&mut self, presenter: &mut impl Presenter) -> bool {
        self.deliver(SequenceEvent::Dismissed, presenter)
    }

    /// Fires every dwell event that is due and returns how long until the
    /// next one, if any is pending.
    pub fn poll(&mut self, presenter: &mut impl Presenter) -> Option<Duration> {
        loop {
            let now = self.timer.now();
            match self.pending.pop_due(now) {
                Some(event) => {
                    self.deliver(event, presenter);
                }
                None => break,
            }
        }
        let now = self.timer.now();
        self.pending
            .next_deadline()
            .map(|deadline| Duration::from_nanos(deadline.saturating_sub(now)))
    }

    pub fn stage(&self) -> Stage {
        self.state.stage
    }

    pub fn cursor(&self) -> usize {
        self.state.cursor
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Every state entered so far, starting with the background.
    pub fn history(&self) -> &[SessionState] {
        &self.history
    }

    pub fn is_finished(&self) -> bool {
        self.state.stage.is_terminal()
    }

    pub fn coordinator(&self) -> &C {
        &self.coordinator
    }

    pub fn into_coordinator(self) -> C {
        self.coordinator
    }

    fn deliver(&mut self, event: SequenceEvent, presenter: &mut impl Presenter) -> bool {
        match self.machine.step(&self.state, event) {
            Some(transition) => {
                self.apply(transition, presenter);
                true
            }
            None => {
                debug!(stage = self.state.stage.name(), ?event, "event ignored");
                false
            }
        }
    }

    fn apply(&mut self, transition: Transition, presenter: &mut impl Presenter) {
        let Transition { next, effects } = transition;
        self.state = next;
        self.history.push(next);

        let stimulus = if next.stage.is_trial() {
            self.machine.order().get(next.cursor).map(|s| s.file_name())
        } else {
            None
        };
        info!(
            stage = next.stage.name(),
            cursor = next.cursor,
            stimulus = stimulus.unwrap_or("-"),
            at = %Local::now().format("%Y-%m-%d %H:%M:%S%.6f"),
            "transition"
        );

        for effect in effects {
            match effect {
                Effect::Show(image) => presenter.show(&image),
                Effect::OpenMessage(text) => presenter.open_message(&text),
                Effect::OpenTimer { label, limit } => presenter.open_timer(label, limit),
                Effect::Dispatch(marker) => {
                    debug!(kind = ?marker.kind, stimulus = %marker.stimulus_id, "dispatch");
                    self.coordinator.dispatch(marker);
                }
                Effect::Terminate => self.coordinator.terminate(),
                Effect::Schedule(delay) => {
                    let deadline = self.timer.now() + delay.as_nanos() as u64;
                    self.pending.push(deadline, SequenceEvent::DwellElapsed);
                }
                Effect::Close => {
                    self.pending.clear();
                    presenter.close();
                }
            }
        }
    }
}
