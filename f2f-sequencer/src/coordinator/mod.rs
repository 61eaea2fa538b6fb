//! The external device coordinator, as seen from the sequencer.
//!
//! The sequencer only ever hands markers over and asks for teardown once;
//! nothing it does depends on whether the coordinator succeeded.

mod http;

pub use http::{HttpCoordinator, post_message};

use f2f_core::Marker;
use tracing::info;

pub trait Coordinator {
    /// Fire-and-forget.
    fn dispatch(&mut self, marker: Marker);
    /// Session teardown. Called once, when the sequence is done.
    fn terminate(&mut self);
}

impl<C: Coordinator + ?Sized> Coordinator for Box<C> {
    fn dispatch(&mut self, marker: Marker) {
        (**self).dispatch(marker)
    }

    fn terminate(&mut self) {
        (**self).terminate()
    }
}

/// Coordinator that only logs. Used when no sensing session is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCoordinator;

impl Coordinator for NullCoordinator {
    fn dispatch(&mut self, marker: Marker) {
        info!(
            experiment = %marker.experiment_id,
            stimulus = %marker.stimulus_id,
            kind = ?marker.kind,
            "marker (no coordinator attached)"
        );
    }

    fn terminate(&mut self) {
        info!("terminate (no coordinator attached)");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorCall {
    Dispatch(Marker),
    Terminate,
}

/// Keeps every call, in order.
#[derive(Debug, Default, Clone)]
pub struct RecordingCoordinator {
    pub calls: Vec<CoordinatorCall>,
}

impl RecordingCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn markers(&self) -> impl Iterator<Item = &Marker> {
        self.calls.iter().filter_map(|c| match c {
            CoordinatorCall::Dispatch(m) => Some(m),
            CoordinatorCall::Terminate => None,
        })
    }
}

impl Coordinator for RecordingCoordinator {
    fn dispatch(&mut self, marker: Marker) {
        self.calls.push(CoordinatorCall::Dispatch(marker));
    }

    fn terminate(&mut self) {
        self.calls.push(CoordinatorCall::Terminate);
    }
}
