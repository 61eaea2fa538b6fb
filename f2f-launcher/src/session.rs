//! Session lifecycle as a chain of owned states.
//!
//! Devices are planned before the service can start, and the service is
//! stopped before preprocessing can run. Each step consumes the previous
//! state, so neither order can be broken by the caller.

use f2f_core::ParticipantId;
use tracing::{info, warn};

use crate::config::LauncherConfig;
use crate::error::LaunchError;
use crate::plan::DevicePlan;

/// Whatever actually runs the recording devices.
pub trait SensingBackend {
    fn start(&mut self, plan: &DevicePlan) -> Result<(), LaunchError>;
    fn stop(&mut self) -> Result<(), LaunchError>;
    fn preprocess(&mut self, plan: &DevicePlan) -> Result<(), LaunchError>;
}

impl<B: SensingBackend + ?Sized> SensingBackend for Box<B> {
    fn start(&mut self, plan: &DevicePlan) -> Result<(), LaunchError> {
        (**self).start(plan)
    }

    fn stop(&mut self) -> Result<(), LaunchError> {
        (**self).stop()
    }

    fn preprocess(&mut self, plan: &DevicePlan) -> Result<(), LaunchError> {
        (**self).preprocess(plan)
    }
}

#[derive(Debug)]
pub struct AssembledSession {
    plan: DevicePlan,
}

impl AssembledSession {
    pub fn new(plan: DevicePlan) -> Self {
        Self { plan }
    }

    pub fn assemble(config: &LauncherConfig, participant: ParticipantId) -> Result<Self, LaunchError> {
        DevicePlan::assemble(config, participant).map(Self::new)
    }

    pub fn plan(&self) -> &DevicePlan {
        &self.plan
    }

    pub fn start<B: SensingBackend>(self, mut backend: B) -> Result<RunningSession<B>, LaunchError> {
        backend.start(&self.plan)?;
        info!(participant = self.plan.participant().0, "sensing session started");
        Ok(RunningSession {
            plan: self.plan,
            backend,
        })
    }
}

pub struct RunningSession<B: SensingBackend> {
    plan: DevicePlan,
    backend: B,
}

impl<B: SensingBackend> RunningSession<B> {
    pub fn plan(&self) -> &DevicePlan {
        &self.plan
    }

    /// Never fails: a service that will not stop cleanly is logged and the
    /// session is considered stopped anyway.
    pub fn stop(mut self) -> StoppedSession<B> {
        match self.backend.stop() {
            Ok(()) => info!("sensing session stopped"),
            Err(e) => warn!("sensing session did not stop cleanly: {e}"),
        }
        StoppedSession {
            plan: self.plan,
            backend: self.backend,
        }
    }
}

pub struct StoppedSession<B: SensingBackend> {
    plan: DevicePlan,
    backend: B,
}

impl<B: SensingBackend> StoppedSession<B> {
    pub fn plan(&self) -> &DevicePlan {
        &self.plan
    }

    pub fn preprocess(mut self) -> Result<DevicePlan, LaunchError> {
        self.backend.preprocess(&self.plan)?;
        Ok(self.plan)
    }
}
