use std::process::{Child, Command};
use std::thread;
use std::time::{Duration, Instant};

use f2f_core::ControlMessage;
use f2f_sequencer::coordinator::post_message;
use reqwest::blocking::Client;
use tracing::{debug, info, warn};

use crate::config::LauncherConfig;
use crate::error::LaunchError;
use crate::plan::DevicePlan;
use crate::session::SensingBackend;

const EXIT_POLL: Duration = Duration::from_millis(100);

/// Runs the coordinator service as a child process.
pub struct ProcessBackend {
    config: LauncherConfig,
    child: Option<Child>,
}

impl ProcessBackend {
    pub fn new(config: LauncherConfig) -> Self {
        Self {
            config,
            child: None,
        }
    }

    fn command(&self, program: &str, args: &[String], plan: &DevicePlan) -> Command {
        let mut command = Command::new(program);
        command.args(
            self.config
                .expand_args(args, plan.manifest(), plan.output_dir()),
        );
        command
    }

    fn request_terminate(&self) {
        let url = self.config.control_endpoint.url();
        let client = match Client::builder().timeout(Duration::from_secs(5)).build() {
            Ok(client) => client,
            Err(e) => {
                warn!("cannot build HTTP client for {url}: {e}");
                return;
            }
        };
        match post_message(&client, &url, &ControlMessage::Terminate) {
            Ok(()) => debug!("terminate sent to {url}"),
            Err(e) => warn!("terminate to {url} failed: {e}"),
        }
    }
}

impl SensingBackend for ProcessBackend {
    fn start(&mut self, plan: &DevicePlan) -> Result<(), LaunchError> {
        let spec = &self.config.service;
        let child = self
            .command(&spec.program, &spec.args, plan)
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                program: spec.program.clone(),
                source,
            })?;
        info!(
            pid = child.id(),
            "service `{}` listening on {}",
            spec.program,
            self.config.control_endpoint.url()
        );
        self.child = Some(child);

        let delay = self.config.startup_delay();
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), LaunchError> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        self.request_terminate();

        let deadline = Instant::now() + self.config.shutdown_timeout();
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    info!("service exited with {status}");
                    return Ok(());
                }
                Ok(None) if Instant::now() < deadline => thread::sleep(EXIT_POLL),
                Ok(None) => break,
                Err(e) => {
                    warn!("cannot query service status: {e}");
                    break;
                }
            }
        }

        warn!(pid = child.id(), "service did not exit in time, killing it");
        if let Err(e) = child.kill() {
            warn!("kill failed: {e}");
        }
        let _ = child.wait();
        Ok(())
    }

    fn preprocess(&mut self, plan: &DevicePlan) -> Result<(), LaunchError> {
        let spec = &self.config.preprocessing;
        info!(
            eeg_rate = spec.eeg_rate,
            shimmer_rate = spec.shimmer_rate,
            "preprocessing {} with `{}`",
            plan.output_dir().display(),
            spec.program
        );
        let status = self
            .command(&spec.program, &spec.args, plan)
            .status()
            .map_err(|source| LaunchError::Spawn {
                program: spec.program.clone(),
                source,
            })?;
        if !status.success() {
            return Err(LaunchError::Preprocessing {
                program: spec.program.clone(),
                status: status.to_string(),
            });
        }
        Ok(())
    }
}

impl Drop for ProcessBackend {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            warn!(pid = child.id(), "service still running at exit, killing it");
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}
