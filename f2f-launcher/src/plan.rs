use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use f2f_core::ParticipantId;
use serde::Serialize;
use tracing::info;

use crate::config::{DeviceSpec, LauncherConfig};
use crate::error::LaunchError;

pub const MANIFEST_NAME: &str = "devices.json";

#[derive(Serialize)]
struct Manifest<'a> {
    participant: u32,
    output_path: &'a Path,
    devices: &'a [DeviceSpec],
}

/// The validated set of devices for one participant, with its output
/// directory already claimed.
#[derive(Debug, Clone)]
pub struct DevicePlan {
    participant: ParticipantId,
    output_dir: PathBuf,
    manifest: PathBuf,
    devices: Vec<DeviceSpec>,
}

impl DevicePlan {
    /// Checks the device list, then creates `{output_root}/p{participant}`
    /// and writes the manifest into it. A directory left by an earlier run
    /// is never reused.
    pub fn assemble(config: &LauncherConfig, participant: ParticipantId) -> Result<Self, LaunchError> {
        validate(&config.devices)?;

        let output_dir = config.output_root.join(format!("p{participant}"));
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source: std::io::Error| LaunchError::Output { path, source }
        };

        fs::create_dir_all(&config.output_root).map_err(io_err(&config.output_root))?;
        match fs::create_dir(&output_dir) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(LaunchError::OutputExists(output_dir));
            }
            Err(e) => return Err(io_err(&output_dir)(e)),
        }

        let manifest = output_dir.join(MANIFEST_NAME);
        let body = Manifest {
            participant: participant.0,
            output_path: &output_dir,
            devices: &config.devices,
        };
        let json = serde_json::to_string_pretty(&body)
            .map_err(|e| LaunchError::InvalidPlan(e.to_string()))?;
        fs::write(&manifest, json).map_err(io_err(&manifest))?;

        info!(
            participant = participant.0,
            devices = ?config.devices.iter().map(DeviceSpec::name).collect::<Vec<_>>(),
            "device plan written to {}",
            manifest.display()
        );

        Ok(Self {
            participant,
            output_dir,
            manifest,
            devices: config.devices.clone(),
        })
    }

    pub fn participant(&self) -> ParticipantId {
        self.participant
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn manifest(&self) -> &Path {
        &self.manifest
    }

    pub fn devices(&self) -> &[DeviceSpec] {
        &self.devices
    }
}

fn validate(devices: &[DeviceSpec]) -> Result<(), LaunchError> {
    let mut names = HashSet::new();
    for device in devices {
        if device.name().is_empty() {
            return Err(LaunchError::InvalidPlan("device with an empty name".into()));
        }
        if !names.insert(device.name()) {
            return Err(LaunchError::InvalidPlan(format!(
                "device name `{}` is used twice",
                device.name()
            )));
        }
        if let DeviceSpec::Eeg {
            name,
            channels_order,
            ..
        } = device
        {
            if channels_order.is_empty() {
                return Err(LaunchError::InvalidPlan(format!(
                    "EEG device `{name}` has no channels"
                )));
            }
            let mut seen = HashSet::new();
            if let Some(dup) = channels_order.iter().find(|c| !seen.insert(c.as_str())) {
                return Err(LaunchError::InvalidPlan(format!(
                    "EEG device `{name}` lists channel `{dup}` twice"
                )));
            }
        }
    }
    Ok(())
}
