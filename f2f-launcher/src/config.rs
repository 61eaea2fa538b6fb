use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::LaunchError;

/// One recording device of the sensing session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeviceSpec {
    Eeg {
        name: String,
        board_type: String,
        #[serde(default)]
        serial_port: Option<String>,
        channels_order: Vec<String>,
        #[serde(default)]
        sampling_rate: Option<u32>,
    },
    Audio {
        name: String,
        device_index: u32,
    },
    Camera {
        name: String,
        camera_path: String,
        image_width: u32,
        image_height: u32,
    },
    Shimmer {
        name: String,
        serial_port: String,
        #[serde(default)]
        sampling_rate: Option<u32>,
    },
}

impl DeviceSpec {
    pub fn name(&self) -> &str {
        match self {
            DeviceSpec::Eeg { name, .. }
            | DeviceSpec::Audio { name, .. }
            | DeviceSpec::Camera { name, .. }
            | DeviceSpec::Shimmer { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn url(&self) -> String {
        format!("http://{}:{}/", self.host, self.port)
    }
}

/// An external program and its argument template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// The post-session preprocessing command and the sampling rates it is
/// told the recordings were taken at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreprocessSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    pub eeg_rate: u32,
    pub shimmer_rate: u32,
}

impl Default for PreprocessSpec {
    fn default() -> Self {
        Self {
            program: "python3".into(),
            args: [
                "preprocess.py",
                "--input",
                "{output}",
                "--eeg-rate",
                "{eeg_rate}",
                "--shimmer-rate",
                "{shimmer_rate}",
            ]
            .iter()
            .map(|a| a.to_string())
            .collect(),
            // Cyton-Daisy boards stream at 125 Hz, Shimmer3 GSR units at 128 Hz.
            eeg_rate: 125,
            shimmer_rate: 128,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    pub output_root: PathBuf,
    pub devices: Vec<DeviceSpec>,
    pub control_endpoint: Endpoint,
    pub monitoring_endpoint: Option<Endpoint>,
    pub service: CommandSpec,
    pub preprocessing: PreprocessSpec,
    pub startup_delay_ms: u64,
    pub shutdown_timeout_ms: u64,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        let channels = [
            "Fp1", "Fp2", "F7", "F3", "F4", "F8", "T3", "C3", "C4", "T4", "T5", "P3", "P4", "T6",
            "O1", "O2",
        ];
        Self {
            output_root: "output_remote".into(),
            devices: vec![
                DeviceSpec::Camera {
                    name: "webcam".into(),
                    camera_path: "/dev/v4l/by-id/usb-046d_081b_97E6A7D0-video-index0".into(),
                    image_width: 640,
                    image_height: 480,
                },
                DeviceSpec::Audio {
                    name: "Audio".into(),
                    device_index: 0,
                },
                DeviceSpec::Eeg {
                    name: "eeg".into(),
                    board_type: "cyton-daisy".into(),
                    serial_port: None,
                    channels_order: channels.iter().map(|c| c.to_string()).collect(),
                    sampling_rate: None,
                },
            ],
            control_endpoint: Endpoint {
                host: "127.0.0.1".into(),
                port: 9331,
            },
            monitoring_endpoint: None,
            service: CommandSpec {
                program: "python3".into(),
                args: [
                    "sensing_service.py",
                    "--manifest",
                    "{manifest}",
                    "--output",
                    "{output}",
                    "--port",
                    "{control_port}",
                ]
                .iter()
                .map(|a| a.to_string())
                .collect(),
            },
            preprocessing: PreprocessSpec::default(),
            startup_delay_ms: 2_000,
            shutdown_timeout_ms: 10_000,
        }
    }
}

impl LauncherConfig {
    pub fn load(path: &Path) -> Result<Self, LaunchError> {
        let text = fs::read_to_string(path).map_err(|source| LaunchError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| LaunchError::ConfigJson {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// Fills `{manifest}`, `{output}`, `{control_port}`, `{monitoring_port}`,
    /// `{eeg_rate}` and `{shimmer_rate}` in each argument. `{monitoring_port}`
    /// is empty when no monitoring endpoint is configured.
    pub fn expand_args(&self, args: &[String], manifest: &Path, output: &Path) -> Vec<String> {
        let values = [
            ("{manifest}", manifest.display().to_string()),
            ("{output}", output.display().to_string()),
            ("{control_port}", self.control_endpoint.port.to_string()),
            (
                "{monitoring_port}",
                self.monitoring_endpoint
                    .as_ref()
                    .map(|e| e.port.to_string())
                    .unwrap_or_default(),
            ),
            ("{eeg_rate}", self.preprocessing.eeg_rate.to_string()),
            ("{shimmer_rate}", self.preprocessing.shimmer_rate.to_string()),
        ];
        args.iter()
            .map(|arg| {
                values
                    .iter()
                    .fold(arg.clone(), |acc, (key, value)| acc.replace(key, value))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_record_the_lab_setup() {
        let config = LauncherConfig::default();
        assert_eq!(config.output_root, PathBuf::from("output_remote"));
        let eeg = config
            .devices
            .iter()
            .find_map(|d| match d {
                DeviceSpec::Eeg {
                    board_type,
                    channels_order,
                    ..
                } => Some((board_type.clone(), channels_order.len())),
                _ => None,
            })
            .unwrap();
        assert_eq!(eeg, ("cyton-daisy".to_string(), 16));
        assert_eq!(config.control_endpoint.url(), "http://127.0.0.1:9331/");
    }

    #[test]
    fn devices_are_tagged_by_kind() {
        let json = r#"{
            "devices": [
                {"kind": "shimmer", "name": "gsr", "serial_port": "/dev/rfcomm0", "sampling_rate": 128},
                {"kind": "audio", "name": "mic", "device_index": 2}
            ],
            "monitoring_endpoint": {"host": "0.0.0.0", "port": 9330}
        }"#;
        let config: LauncherConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.devices.len(), 2);
        assert_eq!(config.devices[0].name(), "gsr");
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn placeholders_are_filled() {
        let mut config = LauncherConfig::default();
        config.monitoring_endpoint = Some(Endpoint {
            host: "0.0.0.0".into(),
            port: 9330,
        });
        let args: Vec<String> = [
            "--m={manifest}",
            "{output}",
            "{control_port}:{monitoring_port}",
            "{shimmer_rate}/{eeg_rate}",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let expanded = config.expand_args(&args, Path::new("out/p3/devices.json"), Path::new("out/p3"));
        assert_eq!(
            expanded,
            ["--m=out/p3/devices.json", "out/p3", "9331:9330", "128/125"]
        );
    }

    #[test]
    fn preprocessing_always_gets_both_rates() {
        let plan_paths = (Path::new("out/p3/devices.json"), Path::new("out/p3"));
        let mut variants = vec![LauncherConfig::default()];
        for file in ["endpoint.json", "presenter.json"] {
            let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config").join(file);
            variants.push(LauncherConfig::load(&path).unwrap());
        }

        for config in variants {
            let args = config.expand_args(&config.preprocessing.args, plan_paths.0, plan_paths.1);
            let rate_of = |flag: &str| {
                let at = args.iter().position(|a| a == flag).unwrap();
                args[at + 1].clone()
            };
            assert_eq!(rate_of("--eeg-rate"), "125");
            assert_eq!(rate_of("--shimmer-rate"), "128");
            assert!(args.iter().all(|a| !a.is_empty() && !a.contains('{')));
        }
    }

    #[test]
    fn preprocessing_rates_are_required() {
        let json = r#"{"preprocessing": {"program": "python3", "args": ["{eeg_rate}"]}}"#;
        assert!(serde_json::from_str::<LauncherConfig>(json).is_err());
    }
}
