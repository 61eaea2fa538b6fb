//! Sensing-session endpoint.
//!
//! Before starting: power the devices, check the camera view and pair the
//! wearable sensors. Then start this with the participant id, and start the
//! presenter once the service is listening.

use std::io;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use f2f_core::ParticipantId;
use f2f_launcher::{AssembledSession, LauncherConfig, ProcessBackend, wait_for_quit};
use f2f_sequencer::logging;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "endpoint")]
#[command(version, about = "Runs the recording devices for one participant", long_about = None)]
struct Cli {
    /// The subject ID
    #[arg(short, long, default_value_t = 0)]
    subject_id: u32,

    /// Launcher config (JSON); built-in lab setup when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Logging verbosity level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(logging::parse_level(&cli.log_level), None)?;

    let config = match &cli.config {
        Some(path) => LauncherConfig::load(path)?,
        None => LauncherConfig::default(),
    };
    let participant = ParticipantId(cli.subject_id);

    let session = AssembledSession::assemble(&config, participant)
        .with_context(|| format!("preparing devices for participant {participant}"))?;
    let running = session.start(ProcessBackend::new(config.clone()))?;

    info!("start listening");
    wait_for_quit(io::stdin().lock(), io::stdout()).context("reading console")?;

    let plan = running.stop().preprocess()?;
    info!("session data in {}", plan.output_dir().display());
    Ok(())
}
