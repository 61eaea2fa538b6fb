mod app;
mod screen;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use chrono::Local;
use clap::Parser;
use f2f_core::{ExperimentId, ParticipantId};
use f2f_launcher::{AssembledSession, LauncherConfig, ProcessBackend};
use f2f_sequencer::order::order_path;
use f2f_sequencer::{
    Coordinator, HttpCoordinator, NullCoordinator, Sequencer, SequencerConfig, StateMachine,
    StimulusOrder, logging,
};
use f2f_timing::HighPrecisionTimer;
use tracing::info;

use app::{App, MonitorLayout};
use screen::ScreenState;

/// Face-to-face stimulus presenter
#[derive(Parser, Debug)]
#[command(name = "f2f")]
#[command(version, about = "Shows the emotion stimuli and marks each conversation", long_about = None)]
struct Cli {
    /// The subject ID
    #[arg(short, long, default_value_t = 0)]
    subject_id: u32,

    /// The task ID
    #[arg(short, long, default_value_t = 1)]
    task_id: u32,

    /// Sequencer config (JSON); study defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Control endpoint that receives the start/stop markers
    #[arg(long)]
    coordinator_url: Option<String>,

    /// Launcher config; starts the sensing session around the presentation
    #[arg(long)]
    session: Option<PathBuf>,

    /// TrueType/OpenType font for the message and timer text (bundled DejaVu Sans when omitted)
    #[arg(long)]
    font: Option<PathBuf>,

    /// Monitor index of the participant screen
    #[arg(long, default_value_t = 0)]
    participant_monitor: usize,

    /// Monitor index of the navigator screen
    #[arg(long, default_value_t = 1)]
    navigator_monitor: usize,

    /// Directory for the per-run log file
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    /// Logging verbosity level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let participant = ParticipantId(cli.subject_id);
    let experiment_id = ExperimentId::new(participant, cli.task_id);

    let log_path = logging::session_log_path(&cli.log_dir, experiment_id.as_str(), Local::now());
    logging::init(logging::parse_level(&cli.log_level), Some(&log_path))?;
    info!(experiment = %experiment_id, "logging to {}", log_path.display());

    let config = match &cli.config {
        Some(path) => SequencerConfig::load(path)?,
        None => SequencerConfig::default(),
    };
    let order = StimulusOrder::load_or_prepare(
        &order_path(&config.assets.order_dir, participant),
        &config.assets.stimuli_dir,
        participant,
        config.stimuli_per_quadrant,
    )
    .context("loading stimulus order")?;

    let session = match &cli.session {
        Some(path) => {
            let launcher = LauncherConfig::load(path)?;
            let running = AssembledSession::assemble(&launcher, participant)?
                .start(ProcessBackend::new(launcher.clone()))?;
            Some((running, launcher))
        }
        None => None,
    };

    let coordinator_url = cli.coordinator_url.clone().or_else(|| {
        session
            .as_ref()
            .map(|(_, launcher)| launcher.control_endpoint.url())
    });
    let coordinator: Box<dyn Coordinator> = match coordinator_url {
        Some(url) => {
            info!("markers go to {url}");
            Box::new(HttpCoordinator::new(url, Duration::from_secs(5)))
        }
        None => Box::new(NullCoordinator),
    };

    let timer = HighPrecisionTimer::new();
    let screen = ScreenState::new(config.assets.clone(), timer.clone());
    let machine = StateMachine::new(config, order, experiment_id.as_str());
    let sequencer = Sequencer::new(machine, coordinator, timer.clone());

    let font = app::resolve_font(cli.font.as_deref()).context("loading font")?;
    let layout = MonitorLayout {
        participant: cli.participant_monitor,
        navigator: cli.navigator_monitor,
    };
    // Dropping the sequencer flushes queued markers before the service stops.
    let outcome = App::new(sequencer, screen, timer, layout, font)
        .run()
        .map(drop);

    if let Some((running, _)) = session {
        let plan = running.stop().preprocess()?;
        info!("session data in {}", plan.output_dir().display());
    }
    outcome?;
    info!("experiment {experiment_id} done");
    Ok(())
}
