use std::path::Path;
use std::time::Duration;

use f2f_core::{DisplayImage, MarkerKind, Prompt, Stage};
use f2f_sequencer::{
    CoordinatorCall, Presenter, RecordingCoordinator, Sequencer, SequencerConfig, StateMachine,
    StimulusOrder,
};
use f2f_timing::ManualTimer;

#[derive(Debug, Clone, PartialEq)]
enum Shown {
    Image(DisplayImage),
    Message(String),
    Timer(String, Option<Duration>),
    Closed,
}

#[derive(Default)]
struct RecordingPresenter {
    log: Vec<Shown>,
}

impl Presenter for RecordingPresenter {
    fn show(&mut self, image: &DisplayImage) {
        self.log.push(Shown::Image(image.clone()));
    }
    fn open_message(&mut self, text: &str) {
        self.log.push(Shown::Message(text.to_string()));
    }
    fn open_timer(&mut self, label: &str, limit: Option<Duration>) {
        self.log.push(Shown::Timer(label.to_string(), limit));
    }
    fn close(&mut self) {
        self.log.push(Shown::Closed);
    }
}

type TestSequencer = Sequencer<RecordingCoordinator, ManualTimer>;

fn sequencer(names: &[&str]) -> (TestSequencer, ManualTimer) {
    let order = StimulusOrder::from_names(names.iter().copied()).unwrap();
    sequencer_for(order)
}

fn sequencer_for(order: StimulusOrder) -> (TestSequencer, ManualTimer) {
    let timer = ManualTimer::new();
    let machine = StateMachine::new(SequencerConfig::default(), order, "00-01");
    let seq = Sequencer::new(machine, RecordingCoordinator::new(), timer.clone());
    (seq, timer)
}

/// Dismisses every window immediately and waits out every dwell.
fn run_to_end(seq: &mut TestSequencer, timer: &ManualTimer, presenter: &mut RecordingPresenter) {
    seq.start(presenter);
    for _ in 0..1_000 {
        if seq.is_finished() {
            return;
        }
        if seq.stage().advances_on_dismissal() {
            assert!(seq.dismiss(presenter));
        } else if let Some(wait) = seq.poll(presenter) {
            timer.advance(wait);
            seq.poll(presenter);
        }
    }
    panic!("sequence did not finish");
}

fn stim(name: &str) -> DisplayImage {
    DisplayImage::Stimulus(name.parse().unwrap())
}

#[test]
fn two_stimulus_session_end_to_end() {
    let (mut seq, timer) = sequencer(&["1a.jpg", "3b.jpg"]);
    let mut p = RecordingPresenter::default();

    seq.start(&mut p);
    assert_eq!(seq.stage(), Stage::Background);
    assert_eq!(seq.poll(&mut p), Some(Duration::from_secs(3)));

    timer.advance(Duration::from_secs(3));
    seq.poll(&mut p);
    assert_eq!(seq.stage(), Stage::Message(Prompt::Start));

    seq.dismiss(&mut p);
    assert_eq!(seq.stage(), Stage::Fixation);
    timer.advance(Duration::from_secs(3));
    seq.poll(&mut p);
    assert_eq!(seq.stage(), Stage::Stimulus);
    timer.advance(Duration::from_secs(6));
    seq.poll(&mut p);
    assert_eq!(seq.stage(), Stage::Timer);

    seq.dismiss(&mut p);
    assert_eq!(seq.stage(), Stage::Message(Prompt::Questionnaire));
    assert_eq!(seq.cursor(), 1);

    seq.dismiss(&mut p);
    timer.advance(Duration::from_secs(3));
    seq.poll(&mut p);
    timer.advance(Duration::from_secs(6));
    seq.poll(&mut p);
    assert_eq!(seq.stage(), Stage::Timer);

    seq.dismiss(&mut p);
    assert_eq!(seq.stage(), Stage::Done);
    timer.advance(Duration::from_secs(3));
    assert_eq!(seq.poll(&mut p), None);
    assert!(seq.is_finished());

    let limit = Some(Duration::from_secs(300));
    assert_eq!(
        p.log,
        vec![
            Shown::Image(DisplayImage::Background),
            Shown::Message("Start".into()),
            Shown::Image(DisplayImage::FixationCross),
            Shown::Image(stim("1a.jpg")),
            Shown::Timer("High-Valence, High-Arousal".into(), limit),
            Shown::Message("Please answer the questionnaire.".into()),
            Shown::Image(DisplayImage::FixationCross),
            Shown::Image(stim("3b.jpg")),
            Shown::Timer("Low-Valence, High-Arousal".into(), limit),
            Shown::Image(DisplayImage::Done),
            Shown::Closed,
        ]
    );

    let calls: Vec<_> = seq
        .coordinator()
        .calls
        .iter()
        .map(|c| match c {
            CoordinatorCall::Dispatch(m) => format!("{:?}:{}", m.kind, m.stimulus_id),
            CoordinatorCall::Terminate => "terminate".to_string(),
        })
        .collect();
    assert_eq!(
        calls,
        ["Start:1a", "Stop:1a", "Start:3b", "Stop:3b", "terminate"]
    );
}

#[test]
fn every_stimulus_visited_once_in_order() {
    let pool = ["1a.jpg", "2b.png", "3c.jpg", "4d.jpeg", "1e.jpg", "2f.jpg"];
    for n in 1..=pool.len() {
        let (mut seq, timer) = sequencer(&pool[..n]);
        let mut p = RecordingPresenter::default();
        run_to_end(&mut seq, &timer, &mut p);

        let mut expected = vec![(Stage::Background, 0)];
        for i in 0..n {
            let prompt = if i == 0 { Prompt::Start } else { Prompt::Questionnaire };
            expected.push((Stage::Message(prompt), i));
            expected.push((Stage::Fixation, i));
            expected.push((Stage::Stimulus, i));
            expected.push((Stage::Timer, i));
        }
        expected.push((Stage::Done, n));
        expected.push((Stage::Finished, n));

        let visited: Vec<_> = seq.history().iter().map(|s| (s.stage, s.cursor)).collect();
        assert_eq!(visited, expected, "n = {n}");
    }
}

#[test]
fn markers_pair_up_per_stimulus() {
    let names = ["1a.jpg", "2b.png", "3c.jpg", "4d.jpeg"];
    let (mut seq, timer) = sequencer(&names);
    let mut p = RecordingPresenter::default();
    run_to_end(&mut seq, &timer, &mut p);

    let markers: Vec<_> = seq.coordinator().markers().cloned().collect();
    assert_eq!(markers.len(), 2 * names.len());
    for (i, pair) in markers.chunks(2).enumerate() {
        let stem = names[i].split('.').next().unwrap();
        assert_eq!(pair[0].kind, MarkerKind::Start);
        assert_eq!(pair[1].kind, MarkerKind::Stop);
        assert_eq!(pair[0].stimulus_id, stem);
        assert_eq!(pair[1].stimulus_id, stem);
        assert_eq!(pair[0].experiment_id, "00-01");
    }

    let calls = &seq.coordinator().calls;
    assert_eq!(calls.last(), Some(&CoordinatorCall::Terminate));
    assert_eq!(
        calls.iter().filter(|c| **c == CoordinatorCall::Terminate).count(),
        1
    );
}

#[test]
fn dwell_never_fires_early() {
    let (mut seq, timer) = sequencer(&["1a.jpg"]);
    let mut p = RecordingPresenter::default();
    seq.start(&mut p);
    timer.advance(Duration::from_secs(3));
    seq.poll(&mut p);
    seq.dismiss(&mut p);
    assert_eq!(seq.stage(), Stage::Fixation);

    timer.advance(Duration::from_millis(2_999));
    assert_eq!(seq.poll(&mut p), Some(Duration::from_millis(1)));
    assert_eq!(seq.stage(), Stage::Fixation);

    timer.advance(Duration::from_millis(1));
    seq.poll(&mut p);
    assert_eq!(seq.stage(), Stage::Stimulus);

    timer.advance(Duration::from_millis(5_999));
    seq.poll(&mut p);
    assert_eq!(seq.stage(), Stage::Stimulus);
    timer.advance(Duration::from_millis(1));
    seq.poll(&mut p);
    assert_eq!(seq.stage(), Stage::Timer);
}

#[test]
fn background_waits_the_full_three_seconds() {
    let (mut seq, timer) = sequencer(&["1a.jpg"]);
    let mut p = RecordingPresenter::default();
    seq.start(&mut p);

    timer.advance(Duration::from_millis(2_999));
    assert_eq!(seq.poll(&mut p), Some(Duration::from_millis(1)));
    assert_eq!(seq.stage(), Stage::Background);
    assert_eq!(p.log, vec![Shown::Image(DisplayImage::Background)]);

    timer.advance(Duration::from_millis(1));
    seq.poll(&mut p);
    assert_eq!(seq.stage(), Stage::Message(Prompt::Start));
    assert_eq!(p.log.last(), Some(&Shown::Message("Start".into())));
}

#[test]
fn done_screen_closes_only_after_its_dwell() {
    let (mut seq, timer) = sequencer(&["1a.jpg"]);
    let mut p = RecordingPresenter::default();
    seq.start(&mut p);
    timer.advance(Duration::from_secs(3));
    seq.poll(&mut p);
    seq.dismiss(&mut p);
    timer.advance(Duration::from_secs(3));
    seq.poll(&mut p);
    timer.advance(Duration::from_secs(6));
    seq.poll(&mut p);
    seq.dismiss(&mut p);
    assert_eq!(seq.stage(), Stage::Done);

    timer.advance(Duration::from_millis(2_999));
    assert_eq!(seq.poll(&mut p), Some(Duration::from_millis(1)));
    assert!(!seq.is_finished());
    assert!(!p.log.contains(&Shown::Closed));
    assert!(!seq.dismiss(&mut p));

    timer.advance(Duration::from_millis(1));
    assert_eq!(seq.poll(&mut p), None);
    assert!(seq.is_finished());
    assert_eq!(p.log.last(), Some(&Shown::Closed));
}

#[test]
fn dismissal_is_immediate_and_ignored_during_dwell() {
    let (mut seq, timer) = sequencer(&["1a.jpg"]);
    let mut p = RecordingPresenter::default();
    seq.start(&mut p);

    // Background waits for its delay, not for a click.
    assert!(!seq.dismiss(&mut p));
    assert_eq!(seq.stage(), Stage::Background);

    timer.advance(Duration::from_secs(3));
    seq.poll(&mut p);
    // No time passes between opening the message and dismissing it.
    assert!(seq.dismiss(&mut p));
    assert_eq!(seq.stage(), Stage::Fixation);

    assert!(!seq.dismiss(&mut p));
    assert_eq!(seq.stage(), Stage::Fixation);
    assert_eq!(seq.coordinator().markers().count(), 1);
}

#[test]
fn a_late_poll_advances_one_dwell_at_a_time() {
    let (mut seq, timer) = sequencer(&["1a.jpg"]);
    let mut p = RecordingPresenter::default();
    seq.start(&mut p);
    timer.advance(Duration::from_secs(3));
    seq.poll(&mut p);
    seq.dismiss(&mut p);

    // Only one dwell is queued at a time, so a long stall advances one stage.
    timer.advance(Duration::from_secs(60));
    seq.poll(&mut p);
    assert_eq!(seq.stage(), Stage::Stimulus);
}

fn run_from_file(path: &Path) -> (Vec<(Stage, usize)>, Vec<Shown>, Vec<CoordinatorCall>) {
    let order = StimulusOrder::read(path).unwrap();
    let (mut seq, timer) = sequencer_for(order);
    let mut p = RecordingPresenter::default();
    run_to_end(&mut seq, &timer, &mut p);
    let history = seq.history().iter().map(|s| (s.stage, s.cursor)).collect();
    (history, p.log, seq.into_coordinator().calls)
}

#[test]
fn same_order_file_gives_the_same_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("p00_stimuli.csv");
    std::fs::write(&path, "2a.jpg\n4b.jpg\n1c.jpg\n").unwrap();

    assert_eq!(run_from_file(&path), run_from_file(&path));
}
