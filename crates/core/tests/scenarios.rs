use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use beatlane_core::{
    parse_chart, BeatSource, DeclarativeSource, GeneratorConfig, HeadlessRenderer,
    JudgmentListener, JudgmentMode, Note, NoteHandle, NotePool, NoteSpec, ProceduralSource,
    RecycleMode, Scheduler, SchedulerConfig,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Hit,
    Missed,
}

/// Records every notification keyed by slot and scheduled time, so recycled
/// slots count as distinct notes.
#[derive(Clone, Default)]
struct SharedLog(Arc<Mutex<Vec<((usize, u64), Outcome)>>>);

impl SharedLog {
    fn entries(&self) -> Vec<((usize, u64), Outcome)> {
        self.0.lock().unwrap().clone()
    }
}

impl JudgmentListener for SharedLog {
    fn on_hit(&mut self, handle: NoteHandle, note: &Note) {
        self.0
            .lock()
            .unwrap()
            .push(((handle.index(), note.time().to_bits()), Outcome::Hit));
    }

    fn on_missed(&mut self, handle: NoteHandle, note: &Note) {
        self.0
            .lock()
            .unwrap()
            .push(((handle.index(), note.time().to_bits()), Outcome::Missed));
    }
}

fn scenario_generator() -> GeneratorConfig {
    GeneratorConfig {
        seed: 1234,
        loop_length: 16.0,
        notes_per_second_per_lane: 4.0,
        ..GeneratorConfig::default()
    }
}

#[test]
fn procedural_runs_are_reproducible() {
    let run = || {
        let mut source = ProceduralSource::new(scenario_generator(), 4);
        let mut out = Vec::new();
        source.produce_due(0.0, 16.0, &mut out);
        source.produce_due(16.0, 40.0, &mut out);
        out.iter()
            .map(|n| (n.time.to_bits(), n.lane, n.duration.to_bits(), n.pitch))
            .collect::<Vec<_>>()
    };
    assert_eq!(run(), run());
}

#[test]
fn first_loop_window_has_256_notes() {
    let notes = ProceduralSource::new(scenario_generator(), 4).generate_loop();
    assert_eq!(notes.len(), 256);
    assert!(notes.iter().all(|n| n.time >= 0.0 && n.time < 16.0));
}

#[test]
fn pool_never_exceeds_capacity() {
    let mut pool = NotePool::new(8);
    let mut live = Vec::new();
    for i in 0..8 {
        live.push(pool.acquire(Note::new(NoteSpec::new(i as f64, 0, 0.2, 60), Default::default())).unwrap());
    }
    let overflow = pool.acquire(Note::new(NoteSpec::new(9.0, 0, 0.2, 60), Default::default()));
    assert!(overflow.is_err());
    assert_eq!(pool.active_count(), 8);
}

#[test]
fn adjacent_note_is_cleared_with_the_hit_one() {
    let log = SharedLog::default();
    let config = SchedulerConfig::default();
    let source = DeclarativeSource::parse("1.0,60,0.2,2\n1.05,62,0.2,2\n", config.lanes);
    let mut scheduler = Scheduler::new(config, source, HeadlessRenderer::new()).with_listener(log.clone());

    scheduler.tick(0.95);
    scheduler.on_lane_input(2);
    scheduler.tick(0.0);
    scheduler.on_lane_input(2);
    scheduler.tick(0.0);

    let entries = log.entries();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|(_, outcome)| *outcome == Outcome::Hit));
    assert_ne!(entries[0].0, entries[1].0);
}

#[test]
fn declarative_scenario_keeps_valid_subset() {
    let chart = parse_chart("1.0,60,0.5,1\nbad,line\n2.0,-5,0.3,9\n", 4);
    assert_eq!(chart.notes.len(), 2);
    assert_eq!(chart.notes[0].lane, 1);
    assert_eq!(chart.notes[1].lane, 3);
    assert!(chart.notes[1].duration >= 0.0);
    assert_eq!(chart.issues.len(), 1);
    assert_eq!(chart.issues[0].line, 2);
}

#[test]
fn every_note_terminates_at_most_once_under_random_input() {
    let log = SharedLog::default();
    let mut config = SchedulerConfig::default();
    config.recycle.mode = RecycleMode::Loop;
    let source = ProceduralSource::new(config.generator.clone(), config.lanes);
    let mut scheduler = Scheduler::new(config, source, HeadlessRenderer::new()).with_listener(log.clone());

    for frame in 0..2_400u32 {
        if frame % 7 == 0 {
            scheduler.on_lane_input((frame as usize / 7) % 4);
        }
        scheduler.tick(1.0 / 60.0);
    }

    let mut seen: HashMap<(usize, u64), Outcome> = HashMap::new();
    for (key, outcome) in log.entries() {
        assert!(seen.insert(key, outcome).is_none(), "note {key:?} notified twice");
    }
    let stats = scheduler.stats();
    assert!(stats.hit > 0 && stats.missed > 0);
    assert_eq!(stats.hit + stats.missed, seen.len() as u64);
}

#[test]
fn rendered_note_is_shown_once_then_gone() {
    let mut config = SchedulerConfig::default();
    config.judgment.mode = JudgmentMode::Visualization;
    let source = DeclarativeSource::parse("20.0,60,0.4,0\n", config.lanes);
    let mut scheduler = Scheduler::new(config, source, HeadlessRenderer::new());

    let mut trail: Vec<(bool, bool)> = Vec::new();
    for _ in 0..1_800 {
        scheduler.tick(1.0 / 60.0);
        let renderer = scheduler.renderer();
        let observed = (!renderer.is_empty(), renderer.visible_count() == 1);
        if trail.last() != Some(&observed) {
            trail.push(observed);
        }
    }

    assert_eq!(trail, vec![(false, false), (true, true), (false, false)]);
    let stats = scheduler.stats();
    assert_eq!(stats.expired, 1);
    assert_eq!(stats.missed, 0);
}
