use serde::{Deserialize, Serialize};

use crate::{BeatSource, Note, NoteSpec, NoteState, RecycleConfig};

/// Fate of notes that leave the trailing edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecycleMode {
    /// Release the slot; the note is gone for good.
    Destroy,
    /// Push the note one loop length into the future and keep the slot.
    Loop,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecycleAction {
    Keep,
    Release,
    /// Rewrite the slot in place with this schedule.
    Reschedule(NoteSpec),
}

/// Decides, per note and tick, whether a slot is kept, released or
/// rescheduled, and when the procedural stream needs topping up.
#[derive(Debug, Clone)]
pub struct Recycler {
    config: RecycleConfig,
}

impl Recycler {
    pub fn new(config: RecycleConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RecycleConfig {
        &self.config
    }

    /// `passed` is whether the note has left the trailing edge this tick.
    /// Hit notes are released right away in destroy mode; in loop mode they
    /// stay hidden until they pass and are rescheduled with the rest.
    pub fn action(&self, note: &Note, passed: bool, source: &mut dyn BeatSource) -> RecycleAction {
        match self.config.mode {
            RecycleMode::Destroy if passed || note.state() == NoteState::Hit => RecycleAction::Release,
            RecycleMode::Destroy => RecycleAction::Keep,
            RecycleMode::Loop if !passed => RecycleAction::Keep,
            RecycleMode::Loop => match source.loop_length() {
                Some(loop_length) => {
                    let mut spec = *note.spec();
                    spec.time += loop_length;
                    if self.config.regenerate_on_recycle {
                        if let Some((pitch, duration)) = source.redraw(spec.lane, spec.time) {
                            spec.pitch = pitch;
                            spec.duration = duration;
                        }
                    }
                    RecycleAction::Reschedule(spec)
                }
                None => RecycleAction::Release,
            },
        }
    }

    /// Returns the time up to which new notes should be produced when the
    /// furthest scheduled note is closer than the ahead-fill margin.
    ///
    /// In loop mode the target never goes past the first loop window: later
    /// windows are populated by rescheduling, and producing them as well would
    /// grow the pool every loop.
    pub fn fill_target(&self, furthest: Option<f64>, front: f64, loop_length: Option<f64>) -> Option<f64> {
        let margin = self.config.ensure_ahead_fill;
        if margin <= 0.0 {
            return None;
        }
        let target = match furthest {
            Some(time) if time - front >= margin => return None,
            _ => front + margin,
        };
        match (self.config.mode, loop_length) {
            (RecycleMode::Loop, Some(loop_length)) => Some(target.min(loop_length)),
            _ => Some(target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Appearance, DeclarativeSource, GeneratorConfig, ProceduralSource};

    fn note(time: f64) -> Note {
        Note::new(NoteSpec::new(time, 1, 0.3, 60), Appearance::default())
    }

    fn recycler(mode: RecycleMode, regenerate: bool) -> Recycler {
        Recycler::new(RecycleConfig {
            mode,
            regenerate_on_recycle: regenerate,
            ensure_ahead_fill: 10.0,
        })
    }

    #[test]
    fn destroy_mode_releases_passed_and_hit_notes() {
        let r = recycler(RecycleMode::Destroy, false);
        let mut source = ProceduralSource::new(GeneratorConfig::default(), 4);

        assert_eq!(r.action(&note(1.0), false, &mut source), RecycleAction::Keep);
        assert_eq!(r.action(&note(1.0), true, &mut source), RecycleAction::Release);

        let mut hit = note(1.0);
        hit.resolve(NoteState::Hit);
        assert_eq!(r.action(&hit, false, &mut source), RecycleAction::Release);
    }

    #[test]
    fn loop_mode_shifts_by_loop_length() {
        let r = recycler(RecycleMode::Loop, false);
        let mut source = ProceduralSource::new(GeneratorConfig::default(), 4);

        let action = r.action(&note(1.0), true, &mut source);
        assert_eq!(
            action,
            RecycleAction::Reschedule(NoteSpec::new(17.0, 1, 0.3, 60))
        );
    }

    #[test]
    fn loop_mode_redraws_when_regenerating() {
        let r = recycler(RecycleMode::Loop, true);
        let config = GeneratorConfig::default();
        let mut source = ProceduralSource::new(config.clone(), 4);

        let RecycleAction::Reschedule(spec) = r.action(&note(1.0), true, &mut source) else {
            panic!("expected reschedule");
        };
        assert_eq!(spec.time, 17.0);
        assert!(spec.duration >= config.duration_range.0 && spec.duration <= config.duration_range.1);
    }

    #[test]
    fn loop_mode_without_loop_source_releases() {
        let r = recycler(RecycleMode::Loop, true);
        let mut source = DeclarativeSource::parse("", 4);
        assert_eq!(r.action(&note(1.0), true, &mut source), RecycleAction::Release);
    }

    #[test]
    fn fill_target_only_when_margin_is_short() {
        let r = recycler(RecycleMode::Destroy, true);
        assert_eq!(r.fill_target(Some(15.0), 4.0, Some(16.0)), None);
        assert_eq!(r.fill_target(Some(15.0), 6.0, Some(16.0)), Some(16.0));
        assert_eq!(r.fill_target(None, 0.0, None), Some(10.0));
        assert_eq!(r.fill_target(Some(30.0), 25.0, Some(16.0)), Some(35.0));
    }

    #[test]
    fn loop_mode_fill_stops_at_the_first_window() {
        let r = recycler(RecycleMode::Loop, true);
        assert_eq!(r.fill_target(Some(7.9), 2.0, Some(8.0)), Some(8.0));
        assert_eq!(r.fill_target(Some(11.0), 5.0, Some(8.0)), Some(8.0));
        assert_eq!(r.fill_target(None, 0.0, None), Some(10.0));
    }
}
