//! Producers of the ordered note stream.
//!
//! Every source answers the same question: which notes are scheduled in a
//! given time range. The scheduler asks repeatedly with adjacent ranges, so a
//! source only has to remember how far it has already produced.

mod declarative;
mod metronome;
mod procedural;

pub use declarative::{parse_chart, DeclarativeSource, ParsedChart, RecordError, RecordIssue};
pub use metronome::MetronomeSource;
pub use procedural::ProceduralSource;

use crate::NoteSpec;

/// How the scheduler should pull from a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Pre-generates one loop window, then extends coverage whenever the
    /// furthest active note gets closer than the ahead-fill margin.
    Procedural,
    /// Finite or open-ended stream pulled as notes enter the look-ahead.
    Stream,
}

pub trait BeatSource {
    fn kind(&self) -> SourceKind;

    /// Appends every note scheduled in `[since, until)` to `out`, in time
    /// order. Ranges already produced are not produced again.
    ///
    /// Jittered sources select by grid step: an emitted time may sit up to
    /// the jitter outside the range, and ordering holds within one call only.
    fn produce_due(&mut self, since: f64, until: f64, out: &mut Vec<NoteSpec>);

    /// End of the range produced so far.
    fn covered_until(&self) -> f64;

    /// Loop period for sources that support in-place recycling.
    fn loop_length(&self) -> Option<f64> {
        None
    }

    /// Draws fresh `(pitch, duration)` for a recycled note of `lane` now
    /// scheduled at `time`.
    fn redraw(&mut self, _lane: usize, _time: f64) -> Option<(i32, f64)> {
        None
    }

    /// Rewinds to the state right after construction.
    fn reset(&mut self);
}

/// Sorts the tail of `out` starting at `from` into schedule order.
pub(crate) fn sort_tail(out: &mut [NoteSpec], from: usize) {
    if let Some(tail) = out.get_mut(from..) {
        tail.sort_by(NoteSpec::schedule_cmp);
    }
}
