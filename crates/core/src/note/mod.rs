use serde::{Deserialize, Serialize};

use crate::{Appearance, RenderHandle};

/// Smallest duration a scheduled note may carry.
pub const MIN_DURATION: f64 = 1e-4;

/// Immutable scheduling data of one note occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteSpec {
    /// Time, in seconds on the source clock, at which the note reaches the
    /// judgment line.
    pub time: f64,
    pub lane: usize,
    pub duration: f64,
    /// Secondary attribute used for colour and wave modulation; never scored.
    pub pitch: i32,
}

impl NoteSpec {
    pub fn new(time: f64, lane: usize, duration: f64, pitch: i32) -> Self {
        Self {
            time,
            lane,
            duration,
            pitch,
        }
    }

    /// Orders by time, breaking ties by lane.
    pub fn schedule_cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.time
            .total_cmp(&other.time)
            .then(self.lane.cmp(&other.lane))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoteState {
    Pending,
    Hit,
    Missed,
    Expired,
}

impl NoteState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, NoteState::Pending)
    }
}

/// Where a note sits relative to the visibility window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    /// Beyond the leading edge; not yet shown.
    Ahead,
    Visible,
    /// Past the trailing edge.
    Behind,
}

/// A live note occupying a pool slot.
#[derive(Debug, Clone)]
pub struct Note {
    spec: NoteSpec,
    state: NoteState,
    visibility: Visibility,
    shown: bool,
    render: Option<RenderHandle>,
    appearance: Appearance,
}

impl Note {
    pub fn new(spec: NoteSpec, appearance: Appearance) -> Self {
        Self {
            spec: NoteSpec {
                duration: spec.duration.max(MIN_DURATION),
                ..spec
            },
            state: NoteState::Pending,
            visibility: Visibility::Ahead,
            shown: false,
            render: None,
            appearance,
        }
    }

    pub fn spec(&self) -> &NoteSpec {
        &self.spec
    }

    pub fn time(&self) -> f64 {
        self.spec.time
    }

    pub fn lane(&self) -> usize {
        self.spec.lane
    }

    pub fn duration(&self) -> f64 {
        self.spec.duration
    }

    pub fn pitch(&self) -> i32 {
        self.spec.pitch
    }

    pub fn state(&self) -> NoteState {
        self.state
    }

    pub fn is_pending(&self) -> bool {
        self.state == NoteState::Pending
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Whether the render adapter currently shows this note.
    pub fn is_shown(&self) -> bool {
        self.shown
    }

    pub fn render_handle(&self) -> Option<RenderHandle> {
        self.render
    }

    pub fn appearance(&self) -> &Appearance {
        &self.appearance
    }

    /// Signed distance to the judgment line; positive while still ahead.
    pub fn offset_at(&self, front: f64) -> f64 {
        self.spec.time - front
    }

    /// Moves a pending note into a terminal state. Returns `false` without
    /// touching anything when the note was already resolved, which is what
    /// keeps hit/miss notifications single-fire.
    pub(crate) fn resolve(&mut self, to: NoteState) -> bool {
        if self.state != NoteState::Pending || to == NoteState::Pending {
            return false;
        }
        self.state = to;
        true
    }

    /// Returns the previous visibility when it changed.
    pub(crate) fn set_visibility(&mut self, visibility: Visibility) -> Option<Visibility> {
        let previous = self.visibility;
        self.visibility = visibility;
        (previous != visibility).then_some(previous)
    }

    /// Returns `true` when the flag changed.
    pub(crate) fn set_shown(&mut self, shown: bool) -> bool {
        let changed = self.shown != shown;
        self.shown = shown;
        changed
    }

    pub(crate) fn attach_render(&mut self, handle: RenderHandle) {
        self.render = Some(handle);
    }

    pub(crate) fn take_render(&mut self) -> Option<RenderHandle> {
        self.render.take()
    }

    /// Rewrites the slot as a freshly scheduled note: the previous occurrence
    /// ends here and the new one starts pending and ahead of the window.
    pub(crate) fn reschedule(&mut self, spec: NoteSpec, appearance: Appearance) {
        self.spec = NoteSpec {
            duration: spec.duration.max(MIN_DURATION),
            ..spec
        };
        self.state = NoteState::Pending;
        self.visibility = Visibility::Ahead;
        self.shown = false;
        self.appearance = appearance;
    }
}
