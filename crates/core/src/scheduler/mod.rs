use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    AppearanceMapper, BeatSource, Clock, JudgmentEngine, JudgmentListener, LaneMotion,
    MetricsSink, Note, NoteHandle, NotePool, NoteSpec, NoteState, NullListener, NullMetrics,
    Pose, RecycleAction, RecycleMode, Recycler, RenderAdapter, SchedulerConfig, SourceKind,
    TimeFront, Visibility,
};

/// Input captured by the host and applied during the next tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Discrete key/trigger for a lane.
    Lane(usize),
    /// Pointer or ray position, resolved through [`RenderAdapter::pick`].
    Pick([f64; 3]),
}

/// Cloneable sender side of the scheduler's input queue; safe to hand to an
/// input thread.
#[derive(Debug, Clone)]
pub struct InputQueue {
    tx: Sender<InputEvent>,
    lanes: usize,
}

impl InputQueue {
    /// Queues a lane press. Returns `false` for an unknown lane or when the
    /// scheduler is gone.
    pub fn lane(&self, lane: usize) -> bool {
        lane < self.lanes && self.tx.send(InputEvent::Lane(lane)).is_ok()
    }

    pub fn pick(&self, point: [f64; 3]) -> bool {
        self.tx.send(InputEvent::Pick(point)).is_ok()
    }
}

/// Running totals of one scheduler instance.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub front: f64,
    pub scroll_speed: f64,
    pub active: usize,
    pub spawned: u64,
    pub dropped: u64,
    pub hit: u64,
    pub missed: u64,
    pub expired: u64,
    pub recycled: u64,
    pub released: u64,
}

/// Per-tick driver tying the note pipeline together.
///
/// Each tick runs the same fixed sequence on a single timeline: advance the
/// front, spawn due notes, update motion, apply queued input, resolve passed
/// notes, then recycle.
pub struct Scheduler<R: RenderAdapter> {
    config: SchedulerConfig,
    front: TimeFront,
    pool: NotePool,
    source: Box<dyn BeatSource>,
    motion: LaneMotion,
    judgment: JudgmentEngine,
    recycler: Recycler,
    mapper: AppearanceMapper,
    renderer: R,
    metrics: Arc<dyn MetricsSink>,
    listener: Box<dyn JudgmentListener>,
    input_tx: Sender<InputEvent>,
    input_rx: Receiver<InputEvent>,
    due: Vec<NoteSpec>,
    released: Vec<NoteHandle>,
    pulled_until: f64,
    started: bool,
    stats: SchedulerStats,
}

impl<R: RenderAdapter> Scheduler<R> {
    pub fn new(config: SchedulerConfig, source: impl BeatSource + 'static, renderer: R) -> Self {
        let config = config.normalized();
        if config.recycle.mode == RecycleMode::Loop && source.loop_length().is_none() {
            tracing::warn!("loop recycling requested for a source without a loop; passed notes will be released");
        }
        let (input_tx, input_rx) = mpsc::channel();
        let capacity = config.pool_capacity;
        Self {
            front: TimeFront::new(config.time.scroll_speed, config.time.audio_time_scale),
            pool: NotePool::new(capacity),
            source: Box::new(source),
            motion: LaneMotion::new(config.motion.clone()),
            judgment: JudgmentEngine::new(config.judgment.clone()),
            recycler: Recycler::new(config.recycle.clone()),
            mapper: AppearanceMapper::new(config.mapping.clone()),
            renderer,
            metrics: Arc::new(NullMetrics),
            listener: Box::new(NullListener),
            input_tx,
            input_rx,
            due: Vec::with_capacity(capacity),
            released: Vec::with_capacity(capacity),
            pulled_until: f64::NEG_INFINITY,
            started: false,
            stats: SchedulerStats::default(),
            config,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_listener(mut self, listener: impl JudgmentListener + 'static) -> Self {
        self.listener = Box::new(listener);
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn front(&self) -> f64 {
        self.front.seconds()
    }

    pub fn pool(&self) -> &NotePool {
        &self.pool
    }

    pub fn note(&self, handle: NoteHandle) -> Option<&Note> {
        self.pool.get(handle)
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            front: self.front.seconds(),
            scroll_speed: self.front.scroll_speed(),
            active: self.pool.active_count(),
            ..self.stats.clone()
        }
    }

    pub fn input_queue(&self) -> InputQueue {
        InputQueue {
            tx: self.input_tx.clone(),
            lanes: self.config.lanes,
        }
    }

    /// Queues a lane press for the next tick. Returns `true` once the press
    /// is queued for a known lane; whether it hits anything is decided when
    /// the queue is applied and shows up in [`SchedulerStats::hit`].
    pub fn on_lane_input(&self, lane: usize) -> bool {
        self.input_queue().lane(lane)
    }

    /// Queues a spatial pick for the next tick.
    pub fn on_spatial_pick(&self, point: [f64; 3]) -> bool {
        self.input_queue().pick(point)
    }

    /// Offset of the note a press on `lane` would target right now.
    pub fn next_pending_offset(&self, lane: usize) -> Option<f64> {
        let front = self.front.seconds();
        self.judgment
            .first_pending_in_lane(&self.pool, lane, front)
            .and_then(|handle| self.pool.get(handle))
            .map(|note| note.offset_at(front))
    }

    pub fn is_paused(&self) -> bool {
        self.front.is_paused()
    }

    /// While paused, ticks hold the front and skip motion, judgment and
    /// recycling; presses queued in the meantime are discarded.
    pub fn set_paused(&mut self, paused: bool) {
        if self.front.is_paused() != paused {
            tracing::info!(paused, front = self.front.seconds(), "scroll paused state changed");
        }
        self.front.set_paused(paused);
    }

    pub fn scroll_speed(&self) -> f64 {
        self.front.scroll_speed()
    }

    /// Sets the tick-delta multiplier, clamped to `[0, max_scroll_speed]`.
    /// Returns the speed in effect.
    pub fn set_scroll_speed(&mut self, speed: f64) -> f64 {
        let max = self.config.time.max_scroll_speed;
        let speed = if speed.is_finite() { speed.clamp(0.0, max) } else { speed };
        let applied = self.front.set_scroll_speed(speed);
        tracing::debug!(requested = speed, applied, "scroll speed set");
        applied
    }

    /// Advances the front by a frame delta and runs one tick.
    pub fn tick(&mut self, delta: f64) {
        self.front.advance(delta);
        self.step();
    }

    /// Samples an external clock (monotonic-clamped) and runs one tick.
    pub fn tick_with_clock(&mut self, clock: &dyn Clock) {
        self.front.sync_with(clock);
        self.step();
    }

    /// Releases every slot, rewinds the front and the source, restores the
    /// configured scroll speed, and prefills again on the next tick.
    pub fn reset(&mut self) {
        self.release_all();
        while self.input_rx.try_recv().is_ok() {}
        self.front.reset();
        self.front.set_scroll_speed(self.config.time.scroll_speed);
        self.source.reset();
        self.pulled_until = f64::NEG_INFINITY;
        self.started = false;
    }

    /// Rewinds the front only; live notes keep their schedule.
    pub fn reset_scroll(&mut self) {
        self.front.reset();
    }

    /// Releases every slot in slot order and destroys its render entity.
    /// Returns how many slots were occupied.
    pub fn shutdown(&mut self) -> usize {
        let released = self.release_all();
        if released > 0 {
            tracing::info!(released, "scheduler shut down");
        }
        released
    }

    fn release_all(&mut self) -> usize {
        let renderer = &mut self.renderer;
        let mut released = 0;
        self.pool.drain(|_, mut note| {
            if let Some(handle) = note.take_render() {
                renderer.destroy(handle);
            }
            released += 1;
        });
        self.stats.released += released as u64;
        released
    }

    fn step(&mut self) {
        if self.front.is_paused() {
            let discarded = self.input_rx.try_iter().count();
            if discarded > 0 {
                tracing::debug!(discarded, "input ignored while paused");
            }
            return;
        }
        if !self.started {
            self.start();
        }
        let front = self.front.seconds();
        self.pull_due(front);
        self.update_motion(front);
        self.apply_inputs(front);
        self.resolve_passed(front);
        self.recycle(front);
    }

    fn start(&mut self) {
        self.started = true;
        if self.source.kind() == SourceKind::Procedural {
            if let Some(loop_length) = self.source.loop_length() {
                self.source.produce_due(0.0, loop_length, &mut self.due);
                tracing::info!(notes = self.due.len(), loop_length, "prefilled procedural loop");
                self.spawn_due();
            }
        }
    }

    fn pull_due(&mut self, front: f64) {
        match self.source.kind() {
            SourceKind::Stream => {
                let until = front + self.config.motion.visible_after;
                if until > self.pulled_until {
                    self.source.produce_due(self.pulled_until, until, &mut self.due);
                    self.pulled_until = until;
                }
            }
            SourceKind::Procedural => {
                let furthest = self
                    .pool
                    .iter()
                    .map(|(_, note)| note.time())
                    .max_by(f64::total_cmp);
                let loop_length = self.source.loop_length();
                if let Some(until) = self.recycler.fill_target(furthest, front, loop_length) {
                    let since = self.source.covered_until();
                    if until > since {
                        self.source.produce_due(since, until, &mut self.due);
                    }
                }
            }
        }
        self.spawn_due();
    }

    fn spawn_due(&mut self) {
        let mut due = std::mem::take(&mut self.due);
        let mut spawned = 0;
        for spec in due.drain(..) {
            let appearance = self.mapper.appearance(&spec);
            match self.pool.acquire(Note::new(spec, appearance)) {
                Ok(handle) => {
                    let render = self.renderer.spawn(&spec, &appearance);
                    if let Some(note) = self.pool.get_mut(handle) {
                        note.attach_render(render);
                    }
                    spawned += 1;
                }
                Err(err) => {
                    tracing::warn!(%err, lane = spec.lane, time = spec.time, "dropping spawn request");
                    self.stats.dropped += 1;
                }
            }
        }
        self.due = due;
        if spawned > 0 {
            self.stats.spawned += spawned;
            self.metrics.report_spawned(spawned);
        }
    }

    fn update_motion(&mut self, front: f64) {
        for (_, note) in self.pool.iter_mut() {
            let placement = self.motion.position_of(note, front);
            if let Some(previous) = note.set_visibility(placement.visibility) {
                tracing::trace!(?previous, now = ?placement.visibility, time = note.time(), "visibility changed");
            }
            let shown = placement.visibility == Visibility::Visible && note.state() != NoteState::Hit;
            let Some(render) = note.render_handle() else {
                continue;
            };
            if note.set_shown(shown) {
                self.renderer.set_visible(render, shown);
            }
            if shown {
                let pose = Pose {
                    travel_offset: placement.travel_offset,
                    fade: placement.fade,
                    position: self.mapper.world_position(note.appearance().anchor, front),
                    scale: self.motion.scale_of(note, placement.fade),
                };
                self.renderer.set_position(render, &pose);
            }
        }
    }

    fn apply_inputs(&mut self, front: f64) {
        while let Ok(event) = self.input_rx.try_recv() {
            let hits = match event {
                InputEvent::Lane(lane) => {
                    self.judgment
                        .lane_input(&mut self.pool, lane, front, self.listener.as_mut())
                }
                InputEvent::Pick(point) => {
                    let target = self.renderer.pick(point).and_then(|render| {
                        self.pool
                            .iter()
                            .find(|(_, note)| note.render_handle() == Some(render))
                            .map(|(handle, _)| handle)
                    });
                    match target {
                        Some(handle) => self.judgment.hit(&mut self.pool, handle, self.listener.as_mut()),
                        None => 0,
                    }
                }
            };
            if hits > 0 {
                let before = self.stats.hit;
                self.stats.hit += hits as u64;
                self.metrics.report_hit(hits as u64);
                self.speed_up(before, self.stats.hit);
            }
        }
    }

    /// Raises the scroll speed once per `speed_up_every_hits` boundary crossed.
    fn speed_up(&mut self, before: u64, after: u64) {
        let every = self.config.time.speed_up_every_hits;
        if every == 0 {
            return;
        }
        let steps = after / every - before / every;
        if steps > 0 {
            let target = self.front.scroll_speed() + steps as f64 * self.config.time.speed_up_step;
            let speed = self.set_scroll_speed(target);
            tracing::info!(hits = after, speed, "scroll speed raised");
        }
    }

    fn resolve_passed(&mut self, front: f64) {
        let outcome =
            self.judgment
                .sweep_passed(&mut self.pool, &self.motion, front, self.listener.as_mut());
        self.stats.missed += outcome.missed as u64;
        self.stats.expired += outcome.expired as u64;
    }

    fn recycle(&mut self, front: f64) {
        for (handle, note) in self.pool.iter_mut() {
            let passed = self.motion.has_passed(note.offset_at(front), note.duration());
            match self.recycler.action(note, passed, self.source.as_mut()) {
                RecycleAction::Keep => {
                    if note.state() == NoteState::Hit && note.set_shown(false) {
                        if let Some(render) = note.render_handle() {
                            self.renderer.set_visible(render, false);
                        }
                    }
                }
                RecycleAction::Release => self.released.push(handle),
                RecycleAction::Reschedule(spec) => {
                    let appearance = self.mapper.appearance(&spec);
                    if let Some(render) = note.render_handle() {
                        if note.is_shown() {
                            self.renderer.set_visible(render, false);
                        }
                        self.renderer.set_appearance(render, &appearance);
                    }
                    note.reschedule(spec, appearance);
                    self.stats.recycled += 1;
                }
            }
        }

        for handle in self.released.drain(..) {
            if let Some(mut note) = self.pool.release(handle) {
                if let Some(render) = note.take_render() {
                    self.renderer.destroy(render);
                }
                self.stats.released += 1;
            }
        }
    }
}

impl<R: RenderAdapter> Drop for Scheduler<R> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<R: RenderAdapter> std::fmt::Debug for Scheduler<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("front", &self.front.seconds())
            .field("active", &self.pool.active_count())
            .field("capacity", &self.pool.capacity())
            .field("source", &self.source.kind())
            .field("stats", &self.stats)
            .finish()
    }
}
