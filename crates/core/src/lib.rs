//! Core library of the Beatlane note scheduler.
//!
//! Notes are produced by a [`BeatSource`] (seeded procedural loop, metronome
//! or a declarative chart), stored in a fixed-capacity [`NotePool`], moved
//! against the time-front by [`LaneMotion`], classified by the
//! [`JudgmentEngine`] and recycled by the [`Recycler`]. The [`Scheduler`]
//! runs them in a fixed order once per tick. Rendering, input devices, audio
//! and score display stay outside the crate behind small traits.

pub mod audio;
pub mod config;
pub mod error;
pub mod judgment;
pub mod mapping;
pub mod metrics;
pub mod motion;
pub mod note;
pub mod pool;
pub mod record;
pub mod recycle;
pub mod render;
pub mod scheduler;
pub mod source;
pub mod timeline;

pub use audio::{AudioClock, MediaPosition};
pub use config::{
    GeneratorConfig, JudgmentConfig, MappingConfig, MotionConfig, RecycleConfig, SchedulerConfig,
    TimeConfig,
};
pub use error::{BeatlaneError, Result};
pub use judgment::{JudgmentEngine, JudgmentListener, JudgmentMode, NullListener, SweepOutcome};
pub use mapping::{Appearance, AppearanceMapper};
pub use metrics::{MetricsSink, NullMetrics, ScoreCounters, ScoreSnapshot};
pub use motion::{Axis, LaneMotion, Placement};
pub use note::{Note, NoteSpec, NoteState, Visibility, MIN_DURATION};
pub use pool::{NoteHandle, NotePool};
pub use record::{export_chart, write_chart, ChartSettings};
pub use recycle::{RecycleAction, RecycleMode, Recycler};
pub use render::{Entity, HeadlessRenderer, NullRenderer, Pose, RenderAdapter, RenderHandle};
pub use scheduler::{InputEvent, InputQueue, Scheduler, SchedulerStats};
pub use source::{
    parse_chart, BeatSource, DeclarativeSource, MetronomeSource, ParsedChart, ProceduralSource,
    RecordError, RecordIssue, SourceKind,
};
pub use timeline::{Clock, ManualClock, TimeFront};
