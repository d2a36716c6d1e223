use std::path::{Path, PathBuf};
use std::sync::Arc;

use beatlane_core::{
    export_chart, AudioClock, BeatSource, BeatlaneError, ChartSettings,
    DeclarativeSource, HeadlessRenderer, MediaPosition, MetronomeSource, ProceduralSource,
    Scheduler, SchedulerConfig, ScoreCounters,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

const SAMPLE_RATE: u32 = 48_000;

fn main() -> beatlane_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play {
            config,
            chart,
            metronome,
            seconds,
            fps,
            autoplay,
            json,
        } => {
            let config = load_config(config.as_deref())?;
            let options = PlayOptions {
                seconds,
                fps,
                autoplay,
                json,
            };
            match (chart, metronome) {
                (Some(path), _) => {
                    let source = DeclarativeSource::from_file(&path, config.lanes)?;
                    run_play(config, source, &options)
                }
                (None, true) => {
                    let source = MetronomeSource::new(config.generator.clone(), config.lanes);
                    run_play(config, source, &options)
                }
                (None, false) => {
                    let source = ProceduralSource::new(config.generator.clone(), config.lanes);
                    run_play(config, source, &options)
                }
            }
        }
        Commands::Generate {
            output,
            config,
            loops,
        } => run_generate(&output, config.as_deref(), loops),
        Commands::Check { file, lanes } => run_check(&file, lanes),
    }
}

struct PlayOptions {
    seconds: f64,
    fps: u32,
    autoplay: bool,
    json: bool,
}

fn load_config(path: Option<&Path>) -> beatlane_core::Result<SchedulerConfig> {
    match path {
        Some(path) => SchedulerConfig::from_json_file(path),
        None => Ok(SchedulerConfig::default()),
    }
}

/// Drives the scheduler from a simulated media position, one video frame at a
/// time, and prints the final counters.
fn run_play(
    config: SchedulerConfig,
    source: impl BeatSource + 'static,
    options: &PlayOptions,
) -> beatlane_core::Result<()> {
    if options.fps == 0 {
        return Err(BeatlaneError::InvalidInput("fps must be positive"));
    }
    if !options.seconds.is_finite() || options.seconds < 0.0 {
        return Err(BeatlaneError::InvalidInput("seconds must be a non-negative number"));
    }
    tracing::info!(
        lanes = config.lanes,
        seconds = options.seconds,
        fps = options.fps,
        autoplay = options.autoplay,
        "starting headless playback"
    );

    let lanes = config.lanes;
    let score = ScoreCounters::new();
    let mut scheduler =
        Scheduler::new(config, source, HeadlessRenderer::new()).with_metrics(Arc::new(score.clone()));

    let media = MediaPosition::new();
    media.play()?;
    let clock = AudioClock::new(media.clone());
    let samples_per_frame = (SAMPLE_RATE / options.fps).max(1) as usize;
    let frames = (options.seconds * f64::from(options.fps)).ceil() as u64;

    for _ in 0..frames {
        media.advance_frames(samples_per_frame, SAMPLE_RATE)?;
        scheduler.tick_with_clock(&clock);
        if options.autoplay {
            for lane in 0..lanes {
                if matches!(scheduler.next_pending_offset(lane), Some(offset) if offset <= 0.0) {
                    scheduler.on_lane_input(lane);
                }
            }
        }
    }
    media.pause()?;

    let stats = scheduler.stats();
    let snapshot = score.snapshot();
    if options.json {
        let text = serde_json::to_string_pretty(&stats).map_err(|err| BeatlaneError::msg(err.to_string()))?;
        println!("{text}");
    } else {
        println!(
            "front {:.2}s | spawned {} | hit {} | missed {} | expired {} | recycled {} | dropped {} | active {}",
            stats.front,
            snapshot.spawned,
            snapshot.hit,
            stats.missed,
            stats.expired,
            stats.recycled,
            stats.dropped,
            stats.active,
        );
    }
    Ok(())
}

fn run_generate(output: &Path, config: Option<&Path>, loops: u32) -> beatlane_core::Result<()> {
    let config = load_config(config)?;
    if loops == 0 {
        return Err(BeatlaneError::InvalidInput("loops must be at least 1"));
    }
    let mut source = ProceduralSource::new(config.generator.clone(), config.lanes);
    let until = config.generator.loop_length * f64::from(loops);
    let mut notes = Vec::new();
    source.produce_due(0.0, until, &mut notes);
    notes.sort_by(|a, b| a.schedule_cmp(b));

    let settings = ChartSettings {
        header: Some(format!(
            "time,pitch,duration,lane | seed {} | {} lanes | {} loop(s) of {}s",
            config.generator.seed, config.lanes, loops, config.generator.loop_length
        )),
        ..ChartSettings::default()
    };
    let written = export_chart(output, &notes, &settings)?;
    println!("wrote {written} notes to {}", output.display());
    Ok(())
}

fn run_check(file: &Path, lanes: usize) -> beatlane_core::Result<()> {
    if lanes == 0 {
        return Err(BeatlaneError::InvalidInput("lanes must be at least 1"));
    }
    let chart = DeclarativeSource::from_file(file, lanes)?;
    for issue in chart.issues() {
        println!("{}: {issue}", file.display());
    }
    let span = chart
        .notes()
        .iter()
        .map(|n| n.time)
        .fold(None, |acc: Option<(f64, f64)>, t| match acc {
            Some((lo, hi)) => Some((lo.min(t), hi.max(t))),
            None => Some((t, t)),
        });
    match span {
        Some((first, last)) => println!(
            "{} notes ({:.3}s to {:.3}s), {} skipped record(s)",
            chart.notes().len(),
            first,
            last,
            chart.issues().len()
        ),
        None => println!("no notes, {} skipped record(s)", chart.issues().len()),
    }
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Lane-based rhythm note scheduler", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the scheduler headlessly against a simulated audio clock.
    Play {
        /// JSON configuration file; defaults are used when omitted.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Play a chart file instead of the procedural generator.
        #[arg(long)]
        chart: Option<PathBuf>,
        /// Use the fixed-tempo metronome source.
        #[arg(long, conflicts_with = "chart")]
        metronome: bool,
        /// Length of the run in seconds of source time.
        #[arg(short, long, default_value_t = 30.0)]
        seconds: f64,
        /// Ticks per second.
        #[arg(long, default_value_t = 60)]
        fps: u32,
        /// Press each lane as its first pending note reaches the judgment line.
        #[arg(long)]
        autoplay: bool,
        /// Print final statistics as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Write the procedural note stream to a chart file.
    Generate {
        /// Destination chart file.
        #[arg(short, long)]
        output: PathBuf,
        /// JSON configuration file; defaults are used when omitted.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Number of loop windows to export.
        #[arg(long, default_value_t = 1)]
        loops: u32,
    },
    /// Parse a chart and report its records and diagnostics.
    Check {
        /// Chart file to validate.
        file: PathBuf,
        /// Lane count used for clamping.
        #[arg(long, default_value_t = 4)]
        lanes: usize,
    },
}
