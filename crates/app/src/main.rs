mod script;

use std::{
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

use clap::{Parser, Subcommand};
use psychometric_study_core::{
    control_for_hotkey, ControlContext, SimulatedEngine, Session, StudyConfig, StudyError,
    CONTROLS, DEFAULT_CONFIG_FILE, TICK_INTERVAL,
};
use tracing_subscriber::EnvFilter;

use crate::script::{ScriptEntry, Step};

/// Extra time the replay keeps ticking after the last scripted event when the
/// media never reports its end.
const REPLAY_GRACE: Duration = Duration::from_secs(10);

fn main() -> psychometric_study_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = StudyConfig::load_or_default(&cli.config);

    match cli.command {
        Commands::Run {
            media,
            length_secs,
            script,
            output,
            realtime,
        } => run_session(
            config,
            media,
            Duration::from_secs(length_secs),
            script.as_deref(),
            output,
            realtime,
        ),
        Commands::Config => show_config(&config),
        Commands::Controls => {
            show_controls();
            Ok(())
        }
    }
}

fn run_session(
    config: StudyConfig,
    media: Option<PathBuf>,
    length: Duration,
    script: Option<&Path>,
    output: Option<PathBuf>,
    realtime: bool,
) -> psychometric_study_core::Result<()> {
    let engine = SimulatedEngine::new(length);
    let mut session = Session::new(engine, config);

    match media {
        Some(path) => session.load_media(path)?,
        None => session.open_default_media()?,
    }
    let Some(source) = session.source().map(Path::to_path_buf) else {
        return Err(StudyError::msg(
            "no media given and no defaultVideoPath configured",
        ));
    };
    tracing::info!(?source, title = %session.window_title(), "session ready");

    let entries = match script {
        Some(path) => script::load(path)?,
        None => script::play_through(),
    };
    let last_event_ms = entries.last().map_or(0, |entry| entry.at_ms);
    let deadline_ms = last_event_ms
        .max(length.as_millis() as u64)
        .saturating_add(REPLAY_GRACE.as_millis() as u64);

    let start = Instant::now();
    let mut pending = entries.into_iter().peekable();
    let mut elapsed_ms = 0_u64;

    loop {
        let now = clock(start, elapsed_ms, realtime);

        while let Some(entry) = pending.next_if(|entry| entry.at_ms <= elapsed_ms) {
            apply(&mut session, entry, now);
        }

        session.engine_mut().advance(TICK_INTERVAL);
        elapsed_ms += TICK_INTERVAL.as_millis() as u64;
        if realtime {
            thread::sleep(TICK_INTERVAL);
        }

        let tick = session.tick(clock(start, elapsed_ms, realtime));
        if let Some(sample) = tick.report.sample {
            tracing::debug!(
                elapsed = %tick.report.elapsed_label(),
                rating = sample.rating,
                "sample recorded"
            );
        }
        if let Some(path) = &tick.auto_saved {
            tracing::info!(?path, "saved automatically at end of media");
        }

        let finished = pending.peek().is_none();
        if tick.report.ended && finished {
            break;
        }
        if elapsed_ms >= deadline_ms {
            tracing::warn!(elapsed_ms, "replay deadline reached before end of media");
            break;
        }
    }

    let saved = match output {
        Some(path) => session.save_as(path).map(Some),
        None if session.has_unsaved_changes() => session.save().map(Some),
        None => Ok(None),
    };
    match saved {
        Ok(Some(path)) => tracing::info!(?path, "ratings exported"),
        Ok(None) => tracing::info!("no unsaved changes"),
        Err(StudyError::NothingToExport) => {
            tracing::warn!("nothing was recorded, no workbook written")
        }
        Err(err) => return Err(err),
    }

    let rows = session.series().collapse().len();
    tracing::info!(
        samples = session.series().samples().len(),
        markers = session.series().markers().len(),
        rows,
        "session finished"
    );
    Ok(())
}

/// Session time: virtual in replay mode, the wall clock in realtime mode.
fn clock(start: Instant, elapsed_ms: u64, realtime: bool) -> Instant {
    if realtime {
        Instant::now()
    } else {
        start + Duration::from_millis(elapsed_ms)
    }
}

/// Applies one scripted entry. Failures are reported and the replay goes on,
/// the same way the window would show an error dialog and stay open.
fn apply(session: &mut Session<SimulatedEngine>, entry: ScriptEntry, now: Instant) {
    let result = match entry.step {
        Step::Input(input) => {
            tracing::debug!(at_ms = entry.at_ms, ?input, "input");
            session.handle(input, now)
        }
        Step::Key { key, release: false } => {
            let ctx = ControlContext::new(session.playback_state());
            match control_for_hotkey(&key, &ctx) {
                Some(control) => session.press(control, now),
                None => {
                    tracing::debug!(%key, "hotkey has no enabled control");
                    Ok(())
                }
            }
        }
        Step::Key { key, release: true } => {
            let control = CONTROLS
                .iter()
                .find(|spec| {
                    spec.on_release.is_some()
                        && spec.hotkeys.iter().any(|k| k.eq_ignore_ascii_case(&key))
                })
                .map(|spec| spec.control);
            match control {
                Some(control) => session.release(control, now),
                None => Ok(()),
            }
        }
    };

    if let Err(err) = result {
        tracing::error!(at_ms = entry.at_ms, %err, "scripted input failed");
    }
}

fn show_config(config: &StudyConfig) -> psychometric_study_core::Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

fn show_controls() {
    for spec in CONTROLS {
        let hotkeys = if spec.hotkeys.is_empty() {
            "-".to_string()
        } else {
            spec.hotkeys.join(", ")
        };
        let repeat = if spec.auto_repeat { " (repeats)" } else { "" };
        println!("{:<12} {hotkeys}{repeat}", spec.label);
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Continuous response rating over video", long_about = None)]
struct Cli {
    /// Configuration document with optional defaults.
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a rating session against the simulated player and export it.
    Run {
        /// Media file to rate. Falls back to `defaultVideoPath`.
        media: Option<PathBuf>,
        /// Length the simulated player reports for the media.
        #[arg(short, long, default_value_t = 60)]
        length_secs: u64,
        /// JSON script of timed inputs. Without one the media is just played.
        #[arg(short, long)]
        script: Option<PathBuf>,
        /// Workbook to write instead of the default destination.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Tick on the wall clock instead of as fast as possible.
        #[arg(long)]
        realtime: bool,
    },
    /// Print the effective configuration.
    Config,
    /// List the rating and transport controls with their hotkeys.
    Controls,
}
