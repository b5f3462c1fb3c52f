use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use parking_lot::Mutex;

use sprite_audio::audio_system::{
    AudioEngine, BasicOwner, Completion, EffectKind, OwnerFilter, PlaybackEvent, SimulatedBackend,
    SoundId,
};
use sprite_audio::config::EngineConfig;

const LOG_TARGET_STARTUP: &str = "sprite_audio::startup";

/// Clock step of the simulated backend
const STEP_SECS: f64 = 0.01;

/// Give up on sounds that have not ended after this long
const MAX_RUN_SECS: f64 = 600.0;

/// Initialize tracing with file rotation
///
/// Logs go to `<local data dir>/sprite-audio/logs/sprite-audio.YYYY-MM-DD.log`
/// and to the console. `RUST_LOG` overrides the default `info` level.
fn initialize_tracing() {
    use tracing_appender::rolling;
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let log_dir = dirs::data_local_dir()
        .map(|dir| dir.join("sprite-audio").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Failed to create log directory: {}", e);
    }

    let file_appender = rolling::daily(&log_dir, "sprite-audio.log");

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true);

    let console_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .with_target(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    tracing::info!(target: LOG_TARGET_STARTUP, "Log directory: {}", log_dir.display());
}

struct Args {
    config: Option<PathBuf>,
    pitch: f64,
    stop_after: Option<f64>,
    files: Vec<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        config: None,
        pitch: 0.0,
        stop_after: None,
        files: Vec::new(),
    };

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let path = iter.next().context("--config needs a path")?;
                args.config = Some(PathBuf::from(path));
            }
            "--pitch" => {
                let value = iter.next().context("--pitch needs a value")?;
                args.pitch = value
                    .parse()
                    .with_context(|| format!("Invalid pitch: {}", value))?;
            }
            "--stop-after" => {
                let value = iter.next().context("--stop-after needs seconds")?;
                args.stop_after = Some(
                    value
                        .parse()
                        .with_context(|| format!("Invalid stop time: {}", value))?,
                );
            }
            flag if flag.starts_with("--") => bail!("Unknown option: {}", flag),
            file => args.files.push(PathBuf::from(file)),
        }
    }
    Ok(args)
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => match EngineConfig::default_path() {
            Some(path) => path,
            None => {
                tracing::warn!("No config directory on this platform, using defaults");
                return Ok(EngineConfig::default());
            }
        },
    };
    EngineConfig::load_or_default(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

fn main() -> Result<()> {
    initialize_tracing();
    tracing::info!(
        target: LOG_TARGET_STARTUP,
        "Starting sprite-audio demo v{}",
        env!("CARGO_PKG_VERSION")
    );

    let args = parse_args()?;
    if args.files.is_empty() {
        println!("Usage: sprite-audio-demo [--config PATH] [--pitch N] [--stop-after SECS] FILE...");
        return Ok(());
    }
    let config = load_config(args.config.as_deref())?;

    let backend = Arc::new(Mutex::new(SimulatedBackend::new()));
    let engine = AudioEngine::with_backend(backend.clone(), config)
        .context("Failed to start audio engine")?;
    let (events, _) = engine.events().subscribe();
    let mut bank = engine.create_bank()?;

    let mut playing: Vec<(PathBuf, SoundId, Completion)> = Vec::new();
    for (index, path) in args.files.iter().enumerate() {
        let bytes =
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let id = engine.decode_sound(&bytes);
        let owner = BasicOwner::new(index as u64 + 1).with_effect(EffectKind::Pitch, args.pitch);
        let done = bank.play_sound(&owner, &id)?;
        tracing::info!("Playing {} as {}", path.display(), id);
        playing.push((path.clone(), id, done));
    }

    let mut now = 0.0;
    let mut stopped = false;
    while playing.iter().any(|(_, _, done)| !done.is_resolved()) {
        if now >= MAX_RUN_SECS {
            tracing::warn!("Sounds still playing after {}s, giving up", MAX_RUN_SECS);
            break;
        }
        if let Some(limit) = args.stop_after {
            if !stopped && now >= limit {
                tracing::info!("Stopping all sounds at {:.2}s", now);
                bank.stop_all_sounds(OwnerFilter::All);
                stopped = true;
            }
        }

        now += STEP_SECS;
        backend.lock().process_to(now);
        engine.process_events();

        for event in events.try_iter() {
            match event {
                PlaybackEvent::Started { sound_id } => {
                    tracing::debug!("{} started at {:.2}s", sound_id, now)
                }
                PlaybackEvent::Stopped { sound_id } => {
                    tracing::info!("{} stopped at {:.2}s", sound_id, now)
                }
            }
        }
    }

    // let pending fades finish before tearing down
    now += engine.decay_duration();
    backend.lock().process_to(now);
    engine.process_events();

    for (path, id, done) in &playing {
        tracing::info!(
            "{} ({}): {}",
            path.display(),
            id,
            if done.is_resolved() { "finished" } else { "unfinished" }
        );
    }
    bank.dispose();
    Ok(())
}
