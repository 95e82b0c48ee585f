// mania: headless player.
//
// Plays a chart with autoplay input against a simulated audio backend (or the
// sound device with the `kira` feature) and prints the result.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use log::info;
use mania_audio::{
    AudioClock, ManualClock, PlaybackDriver, PlaybackReader, SimulatedPlayback, WallClock,
};
use mania_config::PlayConfig;
use mania_input::{Autoplay, InputEvent, input_queue};
use mania_model::{Beatmap, OsuDecoder, US_PER_MS};
use mania_play::{GameSession, PlayResult, SessionSignal};
use mania_rule::Judgment;

/// Silence the simulated track keeps after the last note.
const TRACK_TAIL_US: i64 = 1_000_000;
/// Song time past the simulated track end after which a run is abandoned.
const GIVE_UP_AFTER_US: i64 = 5_000_000;

#[derive(Parser, Debug)]
#[command(name = "mania", about = "Headless osu!mania judgment runner")]
struct Args {
    /// Chart (.osu) to play.
    #[arg(required_unless_present = "write_default_config")]
    chart: Option<PathBuf>,

    /// Path to play config JSON file.
    #[arg(long, env = "MANIA_CONFIG")]
    config: Option<PathBuf>,

    /// Override the configured offset (ms).
    #[arg(long, allow_hyphen_values = true)]
    offset_ms: Option<i32>,

    /// Autoplay timing error, uniformly within +/- this many ms.
    #[arg(long, default_value_t = 0)]
    jitter_ms: i64,

    /// Seed for autoplay jitter.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Leave every n-th note unplayed (0 plays every note).
    #[arg(long, default_value_t = 0)]
    miss_every: usize,

    /// Host tick interval (ms).
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(i64).range(1..=100))]
    tick_ms: i64,

    /// Output latency reported by the backend (ms).
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(i64).range(0..=1000))]
    latency_ms: i64,

    /// Play the chart's audio file on the default output device.
    #[cfg(feature = "kira")]
    #[arg(long)]
    audio: bool,

    /// Print the result as JSON.
    #[arg(long)]
    json: bool,

    /// Log every judgment.
    #[arg(short, long)]
    verbose: bool,

    /// Write a default config to this path and exit.
    #[arg(long)]
    write_default_config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Some(path) = &args.write_default_config {
        PlayConfig::default().write(path)?;
        info!("wrote default config to {}", path.display());
        return Ok(());
    }
    let Some(chart) = &args.chart else {
        anyhow::bail!("no chart given");
    };

    let mut config = match &args.config {
        Some(path) => {
            let c = PlayConfig::read(path)?;
            info!("loaded config {}", path.display());
            c
        }
        None => PlayConfig::default(),
    };
    if let Some(offset) = args.offset_ms {
        config.offset_ms = offset;
    }
    config.validate();

    let beatmap = OsuDecoder::decode(chart)?;
    info!(
        "loaded {} - {} [{}]",
        beatmap.metadata().artist,
        beatmap.metadata().title,
        beatmap.metadata().version
    );
    let events = Autoplay::new()
        .with_jitter(args.jitter_ms * US_PER_MS, args.seed)
        .with_miss_every(args.miss_every)
        .generate(&beatmap);
    let tick_us = args.tick_ms * US_PER_MS;
    let latency_us = args.latency_ms * US_PER_MS;

    #[cfg(feature = "kira")]
    let result = if args.audio {
        play_audio(chart, beatmap, &config, &events, latency_us, tick_us)?
    } else {
        play_simulated(beatmap, &config, &events, latency_us, tick_us)?
    };
    #[cfg(not(feature = "kira"))]
    let result = play_simulated(beatmap, &config, &events, latency_us, tick_us)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }
    Ok(())
}

/// Run a session to completion on a manual wall clock advanced `tick_us` per tick.
fn play_simulated(
    beatmap: Beatmap,
    config: &PlayConfig,
    events: &[InputEvent],
    latency_us: i64,
    tick_us: i64,
) -> Result<PlayResult> {
    let wall = ManualClock::new(0);
    let length_us = beatmap.last_note_time_us().unwrap_or(0).max(0) + TRACK_TAIL_US;
    let (playback, reader) = SimulatedPlayback::new(Arc::new(wall.clone()), length_us);
    let mut playback = playback.with_latency_us(latency_us);
    let give_up_us = length_us + config.offset_us().max(0) + GIVE_UP_AFTER_US;
    play(
        beatmap,
        config,
        events,
        &mut playback,
        reader,
        Arc::new(wall.clone()),
        Some(give_up_us),
        || wall.advance(tick_us),
    )
}

#[cfg(feature = "kira")]
fn play_audio(
    chart: &std::path::Path,
    beatmap: Beatmap,
    config: &PlayConfig,
    events: &[InputEvent],
    latency_us: i64,
    tick_us: i64,
) -> Result<PlayResult> {
    use std::path::Path;
    use std::time::Duration;

    let dir = chart.parent().unwrap_or(Path::new("."));
    let audio = dir.join(&beatmap.metadata().audio_file);
    let (mut playback, reader) = mania_audio::KiraPlayback::open(&audio, latency_us)?;
    let tick = Duration::from_micros(tick_us as u64);
    play(
        beatmap,
        config,
        events,
        &mut playback,
        reader,
        Arc::new(mania_audio::SystemClock::new()),
        None,
        || std::thread::sleep(tick),
    )
}

/// Host loop: feed input whose capture time has come, then tick.
#[allow(clippy::too_many_arguments)]
fn play(
    beatmap: Beatmap,
    config: &PlayConfig,
    events: &[InputEvent],
    driver: &mut dyn PlaybackDriver,
    reader: PlaybackReader,
    wall: Arc<dyn WallClock>,
    give_up_us: Option<i64>,
    mut wait: impl FnMut(),
) -> Result<PlayResult> {
    driver.start()?;
    let clock = AudioClock::new(wall, reader);
    let (sender, queue) = input_queue();
    let mut session = GameSession::new(beatmap, clock, queue, config)?;

    let mut next = 0;
    while !session.is_finished() {
        wait();
        driver.poll();
        let clock = session.clock();
        let now = clock.time_at(clock.wall_now_us());
        while let Some(event) = events.get(next).filter(|e| e.time_us <= now) {
            sender.send(*event);
            next += 1;
        }

        let report = session.tick();
        for signal in &report.signals {
            match signal {
                SessionSignal::AudioStalled => {
                    log::warn!("audio stalled at {}ms", report.time_us / US_PER_MS)
                }
                SessionSignal::AudioResumed => {
                    log::info!("audio resumed at {}ms", report.time_us / US_PER_MS)
                }
                SessionSignal::Failed | SessionSignal::Completed => {
                    log::info!("{signal:?} at {}ms", report.time_us / US_PER_MS)
                }
            }
        }
        if give_up_us.is_some_and(|limit| session.now_us() > limit) {
            log::warn!("track never finished, stopping at {}us", session.now_us());
            break;
        }
    }
    Ok(session.finish())
}

fn print_result(result: &PlayResult) {
    let score = &result.score;
    println!("{:<10}{}", "clear", result.clear_type.name());
    println!("{:<10}{:?}", "grade", result.grade);
    println!("{:<10}{}", "score", score.score);
    println!("{:<10}{:.2}%", "accuracy", score.accuracy);
    println!("{:<10}{}", "max combo", score.max_combo);
    for j in Judgment::ALL {
        println!("{:<10}{}", j.name(), score.count(j));
    }
    println!(
        "{:<10}{}/{}",
        "judged", result.judgments_total, result.judgments_expected
    );
}
