//! osu!mania `.osu` chart decoder.
//!
//! Reads the sections the judgment core needs (`[General]`, `[Metadata]`,
//! `[Difficulty]`, `[TimingPoints]`, `[HitObjects]`) and ignores the rest.

use std::path::Path;

use anyhow::{Context, Result, bail};
use sha2::{Digest, Sha256};

use crate::beatmap::{Beatmap, BeatmapMetadata};
use crate::key_mode::KeyMode;
use crate::ms_to_us;
use crate::note::NoteSpec;
use crate::timing::{DEFAULT_BPM, TimingPoint};

/// osu! game mode id for mania
const MODE_MANIA: i32 = 3;

/// Playfield width used to map hit object x to a lane
const PLAYFIELD_WIDTH: f64 = 512.0;

/// Hit object type bits
const TYPE_CIRCLE: u32 = 1;
const TYPE_HOLD: u32 = 1 << 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    General,
    Metadata,
    Difficulty,
    TimingPoints,
    HitObjects,
    Other,
}

impl Section {
    fn from_header(name: &str) -> Self {
        match name {
            "General" => Self::General,
            "Metadata" => Self::Metadata,
            "Difficulty" => Self::Difficulty,
            "TimingPoints" => Self::TimingPoints,
            "HitObjects" => Self::HitObjects,
            _ => Self::Other,
        }
    }
}

/// Raw `[TimingPoints]` row before bpm/scroll resolution.
#[derive(Debug, Clone, Copy)]
struct RawTimingPoint {
    time_us: i64,
    beat_length: f64,
    uninherited: bool,
}

/// Raw `[HitObjects]` row before lane resolution.
#[derive(Debug, Clone, Copy)]
struct RawHitObject {
    x: f64,
    time_us: i64,
    end_time_us: Option<i64>,
}

pub struct OsuDecoder;

impl OsuDecoder {
    /// Decode a chart file, recording its SHA-256.
    pub fn decode(path: &Path) -> Result<Beatmap> {
        let raw = std::fs::read(path)
            .with_context(|| format!("failed to read chart {}", path.display()))?;
        // Strips a UTF-8 BOM; invalid sequences become U+FFFD
        let (content, _, had_errors) = encoding_rs::UTF_8.decode(&raw);
        if had_errors {
            log::warn!("{}: invalid UTF-8 replaced while decoding", path.display());
        }
        let mut hasher = Sha256::new();
        hasher.update(&raw);
        let sha256 = format!("{:x}", hasher.finalize());
        Self::decode_with_hash(&content, sha256)
            .with_context(|| format!("failed to decode chart {}", path.display()))
    }

    /// Decode chart text already in memory.
    pub fn decode_str(content: &str) -> Result<Beatmap> {
        Self::decode_with_hash(content, String::new())
    }

    fn decode_with_hash(content: &str, sha256: String) -> Result<Beatmap> {
        let mut section = Section::None;
        let mut mode: i32 = 0;
        let mut circle_size: Option<f64> = None;
        let mut metadata = BeatmapMetadata {
            sha256,
            ..Default::default()
        };
        let mut raw_points: Vec<RawTimingPoint> = Vec::new();
        let mut raw_objects: Vec<RawHitObject> = Vec::new();

        for (line_no, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with("//") {
                continue;
            }
            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                section = Section::from_header(name);
                continue;
            }
            match section {
                Section::General | Section::Metadata | Section::Difficulty => {
                    let Some((key, value)) = line.split_once(':') else {
                        continue;
                    };
                    let (key, value) = (key.trim(), value.trim());
                    match (section, key) {
                        (Section::General, "AudioFilename") => metadata.audio_file = value.into(),
                        (Section::General, "Mode") => {
                            mode = value
                                .parse()
                                .with_context(|| format!("line {}: bad Mode", line_no + 1))?;
                        }
                        (Section::Metadata, "Title") => metadata.title = value.into(),
                        (Section::Metadata, "Artist") => metadata.artist = value.into(),
                        (Section::Metadata, "Version") => metadata.version = value.into(),
                        (Section::Difficulty, "CircleSize") => {
                            circle_size = Some(parse_f64(value, line_no, "CircleSize")?);
                        }
                        (Section::Difficulty, "OverallDifficulty") => {
                            metadata.overall_difficulty =
                                parse_f64(value, line_no, "OverallDifficulty")?;
                        }
                        (Section::Difficulty, "HPDrainRate") => {
                            metadata.hp_drain_rate = parse_f64(value, line_no, "HPDrainRate")?;
                        }
                        _ => {}
                    }
                }
                Section::TimingPoints => raw_points.push(parse_timing_point(line, line_no)?),
                Section::HitObjects => {
                    if let Some(obj) = parse_hit_object(line, line_no)? {
                        raw_objects.push(obj);
                    }
                }
                Section::None | Section::Other => {}
            }
        }

        if mode != MODE_MANIA {
            bail!("not a mania chart (Mode: {mode})");
        }
        let lanes = circle_size
            .map(|cs| cs.round() as usize)
            .context("missing CircleSize (key count)")?;
        let Some(key_mode) = KeyMode::from_lane_count(lanes) else {
            bail!("{lanes}K charts are not supported");
        };

        let timing_points = resolve_timing_points(&mut raw_points);
        let notes = raw_objects
            .iter()
            .map(|obj| {
                let lane = ((obj.x * lanes as f64 / PLAYFIELD_WIDTH).floor().max(0.0) as usize)
                    .min(lanes - 1);
                match obj.end_time_us {
                    Some(end) if end > obj.time_us => NoteSpec::hold(lane, obj.time_us, end),
                    Some(_) => {
                        log::warn!(
                            "zero-length hold at {}us in lane {lane} decoded as a tap",
                            obj.time_us
                        );
                        NoteSpec::tap(lane, obj.time_us)
                    }
                    None => NoteSpec::tap(lane, obj.time_us),
                }
            })
            .collect::<Vec<_>>();

        log::debug!(
            "decoded {} {} notes, {} timing points",
            notes.len(),
            key_mode.name(),
            timing_points.len()
        );
        Ok(Beatmap::new(key_mode, timing_points, notes, metadata))
    }
}

fn parse_f64(value: &str, line_no: usize, what: &str) -> Result<f64> {
    value
        .trim()
        .parse()
        .with_context(|| format!("line {}: bad {what} {value:?}", line_no + 1))
}

fn parse_timing_point(line: &str, line_no: usize) -> Result<RawTimingPoint> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() < 2 {
        bail!("line {}: timing point needs time and beatLength", line_no + 1);
    }
    let time_ms = parse_f64(fields[0], line_no, "timing point time")?;
    let beat_length = parse_f64(fields[1], line_no, "beatLength")?;
    // Field 6 (uninherited) is optional in old formats and defaults to 1
    let uninherited = fields.get(6).is_none_or(|f| f.trim() != "0");
    Ok(RawTimingPoint {
        time_us: ms_to_us(time_ms),
        beat_length,
        uninherited,
    })
}

fn parse_hit_object(line: &str, line_no: usize) -> Result<Option<RawHitObject>> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() < 4 {
        bail!("line {}: hit object has {} fields", line_no + 1, fields.len());
    }
    let x = parse_f64(fields[0], line_no, "x")?;
    let time_us = ms_to_us(parse_f64(fields[2], line_no, "time")?);
    let kind: u32 = fields[3]
        .trim()
        .parse()
        .with_context(|| format!("line {}: bad type {:?}", line_no + 1, fields[3]))?;

    if kind & TYPE_HOLD != 0 {
        let end_field = fields
            .get(5)
            .and_then(|f| f.split(':').next())
            .with_context(|| format!("line {}: hold note without end time", line_no + 1))?;
        let end_time_us = ms_to_us(parse_f64(end_field, line_no, "hold end time")?);
        Ok(Some(RawHitObject {
            x,
            time_us,
            end_time_us: Some(end_time_us),
        }))
    } else if kind & TYPE_CIRCLE != 0 {
        Ok(Some(RawHitObject {
            x,
            time_us,
            end_time_us: None,
        }))
    } else {
        log::debug!("line {}: skipping hit object type {kind}", line_no + 1);
        Ok(None)
    }
}

/// Convert osu! timing rows into tempo/scroll points.
///
/// Uninherited rows set the tempo and reset scroll speed; inherited rows set
/// the scroll speed at the current tempo. Rows sharing a time collapse into one
/// point, later rows winning.
fn resolve_timing_points(raw: &mut [RawTimingPoint]) -> Vec<TimingPoint> {
    raw.sort_by_key(|p| p.time_us);
    let mut bpm = raw
        .iter()
        .find(|p| p.uninherited && p.beat_length > 0.0)
        .map_or(DEFAULT_BPM, |p| 60_000.0 / p.beat_length);
    let mut scroll = 1.0;
    let mut points: Vec<TimingPoint> = Vec::with_capacity(raw.len());

    for p in raw.iter() {
        if p.uninherited {
            if p.beat_length <= 0.0 {
                log::warn!("ignoring timing point at {}us with beatLength {}", p.time_us, p.beat_length);
                continue;
            }
            bpm = 60_000.0 / p.beat_length;
            scroll = 1.0;
        } else if p.beat_length < 0.0 {
            scroll = -100.0 / p.beat_length;
        }
        let point = TimingPoint::new(p.time_us, bpm).with_scroll_speed(scroll);
        match points.last_mut() {
            Some(last) if last.time_us == p.time_us => *last = point,
            _ => points.push(point),
        }
    }
    points
}
