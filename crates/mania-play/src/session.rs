//! Game session.
//!
//! One session per play. The host calls [`GameSession::tick`] once per frame;
//! everything (clock read, auto-miss, input matching, scoring) happens inside
//! that call on the host's thread.

use anyhow::{Context, Result};
use mania_audio::AudioClock;
use mania_config::PlayConfig;
use mania_input::{InputEvent, InputQueue};
use mania_model::Beatmap;
use mania_rule::{JudgeEngine, JudgmentResult, NoteScheduler, ScoreAccumulator, ScoreSnapshot};
use serde::Serialize;

use crate::play_result::PlayResult;
use crate::view::LaneView;

/// Conditions reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionSignal {
    /// The audio position stopped advancing; judgment is frozen
    AudioStalled,
    /// The audio position advances again after a stall
    AudioResumed,
    /// Life reached zero
    Failed,
    /// Every note is resolved and the track has ended
    Completed,
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionOutcome {
    Cleared,
    Failed,
    Quit,
}

/// Output of one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Song time the tick was evaluated at
    pub time_us: i64,
    /// Judgments in the order they were scored
    pub judgments: Vec<JudgmentResult>,
    pub signals: Vec<SessionSignal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Playing,
    Paused,
    Finished(SessionOutcome),
}

pub struct GameSession {
    beatmap: Beatmap,
    clock: AudioClock,
    input: InputQueue,
    /// Input drained at pause time, judged on the first tick after resume
    carried: Vec<InputEvent>,
    scheduler: NoteScheduler,
    engine: JudgeEngine,
    score: ScoreAccumulator,
    phase: Phase,
    /// Song time at creation; earlier input is discarded
    start_time_us: i64,
    future_tolerance_us: i64,
    now_us: i64,
    stalled: bool,
    /// Song time when the current pause began
    paused_at_us: i64,
    judgments_total: usize,
}

impl GameSession {
    /// Create a session, rejecting a beatmap that violates its invariants.
    ///
    /// The clock takes its offset and stall threshold from `config`. Out of
    /// range settings in `config` are repaired first.
    pub fn new(
        beatmap: Beatmap,
        clock: AudioClock,
        input: InputQueue,
        config: &PlayConfig,
    ) -> Result<Self> {
        beatmap
            .validate()
            .context("beatmap rejected at session start")?;
        let mut config = config.clone();
        config.validate();
        let judge = config.judge_for(&beatmap);
        let mut clock = clock
            .with_offset_us(config.offset_us())
            .with_stall_threshold_us(config.stall_threshold_us());
        let start_time_us = clock.sample().time_us;

        log::info!(
            "session start: {} {} notes, {} judgment events, offset {}ms",
            beatmap.key_mode().name(),
            beatmap.notes().len(),
            beatmap.judgment_event_count(),
            config.offset_ms
        );
        Ok(Self {
            scheduler: NoteScheduler::new(&beatmap, &judge),
            engine: JudgeEngine::new(beatmap.lane_count(), &judge),
            score: ScoreAccumulator::new(&config.score, &config.life),
            beatmap,
            clock,
            input,
            carried: Vec::new(),
            phase: Phase::Playing,
            start_time_us,
            future_tolerance_us: config.input_future_tolerance_us(),
            now_us: start_time_us,
            stalled: false,
            paused_at_us: start_time_us,
            judgments_total: 0,
        })
    }

    /// Advance the session to the current song time.
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport {
            time_us: self.now_us,
            ..Default::default()
        };
        if self.phase != Phase::Playing {
            return report;
        }

        let sample = self.clock.sample();
        let now = sample.time_us;
        self.now_us = now;
        report.time_us = now;

        if sample.stalled {
            if !self.stalled {
                log::warn!("audio stalled at {now}us, judgment frozen");
                report.signals.push(SessionSignal::AudioStalled);
                self.stalled = true;
            }
            return report;
        }
        if self.stalled {
            log::info!("audio resumed at {now}us");
            report.signals.push(SessionSignal::AudioResumed);
            self.stalled = false;
        }

        let mut events = std::mem::take(&mut self.carried);
        events.extend(self.input.drain());
        let latest_us = now.saturating_add(self.future_tolerance_us);
        for event in events {
            if event.time_us < self.start_time_us || event.time_us > latest_us {
                log::trace!(
                    "discarding {:?} on lane {} at {}us (now {now}us)",
                    event.edge,
                    event.lane,
                    event.time_us
                );
                continue;
            }
            // Auto-misses due by the event's own time go first
            let misses = self.scheduler.advance(event.time_us);
            if !self.record(misses, &mut report) {
                break;
            }
            let hit = self.engine.handle(&mut self.scheduler, &event);
            if !self.record(hit, &mut report) {
                break;
            }
        }
        if self.phase == Phase::Playing {
            let misses = self.scheduler.advance(now);
            self.record(misses, &mut report);
        }

        if self.phase == Phase::Finished(SessionOutcome::Failed) {
            report.signals.push(SessionSignal::Failed);
        } else if self.scheduler.is_complete() && sample.finished {
            log::info!("session complete at {now}us");
            self.end(SessionOutcome::Cleared);
            report.signals.push(SessionSignal::Completed);
        }
        report
    }

    /// Score results in order. Returns false once the play has failed.
    fn record(
        &mut self,
        results: impl IntoIterator<Item = JudgmentResult>,
        report: &mut TickReport,
    ) -> bool {
        for result in results {
            self.score.apply(&result);
            self.judgments_total += 1;
            report.judgments.push(result);
            if self.score.is_failed() {
                log::info!("life empty at {}us, play failed", self.now_us);
                self.end(SessionOutcome::Failed);
                return false;
            }
        }
        true
    }

    fn end(&mut self, outcome: SessionOutcome) {
        let dropped = self.scheduler.discard_remaining();
        if dropped > 0 {
            log::debug!("{dropped} unresolved notes discarded");
        }
        self.input.close();
        self.carried.clear();
        self.phase = Phase::Finished(outcome);
    }

    /// Stop consuming input and the clock until [`resume`](Self::resume).
    ///
    /// Input already queued was captured before the pause and is kept.
    pub fn pause(&mut self) {
        if self.phase == Phase::Playing {
            self.carried.extend(self.input.drain());
            let clock = &self.clock;
            self.paused_at_us = clock.time_at(clock.wall_now_us()).max(self.now_us);
            self.clock.suspend();
            self.phase = Phase::Paused;
            log::info!("paused at {}us", self.now_us);
        }
    }

    /// Continue after a pause.
    ///
    /// Events delivered late but stamped before the pause are kept; input
    /// captured while paused is dropped.
    pub fn resume(&mut self) {
        if self.phase == Phase::Paused {
            let paused_at = self.paused_at_us;
            let (kept, stale): (Vec<_>, Vec<_>) = self
                .input
                .drain()
                .into_iter()
                .partition(|e| e.time_us <= paused_at);
            self.carried.extend(kept);
            if !stale.is_empty() {
                log::trace!("dropping {} events captured while paused", stale.len());
            }
            self.clock.resume();
            self.phase = Phase::Playing;
            log::info!("resumed at {}us", self.now_us);
        }
    }

    /// Abandon the play. No further judgments are produced.
    pub fn quit(mut self) -> PlayResult {
        if !self.is_finished() {
            log::info!("quit at {}us", self.now_us);
            self.end(SessionOutcome::Quit);
        }
        self.finish()
    }

    /// Result of the session; an unfinished session counts as quit.
    pub fn finish(mut self) -> PlayResult {
        let outcome = match self.phase {
            Phase::Finished(outcome) => outcome,
            Phase::Playing | Phase::Paused => {
                self.end(SessionOutcome::Quit);
                SessionOutcome::Quit
            }
        };
        PlayResult::new(
            outcome,
            self.score.snapshot(),
            self.judgments_total,
            self.beatmap.judgment_event_count(),
        )
    }

    /// Unresolved notes of every lane relative to the last sampled song time.
    pub fn lanes(&self) -> Vec<LaneView> {
        (0..self.beatmap.lane_count())
            .map(|lane| {
                LaneView::build(
                    &self.scheduler,
                    lane,
                    self.engine.is_pressed(lane),
                    self.now_us,
                )
            })
            .collect()
    }

    pub fn snapshot(&self) -> ScoreSnapshot {
        self.score.snapshot()
    }

    pub fn beatmap(&self) -> &Beatmap {
        &self.beatmap
    }

    pub fn clock(&self) -> &AudioClock {
        &self.clock
    }

    /// Song time of the last tick.
    pub fn now_us(&self) -> i64 {
        self.now_us
    }

    pub fn start_time_us(&self) -> i64 {
        self.start_time_us
    }

    pub fn is_paused(&self) -> bool {
        self.phase == Phase::Paused
    }

    pub fn is_stalled(&self) -> bool {
        self.stalled
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::Finished(_))
    }

    pub fn outcome(&self) -> Option<SessionOutcome> {
        match self.phase {
            Phase::Finished(outcome) => Some(outcome),
            Phase::Playing | Phase::Paused => None,
        }
    }
}
