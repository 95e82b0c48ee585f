//! Judgment engine.
//!
//! Matches input events to scheduled notes. Auto-miss resolution lives in
//! [`NoteScheduler::advance`]; callers run it before matching the input of the
//! same tick so a late press never revives a retired note.

use mania_input::{InputEvent, KeyEdge};

use crate::judge::{JudgeEventKind, JudgeSource, Judgment, JudgmentResult};
use crate::judge_property::JudgeProperty;
use crate::scheduler::{NoteScheduler, NoteState};

#[derive(Debug, Clone)]
pub struct JudgeEngine {
    judge: JudgeProperty,
    /// Per-lane key state as seen through the event stream
    pressed: Vec<bool>,
}

impl JudgeEngine {
    pub fn new(lane_count: usize, judge: &JudgeProperty) -> Self {
        Self {
            judge: judge.clone(),
            pressed: vec![false; lane_count],
        }
    }

    pub fn is_pressed(&self, lane: usize) -> bool {
        self.pressed.get(lane).copied().unwrap_or(false)
    }

    /// Apply one input event. Returns the judgment it produced, if any.
    ///
    /// Events that match nothing (no note in range, repeated presses, releases
    /// of keys not held, unknown lanes) are no-ops.
    pub fn handle(
        &mut self,
        scheduler: &mut NoteScheduler,
        event: &InputEvent,
    ) -> Option<JudgmentResult> {
        let Some(pressed) = self.pressed.get_mut(event.lane) else {
            log::trace!("input for unknown lane {} ignored", event.lane);
            return None;
        };
        let result = match event.edge {
            KeyEdge::Down => {
                if *pressed {
                    log::trace!("repeated press on lane {} ignored", event.lane);
                    return None;
                }
                *pressed = true;
                self.press(scheduler, event)
            }
            KeyEdge::Up => {
                if !*pressed {
                    return None;
                }
                *pressed = false;
                self.release(scheduler, event)
            }
        };
        match &result {
            Some(r) => log::debug!(
                "{} {:?} note {} lane {} offset {:+.1}ms",
                r.judgment.name(),
                r.kind,
                r.note_index,
                r.lane,
                r.offset_ms()
            ),
            None => log::trace!(
                "{:?} on lane {} at {}us matched nothing",
                event.edge,
                event.lane,
                event.time_us
            ),
        }
        result
    }

    fn press(&self, scheduler: &mut NoteScheduler, event: &InputEvent) -> Option<JudgmentResult> {
        let window = &self.judge.note;
        let mut best: Option<(usize, i64)> = None;
        for note in scheduler.pending_notes(event.lane) {
            let offset = event.time_us - note.spec.time_us;
            // Later notes only get further away
            if offset < -window.good_us {
                break;
            }
            if note.state != NoteState::Pending || !window.contains(offset) {
                continue;
            }
            // Strict comparison keeps the earlier note on ties
            if best.is_none_or(|(_, b)| offset.unsigned_abs() < b.unsigned_abs()) {
                best = Some((note.index, offset));
            }
        }

        let (index, offset_us) = best?;
        let judgment = window.judge(offset_us)?;
        let note = scheduler.note(index)?;
        let (kind, state) = if note.spec.is_hold() {
            (JudgeEventKind::Head, NoteState::HeadJudged { head: judgment })
        } else {
            (JudgeEventKind::TapComplete, NoteState::Resolved)
        };
        let lane = note.spec.lane;
        scheduler.set_state(index, state);
        Some(JudgmentResult {
            note_index: index,
            lane,
            judgment,
            offset_us,
            kind,
            source: JudgeSource::Input,
        })
    }

    fn release(
        &self,
        scheduler: &mut NoteScheduler,
        event: &InputEvent,
    ) -> Option<JudgmentResult> {
        let note = scheduler.held_note(event.lane)?;
        let index = note.index;
        let offset_us = event.time_us - note.spec.end_time_us;
        let judgment = self.release_judgment(offset_us);
        scheduler.set_state(index, NoteState::Resolved);
        Some(JudgmentResult {
            note_index: index,
            lane: event.lane,
            judgment,
            offset_us,
            kind: JudgeEventKind::Tail,
            source: JudgeSource::Input,
        })
    }

    /// Tail judgment for a release `offset_us` away from the hold's end.
    fn release_judgment(&self, offset_us: i64) -> Judgment {
        if let Some(j) = self.judge.hold_end.judge(offset_us) {
            j
        } else if offset_us < 0 && -offset_us <= self.judge.early_release_grace_us {
            Judgment::Good
        } else {
            Judgment::Miss
        }
    }
}
