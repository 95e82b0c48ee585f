//! Note scheduler.
//!
//! Owns the runtime state of every note and the per-lane ordering used for
//! matching and auto-miss resolution.

use mania_model::{Beatmap, NoteSpec};

use crate::judge::{JudgeEventKind, JudgeSource, Judgment, JudgmentResult};
use crate::judge_property::JudgeProperty;

/// Lifecycle of a scheduled note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteState {
    /// Not judged yet
    Pending,
    /// Hold note whose head has been judged; waiting for the release
    HeadJudged { head: Judgment },
    /// Fully judged; never matched or auto-missed again
    Resolved,
}

/// A note plus its runtime state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledNote {
    /// Index into the beatmap's note list
    pub index: usize,
    pub spec: NoteSpec,
    pub state: NoteState,
}

impl ScheduledNote {
    /// Latest time a press can still judge this note.
    pub fn head_deadline_us(&self, judge: &JudgeProperty) -> i64 {
        self.spec.time_us.saturating_add(judge.note.good_us)
    }

    /// Latest time a release can still judge this hold inside its window.
    pub fn tail_deadline_us(&self, judge: &JudgeProperty) -> i64 {
        self.spec.end_time_us.saturating_add(judge.hold_end.good_us)
    }

    pub fn is_resolved(&self) -> bool {
        self.state == NoteState::Resolved
    }
}

#[derive(Debug, Clone)]
pub struct NoteScheduler {
    judge: JudgeProperty,
    /// All notes in beatmap order
    notes: Vec<ScheduledNote>,
    /// Per-lane note indices, ascending by start time
    lanes: Vec<Vec<usize>>,
    /// Per-lane position of the first possibly unresolved note
    cursors: Vec<usize>,
    remaining: usize,
}

impl NoteScheduler {
    pub fn new(beatmap: &Beatmap, judge: &JudgeProperty) -> Self {
        let notes: Vec<ScheduledNote> = beatmap
            .notes()
            .iter()
            .enumerate()
            .map(|(index, spec)| ScheduledNote {
                index,
                spec: *spec,
                state: NoteState::Pending,
            })
            .collect();
        let mut lanes = vec![Vec::new(); beatmap.lane_count()];
        for note in &notes {
            if let Some(lane) = lanes.get_mut(note.spec.lane) {
                lane.push(note.index);
            }
        }
        let remaining = notes.len();
        Self {
            judge: judge.clone(),
            notes,
            lanes,
            cursors: vec![0; beatmap.lane_count()],
            remaining,
        }
    }

    pub fn judge_property(&self) -> &JudgeProperty {
        &self.judge
    }

    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    pub fn note(&self, index: usize) -> Option<&ScheduledNote> {
        self.notes.get(index)
    }

    pub fn notes(&self) -> &[ScheduledNote] {
        &self.notes
    }

    /// Unresolved notes of a lane (Pending or HeadJudged), in time order.
    pub fn pending_notes(&self, lane: usize) -> impl Iterator<Item = &ScheduledNote> + '_ {
        let indices = self
            .lanes
            .get(lane)
            .map_or(&[][..], |l| &l[self.cursors[lane]..]);
        indices
            .iter()
            .map(|&i| &self.notes[i])
            .filter(|n| !n.is_resolved())
    }

    /// The earliest unresolved note of `lane` starting at or before `time_us`.
    pub fn note_due_before(&self, lane: usize, time_us: i64) -> Option<&ScheduledNote> {
        self.pending_notes(lane)
            .next()
            .filter(|n| n.spec.time_us <= time_us)
    }

    /// The hold note of `lane` currently waiting for its release.
    pub fn held_note(&self, lane: usize) -> Option<&ScheduledNote> {
        self.pending_notes(lane)
            .find(|n| matches!(n.state, NoteState::HeadJudged { .. }))
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn is_complete(&self) -> bool {
        self.remaining == 0
    }

    /// Auto-miss every note event whose deadline is before `now_us`.
    ///
    /// A deadline is overdue when `now_us` is strictly greater. Results are
    /// ordered by note start time, then lane; a hold's head comes before its
    /// tail. Calling this repeatedly with the same or an earlier time yields
    /// nothing new.
    pub fn advance(&mut self, now_us: i64) -> Vec<JudgmentResult> {
        let mut results = Vec::new();
        for lane in 0..self.lanes.len() {
            let mut pos = self.cursors[lane];
            while let Some(&idx) = self.lanes[lane].get(pos) {
                let note = self.notes[idx];
                // Deadlines never precede the start time
                if note.spec.time_us > now_us {
                    break;
                }
                match note.state {
                    NoteState::Pending if now_us > note.head_deadline_us(&self.judge) => {
                        if note.spec.is_hold() {
                            results.push(self.miss(&note, JudgeEventKind::Head));
                            results.push(self.miss(&note, JudgeEventKind::Tail));
                        } else {
                            results.push(self.miss(&note, JudgeEventKind::TapComplete));
                        }
                        self.set_state(idx, NoteState::Resolved);
                    }
                    NoteState::HeadJudged { .. }
                        if now_us > note.tail_deadline_us(&self.judge) =>
                    {
                        results.push(self.miss(&note, JudgeEventKind::Tail));
                        self.set_state(idx, NoteState::Resolved);
                    }
                    _ => {}
                }
                pos += 1;
            }
        }
        results.sort_by_key(|r| {
            (
                self.notes[r.note_index].spec.time_us,
                r.lane,
                r.kind == JudgeEventKind::Tail,
            )
        });
        for r in &results {
            log::debug!(
                "auto miss: note {} lane {} {:?}",
                r.note_index,
                r.lane,
                r.kind
            );
        }
        results
    }

    fn miss(&self, note: &ScheduledNote, kind: JudgeEventKind) -> JudgmentResult {
        let offset_us = match kind {
            JudgeEventKind::Tail => self.judge.hold_end.good_us,
            JudgeEventKind::Head | JudgeEventKind::TapComplete => self.judge.note.good_us,
        };
        JudgmentResult {
            note_index: note.index,
            lane: note.spec.lane,
            judgment: Judgment::Miss,
            offset_us,
            kind,
            source: JudgeSource::AutoMiss,
        }
    }

    /// Move a note to a new state, keeping the remaining count and the lane
    /// cursor in step.
    pub(crate) fn set_state(&mut self, index: usize, state: NoteState) {
        let Some(note) = self.notes.get_mut(index) else {
            return;
        };
        if note.is_resolved() {
            return;
        }
        note.state = state;
        if state == NoteState::Resolved {
            self.remaining -= 1;
            let lane = note.spec.lane;
            let indices = &self.lanes[lane];
            let cursor = &mut self.cursors[lane];
            while *cursor < indices.len() && self.notes[indices[*cursor]].is_resolved() {
                *cursor += 1;
            }
        }
    }

    /// Drop every unresolved note without judging it. Returns how many were dropped.
    pub fn discard_remaining(&mut self) -> usize {
        let dropped = self.remaining;
        for note in &mut self.notes {
            note.state = NoteState::Resolved;
        }
        for (lane, cursor) in self.cursors.iter_mut().enumerate() {
            *cursor = self.lanes[lane].len();
        }
        self.remaining = 0;
        dropped
    }
}
