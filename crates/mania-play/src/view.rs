use mania_model::NoteKind;
use mania_rule::{NoteScheduler, NoteState};
use serde::Serialize;

/// Renderer-facing view of one unresolved note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NoteView {
    pub note_index: usize,
    pub kind: NoteKind,
    /// Hold whose head has been judged (the key is being held)
    pub head_judged: bool,
    /// Note start minus current song time; negative once the head has passed
    pub time_to_head_us: i64,
    /// Hold end minus current song time (equals `time_to_head_us` for taps)
    pub time_to_tail_us: i64,
}

/// Renderer-facing view of one lane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaneView {
    pub lane: usize,
    pub pressed: bool,
    /// Pending and head-judged notes in time order
    pub notes: Vec<NoteView>,
}

impl LaneView {
    pub(crate) fn build(
        scheduler: &NoteScheduler,
        lane: usize,
        pressed: bool,
        now_us: i64,
    ) -> Self {
        let notes = scheduler
            .pending_notes(lane)
            .map(|n| NoteView {
                note_index: n.index,
                kind: n.spec.kind,
                head_judged: matches!(n.state, NoteState::HeadJudged { .. }),
                time_to_head_us: n.spec.time_us - now_us,
                time_to_tail_us: n.spec.end_time_us - now_us,
            })
            .collect();
        Self {
            lane,
            pressed,
            notes,
        }
    }
}
