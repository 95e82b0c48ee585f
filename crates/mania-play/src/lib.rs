// Game session: drives the clock, scheduler, judge engine and scoring once per host tick

mod play_result;
mod session;
mod view;

pub use play_result::{ClearType, Grade, PlayResult};
pub use session::{GameSession, SessionOutcome, SessionSignal, TickReport};
pub use view::{LaneView, NoteView};
