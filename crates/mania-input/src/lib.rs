// Input side of the core: lane events, the capture FIFO, key bindings and autoplay

pub mod autoplay;
pub mod event;
pub mod key_config;
pub mod queue;

pub use autoplay::Autoplay;
pub use event::{InputEvent, KeyEdge};
pub use key_config::{KeyBindings, KeyMapper};
pub use queue::{InputQueue, InputSender, input_queue};
