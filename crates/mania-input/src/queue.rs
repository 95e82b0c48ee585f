use std::sync::mpsc::{self, Receiver, Sender};

use crate::event::InputEvent;

/// Create a connected sender / queue pair.
///
/// The sender side is handed to the capture thread; the queue is owned by the
/// session and drained once per tick.
pub fn input_queue() -> (InputSender, InputQueue) {
    let (tx, rx) = mpsc::channel();
    (InputSender { tx }, InputQueue { rx: Some(rx) })
}

/// Capture-side handle. Cheap to clone and `Send`.
#[derive(Debug, Clone)]
pub struct InputSender {
    tx: Sender<InputEvent>,
}

impl InputSender {
    /// Push an event. Returns false once the queue has been closed or dropped.
    pub fn send(&self, event: InputEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// Session-side FIFO of captured input events.
#[derive(Debug)]
pub struct InputQueue {
    rx: Option<Receiver<InputEvent>>,
}

impl InputQueue {
    /// Take every event received so far, in arrival order.
    pub fn drain(&mut self) -> Vec<InputEvent> {
        match &self.rx {
            Some(rx) => rx.try_iter().collect(),
            None => Vec::new(),
        }
    }

    /// Stop consuming input. Queued events are dropped and later sends fail.
    pub fn close(&mut self) {
        if let Some(rx) = self.rx.take() {
            let dropped = rx.try_iter().count();
            if dropped > 0 {
                log::trace!("input queue closed with {dropped} unconsumed events");
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.rx.is_none()
    }
}
