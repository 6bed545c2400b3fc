//! Single-writer detection runtime.
//!
//! The window matcher mutates its buffer in place without locking, so all
//! ingestion is serialized through one spawned task fed by a channel. This is
//! the exclusive-access boundary around the buffer: nothing else ever touches
//! the matcher once the task owns it.

use tokio::sync::mpsc;
use tracing::trace;

use tracehound_core::event::ObservedEvent;
use tracehound_core::WindowMatcher;

/// Input messages to the detection task.
pub enum DetectorInput {
    Event(ObservedEvent),
    Shutdown,
}

/// Owns the matcher and drives it from a channel.
pub struct DetectorRuntime {
    matcher: WindowMatcher,
}

impl DetectorRuntime {
    pub fn new(matcher: WindowMatcher) -> Self {
        Self { matcher }
    }

    /// Spawn the detection task. Runs until the channel closes or a
    /// [`DetectorInput::Shutdown`] message arrives.
    pub fn run(mut self, mut input_rx: mpsc::Receiver<DetectorInput>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(input) = input_rx.recv().await {
                match input {
                    DetectorInput::Event(event) => {
                        // Alerts are delivered through the matcher's sink;
                        // the return value only matters to embedded callers.
                        self.matcher.add_event(event.event_id, event.timestamp);
                    }
                    DetectorInput::Shutdown => break,
                }
            }
            trace!("detector runtime shut down");
        })
    }
}
