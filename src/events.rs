//! Progress events for a refinement run.
//!
//! The engine emits one event per interesting transition over an optional
//! flume channel. Emission is best-effort: a missing or saturated consumer is
//! logged and otherwise ignored, and nothing in the engine waits on a
//! subscriber.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::curriculum::NodeId;

/// One progress transition during a refinement run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RefineEvent {
    RunStarted {
        run_id: String,
        when: DateTime<Utc>,
    },
    RoundStarted {
        round: u32,
    },
    Diagnosed {
        round: u32,
        tasks: Vec<String>,
        keyword_reasoning: String,
    },
    DeltaMerged {
        round: u32,
        specialist: String,
        nodes_touched: usize,
        edges_added: usize,
        resources_added: usize,
    },
    CapReached {
        round: u32,
        critical_cleanup: bool,
    },
    Composed {
        emphasized: usize,
        preserved: usize,
        deleted: usize,
    },
    RootsOrdered {
        roots: Vec<NodeId>,
    },
    RunCompleted {
        run_id: String,
        rounds: u32,
        when: DateTime<Utc>,
    },
}

/// Best-effort sender side of the event channel.
#[derive(Clone, Debug, Default)]
pub struct EventEmitter {
    sender: Option<flume::Sender<RefineEvent>>,
}

impl EventEmitter {
    /// An emitter that drops every event; the engine's default.
    #[must_use]
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    /// Create a connected emitter and its receiving end.
    #[must_use]
    pub fn channel() -> (Self, flume::Receiver<RefineEvent>) {
        let (tx, rx) = flume::unbounded();
        (Self { sender: Some(tx) }, rx)
    }

    /// Emit an event, ignoring a disconnected receiver.
    pub fn emit(&self, event: RefineEvent) {
        if let Some(sender) = &self.sender
            && sender.send(event).is_err()
        {
            tracing::debug!("refine event dropped: receiver disconnected");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_flow_through_the_channel() {
        let (emitter, rx) = EventEmitter::channel();
        emitter.emit(RefineEvent::RoundStarted { round: 1 });
        assert_eq!(rx.recv().unwrap(), RefineEvent::RoundStarted { round: 1 });
    }

    #[test]
    fn disconnected_receiver_is_not_an_error() {
        let (emitter, rx) = EventEmitter::channel();
        drop(rx);
        emitter.emit(RefineEvent::RoundStarted { round: 1 });
    }

    #[test]
    fn disabled_emitter_drops_silently() {
        EventEmitter::disabled().emit(RefineEvent::RoundStarted { round: 0 });
    }
}
