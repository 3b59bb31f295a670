//! Outbound draft notifications.
//!
//! Delivery is at-most-once. The engine emits after commit and never waits
//! on, or learns about, the transport.

mod redis_sink;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub use redis_sink::RedisEventSink;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DraftEvent {
    PickMade {
        draft_id: i64,
        pick_number: i32,
        round: i32,
        pick_in_round: i32,
        roster_id: i64,
        player_id: i64,
        is_auto_pick: bool,
    },
    NextPick {
        draft_id: i64,
        pick_number: i32,
        round: i32,
        roster_id: i64,
        #[serde(with = "time::serde::rfc3339::option")]
        pick_deadline: Option<OffsetDateTime>,
    },
    QueueChanged {
        draft_id: i64,
        roster_id: i64,
    },
    AutodraftForced {
        draft_id: i64,
        roster_id: i64,
    },
    DraftCompleted {
        draft_id: i64,
    },
}

impl DraftEvent {
    pub fn draft_id(&self) -> i64 {
        match self {
            DraftEvent::PickMade { draft_id, .. }
            | DraftEvent::NextPick { draft_id, .. }
            | DraftEvent::QueueChanged { draft_id, .. }
            | DraftEvent::AutodraftForced { draft_id, .. }
            | DraftEvent::DraftCompleted { draft_id } => *draft_id,
        }
    }

    pub fn channel(&self) -> String {
        format!("draft:{}", self.draft_id())
    }
}

/// Fire-and-forget event port.
pub trait DraftEventSink: Send + Sync {
    fn emit(&self, event: DraftEvent);

    fn emit_all(&self, events: Vec<DraftEvent>) {
        for event in events {
            self.emit(event);
        }
    }
}

/// Discards everything. Used when no transport is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventSink;

impl DraftEventSink for NullEventSink {
    fn emit(&self, _event: DraftEvent) {}
}

/// Records events in memory so tests can assert on them.
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    events: Mutex<Vec<DraftEvent>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DraftEvent> {
        self.events.lock().clone()
    }

    pub fn take(&self) -> Vec<DraftEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl DraftEventSink for MemoryEventSink {
    fn emit(&self, event: DraftEvent) {
        self.events.lock().push(event);
    }
}
