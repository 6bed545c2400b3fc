//! Observed event types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single security-relevant occurrence reported by the event feed.
///
/// The identifier is opaque to the detector -- Windows event IDs, syscall
/// numbers, whatever the feed emits. The timestamp is supplied by the caller
/// and is never generated here; the matcher assumes events arrive in
/// non-decreasing timestamp order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedEvent {
    pub event_id: u32,
    pub timestamp: DateTime<Utc>,
}

impl ObservedEvent {
    pub fn new(event_id: u32, timestamp: DateTime<Utc>) -> Self {
        Self {
            event_id,
            timestamp,
        }
    }
}
