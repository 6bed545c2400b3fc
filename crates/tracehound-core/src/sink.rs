//! Alert payloads and the alert sink capability.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pattern::Pattern;

/// An alert raised when a configured pattern completes.
///
/// Carries the pattern's canonical configured sequence, not the buffer
/// entries that satisfied it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyAlert {
    /// Unique alert id (UUID v4 as string).
    pub id: String,
    /// Name of the matched pattern.
    pub pattern_name: String,
    /// The pattern's configured event-ID sequence.
    pub sequence: Vec<u32>,
    /// When the match was detected.
    pub detected_at: DateTime<Utc>,
}

impl AnomalyAlert {
    pub(crate) fn for_pattern(pattern: &Pattern) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            pattern_name: pattern.name.clone(),
            sequence: pattern.sequence.clone(),
            detected_at: Utc::now(),
        }
    }
}

/// Narrow capability interface for alert delivery.
///
/// Invoked synchronously inside [`crate::WindowMatcher::add_event`], at most
/// once per call. Implementations must not block; hand off to a channel or
/// task if downstream handling is slow.
pub trait AlertSink: Send + Sync {
    fn on_anomaly(&self, alert: &AnomalyAlert);
}
