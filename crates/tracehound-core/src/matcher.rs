//! The sliding-window pattern matcher.
//!
//! Owns a bounded, time-ordered buffer of recently observed events and the
//! pattern library. Each ingested event runs a complete eviction + match
//! cycle; there is no partial-match state carried between calls beyond the
//! buffer contents themselves.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use crate::config::{DetectorConfig, EvictionMode};
use crate::error::{ConfigError, Result};
use crate::event::ObservedEvent;
use crate::pattern::{Pattern, PatternLibrary};
use crate::sink::{AlertSink, AnomalyAlert};

/// The window matcher.
///
/// Designed for single-threaded invocation: the buffer is mutated in place
/// without internal synchronization, so callers must serialize calls to
/// [`add_event`](Self::add_event) -- typically by owning the matcher inside
/// one dedicated processing task.
pub struct WindowMatcher {
    library: PatternLibrary,
    buffer: VecDeque<ObservedEvent>,
    threshold: Duration,
    eviction: EvictionMode,
    sink: Option<Arc<dyn AlertSink>>,
}

impl std::fmt::Debug for WindowMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowMatcher")
            .field("library", &self.library)
            .field("buffer", &self.buffer)
            .field("threshold", &self.threshold)
            .field("eviction", &self.eviction)
            .field("sink", &self.sink.as_ref().map(|_| "dyn AlertSink"))
            .finish()
    }
}

impl WindowMatcher {
    /// Create a matcher over the given library.
    ///
    /// Fails if the threshold is not positive; an invalid matcher can never
    /// be constructed.
    pub fn new(
        library: PatternLibrary,
        time_threshold_ms: i64,
        eviction: EvictionMode,
    ) -> Result<Self> {
        if time_threshold_ms <= 0 {
            return Err(ConfigError::InvalidThreshold {
                millis: time_threshold_ms,
            });
        }
        Ok(Self {
            library,
            buffer: VecDeque::new(),
            threshold: Duration::milliseconds(time_threshold_ms),
            eviction,
            sink: None,
        })
    }

    /// Build a matcher from configuration: built-in patterns (unless
    /// disabled) followed by any custom patterns file.
    pub fn from_config(config: &DetectorConfig) -> Result<Self> {
        config.validate()?;
        let mut library = if config.include_builtin_patterns {
            PatternLibrary::builtin()
        } else {
            PatternLibrary::new(Vec::new())?
        };
        if let Some(path) = &config.patterns_path {
            library.load_custom(path)?;
        }
        Self::new(library, config.time_threshold_ms, config.eviction)
    }

    /// Install an alert sink, invoked synchronously on every match.
    pub fn with_sink(mut self, sink: Arc<dyn AlertSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Ingest one event: append, evict stale entries, then evaluate the
    /// library in order. The first pattern that completes wins; at most one
    /// alert is produced per call.
    pub fn add_event(&mut self, event_id: u32, timestamp: DateTime<Utc>) -> Option<AnomalyAlert> {
        self.buffer.push_back(ObservedEvent::new(event_id, timestamp));

        let evaluation_clock = match self.eviction {
            EvictionMode::WallClock => Utc::now(),
            EvictionMode::EventTime => timestamp,
        };
        self.evict(evaluation_clock);

        let matched = self
            .library
            .iter()
            .find(|pattern| self.sequence_in_buffer(pattern))?;

        let alert = AnomalyAlert::for_pattern(matched);
        warn!(
            pattern = %alert.pattern_name,
            sequence = ?alert.sequence,
            "anomaly detected"
        );
        if let Some(sink) = &self.sink {
            sink.on_anomaly(&alert);
        }
        Some(alert)
    }

    /// Remove head entries older than the threshold relative to the
    /// evaluation clock. The buffer is time-ascending, so eviction stops at
    /// the first fresh entry.
    fn evict(&mut self, evaluation_clock: DateTime<Utc>) {
        while let Some(front) = self.buffer.front() {
            if evaluation_clock - front.timestamp > self.threshold {
                self.buffer.pop_front();
            } else {
                break;
            }
        }
    }

    /// Ordered-subsequence check: does the pattern's sequence appear in the
    /// buffer, oldest to newest, with the span from the first matched entry
    /// to every later matched entry within the threshold?
    ///
    /// Intervening unrelated events are skipped; matches need not be
    /// contiguous.
    fn sequence_in_buffer(&self, pattern: &Pattern) -> bool {
        let mut cursor = 0usize;
        let mut first_match: Option<DateTime<Utc>> = None;

        for entry in &self.buffer {
            if entry.event_id != pattern.sequence[cursor] {
                continue;
            }
            match first_match {
                None => first_match = Some(entry.timestamp),
                Some(first) => {
                    if entry.timestamp - first > self.threshold {
                        return false;
                    }
                }
            }
            cursor += 1;
            if cursor == pattern.sequence.len() {
                return true;
            }
        }
        false
    }

    /// Number of registered patterns.
    pub fn pattern_count(&self) -> usize {
        self.library.len()
    }

    /// Number of buffered events (for tests/metrics).
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    /// Iterate the buffered events, oldest to newest (for tests/metrics).
    pub fn buffered_events(&self) -> impl Iterator<Item = &ObservedEvent> {
        self.buffer.iter()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    const THRESHOLD_MS: i64 = 2000;

    fn ms(base: DateTime<Utc>, offset_ms: i64) -> DateTime<Utc> {
        base + Duration::milliseconds(offset_ms)
    }

    /// The pattern set of the reference deployment.
    fn fixture_library() -> PatternLibrary {
        PatternLibrary::new(vec![
            Pattern::new("Lateral Movement via RDP", vec![4624, 4776, 4672, 7045]),
            Pattern::new("Pattern A", vec![1, 4, 7]),
            Pattern::new("Pattern B", vec![3, 1, 2, 5]),
        ])
        .unwrap()
    }

    fn matcher(eviction: EvictionMode) -> WindowMatcher {
        WindowMatcher::new(fixture_library(), THRESHOLD_MS, eviction).unwrap()
    }

    /// Records every alert it receives.
    struct RecordingSink {
        alerts: Mutex<Vec<AnomalyAlert>>,
    }

    impl RecordingSink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                alerts: Mutex::new(Vec::new()),
            })
        }

        fn recorded(&self) -> Vec<AnomalyAlert> {
            self.alerts.lock().unwrap().clone()
        }
    }

    impl AlertSink for RecordingSink {
        fn on_anomaly(&self, alert: &AnomalyAlert) {
            self.alerts.lock().unwrap().push(alert.clone());
        }
    }

    // -- Reference scenarios --

    #[test]
    fn pattern_a_completes() {
        let mut m = matcher(EvictionMode::WallClock);
        let t0 = Utc::now();

        assert!(m.add_event(1, t0).is_none());
        assert!(m.add_event(4, ms(t0, 10)).is_none());
        let alert = m.add_event(7, ms(t0, 20)).expect("Pattern A should match");
        assert_eq!(alert.pattern_name, "Pattern A");
        assert_eq!(alert.sequence, vec![1, 4, 7]);
    }

    #[test]
    fn pattern_b_completes() {
        let mut m = matcher(EvictionMode::WallClock);
        let t0 = Utc::now();

        m.add_event(3, t0);
        m.add_event(1, ms(t0, 10));
        m.add_event(2, ms(t0, 20));
        let alert = m.add_event(5, ms(t0, 30)).expect("Pattern B should match");
        assert_eq!(alert.pattern_name, "Pattern B");
        assert_eq!(alert.sequence, vec![3, 1, 2, 5]);
    }

    #[test]
    fn rdp_lateral_movement_with_interleaved_noise() {
        let mut m = matcher(EvictionMode::WallClock);
        let t0 = Utc::now();

        m.add_event(4625, t0);
        m.add_event(4624, ms(t0, 10));
        m.add_event(7036, ms(t0, 10));
        m.add_event(4776, ms(t0, 10));
        m.add_event(4672, ms(t0, 10));
        let alert = m
            .add_event(7045, ms(t0, 10))
            .expect("interleaved noise must not block the match");
        assert_eq!(alert.pattern_name, "Lateral Movement via RDP");
        assert_eq!(alert.sequence, vec![4624, 4776, 4672, 7045]);
    }

    #[test]
    fn span_beyond_threshold_rejected() {
        // All three identifiers present in order, but the first-to-last span
        // is 3010 ms > 2000 ms. Wall-clock eviction with fresh timestamps
        // keeps every entry buffered, so only the span check can reject.
        let mut m = matcher(EvictionMode::WallClock);
        let t0 = Utc::now();

        assert!(m.add_event(1, t0).is_none());
        assert!(m.add_event(4, ms(t0, 3000)).is_none());
        assert!(m.add_event(7, ms(t0, 3010)).is_none());
    }

    #[test]
    fn unrelated_event_produces_no_alert_and_one_entry() {
        let mut m = matcher(EvictionMode::WallClock);
        assert!(m.add_event(9999, Utc::now()).is_none());
        assert_eq!(m.buffer_len(), 1);
    }

    // -- Ordering semantics --

    #[test]
    fn reversed_order_does_not_match() {
        let mut m = matcher(EvictionMode::WallClock);
        let t0 = Utc::now();

        assert!(m.add_event(7, t0).is_none());
        assert!(m.add_event(4, ms(t0, 10)).is_none());
        assert!(m.add_event(1, ms(t0, 20)).is_none());
    }

    #[test]
    fn repeated_identifiers_require_repeated_entries() {
        let lib = PatternLibrary::new(vec![Pattern::new("brute", vec![4625, 4625, 4624])]).unwrap();
        let mut m = WindowMatcher::new(lib, THRESHOLD_MS, EvictionMode::WallClock).unwrap();
        let t0 = Utc::now();

        m.add_event(4625, t0);
        // A single 4625 must not satisfy both cursor positions.
        assert!(m.add_event(4624, ms(t0, 10)).is_none());
        m.add_event(4625, ms(t0, 20));
        m.add_event(4625, ms(t0, 30));
        assert!(m.add_event(4624, ms(t0, 40)).is_some());
    }

    #[test]
    fn first_match_wins_in_library_order() {
        let lib = PatternLibrary::new(vec![
            Pattern::new("first", vec![1, 2]),
            Pattern::new("second", vec![3, 2]),
        ])
        .unwrap();
        let mut m = WindowMatcher::new(lib, THRESHOLD_MS, EvictionMode::WallClock).unwrap();
        let t0 = Utc::now();

        m.add_event(1, t0);
        m.add_event(3, ms(t0, 10));
        // Both patterns complete on this event; only the first is reported.
        let alert = m.add_event(2, ms(t0, 20)).unwrap();
        assert_eq!(alert.pattern_name, "first");
    }

    #[test]
    fn single_element_pattern_matches_immediately() {
        let lib = PatternLibrary::new(vec![Pattern::new("log cleared", vec![1102])]).unwrap();
        let mut m = WindowMatcher::new(lib, THRESHOLD_MS, EvictionMode::WallClock).unwrap();
        let alert = m.add_event(1102, Utc::now()).unwrap();
        assert_eq!(alert.pattern_name, "log cleared");
    }

    #[test]
    fn span_exactly_at_threshold_matches() {
        let mut m = matcher(EvictionMode::WallClock);
        let t0 = Utc::now();

        m.add_event(1, t0);
        m.add_event(4, ms(t0, 1000));
        // 2000 ms span: <= threshold, should still match.
        assert!(m.add_event(7, ms(t0, 2000)).is_some());
    }

    #[test]
    fn intermediate_step_outside_span_rejects_whole_pattern() {
        // The span check applies at every advancing step, not only the last.
        let mut m = matcher(EvictionMode::WallClock);
        let t0 = Utc::now();

        m.add_event(1, t0);
        m.add_event(4, ms(t0, 2500));
        assert!(m.add_event(7, ms(t0, 2600)).is_none());
    }

    // -- Eviction --

    #[test]
    fn event_time_eviction_trims_head() {
        let mut m = matcher(EvictionMode::EventTime);
        let t0 = Utc::now();

        m.add_event(1, t0);
        m.add_event(4, ms(t0, 3000));
        let ids: Vec<u32> = m.buffered_events().map(|e| e.event_id).collect();
        assert_eq!(ids, vec![4]);
    }

    #[test]
    fn event_time_eviction_breaks_pattern() {
        // With event-time eviction the first element ages out before the
        // pattern can complete.
        let mut m = matcher(EvictionMode::EventTime);
        let t0 = Utc::now();

        m.add_event(1, t0);
        assert!(m.add_event(4, ms(t0, 3000)).is_none());
        assert!(m.add_event(7, ms(t0, 3010)).is_none());
        assert_eq!(m.buffer_len(), 2);
    }

    #[test]
    fn wall_clock_eviction_drops_stale_entries() {
        let mut m = matcher(EvictionMode::WallClock);
        let now = Utc::now();

        // Ingested with a timestamp already 3 seconds in the past: evicted
        // within the same call.
        m.add_event(1, now - Duration::milliseconds(3000));
        assert_eq!(m.buffer_len(), 0);
    }

    #[test]
    fn wall_clock_eviction_keeps_fresh_entries() {
        let mut m = matcher(EvictionMode::WallClock);
        let now = Utc::now();

        m.add_event(1, now - Duration::milliseconds(3000));
        m.add_event(2, now);
        let ids: Vec<u32> = m.buffered_events().map(|e| e.event_id).collect();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn every_buffered_entry_is_within_threshold_after_ingestion() {
        let mut m = matcher(EvictionMode::EventTime);
        let t0 = Utc::now();

        let mut newest = t0;
        for i in 0..50 {
            newest = ms(t0, i * 150);
            m.add_event(9000 + i as u32, newest);
        }
        for entry in m.buffered_events() {
            assert!(newest - entry.timestamp <= Duration::milliseconds(THRESHOLD_MS));
        }
    }

    // -- Sink --

    #[test]
    fn sink_receives_canonical_sequence() {
        let sink = RecordingSink::new();
        let mut m = matcher(EvictionMode::WallClock).with_sink(sink.clone());
        let t0 = Utc::now();

        m.add_event(1, t0);
        m.add_event(4, ms(t0, 10));
        m.add_event(7, ms(t0, 20));

        let recorded = sink.recorded();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].pattern_name, "Pattern A");
        assert_eq!(recorded[0].sequence, vec![1, 4, 7]);
    }

    #[test]
    fn sink_not_invoked_without_match() {
        let sink = RecordingSink::new();
        let mut m = matcher(EvictionMode::WallClock).with_sink(sink.clone());

        m.add_event(9999, Utc::now());
        assert!(sink.recorded().is_empty());
    }

    #[test]
    fn at_most_one_alert_per_call() {
        let sink = RecordingSink::new();
        let lib = PatternLibrary::new(vec![
            Pattern::new("p1", vec![1, 2]),
            Pattern::new("p2", vec![1, 2]),
        ])
        .unwrap();
        let mut m = WindowMatcher::new(lib, THRESHOLD_MS, EvictionMode::WallClock)
            .unwrap()
            .with_sink(sink.clone());
        let t0 = Utc::now();

        m.add_event(1, t0);
        m.add_event(2, ms(t0, 10));
        assert_eq!(sink.recorded().len(), 1);
        assert_eq!(sink.recorded()[0].pattern_name, "p1");
    }

    // -- Construction --

    #[test]
    fn non_positive_threshold_rejected() {
        let err = WindowMatcher::new(fixture_library(), 0, EvictionMode::WallClock).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidThreshold { millis: 0 }));

        let err = WindowMatcher::new(fixture_library(), -5, EvictionMode::WallClock).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidThreshold { millis: -5 }));
    }

    #[test]
    fn from_config_builds_builtin_library() {
        let config = DetectorConfig::default();
        let m = WindowMatcher::from_config(&config).unwrap();
        assert_eq!(m.pattern_count(), 6);
    }

    #[test]
    fn from_config_with_custom_patterns_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("patterns.toml");
        std::fs::write(
            &path,
            r#"
[[pattern]]
name = "only"
sequence = [1, 2, 3]
"#,
        )
        .unwrap();

        let config = DetectorConfig {
            include_builtin_patterns: false,
            patterns_path: Some(path),
            ..Default::default()
        };
        let m = WindowMatcher::from_config(&config).unwrap();
        assert_eq!(m.pattern_count(), 1);
    }
}
