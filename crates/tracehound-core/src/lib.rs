//! # tracehound-core
//!
//! Core detection engine for Tracehound -- a real-time temporal pattern
//! detector over a stream of security events.
//!
//! Events arrive as `(event_id, timestamp)` pairs from an external trace
//! feed. The [`WindowMatcher`] keeps a bounded, time-ordered buffer of the
//! recent past and, on every ingested event, checks whether any configured
//! [`Pattern`] has just completed as an ordered (non-contiguous) subsequence
//! of the buffer within the configured time window.

pub mod config;
pub mod error;
pub mod event;
pub mod matcher;
pub mod pattern;
pub mod sink;

pub use config::{DetectorConfig, EvictionMode};
pub use error::ConfigError;
pub use event::ObservedEvent;
pub use matcher::WindowMatcher;
pub use pattern::{Pattern, PatternLibrary};
pub use sink::{AlertSink, AnomalyAlert};
