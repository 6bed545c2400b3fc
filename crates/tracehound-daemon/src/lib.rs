//! Tracehound daemon orchestration.
//!
//! Ties the core window matcher to its surroundings: an NDJSON event feed on
//! stdin (the stand-in for an OS trace subscription), a single-writer
//! detection task fed by a channel, and an alert router that logs matches.

pub mod feed;
pub mod router;
pub mod runtime;

pub use router::{AlertRouter, ChannelSink};
pub use runtime::{DetectorInput, DetectorRuntime};
