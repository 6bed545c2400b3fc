//! NDJSON event feed.
//!
//! Reads one JSON object per line from an async reader and forwards parsed
//! events to the detection task. This is the external-source boundary: a real
//! deployment pipes an OS trace exporter (ETW consumer, auditd forwarder)
//! into stdin.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::warn;

use tracehound_core::event::ObservedEvent;

use crate::runtime::DetectorInput;

/// Maximum JSON line length we will attempt to parse (64 KB).
/// Lines exceeding this are rejected to prevent memory abuse.
const MAX_JSON_LINE_LENGTH: usize = 64 * 1024;

/// Wire format of one feed line.
#[derive(Debug, Deserialize)]
struct FeedRecord {
    event_id: u32,
    /// Omitted timestamps fall back to arrival time.
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
}

/// Parse a single NDJSON line into an [`ObservedEvent`].
pub fn parse_line(line: &str) -> Result<ObservedEvent> {
    if line.len() > MAX_JSON_LINE_LENGTH {
        anyhow::bail!(
            "feed line exceeds maximum length ({} > {})",
            line.len(),
            MAX_JSON_LINE_LENGTH
        );
    }
    let record: FeedRecord =
        serde_json::from_str(line).context("failed to parse feed JSON line")?;
    Ok(ObservedEvent::new(
        record.event_id,
        record.timestamp.unwrap_or_else(Utc::now),
    ))
}

/// Drive the feed until EOF. Malformed lines are logged and skipped; the
/// stream itself failing is an error.
pub async fn run_feed<R>(reader: R, input_tx: mpsc::Sender<DetectorInput>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await.context("reading event feed")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_line(line) {
            Ok(event) => {
                if input_tx.send(DetectorInput::Event(event)).await.is_err() {
                    // Detector gone; nothing left to feed.
                    break;
                }
            }
            Err(e) => warn!(error = %e, "skipping malformed feed line"),
        }
    }
    Ok(())
}
