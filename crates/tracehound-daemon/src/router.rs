//! Alert delivery: channel sink and the logging router task.

use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use tracehound_core::{AlertSink, AnomalyAlert};

/// An [`AlertSink`] that forwards alerts into a tokio channel.
///
/// `on_anomaly` runs inline inside `add_event`, so delivery uses `try_send`
/// and drops (with a warning) rather than blocking ingestion when the
/// consumer falls behind.
pub struct ChannelSink {
    tx: mpsc::Sender<AnomalyAlert>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<AnomalyAlert>) -> Self {
        Self { tx }
    }
}

impl AlertSink for ChannelSink {
    fn on_anomaly(&self, alert: &AnomalyAlert) {
        if let Err(e) = self.tx.try_send(alert.clone()) {
            warn!(pattern = %alert.pattern_name, error = %e, "dropping alert, channel full or closed");
        }
    }
}

/// Receives alerts and writes them to the log.
pub struct AlertRouter;

impl AlertRouter {
    /// Spawn the router task; it runs until the alert channel closes.
    pub fn run(mut alert_rx: mpsc::Receiver<AnomalyAlert>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(alert) = alert_rx.recv().await {
                error!(
                    id = %alert.id,
                    pattern = %alert.pattern_name,
                    sequence = ?alert.sequence,
                    detected_at = %alert.detected_at,
                    "ALERT: malicious pattern detected"
                );
            }
            debug!("alert router shut down");
        })
    }
}
