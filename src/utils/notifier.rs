//! Best-effort human readable notifications

use tokio::sync::mpsc;
use tracing::info;

/// Cloneable handle that forwards messages to a delivery sink.
///
/// Sending never blocks and never fails: when the sink is gone the message
/// is only logged.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<String>,
}

impl Notifier {
    /// Create a notifier together with the receiving end for a sink
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// A notifier whose messages are only logged
    pub fn disabled() -> Self {
        let (notifier, _rx) = Self::channel();
        notifier
    }

    /// Log a message and forward it to the sink
    pub fn notify(&self, message: impl Into<String>) {
        let message = message.into();
        info!(target: "notify", "{}", message);
        let _ = self.tx.send(message);
    }
}
