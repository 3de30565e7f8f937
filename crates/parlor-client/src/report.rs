use tokio::sync::mpsc;
use tracing::error;

use crate::error::{RequestContext, SyncError};

/// Receives every failed submit and every dropped push frame.
///
/// Implementations must not block: reporting is fire-and-forget.
pub trait ErrorReporter: Send + Sync + 'static {
    fn report(&self, error: &SyncError, context: &RequestContext);
}

/// Logs failures through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, error: &SyncError, context: &RequestContext) {
        let body = serde_json::to_string(context).unwrap_or_default();
        error!("{} -- context: {}", error, body);
    }
}

/// A report forwarded to a front end.
#[derive(Debug, Clone)]
pub struct Report {
    pub message: String,
    pub context: RequestContext,
}

/// Logs like [`TracingReporter`] and forwards a copy to a front end.
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    tx: mpsc::UnboundedSender<Report>,
}

impl ChannelReporter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Report>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ErrorReporter for ChannelReporter {
    fn report(&self, error: &SyncError, context: &RequestContext) {
        TracingReporter.report(error, context);
        // Receiver gone means the front end is shutting down.
        let _ = self.tx.send(Report {
            message: error.to_string(),
            context: context.clone(),
        });
    }
}
