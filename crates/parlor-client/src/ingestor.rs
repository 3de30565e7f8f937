use std::sync::Arc;

use tracing::trace;

use parlor_store::{Action, Outcome, StoreHandle};
use parlor_types::events::{DecodeError, PushEvent};

use crate::error::{Operation, RequestContext, SyncError};
use crate::report::ErrorReporter;

/// Applies push events to the store through the same reducers local actions
/// use. Holds no state of its own: duplicates, reorderings and events for
/// unknown ids all come out as store no-ops.
#[derive(Clone)]
pub struct Ingestor {
    store: StoreHandle,
    reporter: Arc<dyn ErrorReporter>,
}

impl Ingestor {
    pub fn new(store: StoreHandle, reporter: Arc<dyn ErrorReporter>) -> Self {
        Self { store, reporter }
    }

    pub fn ingest(&self, event: PushEvent) -> Outcome {
        let kind = event.kind();
        let action = match event {
            PushEvent::ChannelAdded(envelope) => Action::InsertChannel(envelope.data.into()),
            PushEvent::ChannelRenamed(envelope) => Action::RenameChannel {
                id: envelope.data.id,
                name: envelope.data.attributes.name,
            },
            PushEvent::ChannelRemoved(envelope) => Action::RemoveChannel(envelope.data.id),
            PushEvent::MessageAdded(envelope) => Action::InsertMessage(envelope.data.into()),
        };
        let outcome = self.store.dispatch(action);
        trace!("{} -> {:?}", kind, outcome);
        outcome
    }

    /// Report a frame that failed to decode. It is dropped, never applied.
    pub fn reject(&self, raw: &str, error: DecodeError) {
        let excerpt: String = raw.chars().take(200).collect();
        let context = RequestContext::new(Operation::Ingest, None, excerpt);
        self.reporter.report(&SyncError::Decode(error), &context);
    }
}
