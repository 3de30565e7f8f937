use std::future::Future;
use std::sync::Arc;

use tracing::{debug, info, warn};

use parlor_store::{Action, Noop, Outcome, StoreHandle};
use parlor_types::api::{IdOnly, channel_name_request, message_request};
use parlor_types::{Channel, ChannelId, Message};

use crate::api::Api;
use crate::error::{ApiError, Operation, RequestContext, SyncError, ValidationError};
use crate::report::ErrorReporter;
use crate::validate::{NameRules, check_mutable};

/// Turns user actions into API requests and folds the results into the store.
///
/// Each request runs on its own task: once a submit has been dispatched it
/// completes and updates the store even if the caller drops the future.
#[derive(Clone)]
pub struct Reconciler<A> {
    api: A,
    store: StoreHandle,
    reporter: Arc<dyn ErrorReporter>,
    rules: NameRules,
}

impl<A: Api> Reconciler<A> {
    pub fn new(api: A, store: StoreHandle, reporter: Arc<dyn ErrorReporter>, rules: NameRules) -> Self {
        Self {
            api,
            store,
            reporter,
            rules,
        }
    }

    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    pub fn reporter(&self) -> Arc<dyn ErrorReporter> {
        self.reporter.clone()
    }

    /// Create a channel. The channel shows up once the server has assigned
    /// it an id; it also becomes the current channel.
    pub async fn submit_new_channel(&self, name: &str) -> Result<Channel, SyncError> {
        let name = self.store.read(|s| self.rules.check(s, name, None))?;
        let context = RequestContext::new(Operation::CreateChannel, None, channel_name_request(&name));

        let api = self.api.clone();
        let store = self.store.clone();
        let reporter = self.reporter.clone();
        detached(context.clone(), async move {
            match api.create_channel(name).await {
                Ok(channel) => {
                    info!("Created channel {} '{}'", channel.id, channel.name);
                    match store.dispatch(Action::InsertChannel(channel.clone())) {
                        Outcome::ChannelInserted(_) => {}
                        Outcome::Unchanged(Noop::DuplicateChannel(_)) => {
                            debug!("Channel {} already arrived by push", channel.id)
                        }
                        // Removed by someone else before the answer came back.
                        other => {
                            warn!("Created channel {} did not land: {:?}", channel.id, other);
                            return Ok(channel);
                        }
                    }
                    store.dispatch(Action::SelectChannel(channel.id));
                    Ok(channel)
                }
                Err(source) => Err(failed(&*reporter, context, source)),
            }
        })
        .await
    }

    pub async fn submit_rename(&self, id: ChannelId, name: &str) -> Result<(), SyncError> {
        let name = self.store.read(|s| {
            check_mutable(s, id)?;
            self.rules.check(s, name, Some(id))
        })?;
        let context = RequestContext::new(Operation::RenameChannel, Some(id), channel_name_request(&name));

        let api = self.api.clone();
        let store = self.store.clone();
        let reporter = self.reporter.clone();
        detached(context.clone(), async move {
            match api.rename_channel(id, name.clone()).await {
                Ok(()) => {
                    info!("Renamed channel {} to '{}'", id, name);
                    match store.dispatch(Action::RenameChannel { id, name }) {
                        Outcome::ChannelRenamed { .. } | Outcome::Unchanged(Noop::SameName(_)) => {}
                        other => debug!("Rename of channel {} settled as {:?}", id, other),
                    }
                    Ok(())
                }
                Err(source) => Err(failed(&*reporter, context, source)),
            }
        })
        .await
    }

    /// Remove a channel. It disappears from the store right away; if the
    /// server does not acknowledge the removal it is put back.
    pub async fn submit_removal(&self, id: ChannelId) -> Result<(), SyncError> {
        self.store.read(|s| check_mutable(s, id))?;
        if !self.store.dispatch(Action::RetireChannel(id)).is_change() {
            return Err(ValidationError::UnknownChannel(id).into());
        }
        let context = RequestContext::new(Operation::RemoveChannel, Some(id), IdOnly { id });

        let api = self.api.clone();
        let store = self.store.clone();
        let reporter = self.reporter.clone();
        detached(context.clone(), async move {
            match api.remove_channel(id).await {
                Ok(()) => {
                    info!("Removed channel {}", id);
                    store.dispatch(Action::ConfirmRemoval(id));
                    Ok(())
                }
                Err(source) => {
                    match store.dispatch(Action::RevertRemoval(id)) {
                        Outcome::ChannelRestored(_) => warn!("Restored channel {} after failed removal", id),
                        Outcome::ChannelDisplaced { by, .. } => {
                            warn!("Channel {} kept aside after failed removal, channel {} holds its name", id, by)
                        }
                        other => debug!("Nothing to restore for channel {}: {:?}", id, other),
                    }
                    let error = SyncError::RemovalAmbiguous { id, source };
                    reporter.report(&error, &context);
                    Err(error)
                }
            }
        })
        .await
    }

    /// Post a message. It appears once the server has confirmed it.
    pub async fn submit_message(&self, channel_id: ChannelId, author: &str, text: &str) -> Result<Message, SyncError> {
        if self.store.read(|s| s.channel(channel_id).is_none()) {
            return Err(ValidationError::UnknownChannel(channel_id).into());
        }
        let context = RequestContext::new(Operation::SendMessage, Some(channel_id), message_request(author, text));

        let api = self.api.clone();
        let store = self.store.clone();
        let reporter = self.reporter.clone();
        let (author, text) = (author.to_string(), text.to_string());
        detached(context.clone(), async move {
            match api.send_message(channel_id, author, text).await {
                Ok(message) => {
                    store.dispatch(Action::InsertMessage(message.clone()));
                    Ok(message)
                }
                Err(source) => Err(failed(&*reporter, context, source)),
            }
        })
        .await
    }

    /// Post to whichever channel is selected right now.
    pub async fn send_to_current(&self, author: &str, text: &str) -> Result<Message, SyncError> {
        let channel_id = self
            .store
            .read(|s| s.current_channel_id())
            .ok_or(ValidationError::NoCurrentChannel)?;
        self.submit_message(channel_id, author, text).await
    }

    pub fn select_channel(&self, id: ChannelId) -> Result<(), ValidationError> {
        match self.store.dispatch(Action::SelectChannel(id)) {
            Outcome::Unchanged(Noop::UnknownChannel(_)) => Err(ValidationError::UnknownChannel(id)),
            _ => Ok(()),
        }
    }

    /// Replace the store with a fresh server snapshot.
    pub async fn resync(&self) -> Result<(), SyncError> {
        let context = RequestContext::new(Operation::FetchSnapshot, None, serde_json::Value::Null);
        match self.api.fetch_snapshot().await {
            Ok(snapshot) => {
                info!(
                    "Resynced: {} channels, {} messages",
                    snapshot.channels.len(),
                    snapshot.messages.len()
                );
                self.store.dispatch(Action::Reset(snapshot));
                Ok(())
            }
            Err(source) => Err(failed(&*self.reporter, context, source)),
        }
    }
}

fn failed(reporter: &dyn ErrorReporter, context: RequestContext, source: ApiError) -> SyncError {
    let error = SyncError::RequestFailed {
        context: context.clone(),
        source,
    };
    reporter.report(&error, &context);
    error
}

async fn detached<T, F>(context: RequestContext, task: F) -> Result<T, SyncError>
where
    T: Send + 'static,
    F: Future<Output = Result<T, SyncError>> + Send + 'static,
{
    tokio::spawn(task).await.map_err(|e| SyncError::RequestFailed {
        context,
        source: ApiError::Interrupted(e.to_string()),
    })?
}
