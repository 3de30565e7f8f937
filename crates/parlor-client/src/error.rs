use serde::Serialize;
use serde_json::Value;

use parlor_types::ChannelId;
use parlor_types::events::DecodeError;

/// Failure talking to the chat API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request task did not finish: {0}")]
    Interrupted(String),
}

/// Input rejected before anything was sent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("channel name must not be empty")]
    EmptyName,

    #[error("channel name is {len} characters, at most {max} allowed")]
    NameTooLong { len: usize, max: usize },

    #[error("channel name '{0}' is already taken")]
    NameTaken(String),

    #[error("channel {0} does not exist")]
    UnknownChannel(ChannelId),

    #[error("channel {0} cannot be removed or renamed")]
    Locked(ChannelId),

    #[error("channel {0} is already being removed")]
    RemovalPending(ChannelId),

    #[error("no channel selected")]
    NoCurrentChannel,
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{} failed: {source}", .context.operation)]
    RequestFailed {
        context: RequestContext,
        #[source]
        source: ApiError,
    },

    /// The server may or may not have removed the channel; it was restored
    /// locally and a later push will remove it again if the server did.
    #[error("removal of channel {id} was not acknowledged: {source}")]
    RemovalAmbiguous {
        id: ChannelId,
        #[source]
        source: ApiError,
    },

    #[error("dropped push frame: {0}")]
    Decode(#[from] DecodeError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    CreateChannel,
    RenameChannel,
    RemoveChannel,
    SendMessage,
    FetchSnapshot,
    Ingest,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::CreateChannel => "create channel",
            Self::RenameChannel => "rename channel",
            Self::RemoveChannel => "remove channel",
            Self::SendMessage => "send message",
            Self::FetchSnapshot => "fetch snapshot",
            Self::Ingest => "ingest push event",
        };
        f.write_str(name)
    }
}

/// What was being attempted when an error occurred, for the error reporter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestContext {
    pub operation: Operation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<ChannelId>,
    pub body: Value,
}

impl RequestContext {
    pub fn new(operation: Operation, channel_id: Option<ChannelId>, body: impl Serialize) -> Self {
        Self {
            operation,
            channel_id,
            body: serde_json::to_value(body).unwrap_or(Value::Null),
        }
    }
}
