/// Parlor shared types
///
/// Entity models held by the client store, the `{data: {id, attributes}}`
/// envelopes exchanged with the chat API, and the push events delivered over
/// the realtime socket.

pub mod api;
pub mod events;
pub mod models;

pub use models::{Channel, ChannelId, Message, MessageId, Snapshot};
