/// Parlor client
///
/// Keeps a local store of channels and messages in sync with a chat server:
/// user actions go through the [`Reconciler`] as REST requests, server pushes
/// come in through the [`PushClient`] and [`Ingestor`]. Both paths end in the
/// same idempotent store reducers.

pub mod api;
pub mod config;
pub mod cursor;
pub mod error;
pub mod ingestor;
pub mod push;
pub mod reconciler;
pub mod report;
pub mod session;
pub mod validate;

pub use api::{Api, HttpApi};
pub use config::ClientConfig;
pub use error::{ApiError, SyncError, ValidationError};
pub use ingestor::Ingestor;
pub use push::{LinkState, PushClient, PushConfig};
pub use reconciler::Reconciler;
pub use report::{ChannelReporter, ErrorReporter, TracingReporter};
pub use session::Session;
