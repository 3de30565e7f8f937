use std::future::Future;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;

use parlor_types::api::{ChannelRecord, Envelope, MessageRecord, channel_name_request, message_request};
use parlor_types::{Channel, ChannelId, Message, Snapshot};

use crate::error::ApiError;

/// The chat REST API as seen by the client.
///
/// Methods take owned arguments so a request can run on its own task and
/// finish even if the caller stops waiting.
pub trait Api: Clone + Send + Sync + 'static {
    fn create_channel(&self, name: String) -> impl Future<Output = Result<Channel, ApiError>> + Send;

    fn rename_channel(&self, id: ChannelId, name: String) -> impl Future<Output = Result<(), ApiError>> + Send;

    fn remove_channel(&self, id: ChannelId) -> impl Future<Output = Result<(), ApiError>> + Send;

    fn send_message(
        &self,
        channel_id: ChannelId,
        author: String,
        text: String,
    ) -> impl Future<Output = Result<Message, ApiError>> + Send;

    fn fetch_snapshot(&self) -> impl Future<Output = Result<Snapshot, ApiError>> + Send;
}

pub mod routes {
    use parlor_types::ChannelId;

    pub const PREFIX: &str = "/api/v1";

    pub fn data_path() -> String {
        format!("{}/data", PREFIX)
    }

    pub fn channels_path() -> String {
        format!("{}/channels", PREFIX)
    }

    pub fn channel_path(id: ChannelId) -> String {
        format!("{}/channels/{}", PREFIX, id)
    }

    pub fn channel_messages_path(id: ChannelId) -> String {
        format!("{}/channels/{}/messages", PREFIX, id)
    }
}

/// [`Api`] over HTTP with `reqwest`.
#[derive(Clone)]
pub struct HttpApi {
    client: Client,
    base_url: String,
}

impl HttpApi {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }
        Ok(resp)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        Ok(self.send(request).await?.json().await?)
    }
}

impl Api for HttpApi {
    async fn create_channel(&self, name: String) -> Result<Channel, ApiError> {
        debug!("POST {} name='{}'", routes::channels_path(), name);
        let request = self
            .client
            .post(self.url(&routes::channels_path()))
            .json(&channel_name_request(&name));
        let created: Envelope<ChannelRecord> = self.send_json(request).await?;
        Ok(created.data.into())
    }

    async fn rename_channel(&self, id: ChannelId, name: String) -> Result<(), ApiError> {
        debug!("PATCH {} name='{}'", routes::channel_path(id), name);
        let request = self
            .client
            .patch(self.url(&routes::channel_path(id)))
            .json(&channel_name_request(&name));
        self.send(request).await?;
        Ok(())
    }

    async fn remove_channel(&self, id: ChannelId) -> Result<(), ApiError> {
        debug!("DELETE {}", routes::channel_path(id));
        let request = self.client.delete(self.url(&routes::channel_path(id)));
        self.send(request).await?;
        Ok(())
    }

    async fn send_message(&self, channel_id: ChannelId, author: String, text: String) -> Result<Message, ApiError> {
        debug!("POST {}", routes::channel_messages_path(channel_id));
        let request = self
            .client
            .post(self.url(&routes::channel_messages_path(channel_id)))
            .json(&message_request(&author, &text));
        let created: Envelope<MessageRecord> = self.send_json(request).await?;
        Ok(created.data.into())
    }

    async fn fetch_snapshot(&self) -> Result<Snapshot, ApiError> {
        debug!("GET {}", routes::data_path());
        self.send_json(self.client.get(self.url(&routes::data_path()))).await
    }
}
