use serde::{Deserialize, Serialize};

use crate::models::{Channel, ChannelId, Message, MessageId};

// -- Envelopes --

/// Every entity on the wire is wrapped as `{"data": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// `{id, attributes}` pair for an entity the server already knows about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<I, A> {
    pub id: I,
    pub attributes: A,
}

/// Request body for an entity the server has not assigned an id to yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft<A> {
    pub attributes: A,
}

/// Removal payloads carry only the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdOnly<I> {
    pub id: I,
}

// -- Channels --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelName {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelAttributes {
    pub name: String,
    #[serde(default)]
    pub removable: bool,
}

pub type ChannelRecord = Record<ChannelId, ChannelAttributes>;

impl From<ChannelRecord> for Channel {
    fn from(record: ChannelRecord) -> Self {
        Channel {
            id: record.id,
            name: record.attributes.name,
            removable: record.attributes.removable,
        }
    }
}

/// Body of `POST /channels` and `PATCH /channels/{id}`.
pub fn channel_name_request(name: &str) -> Envelope<Draft<ChannelName>> {
    Envelope::new(Draft {
        attributes: ChannelName { name: name.to_string() },
    })
}

// -- Messages --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageAttributes {
    pub channel_id: ChannelId,
    pub author: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMessage {
    pub author: String,
    pub text: String,
}

pub type MessageRecord = Record<MessageId, MessageAttributes>;

impl From<MessageRecord> for Message {
    fn from(record: MessageRecord) -> Self {
        Message {
            id: record.id,
            channel_id: record.attributes.channel_id,
            author: record.attributes.author,
            text: record.attributes.text,
        }
    }
}

impl From<&Message> for MessageRecord {
    fn from(message: &Message) -> Self {
        Record {
            id: message.id,
            attributes: MessageAttributes {
                channel_id: message.channel_id,
                author: message.author.clone(),
                text: message.text.clone(),
            },
        }
    }
}

impl From<&Channel> for ChannelRecord {
    fn from(channel: &Channel) -> Self {
        Record {
            id: channel.id,
            attributes: ChannelAttributes {
                name: channel.name.clone(),
                removable: channel.removable,
            },
        }
    }
}

/// Body of `POST /channels/{id}/messages`.
pub fn message_request(author: &str, text: &str) -> Envelope<Draft<NewMessage>> {
    Envelope::new(Draft {
        attributes: NewMessage {
            author: author.to_string(),
            text: text.to_string(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn channel_request_shape() {
        let body = serde_json::to_value(channel_name_request("random")).unwrap();
        assert_eq!(body, json!({ "data": { "attributes": { "name": "random" } } }));
    }

    #[test]
    fn message_record_reads_camel_case() {
        let raw = json!({
            "data": {
                "id": 7,
                "attributes": { "channelId": 1, "author": "alice", "text": "hi" }
            }
        });
        let envelope: Envelope<MessageRecord> = serde_json::from_value(raw).unwrap();
        let message = Message::from(envelope.data);
        assert_eq!(message.id, MessageId(7));
        assert_eq!(message.channel_id, ChannelId(1));
        assert_eq!(message.author, "alice");
    }

    #[test]
    fn channel_record_defaults_to_non_removable() {
        let raw = json!({ "id": 1, "attributes": { "name": "general" } });
        let channel = Channel::from(serde_json::from_value::<ChannelRecord>(raw).unwrap());
        assert!(!channel.removable);
    }
}
