use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::types::{ChannelId, ChannelSummary, Message};

/// Frames sent by a client over its WebSocket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Bind a display name to the connection and enter General.
    Register { display_name: String },

    /// Chat text for the current channel. Text starting with `/` is a command.
    Message { text: String },

    /// Explicit slash-command line, e.g. `/join Rust`.
    Command { line: String },
}

/// Frames the server pushes to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// A message appended to the recipient's current channel.
    ChatMessage(Message),

    /// Full history of the channel the recipient just entered.
    ChatHistory {
        channel_id: ChannelId,
        channel_name: String,
        messages: Vec<Message>,
    },

    /// Current channel list, in registry order.
    UpdateChannels { channels: Vec<ChannelSummary> },

    /// Private, non-persisted reply to the recipient alone.
    Notice { text: String },
}

impl ClientEvent {
    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl ServerEvent {
    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_event_wire_shape() {
        let event = ClientEvent::from_json(r#"{"type":"register","display_name":"alice"}"#).unwrap();
        assert_eq!(
            event,
            ClientEvent::Register {
                display_name: "alice".into()
            }
        );

        let event = ClientEvent::from_json(r#"{"type":"command","line":"/join Rust Talk"}"#).unwrap();
        assert_eq!(
            event,
            ClientEvent::Command {
                line: "/join Rust Talk".into()
            }
        );
    }

    #[test]
    fn test_unknown_client_frame_is_rejected() {
        let err = ClientEvent::from_json(r#"{"type":"edit","id":3}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));
    }

    #[test]
    fn test_server_event_tagging() {
        let json = ServerEvent::ChatMessage(Message::new("bob", "hi", "General"))
            .to_json()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "chat_message");
        assert_eq!(value["user"], "bob");
        assert_eq!(value["channel_name"], "General");

        let restored = ServerEvent::from_json(&json).unwrap();
        if let ServerEvent::ChatMessage(msg) = restored {
            assert_eq!(msg.content, "hi");
        } else {
            panic!("Event type mismatch");
        }
    }
}
