//! Socket protocol: events clients send and events the server pushes.

use serde::{Deserialize, Serialize};

use crate::store::Message;

/// Label shown for messages sent without an identity.
pub const ANONYMOUS: &str = "anonymous";

/// Who sent a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Sender {
    Identified(String),
    Anonymous,
}

impl Sender {
    /// Blank identities count as absent.
    pub fn from_claimed(sender: Option<String>) -> Self {
        match sender {
            Some(s) if !s.trim().is_empty() => Self::Identified(s),
            _ => Self::Anonymous,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Identified(id) => id,
            Self::Anonymous => ANONYMOUS,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }

    pub(crate) fn as_column(&self) -> Option<&str> {
        match self {
            Self::Identified(id) => Some(id),
            Self::Anonymous => None,
        }
    }

    pub(crate) fn from_column(sender: Option<String>) -> Self {
        sender.map_or(Self::Anonymous, Self::Identified)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ClientEvent {
    JoinRoom {
        room: String,
    },
    LeaveRoom {
        room: String,
    },
    ChatMessage {
        room: String,
        #[serde(alias = "message")]
        content: String,
        #[serde(default)]
        sender: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ServerEvent {
    Joined { room: String },
    Left { room: String },
    ChatMessage(Message),
    Error { kind: &'static str, message: String },
}
