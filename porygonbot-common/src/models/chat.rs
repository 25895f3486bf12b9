use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A Twitch account as it appears on an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub login: String,
    /// Display name.
    pub name: String,
}

impl Identity {
    pub fn new(id: impl Into<String>, login: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            login: login.into(),
            name: name.into(),
        }
    }
}

/// A single inbound chat message. Read-only input to the classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEvent {
    pub broadcaster: Identity,
    pub chatter: Identity,
    pub text: String,
    #[serde(default)]
    pub message_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// A channel points redemption. Only ever feeds the activity log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedemptionEvent {
    pub broadcaster_id: String,
    pub user: Identity,
    pub reward_title: String,
    #[serde(default)]
    pub user_input: Option<String>,
    pub timestamp: DateTime<Utc>,
}
