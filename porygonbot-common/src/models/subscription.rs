use std::fmt;
use serde::{Deserialize, Serialize};

/// The only event type this bot subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventType {
    ChatMessage,
}

impl EventType {
    /// EventSub subscription type string.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::ChatMessage => "channel.chat.message",
        }
    }

    pub fn version(&self) -> &'static str {
        match self {
            EventType::ChatMessage => "1",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declared wish to receive `event_type` for `broadcaster_id`, read as the bot.
/// Rebuilt on every start, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionIntent {
    pub broadcaster_id: String,
    pub listener_id: String,
    pub event_type: EventType,
}

impl SubscriptionIntent {
    pub fn chat_message(broadcaster_id: impl Into<String>, bot_id: impl Into<String>) -> Self {
        Self {
            broadcaster_id: broadcaster_id.into(),
            listener_id: bot_id.into(),
            event_type: EventType::ChatMessage,
        }
    }
}

/// One intent the transport refused, with its reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRejection {
    pub intent: SubscriptionIntent,
    pub reason: String,
}

/// Result of a batched subscribe call. Partial success is normal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiSubscribeResult {
    pub accepted: Vec<SubscriptionIntent>,
    pub errors: Vec<SubscriptionRejection>,
}
