use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityMessage {
    pub content: String,
    pub channel: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityRedemption {
    pub reward_title: String,
    pub user_input: Option<String>,
    pub channel: String,
    pub timestamp: DateTime<Utc>,
}

/// Everything recently seen from one chatter, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatterActivityRecord {
    pub username: String,
    pub messages: Vec<ActivityMessage>,
    pub redemptions: Vec<ActivityRedemption>,
    pub last_seen: DateTime<Utc>,
}

impl ChatterActivityRecord {
    pub fn new(username: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            username: username.into(),
            messages: Vec::new(),
            redemptions: Vec::new(),
            last_seen: now,
        }
    }
}

/// Rules for trimming the activity log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ActivityRetention {
    pub max_messages_per_user: Option<usize>,
    pub max_redemptions_per_user: Option<usize>,
    /// Chatters idle longer than this are evicted on the next write.
    pub max_idle_seconds: Option<i64>,
}

impl Default for ActivityRetention {
    fn default() -> Self {
        Self {
            max_messages_per_user: Some(200),
            max_redemptions_per_user: Some(50),
            max_idle_seconds: None,
        }
    }
}
