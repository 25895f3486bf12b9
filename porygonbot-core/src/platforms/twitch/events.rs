// File: porygonbot-core/src/platforms/twitch/events.rs
//
// EventSub websocket payloads we care about, and their mapping onto bus events.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use porygonbot_common::models::{ChatEvent, Identity, RedemptionEvent};
use crate::eventbus::BotEvent;

#[derive(Debug, Deserialize)]
pub struct EventSubMessage {
    pub metadata: EventSubMetadata,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Deserialize)]
pub struct EventSubMetadata {
    pub message_id: String,
    pub message_type: String,
    pub message_timestamp: DateTime<Utc>,
    #[serde(default)]
    pub subscription_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SessionPayload {
    pub session: SessionData,
}

#[derive(Debug, Deserialize)]
pub struct SessionData {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub keepalive_timeout_seconds: Option<u64>,
    #[serde(default)]
    pub reconnect_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EventSubNotificationEnvelope {
    pub subscription: SubscriptionData,
    pub event: Value,
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionData {
    pub id: String,
    #[serde(rename = "type")]
    pub sub_type: String,
    pub version: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub condition: Value,
}

/// `channel.chat.message` v1
#[derive(Debug, Deserialize)]
pub struct ChannelChatMessage {
    pub broadcaster_user_id: String,
    pub broadcaster_user_login: String,
    pub broadcaster_user_name: String,
    pub chatter_user_id: String,
    pub chatter_user_login: String,
    pub chatter_user_name: String,
    pub message_id: String,
    pub message: ChatMessageBody,
}

#[derive(Debug, Deserialize)]
pub struct ChatMessageBody {
    pub text: String,
}

/// `channel.channel_points_custom_reward_redemption.add` v1
#[derive(Debug, Deserialize)]
pub struct ChannelPointsRedemptionAdd {
    pub broadcaster_user_id: String,
    pub user_id: String,
    pub user_login: String,
    pub user_name: String,
    #[serde(default)]
    pub user_input: Option<String>,
    pub reward: RedemptionReward,
    #[serde(default)]
    pub redeemed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct RedemptionReward {
    pub title: String,
}

pub const CHAT_MESSAGE: &str = "channel.chat.message";
pub const REWARD_REDEMPTION_ADD: &str = "channel.channel_points_custom_reward_redemption.add";

/// Map a notification onto a bus event. Unknown or malformed payloads are
/// logged and dropped.
pub fn parse_twitch_notification(
    sub_type: &str,
    event: &Value,
    received_at: DateTime<Utc>,
) -> Option<BotEvent> {
    match sub_type {
        CHAT_MESSAGE => match serde_json::from_value::<ChannelChatMessage>(event.clone()) {
            Ok(msg) => Some(BotEvent::ChatMessage(ChatEvent {
                broadcaster: Identity::new(
                    msg.broadcaster_user_id,
                    msg.broadcaster_user_login,
                    msg.broadcaster_user_name,
                ),
                chatter: Identity::new(
                    msg.chatter_user_id,
                    msg.chatter_user_login,
                    msg.chatter_user_name,
                ),
                text: msg.message.text,
                message_id: Some(msg.message_id),
                timestamp: received_at,
            })),
            Err(e) => {
                warn!("[EventSub] bad {} payload: {}", sub_type, e);
                None
            }
        },
        REWARD_REDEMPTION_ADD => {
            match serde_json::from_value::<ChannelPointsRedemptionAdd>(event.clone()) {
                Ok(r) => Some(BotEvent::Redemption(RedemptionEvent {
                    broadcaster_id: r.broadcaster_user_id,
                    user: Identity::new(r.user_id, r.user_login, r.user_name),
                    reward_title: r.reward.title,
                    user_input: r.user_input.filter(|s| !s.is_empty()),
                    timestamp: r.redeemed_at.unwrap_or(received_at),
                })),
                Err(e) => {
                    warn!("[EventSub] bad {} payload: {}", sub_type, e);
                    None
                }
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_chat_message() {
        let event = json!({
            "broadcaster_user_id": "68184174",
            "broadcaster_user_login": "itsmejoji",
            "broadcaster_user_name": "ItsMeJoji",
            "chatter_user_id": "555",
            "chatter_user_login": "viewer",
            "chatter_user_name": "Viewer",
            "message_id": "abc-123",
            "message": { "text": "hello porygon", "fragments": [] },
            "color": "#00FF00",
            "badges": []
        });
        let now = Utc::now();
        match parse_twitch_notification(CHAT_MESSAGE, &event, now) {
            Some(BotEvent::ChatMessage(c)) => {
                assert_eq!(c.broadcaster.id, "68184174");
                assert_eq!(c.chatter.login, "viewer");
                assert_eq!(c.chatter.name, "Viewer");
                assert_eq!(c.text, "hello porygon");
                assert_eq!(c.message_id.as_deref(), Some("abc-123"));
                assert_eq!(c.timestamp, now);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parses_redemption() {
        let event = json!({
            "id": "r1",
            "broadcaster_user_id": "68184174",
            "broadcaster_user_login": "itsmejoji",
            "broadcaster_user_name": "ItsMeJoji",
            "user_id": "555",
            "user_login": "viewer",
            "user_name": "Viewer",
            "user_input": "",
            "status": "unfulfilled",
            "reward": { "id": "x", "title": "Hydrate", "cost": 100, "prompt": "" },
            "redeemed_at": "2024-05-01T12:00:00Z"
        });
        match parse_twitch_notification(REWARD_REDEMPTION_ADD, &event, Utc::now()) {
            Some(BotEvent::Redemption(r)) => {
                assert_eq!(r.reward_title, "Hydrate");
                assert_eq!(r.user.login, "viewer");
                assert!(r.user_input.is_none());
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn unknown_or_bad_payloads_are_dropped() {
        assert!(parse_twitch_notification("channel.follow", &json!({}), Utc::now()).is_none());
        assert!(parse_twitch_notification(CHAT_MESSAGE, &json!({"oops": 1}), Utc::now()).is_none());
    }
}
