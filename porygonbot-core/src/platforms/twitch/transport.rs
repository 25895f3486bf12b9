// File: porygonbot-core/src/platforms/twitch/transport.rs

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use reqwest::{Client as ReqwestClient, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::{watch, Mutex};
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use porygonbot_common::models::{
    CredentialRecord, MultiSubscribeResult, SubscriptionIntent, SubscriptionRejection, TokenPair,
    ValidatedIdentity,
};
use porygonbot_common::traits::ChatTransport;

use crate::eventbus::{BotEvent, EventBus};
use crate::Error;
use super::auth::{TokenGrant, TwitchOAuthClient};

pub const DEFAULT_HELIX_BASE: &str = "https://api.twitch.tv/helix";

/// Tokens expiring within this many seconds are refreshed before use.
pub const REFRESH_MARGIN_SECS: i64 = 600;

#[derive(Clone)]
struct CachedToken {
    access_token: String,
    refresh_token: String,
    expires_at: Option<DateTime<Utc>>,
}

impl CachedToken {
    fn new(access_token: &str, refresh_token: &str, expires_in: Option<u64>) -> Self {
        Self {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.to_string(),
            expires_at: expires_in.map(|s| Utc::now() + chrono::Duration::seconds(s as i64)),
        }
    }

    fn from_grant(grant: TokenGrant) -> Self {
        Self::new(&grant.access_token, &grant.refresh_token, grant.expires_in)
    }

    fn expires_within(&self, margin_secs: i64) -> bool {
        match self.expires_at {
            Some(exp) => exp - Utc::now() <= chrono::Duration::seconds(margin_secs),
            None => false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SendChatResponse {
    #[serde(default)]
    data: Vec<SendChatResult>,
}

#[derive(Debug, Deserialize)]
struct SendChatResult {
    is_sent: bool,
    #[serde(default)]
    drop_reason: Option<DropReason>,
}

#[derive(Debug, Deserialize)]
struct DropReason {
    code: String,
    message: String,
}

/// Twitch implementation of [`ChatTransport`]: Helix for sends and
/// subscriptions, id.twitch.tv for tokens, an EventSub websocket session
/// (driven by [`super::eventsub::EventSubSession`]) for delivery.
pub struct TwitchTransport {
    http: ReqwestClient,
    oauth: TwitchOAuthClient,
    bot_id: String,
    helix_base: String,

    tokens: DashMap<String, CachedToken>,

    /// Current EventSub session id, `None` while disconnected.
    session_tx: watch::Sender<Option<String>>,
    /// Accepted intents and the session they were accepted on.
    accepted: Mutex<HashMap<SubscriptionIntent, String>>,

    event_bus: Option<Arc<EventBus>>,
    /// Refresh announcements run here so a shutdown drain can wait for them.
    tracker: TaskTracker,
    session_wait: Duration,
    refresh_margin_secs: i64,
}

impl TwitchTransport {
    pub fn new(http: ReqwestClient, oauth: TwitchOAuthClient, bot_id: impl Into<String>) -> Self {
        let (session_tx, _) = watch::channel(None);
        Self {
            http,
            oauth,
            bot_id: bot_id.into(),
            helix_base: DEFAULT_HELIX_BASE.to_string(),
            tokens: DashMap::new(),
            session_tx,
            accepted: Mutex::new(HashMap::new()),
            event_bus: None,
            tracker: TaskTracker::new(),
            session_wait: Duration::from_secs(30),
            refresh_margin_secs: REFRESH_MARGIN_SECS,
        }
    }

    pub fn with_helix_base(mut self, base: impl Into<String>) -> Self {
        self.helix_base = base.into().trim_end_matches('/').to_string();
        self
    }

    /// Refreshed tokens are announced here as `TokenRefreshed`.
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Track refresh announcements on the dispatcher's tracker.
    pub fn with_tracker(mut self, tracker: TaskTracker) -> Self {
        self.tracker = tracker;
        self
    }

    /// How long `multi_subscribe` waits for a websocket session.
    pub fn with_session_wait(mut self, wait: Duration) -> Self {
        self.session_wait = wait;
        self
    }

    pub fn oauth(&self) -> &TwitchOAuthClient {
        &self.oauth
    }

    pub fn current_session(&self) -> Option<String> {
        self.session_tx.borrow().clone()
    }

    pub fn has_token(&self, user_id: &str) -> bool {
        self.tokens.contains_key(user_id)
    }

    fn cache_token(&self, user_id: &str, token: CachedToken) {
        self.tokens.insert(user_id.to_string(), token);
    }

    /// A session welcome arrived. Intents accepted on an older session are
    /// gone on Twitch's side, so they are submitted again.
    pub async fn on_session_welcome(
        &self,
        session_id: &str,
    ) -> Result<Option<MultiSubscribeResult>, Error> {
        self.session_tx.send_replace(Some(session_id.to_string()));

        let stale: Vec<SubscriptionIntent> = {
            let mut accepted = self.accepted.lock().await;
            let stale: Vec<_> = accepted
                .iter()
                .filter(|(_, sid)| sid.as_str() != session_id)
                .map(|(intent, _)| intent.clone())
                .collect();
            for intent in &stale {
                accepted.remove(intent);
            }
            stale
        };
        if stale.is_empty() {
            return Ok(None);
        }

        info!(
            "[TwitchTransport] new EventSub session {} => re-submitting {} subscription(s)",
            session_id,
            stale.len()
        );
        self.multi_subscribe(stale).await.map(Some)
    }

    /// A `session_reconnect` hop finished. Twitch moves the subscriptions
    /// along with the session, so nothing is re-submitted.
    pub async fn on_session_migrated(&self, session_id: &str) {
        self.session_tx.send_replace(Some(session_id.to_string()));
        let mut accepted = self.accepted.lock().await;
        for sid in accepted.values_mut() {
            *sid = session_id.to_string();
        }
    }

    /// The websocket is gone; subscribe calls wait for the next welcome.
    pub fn on_session_lost(&self) {
        self.session_tx.send_replace(None);
    }

    async fn wait_for_session(&self) -> Result<String, Error> {
        let mut rx = self.session_tx.subscribe();
        let id = tokio::time::timeout(self.session_wait, async {
            rx.wait_for(|s| s.is_some())
                .await
                .map(|s| s.clone())
                .map_err(|_| Error::Platform("EventSub session channel closed".into()))
        })
        .await??;
        id.ok_or_else(|| Error::Platform("no EventSub session".into()))
    }

    /// Access token for `user_id`, refreshed first if it is about to expire.
    async fn fresh_access_token(&self, user_id: &str) -> Result<String, Error> {
        let cached = self
            .tokens
            .get(user_id)
            .map(|t| t.value().clone())
            .ok_or_else(|| Error::Auth(format!("no token cached for user_id={user_id}")))?;

        if !cached.expires_within(self.refresh_margin_secs) {
            return Ok(cached.access_token);
        }

        warn!(
            "Twitch token for user_id={} expires in ≤{} s – refreshing…",
            user_id, self.refresh_margin_secs
        );
        let updated = CachedToken::from_grant(self.oauth.refresh(&cached.refresh_token).await?);
        self.cache_token(user_id, updated.clone());

        if let Some(bus) = &self.event_bus {
            let bus = bus.clone();
            let record = CredentialRecord::new(user_id, &updated.access_token, &updated.refresh_token);
            // Spawned so a publish from inside the dispatcher cannot wait on itself.
            self.tracker.spawn(async move {
                bus.publish(BotEvent::TokenRefreshed(record)).await;
            });
        }
        Ok(updated.access_token)
    }

    async fn create_subscription(
        &self,
        session_id: &str,
        access_token: &str,
        intent: &SubscriptionIntent,
    ) -> Result<(), Error> {
        let body = json!({
            "type": intent.event_type.as_str(),
            "version": intent.event_type.version(),
            "condition": {
                "broadcaster_user_id": intent.broadcaster_id,
                "user_id": intent.listener_id,
            },
            "transport": {
                "method": "websocket",
                "session_id": session_id
            }
        });
        debug!("Subscribing to {} v{} => {:?}", intent.event_type, intent.event_type.version(), body);

        let resp = self
            .http
            .post(format!("{}/eventsub/subscriptions", self.helix_base))
            .header("Client-Id", &self.oauth.client_id)
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Subscription(format!("request failed: {e}")))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        if status == StatusCode::CONFLICT {
            return Err(Error::Subscription("already subscribed".into()));
        }
        let text = resp.text().await.unwrap_or_default();
        Err(Error::Subscription(format!("HTTP {status}: {text}")))
    }
}

#[async_trait]
impl ChatTransport for TwitchTransport {
    fn bot_id(&self) -> &str {
        &self.bot_id
    }

    async fn validate_token(&self, access_token: &str) -> Result<ValidatedIdentity, Error> {
        self.oauth.validate(access_token).await
    }

    async fn add_token(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<ValidatedIdentity, Error> {
        let identity = self.oauth.validate(access_token).await?;
        self.cache_token(
            &identity.user_id,
            CachedToken::new(access_token, refresh_token, identity.expires_in),
        );
        debug!("Cached token for user_id={}", identity.user_id);
        Ok(identity)
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenPair, Error> {
        let grant = self.oauth.refresh(refresh_token).await?;
        Ok(TokenPair {
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
        })
    }

    async fn multi_subscribe(
        &self,
        intents: Vec<SubscriptionIntent>,
    ) -> Result<MultiSubscribeResult, Error> {
        let mut result = MultiSubscribeResult::default();
        if intents.is_empty() {
            return Ok(result);
        }

        let session_id = self.wait_for_session().await?;
        let token = self.fresh_access_token(&self.bot_id).await?;

        for intent in intents {
            match self.create_subscription(&session_id, &token, &intent).await {
                Ok(()) => {
                    self.accepted.lock().await.insert(intent.clone(), session_id.clone());
                    result.accepted.push(intent);
                }
                Err(e) => {
                    let reason = match e {
                        Error::Subscription(r) => r,
                        other => other.to_string(),
                    };
                    warn!(
                        "Subscription {} for broadcaster_id={} rejected: {}",
                        intent.event_type, intent.broadcaster_id, reason
                    );
                    result.errors.push(SubscriptionRejection { intent, reason });
                }
            }
        }
        Ok(result)
    }

    async fn send_message(&self, broadcaster_id: &str, text: &str) -> Result<(), Error> {
        let token = self
            .fresh_access_token(&self.bot_id)
            .await
            .map_err(|e| Error::TransportSend(e.to_string()))?;

        let body = json!({
            "broadcaster_id": broadcaster_id,
            "sender_id": self.bot_id,
            "message": text,
        });
        let resp = self
            .http
            .post(format!("{}/chat/messages", self.helix_base))
            .header("Client-Id", &self.oauth.client_id)
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::TransportSend(format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(Error::TransportSend(format!("HTTP {status}: {text}")));
        }

        let parsed: SendChatResponse = resp
            .json()
            .await
            .map_err(|e| Error::TransportSend(format!("bad response: {e}")))?;
        match parsed.data.first() {
            Some(r) if !r.is_sent => {
                let reason = r
                    .drop_reason
                    .as_ref()
                    .map(|d| format!("{}: {}", d.code, d.message))
                    .unwrap_or_else(|| "dropped".to_string());
                Err(Error::TransportSend(reason))
            }
            _ => Ok(()),
        }
    }
}
