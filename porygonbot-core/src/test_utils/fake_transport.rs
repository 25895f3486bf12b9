// File: porygonbot-core/src/test_utils/fake_transport.rs

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use porygonbot_common::models::{
    MultiSubscribeResult, SubscriptionIntent, SubscriptionRejection, TokenPair, ValidatedIdentity,
};
use porygonbot_common::traits::ChatTransport;
use crate::Error;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory stand-in for the platform. Knows a fixed set of access tokens,
/// records every subscribe and send, and can be told to fail.
#[derive(Default)]
pub struct FakeTransport {
    bot_id: String,
    /// access token -> owner
    known_tokens: Mutex<HashMap<String, String>>,
    /// refresh token -> new pair
    refreshes: Mutex<HashMap<String, TokenPair>>,
    /// broadcaster id -> rejection reason
    rejections: Mutex<HashMap<String, String>>,
    subscribe_failure: Mutex<Option<String>>,
    send_failure: Mutex<Option<String>>,

    cached: Mutex<HashMap<String, TokenPair>>,
    subscribe_calls: Mutex<Vec<Vec<SubscriptionIntent>>>,
    accepted: Mutex<Vec<SubscriptionIntent>>,
    sent: Mutex<Vec<(String, String)>>,
}

impl FakeTransport {
    pub fn new(bot_id: &str) -> Self {
        Self {
            bot_id: bot_id.to_string(),
            ..Default::default()
        }
    }

    /// `access_token` validates as `user_id`.
    pub fn with_user(self, access_token: &str, user_id: &str) -> Self {
        lock(&self.known_tokens).insert(access_token.to_string(), user_id.to_string());
        self
    }

    /// `refresh_token` can be exchanged for the given pair.
    pub fn with_refresh(self, refresh_token: &str, new_access: &str, new_refresh: &str) -> Self {
        lock(&self.refreshes).insert(
            refresh_token.to_string(),
            TokenPair {
                access_token: new_access.to_string(),
                refresh_token: new_refresh.to_string(),
            },
        );
        self
    }

    pub fn reject_broadcaster(self, broadcaster_id: &str, reason: &str) -> Self {
        lock(&self.rejections).insert(broadcaster_id.to_string(), reason.to_string());
        self
    }

    /// Every `multi_subscribe` call fails as a whole.
    pub fn fail_subscriptions(self, reason: &str) -> Self {
        *lock(&self.subscribe_failure) = Some(reason.to_string());
        self
    }

    pub fn fail_sends(self, reason: &str) -> Self {
        *lock(&self.send_failure) = Some(reason.to_string());
        self
    }

    pub fn subscribe_calls(&self) -> Vec<Vec<SubscriptionIntent>> {
        lock(&self.subscribe_calls).clone()
    }

    pub fn accepted(&self) -> Vec<SubscriptionIntent> {
        lock(&self.accepted).clone()
    }

    /// `(broadcaster_id, text)` in send order.
    pub fn sent(&self) -> Vec<(String, String)> {
        lock(&self.sent).clone()
    }

    pub fn cached_token(&self, user_id: &str) -> Option<TokenPair> {
        lock(&self.cached).get(user_id).cloned()
    }
}

#[async_trait]
impl ChatTransport for FakeTransport {
    fn bot_id(&self) -> &str {
        &self.bot_id
    }

    async fn validate_token(&self, access_token: &str) -> Result<ValidatedIdentity, Error> {
        let user_id = lock(&self.known_tokens)
            .get(access_token)
            .cloned()
            .ok_or_else(|| Error::Validation("invalid access token".into()))?;
        Ok(ValidatedIdentity {
            login: Some(format!("user{user_id}")),
            user_id,
            client_id: "fake-client".into(),
            scopes: vec!["user:read:chat".into(), "user:bot".into()],
            expires_in: Some(14_400),
        })
    }

    async fn add_token(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<ValidatedIdentity, Error> {
        let identity = self.validate_token(access_token).await?;
        lock(&self.cached).insert(
            identity.user_id.clone(),
            TokenPair {
                access_token: access_token.to_string(),
                refresh_token: refresh_token.to_string(),
            },
        );
        Ok(identity)
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenPair, Error> {
        let pair = lock(&self.refreshes)
            .get(refresh_token)
            .cloned()
            .ok_or_else(|| Error::Auth("invalid refresh token".into()))?;
        Ok(pair)
    }

    async fn multi_subscribe(
        &self,
        intents: Vec<SubscriptionIntent>,
    ) -> Result<MultiSubscribeResult, Error> {
        lock(&self.subscribe_calls).push(intents.clone());
        if let Some(reason) = lock(&self.subscribe_failure).clone() {
            return Err(Error::Platform(reason));
        }

        let rejections = lock(&self.rejections).clone();
        let mut result = MultiSubscribeResult::default();
        for intent in intents {
            match rejections.get(&intent.broadcaster_id) {
                Some(reason) => result.errors.push(SubscriptionRejection {
                    intent,
                    reason: reason.clone(),
                }),
                None => {
                    lock(&self.accepted).push(intent.clone());
                    result.accepted.push(intent);
                }
            }
        }
        Ok(result)
    }

    async fn send_message(&self, broadcaster_id: &str, text: &str) -> Result<(), Error> {
        if let Some(reason) = lock(&self.send_failure).clone() {
            return Err(Error::TransportSend(reason));
        }
        lock(&self.sent).push((broadcaster_id.to_string(), text.to_string()));
        Ok(())
    }
}
