// File: src/services/subscription_service.rs

use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

use porygonbot_common::models::{CredentialRecord, SubscriptionIntent};
use porygonbot_common::traits::ChatTransport;
use crate::Error;

/// What a startup bootstrap achieved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    /// Broadcaster ids now receiving chat events.
    pub accepted: BTreeSet<String>,
    /// `(user_id, reason)` for every intent that was refused.
    pub rejected: Vec<(String, String)>,
}

/// Rebuilds chat subscriptions from stored credentials and subscribes
/// newly authorized channels. Nothing here retries; the next start does.
pub struct SubscriptionManager {
    transport: Arc<dyn ChatTransport>,
}

impl SubscriptionManager {
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self { transport }
    }

    /// The chat intent for `user_id`, or `None` for the bot itself.
    pub fn intent_for(&self, user_id: &str) -> Option<SubscriptionIntent> {
        let bot_id = self.transport.bot_id();
        if user_id.is_empty() || user_id == bot_id {
            return None;
        }
        Some(SubscriptionIntent::chat_message(user_id, bot_id))
    }

    /// One intent per non-bot credential, all submitted in a single batch.
    pub async fn bootstrap(&self, records: &[CredentialRecord]) -> BootstrapReport {
        let intents: Vec<SubscriptionIntent> = records
            .iter()
            .map(|r| r.user_id.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .filter_map(|uid| self.intent_for(uid))
            .collect();

        let mut report = BootstrapReport::default();
        if intents.is_empty() {
            info!("Bootstrap: no channels to subscribe");
            return report;
        }

        info!("Bootstrap: subscribing {} channel(s)", intents.len());
        match self.transport.multi_subscribe(intents.clone()).await {
            Ok(result) => {
                for intent in result.accepted {
                    report.accepted.insert(intent.broadcaster_id);
                }
                for rejection in result.errors {
                    warn!(
                        "Bootstrap: subscription for user_id={} rejected: {}",
                        rejection.intent.broadcaster_id, rejection.reason
                    );
                    report
                        .rejected
                        .push((rejection.intent.broadcaster_id, rejection.reason));
                }
            }
            Err(e) => {
                let reason = e.to_string();
                warn!("Bootstrap: batch subscribe failed: {}", reason);
                report.rejected = intents
                    .into_iter()
                    .map(|i| (i.broadcaster_id, reason.clone()))
                    .collect();
            }
        }

        info!(
            "Bootstrap: {} accepted, {} rejected",
            report.accepted.len(),
            report.rejected.len()
        );
        report
    }

    /// Subscribe the chat of one newly authorized user.
    pub async fn subscribe_one(&self, user_id: &str) -> Result<SubscriptionIntent, Error> {
        let intent = self.intent_for(user_id).ok_or_else(|| {
            Error::Subscription(format!("no subscription for user_id={user_id:?}"))
        })?;

        let result = self.transport.multi_subscribe(vec![intent.clone()]).await?;
        if result.accepted.contains(&intent) {
            info!("Subscribed to chat of user_id={}", user_id);
            return Ok(intent);
        }
        let reason = result
            .errors
            .into_iter()
            .next()
            .map(|r| r.reason)
            .unwrap_or_else(|| "not accepted".to_string());
        Err(Error::Subscription(reason))
    }
}
