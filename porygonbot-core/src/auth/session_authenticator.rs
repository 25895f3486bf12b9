// porygonbot-core/src/auth/session_authenticator.rs
//
// authorize -> validate -> persist -> subscribe, plus the startup replay of
// stored credentials.

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use porygonbot_common::models::{
    AuthorizationEvent, AuthorizationOutcome, CredentialRecord, SubscriptionOutcome,
};
use porygonbot_common::traits::{ChatTransport, CredentialsRepository};
use crate::services::SubscriptionManager;
use crate::Error;

/// Result of replaying stored credentials into the transport at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Stored tokens that validated as-is.
    pub restored: Vec<String>,
    /// Tokens that had to be refreshed (and were re-persisted).
    pub refreshed: Vec<String>,
    /// `(user_id, reason)` for credentials that are unusable until the user
    /// authorizes again.
    pub failed: Vec<(String, String)>,
}

pub struct SessionAuthenticator {
    transport: Arc<dyn ChatTransport>,
    credentials_repo: Arc<dyn CredentialsRepository>,
    subscriptions: Arc<SubscriptionManager>,
}

impl SessionAuthenticator {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        credentials_repo: Arc<dyn CredentialsRepository>,
        subscriptions: Arc<SubscriptionManager>,
    ) -> Self {
        Self {
            transport,
            credentials_repo,
            subscriptions,
        }
    }

    /// Handle one authorization.
    ///
    /// A token the platform rejects fails with `Error::Validation` and nothing
    /// is stored. Storage errors propagate. A failed subscription is reported
    /// in the outcome; the credential stays persisted so the next start
    /// retries it.
    pub async fn on_authorized(
        &self,
        event: &AuthorizationEvent,
    ) -> Result<AuthorizationOutcome, Error> {
        let tokens = &event.tokens;
        let identity = self
            .transport
            .add_token(&tokens.access_token, &tokens.refresh_token)
            .await?;

        self.credentials_repo
            .upsert(&identity.user_id, &tokens.access_token, &tokens.refresh_token)
            .await?;
        info!(
            "Stored credentials for user_id={} login={:?}",
            identity.user_id, identity.login
        );

        let claim = event.claimed_user_id.as_deref().filter(|c| !c.is_empty());
        let subscription = match claim {
            None => {
                debug!("Authorization without a claimed user id, not subscribing");
                SubscriptionOutcome::SkippedNoClaim
            }
            Some(_) if identity.user_id == self.transport.bot_id() => {
                debug!("Bot account authorized itself, not subscribing");
                SubscriptionOutcome::SkippedSelf
            }
            Some(claimed) => {
                if claimed != identity.user_id {
                    warn!(
                        "Claimed user_id={} but token belongs to user_id={}; using the latter",
                        claimed, identity.user_id
                    );
                }
                match self.subscriptions.subscribe_one(&identity.user_id).await {
                    Ok(_) => SubscriptionOutcome::Subscribed,
                    Err(e) => {
                        let reason = match e {
                            Error::Subscription(r) => r,
                            other => other.to_string(),
                        };
                        warn!(
                            "Subscription for user_id={} failed: {}",
                            identity.user_id, reason
                        );
                        SubscriptionOutcome::Failed(reason)
                    }
                }
            }
        };

        Ok(AuthorizationOutcome {
            identity,
            subscription,
        })
    }

    /// Load every stored credential into the transport. A token that no
    /// longer validates is refreshed once and the new pair is persisted.
    pub async fn restore(&self, records: &[CredentialRecord]) -> Result<RestoreReport, Error> {
        let mut report = RestoreReport::default();

        for rec in records {
            match self
                .transport
                .add_token(&rec.access_token, &rec.refresh_token)
                .await
            {
                Ok(identity) => {
                    if identity.user_id != rec.user_id {
                        warn!(
                            "Stored token for user_id={} validates as user_id={}",
                            rec.user_id, identity.user_id
                        );
                    }
                    report.restored.push(rec.user_id.clone());
                }
                Err(e) if e.is_validation() => {
                    debug!("Token for user_id={} rejected ({}), refreshing", rec.user_id, e);
                    match self.refresh_and_store(rec).await {
                        Ok(()) => report.refreshed.push(rec.user_id.clone()),
                        Err(e) if e.is_storage() => return Err(e),
                        Err(e) => {
                            warn!("Could not refresh user_id={}: {}", rec.user_id, e);
                            report.failed.push((rec.user_id.clone(), e.to_string()));
                        }
                    }
                }
                Err(e) => {
                    error!("Could not restore user_id={}: {}", rec.user_id, e);
                    report.failed.push((rec.user_id.clone(), e.to_string()));
                }
            }
        }

        info!(
            "Restored {} credential(s), refreshed {}, failed {}",
            report.restored.len(),
            report.refreshed.len(),
            report.failed.len()
        );
        Ok(report)
    }

    async fn refresh_and_store(&self, rec: &CredentialRecord) -> Result<(), Error> {
        let pair = self.transport.refresh_token(&rec.refresh_token).await?;
        let identity = self
            .transport
            .add_token(&pair.access_token, &pair.refresh_token)
            .await?;
        self.credentials_repo
            .upsert(&identity.user_id, &pair.access_token, &pair.refresh_token)
            .await?;
        Ok(())
    }

    /// Persist a pair the transport refreshed on its own.
    pub async fn on_token_refreshed(&self, record: &CredentialRecord) -> Result<(), Error> {
        self.credentials_repo
            .upsert(&record.user_id, &record.access_token, &record.refresh_token)
            .await?;
        debug!("Persisted refreshed token for user_id={}", record.user_id);
        Ok(())
    }
}
