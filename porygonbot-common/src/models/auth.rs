use std::fmt;
use super::credential::{TokenPair, ValidatedIdentity};

/// Someone granted the bot access. `claimed_user_id` comes from the
/// authorization payload and is only a hint; validation decides.
#[derive(Clone)]
pub struct AuthorizationEvent {
    pub claimed_user_id: Option<String>,
    pub tokens: TokenPair,
}

impl AuthorizationEvent {
    pub fn new(
        claimed_user_id: Option<String>,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            claimed_user_id,
            tokens: TokenPair {
                access_token: access_token.into(),
                refresh_token: refresh_token.into(),
            },
        }
    }
}

impl fmt::Debug for AuthorizationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationEvent")
            .field("claimed_user_id", &self.claimed_user_id)
            .finish_non_exhaustive()
    }
}

/// What happened to the subscription step of an authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionOutcome {
    Subscribed,
    /// The validated identity is the bot itself.
    SkippedSelf,
    /// The payload carried no user id.
    SkippedNoClaim,
    /// Persisted but not subscribed; the next restart retries.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationOutcome {
    pub identity: ValidatedIdentity,
    pub subscription: SubscriptionOutcome,
}
