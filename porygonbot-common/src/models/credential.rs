use std::fmt;
use serde::{Deserialize, Serialize};

/// One row of the `tokens` table: the OAuth pair for a single Twitch user.
///
/// Exactly one record exists per `user_id`; re-authorization overwrites it.
/// The tokens are secrets, so `Debug` never prints them.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub user_id: String,
    pub access_token: String,
    pub refresh_token: String,
}

impl CredentialRecord {
    pub fn new(
        user_id: impl Into<String>,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }

    pub fn token_pair(&self) -> TokenPair {
        TokenPair {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
        }
    }
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("user_id", &self.user_id)
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

/// A fresh access/refresh pair, e.g. from a code exchange or a refresh.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TokenPair([REDACTED])")
    }
}

/// What the platform told us about a token when we validated it.
/// `user_id` is authoritative; ids claimed elsewhere are not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedIdentity {
    pub user_id: String,
    pub login: Option<String>,
    pub client_id: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Seconds until expiry, if the platform reported one.
    pub expires_in: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_hides_tokens() {
        let rec = CredentialRecord::new("123", "secret-access", "secret-refresh");
        let printed = format!("{:?}", rec);
        assert!(printed.contains("123"));
        assert!(!printed.contains("secret-access"));
        assert!(!printed.contains("secret-refresh"));
        assert!(!format!("{:?}", rec.token_pair()).contains("secret"));
    }
}
