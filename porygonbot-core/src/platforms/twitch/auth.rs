// File: porygonbot-core/src/platforms/twitch/auth.rs
//
// OAuth plumbing against id.twitch.tv: authorize URL, code exchange,
// refresh and validation.

use reqwest::Client as ReqwestClient;
use serde::Deserialize;
use tracing::{debug, error};
use twitch_oauth2::tokens::errors::ValidationError;
use twitch_oauth2::AccessToken;

use porygonbot_common::models::ValidatedIdentity;
use crate::Error;

pub const DEFAULT_OAUTH_BASE: &str = "https://id.twitch.tv/oauth2";

/// Matches Twitch's JSON from the token endpoint
#[derive(Debug, Deserialize)]
pub struct TwitchTokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub scope: Option<Vec<String>>,
}

/// A token pair freshly issued by Twitch.
#[derive(Clone)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: Option<u64>,
}

impl std::fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGrant")
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}

/// Twitch code flow with client_secret, no PKCE.
#[derive(Clone)]
pub struct TwitchOAuthClient {
    http: ReqwestClient,
    pub client_id: String,
    client_secret: Option<String>,
    pub redirect_uri: String,
    oauth_base: String,
}

impl TwitchOAuthClient {
    pub fn new(
        http: ReqwestClient,
        client_id: impl Into<String>,
        client_secret: Option<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            http,
            client_id: client_id.into(),
            client_secret,
            redirect_uri: redirect_uri.into(),
            oauth_base: DEFAULT_OAUTH_BASE.to_string(),
        }
    }

    /// Point the token endpoint somewhere else (tests, proxies).
    pub fn with_oauth_base(mut self, base: impl Into<String>) -> Self {
        self.oauth_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn authorize_url(&self, scopes: &[String], state: &str) -> String {
        let scope_str = scopes.join(" ");
        format!(
            "{base}/authorize?response_type=code&client_id={cid}\
             &redirect_uri={redir}&scope={scope}&state={st}",
            base  = self.oauth_base,
            cid   = urlencoding::encode(&self.client_id),
            redir = urlencoding::encode(&self.redirect_uri),
            scope = urlencoding::encode(&scope_str),
            st    = urlencoding::encode(state),
        )
    }

    /// Exchange an authorization code for a token pair.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenGrant, Error> {
        let params = [
            ("client_id",     self.client_id.clone()),
            ("client_secret", self.client_secret.clone().unwrap_or_default()),
            ("code",          code.to_string()),
            ("grant_type",    "authorization_code".to_string()),
            ("redirect_uri",  self.redirect_uri.clone()),
        ];
        let resp = self.post_token(&params, "exchanging code").await?;
        let refresh = resp
            .refresh_token
            .ok_or_else(|| Error::Auth("Twitch code exchange returned no refresh_token".into()))?;
        Ok(TokenGrant {
            access_token: resp.access_token,
            refresh_token: refresh,
            expires_in: resp.expires_in,
        })
    }

    /// Trade a refresh token for a new pair. Twitch may omit a new refresh
    /// token, in which case the old one stays valid.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, Error> {
        let params = [
            ("client_id",     self.client_id.clone()),
            ("client_secret", self.client_secret.clone().unwrap_or_default()),
            ("grant_type",    "refresh_token".to_string()),
            ("refresh_token", refresh_token.to_string()),
        ];
        let resp = self.post_token(&params, "refreshing token").await?;
        Ok(TokenGrant {
            access_token: resp.access_token,
            refresh_token: resp.refresh_token.unwrap_or_else(|| refresh_token.to_string()),
            expires_in: resp.expires_in,
        })
    }

    async fn post_token(
        &self,
        params: &[(&str, String)],
        what: &str,
    ) -> Result<TwitchTokenResponse, Error> {
        let url = format!("{}/token", self.oauth_base);
        debug!("POST {} ({})", url, what);
        self.http
            .post(&url)
            .form(params)
            .send()
            .await
            .map_err(|e| Error::Auth(format!("HTTP error {what}: {e}")))?
            .error_for_status()
            .map_err(|e| Error::Auth(format!("Twitch token endpoint error {what}: {e}")))?
            .json::<TwitchTokenResponse>()
            .await
            .map_err(|e| Error::Auth(format!("Parse error on token JSON: {e}")))
    }

    /// Ask Twitch who owns `access_token`. Only a rejected token maps to
    /// `Error::Validation`; a failed request is a `Platform` error.
    pub async fn validate(&self, access_token: &str) -> Result<ValidatedIdentity, Error> {
        let token = AccessToken::new(access_token.to_string());
        let validated = token
            .validate_token(&self.http)
            .await
            .map_err(classify_validation_error)?;

        let user_id = validated
            .user_id
            .map(|id| id.to_string())
            .ok_or_else(|| Error::Validation("token is not a user token (no user_id)".into()))?;

        Ok(ValidatedIdentity {
            user_id,
            login: validated.login.map(|l| l.to_string()),
            client_id: validated.client_id.to_string(),
            scopes: validated
                .scopes
                .unwrap_or_default()
                .into_iter()
                .map(|s| s.to_string())
                .collect(),
            expires_in: validated.expires_in.map(|d| d.as_secs()),
        })
    }
}

fn classify_validation_error<RE>(e: ValidationError<RE>) -> Error
where
    RE: std::error::Error + Send + Sync + 'static,
{
    match e {
        ValidationError::NotAuthorized => Error::Validation("token rejected by Twitch".into()),
        ValidationError::InvalidToken(why) => Error::Validation(why.to_string()),
        other => {
            error!("Twitch validate_token error => {other}");
            Error::Platform(format!("token validation request failed: {other}"))
        }
    }
}
