use async_trait::async_trait;
use crate::error::Error;
use crate::models::{MultiSubscribeResult, SubscriptionIntent, TokenPair, ValidatedIdentity};

/// The platform capability the bot consumes: token validation, a token
/// cache, chat subscriptions and outbound chat messages.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// The bot account's own user id.
    fn bot_id(&self) -> &str;

    /// Ask the platform who owns `access_token`.
    async fn validate_token(&self, access_token: &str) -> Result<ValidatedIdentity, Error>;

    /// Validate the pair and keep it in the transport's token cache, keyed by
    /// the validated user id.
    async fn add_token(&self, access_token: &str, refresh_token: &str) -> Result<ValidatedIdentity, Error>;

    /// Exchange a refresh token for a new pair.
    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenPair, Error>;

    /// Submit all intents at once. Per-intent rejections land in `errors`;
    /// `Err` is reserved for the call failing as a whole.
    async fn multi_subscribe(&self, intents: Vec<SubscriptionIntent>) -> Result<MultiSubscribeResult, Error>;

    /// Send `text` to the chat of `broadcaster_id` as the bot.
    async fn send_message(&self, broadcaster_id: &str, text: &str) -> Result<(), Error>;
}
