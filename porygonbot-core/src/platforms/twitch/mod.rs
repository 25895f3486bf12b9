// File: src/platforms/twitch/mod.rs

pub mod auth;
pub mod events;
pub mod eventsub;
pub mod transport;

pub use auth::TwitchOAuthClient;
pub use eventsub::EventSubSession;
pub use transport::TwitchTransport;
