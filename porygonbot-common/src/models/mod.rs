// File: porygonbot-common/src/models/mod.rs
pub mod activity;
pub mod auth;
pub mod chat;
pub mod credential;
pub mod rule;
pub mod subscription;

pub use activity::{ActivityMessage, ActivityRedemption, ActivityRetention, ChatterActivityRecord};
pub use auth::{AuthorizationEvent, AuthorizationOutcome, SubscriptionOutcome};
pub use chat::{ChatEvent, Identity, RedemptionEvent};
pub use credential::{CredentialRecord, TokenPair, ValidatedIdentity};
pub use rule::{RuleKind, RuleMatch};
pub use subscription::{EventType, MultiSubscribeResult, SubscriptionIntent, SubscriptionRejection};
