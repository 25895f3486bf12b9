//! src/eventbus/mod.rs
//!
//! Provides an in-process event bus that supports guaranteed delivery
//! to multiple subscribers via bounded MPSC queues.

use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use porygonbot_common::models::{AuthorizationEvent, ChatEvent, CredentialRecord, RedemptionEvent};

/// Everything that flows through the bot at runtime.
#[derive(Debug, Clone)]
pub enum BotEvent {
    /// A user granted the bot access (OAuth callback or any other producer).
    Authorized(AuthorizationEvent),

    /// A chat message delivered by the EventSub session.
    ChatMessage(ChatEvent),

    /// A channel points redemption, if the platform delivers one.
    Redemption(RedemptionEvent),

    /// The transport refreshed a token on its own; it must be persisted.
    TokenRefreshed(CredentialRecord),

    /// Free-form system event for debugging or administration.
    SystemMessage(String),
}

impl BotEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            BotEvent::Authorized(_) => "authorized",
            BotEvent::ChatMessage(_) => "chat_message",
            BotEvent::Redemption(_) => "redemption",
            BotEvent::TokenRefreshed(_) => "token_refreshed",
            BotEvent::SystemMessage(_) => "system_message",
        }
    }
}

/// Each subscriber gets its own `mpsc::Sender<BotEvent>` for guaranteed delivery.
///
/// - If the subscriber’s channel buffer fills, `publish` will await
///   until there's space (backpressure).
/// - If the subscriber has dropped the `Receiver`, the channel is closed
///   and that subscriber is skipped.
#[derive(Clone)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<mpsc::Sender<BotEvent>>>>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    pub shutdown_rx: watch::Receiver<bool>,
}

/// Default size for each subscriber’s buffer.
const DEFAULT_BUFFER_SIZE: usize = 10000;

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// Create a new, empty event bus.
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            subscribers: Arc::new(Mutex::new(vec![])),
            shutdown_tx: Arc::new(tx),
            shutdown_rx: rx,
        }
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    /// Resolves once `shutdown` has been called.
    pub async fn wait_for_shutdown(&self) {
        let mut rx = self.shutdown_rx.clone();
        let _ = rx.wait_for(|down| *down).await;
    }

    /// Returns a receiver on which events will be delivered.
    pub async fn subscribe(&self, buffer_size: Option<usize>) -> mpsc::Receiver<BotEvent> {
        let size = buffer_size.unwrap_or(DEFAULT_BUFFER_SIZE);
        let (tx, rx) = mpsc::channel(size);
        let mut subs = self.subscribers.lock().await;
        subs.push(tx);
        rx
    }

    /// Publish an event to all subscribers.
    pub async fn publish(&self, event: BotEvent) {
        let senders = {
            let mut subs = self.subscribers.lock().await;
            subs.retain(|s| !s.is_closed());
            subs.clone()
        };
        for s in senders {
            let _ = s.send(event.clone()).await;
        }
    }

    /// Convenience method: publish an authorization.
    pub async fn publish_authorized(
        &self,
        claimed_user_id: Option<String>,
        access_token: &str,
        refresh_token: &str,
    ) {
        self.publish(BotEvent::Authorized(AuthorizationEvent::new(
            claimed_user_id,
            access_token,
            refresh_token,
        )))
        .await;
    }
}
