// File: src/services/dispatcher.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, trace, warn};

use porygonbot_common::models::{AuthorizationEvent, ChatEvent, CredentialRecord, RedemptionEvent};
use porygonbot_common::traits::ChatTransport;

use crate::auth::SessionAuthenticator;
use crate::cache::ActivityLog;
use crate::eventbus::{BotEvent, EventBus};
use crate::services::twitch::MessageClassifier;
use crate::utils::{RandomSource, ThreadRandom};

pub type RandomFactory = Arc<dyn Fn() -> Box<dyn RandomSource> + Send + Sync>;

/// Listens on the bus and routes each event. Chat is handled inline, one
/// event at a time, so replies keep the order messages arrived in.
/// Credential writes run on a task tracker so shutdown can wait for them.
pub struct Dispatcher {
    event_bus: Arc<EventBus>,
    transport: Arc<dyn ChatTransport>,
    authenticator: Arc<SessionAuthenticator>,
    classifier: Arc<MessageClassifier>,
    activity: Arc<ActivityLog>,
    random: RandomFactory,
    tracker: TaskTracker,
}

impl Dispatcher {
    pub fn new(
        event_bus: Arc<EventBus>,
        transport: Arc<dyn ChatTransport>,
        authenticator: Arc<SessionAuthenticator>,
        classifier: Arc<MessageClassifier>,
        activity: Arc<ActivityLog>,
    ) -> Self {
        Self {
            event_bus,
            transport,
            authenticator,
            classifier,
            activity,
            random: Arc::new(|| Box::new(ThreadRandom::new()) as Box<dyn RandomSource>),
            tracker: TaskTracker::new(),
        }
    }

    /// Replace where dice rolls come from.
    pub fn with_random(mut self, random: RandomFactory) -> Self {
        self.random = random;
        self
    }

    /// Share the tracker credential writes run on, so other components
    /// (the transport's refresh announcements) are covered by `drain`.
    pub fn with_tracker(mut self, tracker: TaskTracker) -> Self {
        self.tracker = tracker;
        self
    }

    /// Process events until the bus shuts down or every sender is gone.
    /// Subscribe before spawning this so nothing published in between is lost.
    /// Events already queued are handled before the shutdown flag is honoured;
    /// the receiver is handed back for `drain`.
    pub async fn run(&self, mut rx: mpsc::Receiver<BotEvent>) -> mpsc::Receiver<BotEvent> {
        info!("Dispatcher started, listening on EventBus.");
        loop {
            tokio::select! {
                biased;
                maybe = rx.recv() => match maybe {
                    Some(event) => self.handle(event).await,
                    None => break,
                },
                _ = self.event_bus.wait_for_shutdown() => break,
            }
        }
        info!("Dispatcher: shutting down listener loop.");
        rx
    }

    /// Persist credential events still queued on `rx`, then wait (bounded) for
    /// every credential write, including writes queued by those writes.
    /// Chat and redemptions arriving this late are dropped.
    pub async fn drain(&self, mut rx: mpsc::Receiver<BotEvent>, wait: Duration) -> bool {
        self.tracker.close();
        let settle = async {
            loop {
                let mut pending = 0usize;
                while let Ok(event) = rx.try_recv() {
                    pending += 1;
                    match event {
                        BotEvent::Authorized(ev) => self.spawn_authorization(ev),
                        BotEvent::TokenRefreshed(rec) => self.spawn_token_persist(rec),
                        other => debug!("dropping {} queued at shutdown", other.event_type()),
                    }
                }
                if pending == 0 && self.tracker.is_empty() {
                    break;
                }
                self.tracker.wait().await;
            }
        };
        match tokio::time::timeout(wait, settle).await {
            Ok(()) => true,
            Err(_) => {
                warn!("{} background task(s) still running after {:?}", self.tracker.len(), wait);
                false
            }
        }
    }

    pub async fn handle(&self, event: BotEvent) {
        trace!("dispatching {}", event.event_type());
        match event {
            BotEvent::Authorized(ev) => self.spawn_authorization(ev),
            BotEvent::TokenRefreshed(rec) => self.spawn_token_persist(rec),
            BotEvent::ChatMessage(chat) => self.handle_chat(&chat).await,
            BotEvent::Redemption(r) => self.handle_redemption(&r),
            BotEvent::SystemMessage(msg) => debug!("system message: {}", msg),
        }
    }

    fn spawn_authorization(&self, event: AuthorizationEvent) {
        let authenticator = self.authenticator.clone();
        self.tracker.spawn(async move {
            match authenticator.on_authorized(&event).await {
                Ok(outcome) => info!(
                    "Authorization for user_id={} handled: {:?}",
                    outcome.identity.user_id, outcome.subscription
                ),
                Err(e) if e.is_validation() => {
                    warn!("Dropping authorization with invalid token: {}", e)
                }
                Err(e) => error!("Authorization failed: {}", e),
            }
        });
    }

    fn spawn_token_persist(&self, record: CredentialRecord) {
        let authenticator = self.authenticator.clone();
        self.tracker.spawn(async move {
            if let Err(e) = authenticator.on_token_refreshed(&record).await {
                error!("Could not persist refreshed token for user_id={}: {}", record.user_id, e);
            }
        });
    }

    async fn handle_chat(&self, chat: &ChatEvent) {
        if self.classifier.is_self(chat) {
            trace!("ignoring own message");
            return;
        }
        info!("[{}] - {}: {}", chat.broadcaster.name, chat.chatter.name, chat.text);

        self.activity.record_message(
            &chat.chatter.login,
            &chat.broadcaster.login,
            &chat.text,
            chat.timestamp,
        );

        let replies = {
            let mut rng = (self.random)();
            self.classifier.responses(chat, rng.as_mut())
        };

        for reply in replies {
            if let Err(e) = self.transport.send_message(&chat.broadcaster.id, &reply).await {
                warn!("Failed to send reply in {}: {}", chat.broadcaster.login, e);
            }
        }
    }

    fn handle_redemption(&self, r: &RedemptionEvent) {
        self.activity.record_redemption(
            &r.user.login,
            &r.broadcaster_id,
            &r.reward_title,
            r.user_input.as_deref(),
            r.timestamp,
        );
    }
}
