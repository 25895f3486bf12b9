//! porygonbot-server/src/context.rs
//!
//! Everything the running bot shares, built once at startup.

use std::sync::Arc;

use tokio_util::task::TaskTracker;
use tracing::info;

use porygonbot_core::auth::{OAuthRouteState, SessionAuthenticator};
use porygonbot_core::cache::ActivityLog;
use porygonbot_core::eventbus::EventBus;
use porygonbot_core::platforms::twitch::{TwitchOAuthClient, TwitchTransport};
use porygonbot_core::repositories::SqliteCredentialsRepository;
use porygonbot_core::services::twitch::MessageClassifier;
use porygonbot_core::services::{Dispatcher, SubscriptionManager};
use porygonbot_core::{Database, Error};

use crate::config::FileConfig;
use crate::Args;

pub struct ServerContext {
    pub db: Database,
    pub event_bus: Arc<EventBus>,
    pub credentials_repo: Arc<SqliteCredentialsRepository>,
    pub transport: Arc<TwitchTransport>,
    pub subscriptions: Arc<SubscriptionManager>,
    pub authenticator: Arc<SessionAuthenticator>,
    pub activity: Arc<ActivityLog>,
    pub dispatcher: Arc<Dispatcher>,
    pub oauth_state: OAuthRouteState,
}

impl ServerContext {
    /// Opens the credential store first; if that fails nothing else is built.
    pub async fn new(args: &Args, cfg: &FileConfig) -> Result<Self, Error> {
        let db = Database::new(&args.database_url).await?;
        db.migrate().await?;
        let credentials_repo = Arc::new(SqliteCredentialsRepository::new(db.pool().clone()));

        let event_bus = Arc::new(EventBus::new());
        let tracker = TaskTracker::new();
        let http = reqwest::Client::new();
        let oauth = TwitchOAuthClient::new(
            http.clone(),
            args.client_id.clone(),
            args.client_secret.clone(),
            args.redirect_uri.clone(),
        );
        let transport = Arc::new(
            TwitchTransport::new(http, oauth.clone(), args.bot_id.clone())
                .with_event_bus(event_bus.clone())
                .with_tracker(tracker.clone()),
        );

        let subscriptions = Arc::new(SubscriptionManager::new(transport.clone()));
        let authenticator = Arc::new(SessionAuthenticator::new(
            transport.clone(),
            credentials_repo.clone(),
            subscriptions.clone(),
        ));
        let classifier = Arc::new(MessageClassifier::new(args.bot_id.clone(), cfg.classifier.clone())?);
        let activity = Arc::new(ActivityLog::new(cfg.retention.clone()));

        let dispatcher = Arc::new(
            Dispatcher::new(
                event_bus.clone(),
                transport.clone(),
                authenticator.clone(),
                classifier,
                activity.clone(),
            )
            .with_tracker(tracker),
        );

        let oauth_state = OAuthRouteState::new(
            oauth,
            transport.clone(),
            event_bus.clone(),
            cfg.scopes.clone(),
        );

        info!("Server context ready (bot_id={})", args.bot_id);
        Ok(Self {
            db,
            event_bus,
            credentials_repo,
            transport,
            subscriptions,
            authenticator,
            activity,
            dispatcher,
            oauth_state,
        })
    }
}
