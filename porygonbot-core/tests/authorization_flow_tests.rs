// tests/authorization_flow_tests.rs

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use porygonbot_common::models::{ChatEvent, Identity};
use porygonbot_core::auth::SessionAuthenticator;
use porygonbot_core::cache::ActivityLog;
use porygonbot_core::eventbus::{BotEvent, EventBus};
use porygonbot_core::repositories::{CredentialsRepository, SqliteCredentialsRepository};
use porygonbot_core::services::twitch::{ClassifierConfig, MessageClassifier};
use porygonbot_core::services::{Dispatcher, RandomFactory, SubscriptionManager};
use porygonbot_core::test_utils::FakeTransport;
use porygonbot_core::utils::{RandomSource, ScriptedRandom};
use porygonbot_core::{Database, Error};

const BOT: &str = "1388303571";

struct Bot {
    bus: Arc<EventBus>,
    dispatcher: Arc<Dispatcher>,
    transport: Arc<FakeTransport>,
    repo: Arc<SqliteCredentialsRepository>,
    handle: tokio::task::JoinHandle<tokio::sync::mpsc::Receiver<BotEvent>>,
}

async fn start(transport: FakeTransport) -> Result<Bot, Error> {
    let db = Database::in_memory().await?;
    db.migrate().await?;
    let repo = Arc::new(SqliteCredentialsRepository::new(db.pool().clone()));
    let transport = Arc::new(transport);
    let bus = Arc::new(EventBus::new());

    let subs = Arc::new(SubscriptionManager::new(transport.clone()));
    let auth = Arc::new(SessionAuthenticator::new(transport.clone(), repo.clone(), subs));
    let classifier = Arc::new(MessageClassifier::new(BOT, ClassifierConfig::default())?);
    let random: RandomFactory = Arc::new(|| Box::new(ScriptedRandom::new([50, 10, 10])) as Box<dyn RandomSource>);
    let dispatcher = Arc::new(
        Dispatcher::new(bus.clone(), transport.clone(), auth, classifier, Arc::new(ActivityLog::default()))
            .with_random(random),
    );

    let rx = bus.subscribe(None).await;
    let handle = {
        let d = dispatcher.clone();
        tokio::spawn(async move { d.run(rx).await })
    };
    Ok(Bot { bus, dispatcher, transport, repo, handle })
}

impl Bot {
    async fn stop(self) {
        self.bus.shutdown();
        let rx = self.handle.await.expect("dispatcher task");
        assert!(self.dispatcher.drain(rx, Duration::from_secs(2)).await);
    }
}

#[tokio::test]
async fn authorizing_a_user_persists_once_and_subscribes_once() -> Result<(), Error> {
    let bot = start(FakeTransport::new(BOT).with_user("A1", "111")).await?;
    bot.bus.publish_authorized(Some("111".into()), "A1", "R1").await;

    let transport = bot.transport.clone();
    let repo = bot.repo.clone();
    bot.stop().await;

    let rows = repo.list_all().await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].user_id, "111");
    assert_eq!(rows[0].access_token, "A1");
    assert_eq!(rows[0].refresh_token, "R1");

    let accepted = transport.accepted();
    assert_eq!(accepted.len(), 1);
    assert_eq!(accepted[0].broadcaster_id, "111");
    assert_eq!(accepted[0].listener_id, BOT);
    Ok(())
}

#[tokio::test]
async fn authorizing_the_bot_subscribes_nothing() -> Result<(), Error> {
    let bot = start(FakeTransport::new(BOT).with_user("B1", BOT)).await?;
    bot.bus.publish_authorized(Some(BOT.into()), "B1", "BR").await;

    let transport = bot.transport.clone();
    let repo = bot.repo.clone();
    bot.stop().await;

    assert_eq!(repo.list_all().await?.len(), 1);
    assert!(transport.subscribe_calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn chat_from_a_subscribed_channel_gets_replies() -> Result<(), Error> {
    let bot = start(FakeTransport::new(BOT).with_user("A1", "111")).await?;
    bot.bus.publish_authorized(Some("111".into()), "A1", "R1").await;
    bot.bus
        .publish(BotEvent::ChatMessage(ChatEvent {
            broadcaster: Identity::new("111", "streamer", "Streamer"),
            chatter: Identity::new("555", "viewer", "Viewer"),
            text: "!shinyroll".into(),
            message_id: Some("m1".into()),
            timestamp: Utc::now(),
        }))
        .await;

    let transport = bot.transport.clone();
    bot.stop().await;

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "111");
    assert_eq!(sent[0].1, "RESULT: Viewer rolled 10!");
    Ok(())
}
