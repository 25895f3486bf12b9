// tests/restart_tests.rs
//
// Credentials written in one run must rebuild the same subscriptions in the next.

use std::collections::BTreeSet;
use std::sync::Arc;

use porygonbot_common::models::AuthorizationEvent;
use porygonbot_core::auth::SessionAuthenticator;
use porygonbot_core::repositories::{CredentialsRepository, SqliteCredentialsRepository};
use porygonbot_core::services::SubscriptionManager;
use porygonbot_core::test_utils::FakeTransport;
use porygonbot_core::{Database, Error};

const BOT: &str = "1388303571";

fn transport() -> FakeTransport {
    FakeTransport::new(BOT)
        .with_user("A1", "111")
        .with_user("A2", "222")
        .with_user("B1", BOT)
}

#[tokio::test]
async fn stored_credentials_survive_restart_and_resubscribe() -> Result<(), Error> {
    let dir = tempfile::tempdir().expect("create temp dir");
    let url = format!("sqlite://{}", dir.path().join("tokens.db").display());

    // first run
    {
        let db = Database::new(&url).await?;
        db.migrate().await?;
        let repo = Arc::new(SqliteCredentialsRepository::new(db.pool().clone()));
        let transport = Arc::new(transport());
        let subs = Arc::new(SubscriptionManager::new(transport.clone()));
        let auth = SessionAuthenticator::new(transport.clone(), repo, subs);

        for (claim, access, refresh) in [("111", "A1", "R1"), ("222", "A2", "R2"), (BOT, "B1", "BR")] {
            auth.on_authorized(&AuthorizationEvent::new(Some(claim.into()), access, refresh))
                .await?;
        }
        assert_eq!(transport.accepted().len(), 2);
        db.close().await;
    }

    // second run, fresh transport with nothing cached
    let db = Database::new(&url).await?;
    db.migrate().await?;
    let repo = Arc::new(SqliteCredentialsRepository::new(db.pool().clone()));
    let transport = Arc::new(transport());
    let subs = Arc::new(SubscriptionManager::new(transport.clone()));
    let auth = SessionAuthenticator::new(transport.clone(), repo.clone(), subs.clone());

    let records = repo.list_all().await?;
    assert_eq!(records.len(), 3);

    let restored = auth.restore(&records).await?;
    assert_eq!(restored.restored.len(), 3);
    assert!(restored.failed.is_empty());

    let report = subs.bootstrap(&records).await;
    assert_eq!(report.accepted, BTreeSet::from(["111".to_string(), "222".to_string()]));
    assert!(report.rejected.is_empty());

    // one batch, never the bot's own channel
    let calls = transport.subscribe_calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].iter().all(|i| i.broadcaster_id != BOT && i.listener_id == BOT));

    db.close().await;
    Ok(())
}

#[tokio::test]
async fn reopening_an_empty_store_bootstraps_nothing() -> Result<(), Error> {
    let dir = tempfile::tempdir().expect("create temp dir");
    let url = format!("sqlite://{}", dir.path().join("tokens.db").display());

    let db = Database::new(&url).await?;
    db.migrate().await?;
    db.close().await;

    let db = Database::new(&url).await?;
    db.migrate().await?;
    let repo = SqliteCredentialsRepository::new(db.pool().clone());
    let transport = Arc::new(FakeTransport::new(BOT));
    let subs = SubscriptionManager::new(transport.clone());

    let report = subs.bootstrap(&repo.list_all().await?).await;
    assert!(report.accepted.is_empty());
    assert!(transport.subscribe_calls().is_empty());
    Ok(())
}
