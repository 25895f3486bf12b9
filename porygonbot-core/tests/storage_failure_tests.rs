// tests/storage_failure_tests.rs

use std::sync::Arc;

use async_trait::async_trait;
use mockall::mock;
use mockall::predicate::eq;
use tokio_test::assert_err;

use porygonbot_common::models::{AuthorizationEvent, CredentialRecord};
use porygonbot_core::auth::SessionAuthenticator;
use porygonbot_core::repositories::CredentialsRepository;
use porygonbot_core::services::SubscriptionManager;
use porygonbot_core::test_utils::FakeTransport;
use porygonbot_core::Error;

const BOT: &str = "1388303571";

mock! {
    CredentialsRepo {}
    #[async_trait]
    impl CredentialsRepository for CredentialsRepo {
        async fn upsert(&self, user_id: &str, access_token: &str, refresh_token: &str) -> Result<CredentialRecord, Error>;
        async fn get(&self, user_id: &str) -> Result<Option<CredentialRecord>, Error>;
        async fn list_all(&self) -> Result<Vec<CredentialRecord>, Error>;
    }
}

fn authenticator(transport: FakeTransport, repo: MockCredentialsRepo) -> (SessionAuthenticator, Arc<FakeTransport>) {
    let transport = Arc::new(transport);
    let subs = Arc::new(SubscriptionManager::new(transport.clone()));
    (SessionAuthenticator::new(transport.clone(), Arc::new(repo), subs), transport)
}

#[tokio::test]
async fn storage_error_on_authorize_propagates_and_skips_subscription() {
    let mut repo = MockCredentialsRepo::new();
    repo.expect_upsert()
        .with(eq("111"), eq("A1"), eq("R1"))
        .times(1)
        .returning(|_, _, _| Err(Error::Storage("disk full".into())));

    let (auth, transport) = authenticator(FakeTransport::new(BOT).with_user("A1", "111"), repo);
    let err = assert_err!(
        auth.on_authorized(&AuthorizationEvent::new(Some("111".into()), "A1", "R1"))
            .await
    );

    assert!(err.is_storage());
    assert!(transport.subscribe_calls().is_empty());
}

#[tokio::test]
async fn storage_error_while_restoring_a_refreshed_token_propagates() {
    let mut repo = MockCredentialsRepo::new();
    repo.expect_upsert()
        .times(1)
        .returning(|_, _, _| Err(Error::Storage("read-only filesystem".into())));

    let (auth, _transport) = authenticator(
        FakeTransport::new(BOT)
            .with_user("fresh", "222")
            .with_refresh("r-stale", "fresh", "r-fresh"),
        repo,
    );

    let err = assert_err!(
        auth.restore(&[CredentialRecord::new("222", "stale", "r-stale")])
            .await
    );
    assert!(err.is_storage());
}

#[tokio::test]
async fn refreshed_token_write_failure_is_reported() {
    let mut repo = MockCredentialsRepo::new();
    repo.expect_upsert()
        .with(eq(BOT), eq("n1"), eq("n2"))
        .returning(|_, _, _| Err(Error::Storage("locked".into())));

    let (auth, _transport) = authenticator(FakeTransport::new(BOT), repo);
    let err = auth
        .on_token_refreshed(&CredentialRecord::new(BOT, "n1", "n2"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Storage(ref r) if r == "locked"));
}

#[tokio::test]
async fn invalid_token_never_reaches_storage() {
    let mut repo = MockCredentialsRepo::new();
    repo.expect_upsert().never();

    let (auth, _transport) = authenticator(FakeTransport::new(BOT), repo);
    let err = auth
        .on_authorized(&AuthorizationEvent::new(Some("111".into()), "forged", "R"))
        .await
        .unwrap_err();
    assert!(err.is_validation());
}
