//! src/repositories/sqlite/credentials.rs
use async_trait::async_trait;
use sqlx::{Pool, Sqlite};
use tracing::debug;
use crate::Error;
use porygonbot_common::models::CredentialRecord;
use porygonbot_common::traits::CredentialsRepository;

/// Internal row type for sqlx mapping of the `tokens` table.
#[derive(sqlx::FromRow)]
struct TokenRow {
    user_id: String,
    token: String,
    refresh: String,
}

impl From<TokenRow> for CredentialRecord {
    fn from(r: TokenRow) -> Self {
        CredentialRecord {
            user_id: r.user_id,
            access_token: r.token,
            refresh_token: r.refresh,
        }
    }
}

#[derive(Clone)]
pub struct SqliteCredentialsRepository {
    pool: Pool<Sqlite>,
}

impl SqliteCredentialsRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialsRepository for SqliteCredentialsRepository {
    async fn upsert(
        &self,
        user_id: &str,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<CredentialRecord, Error> {
        // A single statement, so readers never see a half-written pair.
        let row = sqlx::query_as::<_, TokenRow>(
            r#"
            INSERT INTO tokens (user_id, token, refresh)
            VALUES (?, ?, ?)
            ON CONFLICT (user_id) DO UPDATE SET
                token = excluded.token,
                refresh = excluded.refresh
            RETURNING user_id, token, refresh
            "#,
        )
            .bind(user_id)
            .bind(access_token)
            .bind(refresh_token)
            .fetch_one(&self.pool)
            .await?;

        debug!("Upserted token row for user_id={}", user_id);
        Ok(row.into())
    }

    async fn get(&self, user_id: &str) -> Result<Option<CredentialRecord>, Error> {
        let row = sqlx::query_as::<_, TokenRow>(
            "SELECT user_id, token, refresh FROM tokens WHERE user_id = ?",
        )
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn list_all(&self) -> Result<Vec<CredentialRecord>, Error> {
        let rows = sqlx::query_as::<_, TokenRow>(
            "SELECT user_id, token, refresh FROM tokens ORDER BY user_id",
        )
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::db::Database;

    async fn repo() -> SqliteCredentialsRepository {
        let db = Database::in_memory().await.unwrap();
        db.migrate().await.unwrap();
        SqliteCredentialsRepository::new(db.pool().clone())
    }

    async fn row_count(repo: &SqliteCredentialsRepository, user_id: &str) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM tokens WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&repo.pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn upsert_then_get() {
        let repo = repo().await;
        let rec = repo.upsert("111", "t1", "r1").await.unwrap();
        assert_eq!(rec, CredentialRecord::new("111", "t1", "r1"));

        let got = repo.get("111").await.unwrap().unwrap();
        assert_eq!(got.access_token, "t1");
        assert_eq!(got.refresh_token, "r1");
        assert!(repo.get("999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn second_upsert_overwrites_in_place() {
        let repo = repo().await;
        repo.upsert("111", "t1", "r1").await.unwrap();
        let rec = repo.upsert("111", "t2", "r2").await.unwrap();

        assert_eq!(rec, CredentialRecord::new("111", "t2", "r2"));
        assert_eq!(row_count(&repo, "111").await, 1);
        assert_eq!(repo.list_all().await.unwrap(), vec![rec]);
    }

    #[tokio::test]
    async fn repeated_identical_upserts_are_idempotent() {
        let repo = repo().await;
        for _ in 0..5 {
            repo.upsert("111", "same", "same-r").await.unwrap();
        }
        assert_eq!(row_count(&repo, "111").await, 1);
    }

    #[tokio::test]
    async fn concurrent_upserts_leave_one_row_per_user() {
        let repo = Arc::new(repo().await);
        let mut handles = Vec::new();
        for i in 0..20 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                let uid = format!("user{}", i % 4);
                repo.upsert(&uid, &format!("t{i}"), &format!("r{i}")).await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        let all = repo.list_all().await.unwrap();
        assert_eq!(all.len(), 4);
        for rec in all {
            assert_eq!(row_count(&repo, &rec.user_id).await, 1);
            // access and refresh always come from the same write
            assert_eq!(rec.access_token[1..], rec.refresh_token[1..]);
        }
    }

    #[tokio::test]
    async fn closed_pool_surfaces_storage_error() {
        let repo = repo().await;
        repo.pool.close().await;
        let err = repo.upsert("111", "t", "r").await.unwrap_err();
        assert!(err.is_storage(), "expected storage error, got {err:?}");
    }
}
