use async_trait::async_trait;
use crate::error::Error;
use crate::models::CredentialRecord;

/// Durable `user_id -> token pair` store.
///
/// `upsert` must be atomic and idempotent: repeated or concurrent writes for
/// one `user_id` converge on the last pair written, never a second row.
#[async_trait]
pub trait CredentialsRepository: Send + Sync {
    async fn upsert(
        &self,
        user_id: &str,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<CredentialRecord, Error>;

    /// Returns the record for `user_id`, or `None`.
    async fn get(&self, user_id: &str) -> Result<Option<CredentialRecord>, Error>;

    /// A consistent snapshot of every stored record.
    async fn list_all(&self) -> Result<Vec<CredentialRecord>, Error>;
}
