use crate::models::RefreshRecord;
use crate::observability::metrics::record_store_operation;
use crate::repositories::{CredentialStore, StoreError};
use async_trait::async_trait;
use sqlx::PgPool;

/// PostgreSQL-backed credential store (`refresh_credentials` table).
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn backend_error(context: &str, err: sqlx::Error) -> StoreError {
    tracing::warn!(target: "auth.store", error = %err, "{}", context);
    StoreError::Backend(format!("{}: {}", context, err))
}

fn status_of<T, E>(result: &Result<T, E>) -> &'static str {
    if result.is_ok() {
        "success"
    } else {
        "error"
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn save_refresh_hash(&self, record: &RefreshRecord) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO refresh_credentials (user_id, refresh_hash, created_at, expires_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE
            SET refresh_hash = EXCLUDED.refresh_hash,
                created_at = EXCLUDED.created_at,
                expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(&record.user_id)
        .bind(&record.refresh_hash)
        .bind(record.created_at)
        .bind(record.expires_at)
        .execute(&self.pool)
        .await;

        record_store_operation("save", status_of(&result));

        result
            .map(|_| ())
            .map_err(|e| backend_error("Failed to save refresh credential", e))
    }

    async fn get_refresh_hash(&self, user_id: &str) -> Result<RefreshRecord, StoreError> {
        let result = sqlx::query_as::<_, RefreshRecord>(
            r#"
            SELECT user_id, refresh_hash, created_at, expires_at
            FROM refresh_credentials
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await;

        record_store_operation("get", status_of(&result));

        result
            .map_err(|e| backend_error("Failed to fetch refresh credential", e))?
            .ok_or(StoreError::NotFound)
    }

    async fn replace_refresh_hash(
        &self,
        expected_hash: &str,
        record: &RefreshRecord,
    ) -> Result<bool, StoreError> {
        // The WHERE clause on the old hash makes this a compare-and-swap:
        // a concurrent rotation that already replaced it matches zero rows.
        let result = sqlx::query(
            r#"
            UPDATE refresh_credentials
            SET refresh_hash = $3, created_at = $4, expires_at = $5
            WHERE user_id = $1 AND refresh_hash = $2
            "#,
        )
        .bind(&record.user_id)
        .bind(expected_hash)
        .bind(&record.refresh_hash)
        .bind(record.created_at)
        .bind(record.expires_at)
        .execute(&self.pool)
        .await;

        let outcome = result
            .map(|done| done.rows_affected() == 1)
            .map_err(|e| backend_error("Failed to replace refresh credential", e));

        let status = match &outcome {
            Ok(true) => "success",
            Ok(false) => "conflict",
            Err(_) => "error",
        };
        record_store_operation("replace", status);

        outcome
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let result = sqlx::query("SELECT 1").execute(&self.pool).await;
        record_store_operation("ping", status_of(&result));
        result
            .map(|_| ())
            .map_err(|e| backend_error("Database ping failed", e))
    }
}
