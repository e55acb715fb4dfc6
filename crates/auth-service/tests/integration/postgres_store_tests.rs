//! PostgreSQL credential store tests
//!
//! Each test gets an isolated database from `#[sqlx::test]`. They need a
//! reachable server in `DATABASE_URL`, so they are ignored by default:
//!
//! ```sh
//! DATABASE_URL=postgresql://localhost/tokens cargo test -p auth-service -- --ignored
//! ```

use auth_service::errors::TokenError;
use auth_service::models::RefreshRecord;
use auth_service::repositories::{CredentialStore, PgCredentialStore, StoreError};
use auth_test_utils::*;
use chrono::{Duration, Utc};
use sqlx::PgPool;
use std::collections::BTreeMap;
use std::sync::Arc;

fn record(user_id: &str, hash: &str) -> RefreshRecord {
    let now = Utc::now();
    RefreshRecord {
        user_id: user_id.to_string(),
        refresh_hash: hash.to_string(),
        created_at: now,
        expires_at: now + Duration::days(30),
    }
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_save_and_get(pool: PgPool) -> Result<(), anyhow::Error> {
    let store = PgCredentialStore::new(pool);

    store.save_refresh_hash(&record(TEST_USER_ALICE, "h1")).await?;
    let found = store.get_refresh_hash(TEST_USER_ALICE).await?;
    assert_eq!(found.refresh_hash, "h1");

    // Upsert overwrites
    store.save_refresh_hash(&record(TEST_USER_ALICE, "h2")).await?;
    let found = store.get_refresh_hash(TEST_USER_ALICE).await?;
    assert_eq!(found.refresh_hash, "h2");

    let missing = store.get_refresh_hash(TEST_USER_BOB).await;
    assert!(matches!(missing, Err(StoreError::NotFound)));
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_replace_is_conditional(pool: PgPool) -> Result<(), anyhow::Error> {
    let store = PgCredentialStore::new(pool);
    store.save_refresh_hash(&record(TEST_USER_ALICE, "h1")).await?;

    assert!(
        !store
            .replace_refresh_hash("stale", &record(TEST_USER_ALICE, "h2"))
            .await?
    );
    assert!(
        store
            .replace_refresh_hash("h1", &record(TEST_USER_ALICE, "h2"))
            .await?
    );
    assert!(
        !store
            .replace_refresh_hash("h1", &record(TEST_USER_ALICE, "h3"))
            .await?
    );

    // Replace never creates a record
    assert!(
        !store
            .replace_refresh_hash("h1", &record(TEST_USER_BOB, "h1"))
            .await?
    );

    assert_eq!(
        store.get_refresh_hash(TEST_USER_ALICE).await?.refresh_hash,
        "h2"
    );
    store.ping().await?;
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_rotation_over_postgres(pool: PgPool) -> Result<(), anyhow::Error> {
    let store = Arc::new(PgCredentialStore::new(pool.clone()));
    let service = TestConfigBuilder::ed25519().build_service(store)?;

    let first = service.issue(TEST_USER_U1, &BTreeMap::new()).await?;
    let second = service
        .rotate(&first.access_token, &first.refresh_token)
        .await?;

    let replay = service
        .rotate(&first.access_token, &first.refresh_token)
        .await;
    assert!(matches!(replay, Err(TokenError::InvalidRefreshToken)));

    service
        .rotate(&second.access_token, &second.refresh_token)
        .await?;

    // One row per user, holding a hash rather than the secret
    let (count, hash): (i64, String) = sqlx::query_as(
        "SELECT COUNT(*) OVER (), refresh_hash FROM refresh_credentials WHERE user_id = $1",
    )
    .bind(TEST_USER_U1)
    .fetch_one(&pool)
    .await?;
    assert_eq!(count, 1);
    assert!(hash.starts_with("$2"));
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_closed_pool_maps_to_persistence(pool: PgPool) -> Result<(), anyhow::Error> {
    let store = Arc::new(PgCredentialStore::new(pool.clone()));
    let service = TestConfigBuilder::hmac().build_service(store.clone())?;

    pool.close().await;

    assert!(matches!(
        store.ping().await,
        Err(StoreError::Backend(_))
    ));
    let result = service.issue(TEST_USER_ALICE, &BTreeMap::new()).await;
    assert!(matches!(result, Err(TokenError::Persistence(_))));
    Ok(())
}
