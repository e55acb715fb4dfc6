//! Concurrent rotation tests
//!
//! Several clients presenting the same refresh secret at once must produce
//! exactly one new pair.

use auth_service::errors::TokenError;
use auth_service::services::TokenService;
use auth_test_utils::*;
use common::secret::{ExposeSecret, SecretString};
use std::collections::BTreeMap;
use std::sync::Arc;

const CONCURRENT_CLIENTS: usize = 8;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_rotation_has_single_winner() -> Result<(), anyhow::Error> {
    let service: Arc<TokenService> = Arc::new(TestConfigBuilder::hmac().build_service_in_memory()?);
    let pair = service.issue(TEST_USER_ALICE, &BTreeMap::new()).await?;

    let mut handles = Vec::with_capacity(CONCURRENT_CLIENTS);
    for _ in 0..CONCURRENT_CLIENTS {
        let service = Arc::clone(&service);
        let access_token = pair.access_token.clone();
        let refresh_token = SecretString::from(pair.refresh_token.expose_secret().to_owned());
        handles.push(tokio::spawn(async move {
            service.rotate(&access_token, &refresh_token).await
        }));
    }

    let mut winners = Vec::new();
    let mut losers = 0;
    for handle in handles {
        match handle.await? {
            Ok(new_pair) => winners.push(new_pair),
            Err(TokenError::InvalidRefreshToken) => losers += 1,
            Err(other) => return Err(other.into()),
        }
    }

    assert_eq!(winners.len(), 1, "Exactly one rotation must succeed");
    assert_eq!(losers, CONCURRENT_CLIENTS - 1);

    // The winner's pair is the live one
    let winner = winners.remove(0);
    service
        .rotate(&winner.access_token, &winner.refresh_token)
        .await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_rotation_across_users_is_independent() -> Result<(), anyhow::Error> {
    let service: Arc<TokenService> = Arc::new(TestConfigBuilder::hmac().build_service_in_memory()?);

    let mut handles = Vec::new();
    for user in [TEST_USER_ALICE, TEST_USER_BOB, TEST_USER_CHARLIE] {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            let pair = service.issue(user, &BTreeMap::new()).await?;
            service.rotate(&pair.access_token, &pair.refresh_token).await
        }));
    }

    for result in futures::future::join_all(handles).await {
        result??;
    }
    Ok(())
}
