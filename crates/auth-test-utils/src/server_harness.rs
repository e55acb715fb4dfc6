//! Test server harness for E2E testing
//!
//! Provides TestAuthServer for spawning real token service instances in tests.

use crate::config_builder::TestConfigBuilder;
use auth_service::models::TokenResponse;
use auth_service::observability::metrics::{build_prometheus, init_metrics_recorder};
use auth_service::repositories::{CredentialStore, InMemoryCredentialStore};
use auth_service::routes::{self, AppState};
use auth_service::services::TokenService;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Deadline used by test servers unless overridden.
pub const TEST_REQUEST_DEADLINE: Duration = Duration::from_secs(5);

/// Test harness for spawning the token service in E2E tests
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_issue_e2e() -> Result<()> {
///     let server = TestAuthServer::spawn().await?;
///     let response = reqwest::Client::new()
///         .post(format!("{}/api/v1/token", server.url()))
///         .json(&serde_json::json!({"user_id": "alice"}))
///         .send()
///         .await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestAuthServer {
    addr: SocketAddr,
    state: Arc<AppState>,
    handle: JoinHandle<()>,
}

impl TestAuthServer {
    /// Spawn with HS256 keys over a fresh in-memory store
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with(
            TestConfigBuilder::hmac(),
            Arc::new(InMemoryCredentialStore::new()),
            TEST_REQUEST_DEADLINE,
        )
        .await
    }

    /// Spawn with explicit configuration, store and request deadline
    ///
    /// The server binds to a random available port (127.0.0.1:0) and runs in
    /// the background until the harness is dropped.
    pub async fn spawn_with(
        config: TestConfigBuilder,
        store: Arc<dyn CredentialStore>,
        request_deadline: Duration,
    ) -> Result<Self, anyhow::Error> {
        let token_service = TokenService::new(&config.build()?, store)?;

        let state = Arc::new(AppState {
            token_service,
            request_deadline,
        });

        // The global recorder can only be installed once per process; later
        // servers get a standalone handle.
        let metrics_handle = match init_metrics_recorder() {
            Ok(handle) => handle,
            Err(_) => build_prometheus()
                .map_err(|e| anyhow::anyhow!("Failed to build metrics recorder: {}", e))?
                .build_recorder()
                .handle(),
        };

        let app = routes::build_routes(Arc::clone(&state), metrics_handle);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            state,
            handle,
        })
    }

    /// Get the base URL of the test server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get the token service backing this server
    pub fn token_service(&self) -> &TokenService {
        &self.state.token_service
    }

    /// Issue a pair for `user_id` over HTTP
    ///
    /// # Example
    /// ```rust,ignore
    /// let tokens = server.issue_tokens("alice").await?;
    /// ```
    pub async fn issue_tokens(&self, user_id: &str) -> Result<TokenResponse, anyhow::Error> {
        let response = reqwest::Client::new()
            .post(format!("{}/api/v1/token", self.url()))
            .json(&serde_json::json!({ "user_id": user_id }))
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("Issue failed with status {}", response.status());
        }

        Ok(response.json::<TokenResponse>().await?)
    }

    /// Send a JSON rotation request over HTTP
    pub async fn refresh(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<reqwest::Response, anyhow::Error> {
        Ok(reqwest::Client::new()
            .post(format!("{}/api/v1/token/refresh", self.url()))
            .bearer_auth(access_token)
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await?)
    }
}

impl Drop for TestAuthServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
