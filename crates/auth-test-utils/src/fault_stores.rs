//! Fault-injecting credential stores
//!
//! `FaultyStore` wraps an in-memory store and fails selected operations on
//! demand, so tests can simulate an unreachable or stalled backend.

use async_trait::async_trait;
use auth_service::models::RefreshRecord;
use auth_service::repositories::{CredentialStore, InMemoryCredentialStore, StoreError};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Which store operation a fault applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Save,
    Get,
    Replace,
    Ping,
}

/// In-memory store with switchable failures and an optional delay.
///
/// # Example
/// ```rust,ignore
/// let store = Arc::new(FaultyStore::new());
/// store.fail(StoreOp::Replace, true);
/// // rotate now fails with Persistence and the old secret stays valid
/// store.fail(StoreOp::Replace, false);
/// store.set_replace_ack_delay(Duration::from_secs(2));
/// // rotate commits immediately but returns two seconds later
/// ```
#[derive(Debug, Default)]
pub struct FaultyStore {
    inner: InMemoryCredentialStore,
    fail_save: AtomicBool,
    fail_get: AtomicBool,
    fail_replace: AtomicBool,
    fail_ping: AtomicBool,
    delay_ms: AtomicU64,
    replace_ack_delay_ms: AtomicU64,
    replace_calls: AtomicUsize,
    save_calls: AtomicUsize,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Turn failures for `op` on or off.
    pub fn fail(&self, op: StoreOp, enabled: bool) {
        self.flag(op).store(enabled, Ordering::SeqCst);
    }

    /// Delay every operation by `delay` before it runs.
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Delay the acknowledgement of a replacement that has already been
    /// applied, like a database that commits and then answers slowly.
    pub fn set_replace_ack_delay(&self, delay: Duration) {
        self.replace_ack_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    pub fn replace_calls(&self) -> usize {
        self.replace_calls.load(Ordering::SeqCst)
    }

    /// Direct access to the wrapped store, bypassing faults.
    pub fn inner(&self) -> &InMemoryCredentialStore {
        &self.inner
    }

    fn flag(&self, op: StoreOp) -> &AtomicBool {
        match op {
            StoreOp::Save => &self.fail_save,
            StoreOp::Get => &self.fail_get,
            StoreOp::Replace => &self.fail_replace,
            StoreOp::Ping => &self.fail_ping,
        }
    }

    async fn before(&self, op: StoreOp) -> Result<(), StoreError> {
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if self.flag(op).load(Ordering::SeqCst) {
            return Err(StoreError::Backend(format!("injected {:?} failure", op)));
        }
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for FaultyStore {
    async fn save_refresh_hash(&self, record: &RefreshRecord) -> Result<(), StoreError> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        self.before(StoreOp::Save).await?;
        self.inner.save_refresh_hash(record).await
    }

    async fn get_refresh_hash(&self, user_id: &str) -> Result<RefreshRecord, StoreError> {
        self.before(StoreOp::Get).await?;
        self.inner.get_refresh_hash(user_id).await
    }

    async fn replace_refresh_hash(
        &self,
        expected_hash: &str,
        record: &RefreshRecord,
    ) -> Result<bool, StoreError> {
        self.replace_calls.fetch_add(1, Ordering::SeqCst);
        self.before(StoreOp::Replace).await?;
        let replaced = self.inner.replace_refresh_hash(expected_hash, record).await;

        let ack_delay = self.replace_ack_delay_ms.load(Ordering::SeqCst);
        if ack_delay > 0 {
            tokio::time::sleep(Duration::from_millis(ack_delay)).await;
        }
        replaced
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.before(StoreOp::Ping).await
    }
}
