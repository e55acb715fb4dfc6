use crate::models::RefreshRecord;
use crate::observability::metrics::record_store_operation;
use crate::repositories::{CredentialStore, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Process-local credential store.
///
/// Every operation holds one lock for its whole read-check-write, which gives
/// the per-user atomicity `replace_refresh_hash` requires. Records do not
/// survive a restart.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    records: Mutex<HashMap<String, RefreshRecord>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of users with a stored credential.
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn save_refresh_hash(&self, record: &RefreshRecord) -> Result<(), StoreError> {
        self.records
            .lock()
            .await
            .insert(record.user_id.clone(), record.clone());
        record_store_operation("save", "success");
        Ok(())
    }

    async fn get_refresh_hash(&self, user_id: &str) -> Result<RefreshRecord, StoreError> {
        let found = self.records.lock().await.get(user_id).cloned();
        record_store_operation("get", "success");
        found.ok_or(StoreError::NotFound)
    }

    async fn replace_refresh_hash(
        &self,
        expected_hash: &str,
        record: &RefreshRecord,
    ) -> Result<bool, StoreError> {
        let mut records = self.records.lock().await;

        match records.get_mut(&record.user_id) {
            Some(current) if current.refresh_hash == expected_hash => {
                *current = record.clone();
                record_store_operation("replace", "success");
                Ok(true)
            }
            _ => {
                record_store_operation("replace", "conflict");
                Ok(false)
            }
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
