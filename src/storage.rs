use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::app::ports::KeyValuePort;
use crate::config::StoreConfig;
use crate::constants::CREDENTIAL_KEY_PREFIX;
use crate::error::Result;
use crate::infra::RestKeyValueAdapter;
use crate::observability::metrics;

/// Store key holding the seller credential of one user
pub fn credential_key(user_id: i64) -> String {
    format!("{}{}", CREDENTIAL_KEY_PREFIX, user_id)
}

/// In-process key/value map. Lives as long as the owning store.
#[derive(Default)]
pub struct InMemoryKeyValue {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemoryKeyValue {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValuePort for InMemoryKeyValue {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.entries.write().await.remove(key).is_some())
    }
}

/// Credential persistence that prefers a remote backend and degrades to an
/// in-process map whenever the remote fails. Never returns an error.
///
/// Build one per process and share it behind an `Arc`.
pub struct CredentialStore {
    remote: Option<Arc<dyn KeyValuePort>>,
    fallback: InMemoryKeyValue,
}

impl CredentialStore {
    pub fn new(remote: Option<Arc<dyn KeyValuePort>>) -> Self {
        Self {
            remote,
            fallback: InMemoryKeyValue::new(),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(None)
    }

    /// Remote backend when both REST settings are present, otherwise memory only.
    pub fn from_config(config: &StoreConfig, timeout: Duration) -> Result<Self> {
        let remote = match config.remote() {
            Some((url, token)) => {
                debug!(url, "Using remote credential store");
                let adapter = RestKeyValueAdapter::new(url, token, timeout)?;
                Some(Arc::new(adapter) as Arc<dyn KeyValuePort>)
            }
            None => {
                debug!("Remote store not configured, credentials kept in memory");
                None
            }
        };
        Ok(Self::new(remote))
    }

    pub fn is_remote(&self) -> bool {
        self.remote.is_some()
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        if let Some(remote) = &self.remote {
            match remote.get(key).await {
                Ok(value) => return value,
                Err(e) => self.degraded("get", &e),
            }
        }
        self.fallback.get(key).await.ok().flatten()
    }

    /// Returns `false` when the value only reached the in-process map.
    pub async fn set(&self, key: &str, value: &str) -> bool {
        if let Some(remote) = &self.remote {
            match remote.set(key, value).await {
                Ok(()) => return true,
                Err(e) => self.degraded("set", &e),
            }
        }
        // Memory write cannot fail
        let _ = self.fallback.set(key, value).await;
        self.remote.is_none()
    }

    pub async fn delete(&self, key: &str) -> bool {
        if let Some(remote) = &self.remote {
            match remote.delete(key).await {
                Ok(removed) => {
                    // Also drop anything a failed earlier write left in memory
                    let _ = self.fallback.delete(key).await;
                    return removed;
                }
                Err(e) => self.degraded("delete", &e),
            }
        }
        self.fallback.delete(key).await.unwrap_or(false)
    }

    fn degraded(&self, operation: &'static str, error: &crate::error::SellerError) {
        warn!(operation, error = %error, "Remote credential store failed, using in-process map");
        metrics::store::fallback_used(operation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_key() {
        assert_eq!(credential_key(42), "wb_token:42");
    }

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = CredentialStore::in_memory();
        assert!(!store.is_remote());
        assert_eq!(store.get("k").await, None);
        assert!(store.set("k", "v1").await);
        assert!(store.set("k", "v2").await);
        assert_eq!(store.get("k").await.as_deref(), Some("v2"));
        assert!(store.delete("k").await);
        assert!(!store.delete("k").await);
        assert_eq!(store.get("k").await, None);
    }

    #[test]
    fn test_from_config_without_remote() {
        let store = CredentialStore::from_config(&StoreConfig::default(), Duration::from_secs(1)).unwrap();
        assert!(!store.is_remote());
    }
}
