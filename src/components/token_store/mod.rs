mod file;
mod memory;
mod redis_store;

pub use self::file::FileTokenStore;
pub use self::memory::MemoryTokenStore;
pub use self::redis_store::RedisTokenStore;

use crate::config::TokenBackend;
use crate::error::McpResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// OAuth token pair stored for one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    #[serde(alias = "token")]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl CredentialRecord {
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
        }
    }

    /// Combine a freshly granted token pair with what was on file.
    /// A refresh token, once known, is never replaced by an absent one.
    pub fn merged_with(self, previous: Option<&CredentialRecord>) -> Self {
        let refresh_token = self
            .refresh_token
            .or_else(|| previous.and_then(|p| p.refresh_token.clone()));
        Self {
            access_token: self.access_token,
            refresh_token,
        }
    }
}

/// Everything persisted: user id -> credentials
pub type TokenSnapshot = HashMap<String, CredentialRecord>;

/// Persistence for credential records
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Name of the backend, for logging
    fn name(&self) -> &'static str;

    /// Read the full snapshot
    async fn load(&self) -> McpResult<TokenSnapshot>;

    /// Persist the full snapshot
    async fn save(&self, tokens: &TokenSnapshot) -> McpResult<()>;

    /// Insert or replace one user's record
    async fn upsert(&self, user_id: &str, record: CredentialRecord) -> McpResult<()> {
        let mut tokens = self.load().await?;
        tokens.insert(user_id.to_string(), record);
        self.save(&tokens).await
    }
}

/// Build the store selected by configuration
pub fn from_backend(backend: &TokenBackend) -> McpResult<Arc<dyn TokenStore>> {
    let store: Arc<dyn TokenStore> = match backend {
        TokenBackend::Redis(url) => Arc::new(RedisTokenStore::new(url)?),
        TokenBackend::File(path) => Arc::new(FileTokenStore::new(path.clone())),
    };
    info!("Using {} token store", store.name());
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keeps_previous_refresh_token() {
        let previous = CredentialRecord::new("a1", Some("r1".to_string()));
        let granted = CredentialRecord::new("a2", None);

        let merged = granted.merged_with(Some(&previous));
        assert_eq!(merged, CredentialRecord::new("a2", Some("r1".to_string())));
    }

    #[test]
    fn test_merge_prefers_new_refresh_token() {
        let previous = CredentialRecord::new("a1", Some("r1".to_string()));
        let granted = CredentialRecord::new("a2", Some("r2".to_string()));

        let merged = granted.merged_with(Some(&previous));
        assert_eq!(merged.refresh_token.as_deref(), Some("r2"));
    }

    #[test]
    fn test_merge_without_history() {
        let merged = CredentialRecord::new("a1", None).merged_with(None);
        assert_eq!(merged, CredentialRecord::new("a1", None));
    }

    #[test]
    fn test_record_accepts_legacy_token_key() {
        let record: CredentialRecord =
            serde_json::from_str(r#"{"token": "a1", "refresh_token": null}"#).unwrap();
        assert_eq!(record, CredentialRecord::new("a1", None));

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json, serde_json::json!({"access_token": "a1", "refresh_token": null}));
    }
}
