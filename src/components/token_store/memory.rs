use super::{CredentialRecord, TokenSnapshot, TokenStore};
use crate::error::McpResult;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

/// In-process token store, for tests and throwaway runs
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenStore {
    data: Arc<Mutex<TokenSnapshot>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with one user's record
    pub fn with_record(user_id: &str, record: CredentialRecord) -> Self {
        let mut tokens = TokenSnapshot::new();
        tokens.insert(user_id.to_string(), record);
        Self {
            data: Arc::new(Mutex::new(tokens)),
        }
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn load(&self) -> McpResult<TokenSnapshot> {
        Ok(self.data.lock().await.clone())
    }

    async fn save(&self, tokens: &TokenSnapshot) -> McpResult<()> {
        *self.data.lock().await = tokens.clone();
        Ok(())
    }

    async fn upsert(&self, user_id: &str, record: CredentialRecord) -> McpResult<()> {
        self.data.lock().await.insert(user_id.to_string(), record);
        Ok(())
    }
}
