use super::{CredentialRecord, TokenSnapshot, TokenStore};
use crate::error::{token_store_error, McpResult};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

/// Token store backed by a JSON file.
///
/// Writes go to a temporary sibling file which is then renamed over the
/// target, so readers only ever see a complete snapshot.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    async fn read_snapshot(&self) -> McpResult<TokenSnapshot> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(TokenSnapshot::new()),
            Err(e) => {
                return Err(token_store_error(&format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        if content.trim().is_empty() {
            return Ok(TokenSnapshot::new());
        }

        serde_json::from_str(&content).map_err(|e| {
            token_store_error(&format!("Failed to parse {}: {}", self.path.display(), e))
        })
    }

    async fn write_snapshot(&self, tokens: &TokenSnapshot) -> McpResult<()> {
        let json = serde_json::to_string_pretty(tokens)?;

        let file_name = self
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("tokens.json");
        let tmp_path = self
            .path
            .with_file_name(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));

        if let Err(e) = fs::write(&tmp_path, json).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(token_store_error(&format!(
                "Failed to write {}: {}",
                tmp_path.display(),
                e
            )));
        }

        if let Err(e) = fs::rename(&tmp_path, &self.path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(token_store_error(&format!(
                "Failed to replace {}: {}",
                self.path.display(),
                e
            )));
        }

        debug!("Saved {} credential records to {}", tokens.len(), self.path.display());
        Ok(())
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn load(&self) -> McpResult<TokenSnapshot> {
        self.read_snapshot().await
    }

    async fn save(&self, tokens: &TokenSnapshot) -> McpResult<()> {
        let _guard = self.write_lock.lock().await;
        self.write_snapshot(tokens).await
    }

    async fn upsert(&self, user_id: &str, record: CredentialRecord) -> McpResult<()> {
        // Held across read and write so concurrent upserts for other users survive
        let _guard = self.write_lock.lock().await;
        let mut tokens = self.read_snapshot().await?;
        tokens.insert(user_id.to_string(), record);
        self.write_snapshot(&tokens).await
    }
}
