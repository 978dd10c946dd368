use super::{CredentialRecord, TokenSnapshot, TokenStore};
use crate::error::{token_store_error, McpResult};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client as RedisClient};
use std::collections::HashMap;
use tracing::debug;

// Redis key constants
pub mod keys {
    pub const GOOGLE_CALENDAR_TOKENS: &str = "google_calendar_tokens";
}

/// Token store backed by a Redis hash, one field per user
#[derive(Debug, Clone)]
pub struct RedisTokenStore {
    client: RedisClient,
}

impl RedisTokenStore {
    pub fn new(redis_url: &str) -> McpResult<Self> {
        let client = RedisClient::open(redis_url)
            .map_err(|e| token_store_error(&format!("Failed to create Redis client: {}", e)))?;
        Ok(Self { client })
    }

    /// Get a redis connection
    async fn connection(&self) -> McpResult<MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| token_store_error(&format!("Failed to connect to Redis: {}", e)))
    }
}

/// Decode the raw hash into records; a bad field fails the whole load
fn decode_fields(fields: HashMap<String, String>) -> McpResult<TokenSnapshot> {
    fields
        .into_iter()
        .map(|(user_id, json)| {
            let record: CredentialRecord = serde_json::from_str(&json).map_err(|e| {
                token_store_error(&format!("Failed to parse token for '{}': {}", user_id, e))
            })?;
            Ok((user_id, record))
        })
        .collect()
}

fn encode_fields(tokens: &TokenSnapshot) -> McpResult<Vec<(String, String)>> {
    tokens
        .iter()
        .map(|(user_id, record)| Ok((user_id.clone(), serde_json::to_string(record)?)))
        .collect()
}

#[async_trait]
impl TokenStore for RedisTokenStore {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn load(&self) -> McpResult<TokenSnapshot> {
        let mut conn = self.connection().await?;
        let fields: HashMap<String, String> = conn
            .hgetall(keys::GOOGLE_CALENDAR_TOKENS)
            .await
            .map_err(|e| token_store_error(&format!("Failed to read tokens from Redis: {}", e)))?;
        decode_fields(fields)
    }

    async fn save(&self, tokens: &TokenSnapshot) -> McpResult<()> {
        if tokens.is_empty() {
            return Ok(());
        }
        let fields = encode_fields(tokens)?;

        // A single HSET is atomic and leaves fields it does not name untouched
        let mut conn = self.connection().await?;
        () = conn
            .hset_multiple(keys::GOOGLE_CALENDAR_TOKENS, fields.as_slice())
            .await
            .map_err(|e| token_store_error(&format!("Failed to save tokens to Redis: {}", e)))?;

        debug!("Saved {} credential records to Redis", fields.len());
        Ok(())
    }

    async fn upsert(&self, user_id: &str, record: CredentialRecord) -> McpResult<()> {
        let json = serde_json::to_string(&record)?;
        let mut conn = self.connection().await?;
        () = conn
            .hset(keys::GOOGLE_CALENDAR_TOKENS, user_id, json)
            .await
            .map_err(|e| token_store_error(&format!("Failed to save token to Redis: {}", e)))?;
        Ok(())
    }
}
