use super::handle::CalendarHandle;
use super::models::Authorized;
use crate::components::token_store::{CredentialRecord, TokenStore};
use crate::config::{Config, CALENDAR_SCOPE, DEFAULT_USER_ID};
use crate::error::{oauth_error, transport_error, McpResult};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};
use url::Url;

/// Token endpoint response for both code exchange and refresh
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// One async mutex per user id, serializing load-mutate-save on that user's record
#[derive(Debug, Clone, Default)]
pub struct UserLocks {
    inner: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl UserLocks {
    pub async fn lock(&self, user_id: &str) -> OwnedMutexGuard<()> {
        let user_lock = {
            let mut locks = self.inner.lock().await;
            Arc::clone(locks.entry(user_id.to_string()).or_default())
        };
        user_lock.lock_owned().await
    }
}

/// Owns the OAuth flow and every read or write of stored credentials
#[derive(Clone)]
pub struct TokenManager {
    config: Arc<Config>,
    store: Arc<dyn TokenStore>,
    client: Client,
    locks: UserLocks,
}

impl TokenManager {
    pub fn new(config: Arc<Config>, store: Arc<dyn TokenStore>, client: Client) -> Self {
        Self {
            config,
            store,
            client,
            locks: UserLocks::default(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }

    /// Google consent page for `user_id`. The user id rides along in `state`
    /// so the callback can recover it without a server-side session.
    pub fn build_authorization_url(&self, user_id: &str) -> McpResult<Url> {
        let redirect_uri = self.config.redirect_uri();
        Url::parse_with_params(
            &self.config.google_auth_uri,
            &[
                ("response_type", "code"),
                ("client_id", self.config.google_client_id.as_str()),
                ("redirect_uri", redirect_uri.as_str()),
                ("scope", CALENDAR_SCOPE),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("state", user_id),
            ],
        )
        .map_err(|e| oauth_error(&format!("Failed to build authorization URL: {}", e)))
    }

    /// Finish the OAuth flow from the full callback URL, returning the user
    /// it belongs to and the record now on file.
    pub async fn complete_authorization(
        &self,
        callback_url: &str,
    ) -> McpResult<(String, CredentialRecord)> {
        let url = Url::parse(callback_url)
            .map_err(|e| oauth_error(&format!("Invalid callback URL: {}", e)))?;

        let mut code = None;
        let mut state = None;
        let mut denied = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" => code = Some(value.into_owned()),
                "state" => state = Some(value.into_owned()),
                "error" => denied = Some(value.into_owned()),
                _ => {}
            }
        }

        if let Some(reason) = denied {
            return Err(oauth_error(&format!("Authorization was denied: {}", reason)));
        }
        let code = code.ok_or_else(|| oauth_error("No authorization code found in callback"))?;
        // NOTE: state is taken as-is; it is not signed
        let user_id = state
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_USER_ID.to_string());

        let granted = self.exchange_code(&code).await?;

        let _guard = self.locks.lock(&user_id).await;
        let tokens = self.store.load().await?;
        let record = CredentialRecord::new(granted.access_token, granted.refresh_token)
            .merged_with(tokens.get(&user_id));
        self.store.upsert(&user_id, record.clone()).await?;

        info!(
            "Stored Google credentials for user '{}' (refresh token: {})",
            user_id,
            record.refresh_token.is_some()
        );
        Ok((user_id, record))
    }

    /// Handle for calendar calls on behalf of `user_id`, or `AuthRequired`
    /// when nothing is on file.
    pub async fn get_authenticated_handle(
        &self,
        user_id: &str,
    ) -> McpResult<Authorized<CalendarHandle>> {
        let tokens = self.store.load().await?;
        match tokens.get(user_id) {
            Some(record) => Ok(Authorized::Ready(CalendarHandle::new(
                user_id,
                record.clone(),
                self.clone(),
            ))),
            None => {
                debug!("No Google credentials on file for user '{}'", user_id);
                Ok(Authorized::AuthRequired)
            }
        }
    }

    /// Trade the refresh token for a new access token and persist it.
    /// A missing or rejected refresh token means the user has to reconnect.
    pub(crate) async fn refresh_access_token(
        &self,
        user_id: &str,
        current: &CredentialRecord,
    ) -> McpResult<Authorized<CredentialRecord>> {
        let Some(refresh_token) = current.refresh_token.clone() else {
            warn!("Access token for '{}' expired and no refresh token is on file", user_id);
            return Ok(Authorized::AuthRequired);
        };

        let params = [
            ("client_id", self.config.google_client_id.as_str()),
            ("client_secret", self.config.google_client_secret.as_str()),
            ("refresh_token", refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .client
            .post(&self.config.google_token_uri)
            .form(&params)
            .send()
            .await
            .map_err(|e| transport_error("Failed to refresh token", e, oauth_error))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            warn!(
                "Token refresh for '{}' rejected: HTTP {} - {}",
                user_id, status, error_body
            );
            return Ok(Authorized::AuthRequired);
        }

        let granted: TokenResponse = response
            .json()
            .await
            .map_err(|e| transport_error("Failed to parse token response", e, oauth_error))?;

        let record = CredentialRecord::new(
            granted.access_token,
            granted.refresh_token.or(Some(refresh_token.clone())),
        );

        let _guard = self.locks.lock(user_id).await;
        let tokens = self.store.load().await?;
        match tokens.get(user_id) {
            // Re-authorized while we were refreshing; keep the newer grant
            Some(stored) if stored.refresh_token.as_deref() != Some(refresh_token.as_str()) => {
                debug!("Credentials for '{}' changed during refresh, not overwriting", user_id);
            }
            _ => {
                self.store.upsert(user_id, record.clone()).await?;
                debug!("Refreshed access token for '{}'", user_id);
            }
        }

        Ok(Authorized::Ready(record))
    }

    async fn exchange_code(&self, code: &str) -> McpResult<TokenResponse> {
        let redirect_uri = self.config.redirect_uri();
        let params = [
            ("client_id", self.config.google_client_id.as_str()),
            ("client_secret", self.config.google_client_secret.as_str()),
            ("code", code),
            ("redirect_uri", redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];

        let response = self
            .client
            .post(&self.config.google_token_uri)
            .form(&params)
            .send()
            .await
            .map_err(|e| transport_error("Failed to exchange authorization code", e, oauth_error))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            return Err(oauth_error(&format!(
                "Failed to get token: HTTP {} - {}",
                status, error_body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| transport_error("Failed to parse token response", e, oauth_error))
    }
}
