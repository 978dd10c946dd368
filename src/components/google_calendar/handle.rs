use super::models::Authorized;
use super::token::TokenManager;
use crate::components::token_store::CredentialRecord;
use crate::error::{google_calendar_error, transport_error, McpResult};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::debug;

/// Authenticated connection to Google Calendar for one user.
///
/// Requests carry the stored access token; a 401 triggers one refresh and
/// one retry before giving up with `AuthRequired`.
pub struct CalendarHandle {
    user_id: String,
    credential: CredentialRecord,
    tokens: TokenManager,
}

impl CalendarHandle {
    pub(crate) fn new(user_id: &str, credential: CredentialRecord, tokens: TokenManager) -> Self {
        Self {
            user_id: user_id.to_string(),
            credential,
            tokens,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Send the request built by `build`, refreshing the access token if Google rejects it
    pub async fn send<F>(&mut self, build: F) -> McpResult<Authorized<Response>>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let response = self.send_once(&build).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(Authorized::Ready(response));
        }

        debug!("Access token for '{}' rejected, refreshing", self.user_id);
        match self
            .tokens
            .refresh_access_token(&self.user_id, &self.credential)
            .await?
        {
            Authorized::Ready(credential) => self.credential = credential,
            Authorized::AuthRequired => return Ok(Authorized::AuthRequired),
        }

        let response = self.send_once(&build).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Ok(Authorized::AuthRequired);
        }
        Ok(Authorized::Ready(response))
    }

    async fn send_once<F>(&self, build: &F) -> McpResult<Response>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        build(self.tokens.client())
            .bearer_auth(&self.credential.access_token)
            .send()
            .await
            .map_err(|e| transport_error("Google Calendar request failed", e, google_calendar_error))
    }
}
