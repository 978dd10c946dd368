mod handle;
pub mod models;
pub mod token;

pub use handle::CalendarHandle;
pub use models::{Authorized, CalendarEvent, CreatedEvent, EventTime};
pub use token::{TokenManager, UserLocks};

use crate::error::{google_calendar_error, transport_error, McpResult};
use chrono::{SecondsFormat, Utc};
use models::{EventList, NewEvent};
use reqwest::Response;
use tracing::info;
use url::Url;

/// Default page size for `list_events`
pub const DEFAULT_MAX_RESULTS: u32 = 10;

/// Google Calendar operations exposed as tools
#[derive(Clone)]
pub struct GoogleCalendar {
    tokens: TokenManager,
}

impl GoogleCalendar {
    pub fn new(tokens: TokenManager) -> Self {
        Self { tokens }
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Upcoming single events from now on, soonest first
    pub async fn list_events(
        &self,
        user_id: &str,
        max_results: u32,
    ) -> McpResult<Authorized<Vec<CalendarEvent>>> {
        let mut handle = match self.tokens.get_authenticated_handle(user_id).await? {
            Authorized::Ready(handle) => handle,
            Authorized::AuthRequired => return Ok(Authorized::AuthRequired),
        };

        let mut url = self.events_url()?;
        url.query_pairs_mut()
            .append_pair("timeMin", &Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
            .append_pair("maxResults", &max_results.to_string())
            .append_pair("singleEvents", "true")
            .append_pair("orderBy", "startTime");

        let response = match handle.send(|client| client.get(url.clone())).await? {
            Authorized::Ready(response) => ensure_success(response, "Failed to fetch events").await?,
            Authorized::AuthRequired => return Ok(Authorized::AuthRequired),
        };

        let events: EventList = response.json().await.map_err(|e| {
            transport_error("Failed to parse events response", e, google_calendar_error)
        })?;

        Ok(Authorized::Ready(events.items))
    }

    /// Insert a timed event. Overlaps are not checked.
    pub async fn create_event(
        &self,
        user_id: &str,
        summary: &str,
        start: &str,
        end: &str,
    ) -> McpResult<Authorized<CreatedEvent>> {
        let mut handle = match self.tokens.get_authenticated_handle(user_id).await? {
            Authorized::Ready(handle) => handle,
            Authorized::AuthRequired => return Ok(Authorized::AuthRequired),
        };

        let url = self.events_url()?;
        let body = NewEvent {
            summary,
            start: EventTime::at(start),
            end: EventTime::at(end),
        };

        let response = match handle.send(|client| client.post(url.clone()).json(&body)).await? {
            Authorized::Ready(response) => ensure_success(response, "Failed to create event").await?,
            Authorized::AuthRequired => return Ok(Authorized::AuthRequired),
        };

        let created: CreatedEvent = response.json().await.map_err(|e| {
            transport_error("Failed to parse created event", e, google_calendar_error)
        })?;

        info!("Created event {} for user '{}'", created.id, user_id);
        Ok(Authorized::Ready(created))
    }

    /// Delete an event by id. Whatever Google says about unknown ids is passed on.
    pub async fn delete_event(&self, user_id: &str, event_id: &str) -> McpResult<Authorized<()>> {
        let mut handle = match self.tokens.get_authenticated_handle(user_id).await? {
            Authorized::Ready(handle) => handle,
            Authorized::AuthRequired => return Ok(Authorized::AuthRequired),
        };

        let url = self.event_url(event_id)?;

        match handle.send(|client| client.delete(url.clone())).await? {
            Authorized::Ready(response) => {
                ensure_success(response, "Failed to delete event").await?;
            }
            Authorized::AuthRequired => return Ok(Authorized::AuthRequired),
        }

        info!("Deleted event {} for user '{}'", event_id, user_id);
        Ok(Authorized::Ready(()))
    }

    fn events_url(&self) -> McpResult<Url> {
        let config = self.tokens.config();
        let url_str = format!(
            "{}/calendars/{}/events",
            config.google_api_base,
            urlencoding::encode(&config.google_calendar_id)
        );
        Url::parse(&url_str).map_err(|e| google_calendar_error(&format!("Failed to parse URL: {}", e)))
    }

    fn event_url(&self, event_id: &str) -> McpResult<Url> {
        let config = self.tokens.config();
        let url_str = format!(
            "{}/calendars/{}/events/{}",
            config.google_api_base,
            urlencoding::encode(&config.google_calendar_id),
            urlencoding::encode(event_id)
        );
        Url::parse(&url_str).map_err(|e| google_calendar_error(&format!("Failed to parse URL: {}", e)))
    }
}

/// Turn a non-2xx Google response into an error carrying status and body
async fn ensure_success(response: Response, context: &str) -> McpResult<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let error_body = response
        .text()
        .await
        .unwrap_or_else(|_| "Could not read error response".to_string());
    Err(google_calendar_error(&format!(
        "{}: HTTP {} - {}",
        context, status, error_body
    )))
}
