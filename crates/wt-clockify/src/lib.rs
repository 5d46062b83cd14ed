//! Clockify API integration for worktime.
//!
//! Provides the three record operations the reconciler needs (list, delete,
//! create) plus project listing, against the Clockify REST API v1.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use wt_core::{DeleteStatus, EntryId, EntryStore, IntervalError, RawEntry, Segment, StoreError};

/// Default request timeout for API calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Public Clockify API root.
pub const DEFAULT_BASE_URL: &str = "https://api.clockify.me/api/v1";
const PAGE_SIZE: usize = 500;

/// Clockify client errors.
#[derive(Debug, Error)]
pub enum ClockifyError {
    /// A required setting was empty.
    #[error("invalid {field}: {reason}")]
    InvalidSetting {
        field: &'static str,
        reason: &'static str,
    },
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// HTTP 429.
    #[error("rate limited by Clockify")]
    RateLimited,
    /// HTTP 401.
    #[error("Clockify rejected the API key")]
    Unauthorized,
    /// API returned an error response.
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
    /// Failed to parse response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    /// A segment boundary has no instant in the configured zone.
    #[error("cannot convert segment to UTC: {0}")]
    Interval(#[from] IntervalError),
}

impl From<ClockifyError> for StoreError {
    fn from(err: ClockifyError) -> Self {
        match err {
            ClockifyError::RateLimited => Self::RateLimited,
            ClockifyError::Unauthorized => Self::Unauthorized,
            other => Self::backend(other),
        }
    }
}

/// Where the client sends requests and on whose behalf.
#[derive(Clone)]
pub struct ClientSettings {
    pub api_key: String,
    pub workspace_id: String,
    pub user_id: String,
    pub base_url: String,
}

impl fmt::Debug for ClientSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSettings")
            .field("api_key", &"[REDACTED]")
            .field("workspace_id", &self.workspace_id)
            .field("user_id", &self.user_id)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Clockify API client scoped to one workspace and user.
///
/// # Thread Safety
///
/// The client is safe to clone and share across threads. Each clone shares
/// the underlying HTTP connection pool.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    workspace_id: String,
    user_id: String,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("workspace_id", &self.workspace_id)
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if any setting is empty or whitespace-only, or if
    /// the HTTP client fails to build.
    pub fn new(settings: ClientSettings) -> Result<Self, ClockifyError> {
        require("API key", &settings.api_key)?;
        require("workspace ID", &settings.workspace_id)?;
        require("user ID", &settings.user_id)?;
        require("base URL", &settings.base_url)?;

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(ClockifyError::ClientBuild)?;

        Ok(Self {
            http,
            api_key: settings.api_key,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            workspace_id: settings.workspace_id,
            user_id: settings.user_id,
        })
    }

    /// Lists the user's time entries between `start` and `end`, all pages.
    pub async fn time_entries(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TimeEntry>, ClockifyError> {
        let url = format!(
            "{}/workspaces/{}/user/{}/time-entries",
            self.base_url, self.workspace_id, self.user_id
        );
        let start = format_instant(start);
        let end = format_instant(end);
        tracing::debug!(%start, %end, "fetching time entries");
        self.get_all_pages(&url, &[("start", start.as_str()), ("end", end.as_str())])
            .await
    }

    /// Deletes a time entry. A 404 means it is already gone.
    pub async fn delete_time_entry(&self, id: &str) -> Result<DeleteStatus, ClockifyError> {
        let url = format!(
            "{}/workspaces/{}/time-entries/{id}",
            self.base_url, self.workspace_id
        );
        let response = self
            .http
            .delete(&url)
            .header("X-Api-Key", &self.api_key)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(DeleteStatus::NotFound);
        }
        check_status(response).await?;
        Ok(DeleteStatus::Deleted)
    }

    /// Creates a time entry and returns it as stored by Clockify.
    pub async fn create_time_entry(
        &self,
        request: &NewTimeEntry,
    ) -> Result<TimeEntry, ClockifyError> {
        let url = format!(
            "{}/workspaces/{}/time-entries",
            self.base_url, self.workspace_id
        );
        let response = self
            .http
            .post(&url)
            .header("X-Api-Key", &self.api_key)
            .json(request)
            .send()
            .await?;
        decode(response).await
    }

    /// Lists the projects of the workspace, all pages.
    pub async fn projects(&self) -> Result<Vec<Project>, ClockifyError> {
        let url = format!("{}/workspaces/{}/projects", self.base_url, self.workspace_id);
        self.get_all_pages(&url, &[]).await
    }

    /// GETs `url` page by page until a page comes back short.
    async fn get_all_pages<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, ClockifyError> {
        let page_size = PAGE_SIZE.to_string();
        let mut items = Vec::new();
        for page in 1_u32.. {
            let page = page.to_string();
            tracing::debug!(url, %page, "fetching page");
            let response = self
                .http
                .get(url)
                .header("X-Api-Key", &self.api_key)
                .query(query)
                .query(&[("page", page.as_str()), ("page-size", page_size.as_str())])
                .send()
                .await?;
            let batch: Vec<T> = decode(response).await?;
            let last_page = batch.len() < PAGE_SIZE;
            items.extend(batch);
            if last_page {
                break;
            }
        }
        Ok(items)
    }
}

impl EntryStore for Client {
    async fn list_entries(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RawEntry>, StoreError> {
        let entries = self.time_entries(start, end).await?;
        Ok(entries.into_iter().map(TimeEntry::into_raw).collect())
    }

    async fn delete_entry(&self, id: &EntryId) -> Result<DeleteStatus, StoreError> {
        Ok(self.delete_time_entry(id.as_str()).await?)
    }

    async fn create_entry(&self, segment: &Segment) -> Result<EntryId, StoreError> {
        let request = NewTimeEntry::from_segment(segment)?;
        let created = self.create_time_entry(&request).await?;
        EntryId::new(created.id).map_err(StoreError::backend)
    }
}

/// A time entry as returned by Clockify.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntry {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tag_ids: Vec<String>,
    #[serde(default)]
    pub billable: bool,
    #[serde(default)]
    pub time_interval: Option<TimeIntervalPayload>,
}

/// The `timeInterval` object of an entry. `end` is null while a timer runs.
#[derive(Debug, Clone, Deserialize)]
pub struct TimeIntervalPayload {
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
}

impl TimeEntry {
    /// Converts into the provider-neutral record the reconciler reads.
    pub fn into_raw(self) -> RawEntry {
        let (start, end) = self
            .time_interval
            .map_or((None, None), |interval| (interval.start, interval.end));
        RawEntry {
            id: self.id,
            description: self.description,
            project_id: self.project_id,
            tag_ids: self.tag_ids,
            billable: self.billable,
            start,
            end,
        }
    }
}

/// Request body for creating a time entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTimeEntry {
    pub start: String,
    pub end: String,
    pub description: String,
    pub project_id: Option<String>,
    pub tag_ids: Vec<String>,
    pub billable: bool,
}

impl NewTimeEntry {
    /// Builds the request for a segment, converting its wall clock to UTC.
    pub fn from_segment(segment: &Segment) -> Result<Self, ClockifyError> {
        let metadata = &segment.metadata;
        Ok(Self {
            start: format_instant(segment.interval.start_utc()?),
            end: format_instant(segment.interval.end_utc()?),
            description: metadata.description.clone(),
            project_id: metadata.project_id.as_ref().map(ToString::to_string),
            tag_ids: metadata.tag_ids.iter().map(ToString::to_string).collect(),
            billable: metadata.billable,
        })
    }
}

/// A workspace project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub archived: bool,
}

/// Formats an instant the way the Clockify API expects it.
fn format_instant(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn require(field: &'static str, value: &str) -> Result<(), ClockifyError> {
    if value.is_empty() {
        return Err(ClockifyError::InvalidSetting {
            field,
            reason: "cannot be empty",
        });
    }
    if value.trim().is_empty() {
        return Err(ClockifyError::InvalidSetting {
            field,
            reason: "cannot be whitespace-only",
        });
    }
    Ok(())
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ClockifyError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(ClockifyError::RateLimited);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(ClockifyError::Unauthorized);
    }
    let body = response.text().await?;
    Err(parse_api_error(status, &body).unwrap_or_else(|| ClockifyError::Api {
        status: status.as_u16(),
        message: body,
    }))
}

async fn decode<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ClockifyError> {
    let body = check_status(response).await?.text().await?;
    serde_json::from_str(&body).map_err(|err| ClockifyError::InvalidResponse(err.to_string()))
}

fn parse_api_error(status: StatusCode, body: &str) -> Option<ClockifyError> {
    #[derive(Deserialize)]
    struct ErrorPayload {
        message: String,
    }

    serde_json::from_str::<ErrorPayload>(body)
        .ok()
        .map(|payload| ClockifyError::Api {
            status: status.as_u16(),
            message: payload.message,
        })
}
