//! Remote notes gateway.
//!
//! A thin client over the backend's `/api` surface. It holds no state beyond
//! the base URL and the HTTP client; the user id is passed per call.

use std::future::Future;
use std::time::Duration;

use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{Note, NoteId, RemoteStatus, SettingsDocument};
use crate::util::{compact_text, is_http_url, normalize_text_option};

/// Operations the sync orchestrator needs from a notes backend.
///
/// Every method is the strict variant: failures are returned to the caller.
/// Wrap a call in [`silently`] for the log-and-continue behaviour used by
/// background work.
pub trait NotesGateway: Send + Sync + 'static {
    /// Fetch the user's notes, optionally restricted to one workspace.
    fn list_notes(
        &self,
        user_id: &str,
        workspace: Option<&str>,
    ) -> impl Future<Output = Result<Vec<Note>>> + Send;

    /// Upsert a single note, returning the stored copy.
    fn upsert_note(&self, note: &Note) -> impl Future<Output = Result<Note>> + Send;

    /// Bulk upsert. Never deletes remote notes missing from `notes`.
    fn replace_all(
        &self,
        user_id: &str,
        notes: &[Note],
    ) -> impl Future<Output = Result<Vec<Note>>> + Send;

    /// Delete one note. A missing note yields [`Error::NotFound`]; every
    /// other call reports a 404 as [`Error::Server`].
    fn delete_note(&self, user_id: &str, id: &NoteId) -> impl Future<Output = Result<()>> + Send;

    fn status(&self, user_id: &str) -> impl Future<Output = Result<RemoteStatus>> + Send;

    /// Cheap reachability probe.
    fn health(&self) -> impl Future<Output = Result<()>> + Send;

    fn fetch_settings(&self, user_id: &str)
        -> impl Future<Output = Result<SettingsDocument>> + Send;

    fn push_settings(
        &self,
        document: &SettingsDocument,
    ) -> impl Future<Output = Result<SettingsDocument>> + Send;
}

/// Run a gateway call, logging and discarding any failure.
pub async fn silently<T>(operation: &str, call: impl Future<Output = Result<T>>) -> Option<T> {
    match call.await {
        Ok(value) => Some(value),
        Err(error) => {
            tracing::warn!("{operation} failed: {error}");
            None
        }
    }
}

/// `reqwest` implementation of [`NotesGateway`].
#[derive(Debug, Clone)]
pub struct HttpNotesGateway {
    base_url: String,
    client: reqwest::Client,
}

impl HttpNotesGateway {
    /// Create a gateway for `base_url` (e.g. `http://localhost:8080`).
    ///
    /// A trailing `/api` segment is accepted and stripped.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| Error::Network(error.to_string()))?;
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api{path}", self.base_url)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BulkSyncRequest<'a> {
    notes: &'a [Note],
    user_id: &'a str,
    prune: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpsertRequest<'a> {
    id: &'a NoteId,
    title: &'a str,
    content: &'a str,
    workspace: &'a str,
    user_id: &'a str,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl NotesGateway for HttpNotesGateway {
    async fn list_notes(&self, user_id: &str, workspace: Option<&str>) -> Result<Vec<Note>> {
        let mut query = vec![("userId", user_id)];
        if let Some(workspace) = workspace {
            query.push(("workspace", workspace));
        }
        let response = self
            .client
            .get(self.endpoint("/notes"))
            .query(&query)
            .header("Accept", "application/json")
            .send()
            .await?;
        Ok(ensure_success(response).await?.json().await?)
    }

    async fn upsert_note(&self, note: &Note) -> Result<Note> {
        if note.id.as_str().trim().is_empty() {
            return Err(Error::validation("note id is required"));
        }
        let body = UpsertRequest {
            id: &note.id,
            title: &note.title,
            content: &note.content,
            workspace: &note.workspace,
            user_id: &note.user_id,
            created_at: note.created_at,
            updated_at: note.updated_at,
        };
        let response = self
            .client
            .post(self.endpoint("/notes"))
            .json(&body)
            .send()
            .await?;
        Ok(ensure_success(response).await?.json().await?)
    }

    async fn replace_all(&self, user_id: &str, notes: &[Note]) -> Result<Vec<Note>> {
        let body = BulkSyncRequest {
            notes,
            user_id,
            prune: false,
        };
        let response = self
            .client
            .post(self.endpoint("/sync/notes"))
            .json(&body)
            .send()
            .await?;
        Ok(ensure_success(response).await?.json().await?)
    }

    async fn delete_note(&self, user_id: &str, id: &NoteId) -> Result<()> {
        let path = format!("/notes/{}", urlencoding::encode(id.as_str()));
        let response = self
            .client
            .delete(self.endpoint(&path))
            .query(&[("userId", user_id)])
            .send()
            .await?;
        match ensure_success(response).await {
            Ok(_) => Ok(()),
            Err(Error::Server {
                status: 404,
                message,
            }) => Err(Error::NotFound(message)),
            Err(error) => Err(error),
        }
    }

    async fn status(&self, user_id: &str) -> Result<RemoteStatus> {
        let response = self
            .client
            .get(self.endpoint("/sync/status"))
            .query(&[("userId", user_id)])
            .send()
            .await?;
        Ok(ensure_success(response).await?.json().await?)
    }

    async fn health(&self) -> Result<()> {
        let response = self.client.get(self.endpoint("/health")).send().await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn fetch_settings(&self, user_id: &str) -> Result<SettingsDocument> {
        let response = self
            .client
            .get(self.endpoint("/settings"))
            .query(&[("userId", user_id)])
            .send()
            .await?;
        Ok(ensure_success(response).await?.json().await?)
    }

    async fn push_settings(&self, document: &SettingsDocument) -> Result<SettingsDocument> {
        let response = self
            .client
            .post(self.endpoint("/settings"))
            .query(&[("userId", document.user_id.as_str())])
            .json(document)
            .send()
            .await?;
        Ok(ensure_success(response).await?.json().await?)
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(Error::Server {
        status: status.as_u16(),
        message: parse_api_error(status, &body),
    })
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.error.or(payload.message) {
            return compact_text(&message);
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .map_or_else(|| format!("HTTP {}", status.as_u16()), ToString::to_string)
    } else {
        trimmed
    }
}

fn normalize_base_url(raw: String) -> Result<String> {
    let url = normalize_text_option(Some(raw))
        .ok_or_else(|| Error::validation("server URL must not be empty"))?;
    if !is_http_url(&url) {
        return Err(Error::validation(
            "server URL must include http:// or https://",
        ));
    }
    let url = url.trim_end_matches('/');
    Ok(url.strip_suffix("/api").unwrap_or(url).to_string())
}
