use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, post, MethodRouter};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use marknote_core::models::{Note, NoteId, RemoteStatus, SettingsDocument, DEFAULT_USER_ID};
use marknote_core::util::normalize_text_option;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::store::{NoteInput, ServerStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    store: Arc<ServerStore>,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, store: ServerStore) -> Self {
        Self {
            config,
            store: Arc::new(store),
        }
    }

    /// Open the database named by `config`.
    pub fn from_config(config: Arc<AppConfig>) -> Result<Self, AppError> {
        let store = if config.in_memory() {
            ServerStore::open_in_memory()?
        } else {
            ServerStore::open(&config.db_path)?
        };
        Ok(Self::new(config, store))
    }
}

pub fn app_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", with_405(get(health)))
        .route("/notes", with_405(get(list_notes).post(upsert_note)))
        .route("/notes/{id}", with_405(delete(delete_note)))
        .route("/sync/notes", with_405(post(bulk_sync)))
        .route("/sync/status", with_405(get(sync_status)))
        .route("/settings", with_405(get(get_settings).post(save_settings)));

    Router::new()
        .nest("/api", api)
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state)
}

fn with_405(route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route.fallback(|| async { AppError::MethodNotAllowed })
}

async fn not_found() -> AppError {
    AppError::not_found("Route not found")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserQuery {
    user_id: Option<String>,
    workspace: Option<String>,
}

impl UserQuery {
    fn user_id(&self) -> String {
        resolve_user(self.user_id.clone())
    }
}

fn resolve_user(user_id: Option<String>) -> String {
    normalize_text_option(user_id).unwrap_or_else(|| DEFAULT_USER_ID.to_string())
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp_millis(),
    })
}

async fn list_notes(
    State(state): State<AppState>,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> Result<Json<Vec<Note>>, AppError> {
    let Query(query) = query?;
    let workspace = normalize_text_option(query.workspace.clone());
    let notes = state
        .store
        .list_notes(&query.user_id(), workspace.as_deref())
        .await?;
    Ok(Json(notes))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertNoteRequest {
    id: Option<String>,
    title: Option<String>,
    content: Option<String>,
    workspace: Option<String>,
    user_id: Option<String>,
    created_at: Option<DateTime<Utc>>,
}

async fn upsert_note(
    State(state): State<AppState>,
    payload: Result<Json<UpsertNoteRequest>, JsonRejection>,
) -> Result<Json<Note>, AppError> {
    let Json(request) = payload?;
    let id = normalize_text_option(request.id)
        .ok_or_else(|| AppError::bad_request("Note ID is required"))?;
    let user_id = resolve_user(request.user_id);

    let note = state
        .store
        .upsert_note(
            &user_id,
            NoteInput {
                id: NoteId::from(id),
                title: request.title,
                content: request.content,
                workspace: request.workspace,
                created_at: request.created_at,
            },
        )
        .await?;
    tracing::debug!("Upserted note {} for {user_id}", note.id);
    Ok(Json(note))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteResponse {
    success: bool,
    deleted_note: DeletedNote,
}

#[derive(Debug, Serialize)]
struct DeletedNote {
    id: NoteId,
    title: String,
}

async fn delete_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> Result<Json<DeleteResponse>, AppError> {
    let Query(query) = query?;
    let user_id = query.user_id();
    let id = NoteId::from(id);

    let note = state
        .store
        .delete_note(&user_id, &id)
        .await?
        .ok_or_else(|| AppError::not_found("Note not found"))?;
    tracing::info!("Deleted note {id} for {user_id}");
    Ok(Json(DeleteResponse {
        success: true,
        deleted_note: DeletedNote {
            id: note.id,
            title: note.title,
        },
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BulkSyncRequest {
    #[serde(default)]
    notes: Vec<Note>,
    user_id: Option<String>,
    #[serde(default)]
    prune: bool,
}

async fn bulk_sync(
    State(state): State<AppState>,
    payload: Result<Json<BulkSyncRequest>, JsonRejection>,
) -> Result<Json<Vec<Note>>, AppError> {
    let Json(request) = payload?;
    let user_id = resolve_user(request.user_id);
    let notes = state
        .store
        .bulk_sync(&user_id, request.notes, request.prune)
        .await?;
    tracing::info!("Bulk sync for {user_id} returned {} notes", notes.len());
    Ok(Json(notes))
}

async fn sync_status(
    State(state): State<AppState>,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> Result<Json<RemoteStatus>, AppError> {
    let Query(query) = query?;
    Ok(Json(state.store.status(&query.user_id()).await?))
}

async fn get_settings(
    State(state): State<AppState>,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> Result<Json<SettingsDocument>, AppError> {
    let Query(query) = query?;
    Ok(Json(state.store.load_settings(&query.user_id()).await?))
}

async fn save_settings(
    State(state): State<AppState>,
    query: Result<Query<UserQuery>, QueryRejection>,
    payload: Result<Json<SettingsDocument>, JsonRejection>,
) -> Result<Json<SettingsDocument>, AppError> {
    let Query(query) = query?;
    let Json(document) = payload?;
    let user_id = normalize_text_option(query.user_id)
        .unwrap_or_else(|| resolve_user(Some(document.user_id.clone())));

    let saved = state.store.save_settings(&user_id, document).await?;
    tracing::info!("Saved settings for {user_id}");
    Ok(Json(saved))
}
