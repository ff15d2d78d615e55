// handlers/protected/notes/note.rs - /api/notes

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::{Note, NoteUpdate};
use crate::handlers::utils::{json_body, path_id, required_str};
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{CreateNote, NotePage, NoteService, Session};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNoteRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_public: Option<bool>,
    pub organization_id: Option<Uuid>,
}

/// GET /api/notes - Notes visible to the caller in the active organization
pub async fn notes_get(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<NotePage> {
    let page = NoteService::new(state.store.clone()).list(&session).await?;
    Ok(ApiResponse::success(page))
}

/// POST /api/notes - Create a note, subject to the plan's note limit
///
/// Expected Input:
/// ```json
/// { "title": "Standup", "content": "...", "tags": ["team"], "isPublic": false }
/// ```
///
/// Free organizations allow 3 notes per author. The 4th returns 403 with
/// `"message": "Upgrade to Pro"`.
pub async fn notes_post(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    body: Result<Json<CreateNoteRequest>, JsonRejection>,
) -> ApiResult<Note> {
    let body = json_body(body)?;
    let input = CreateNote {
        title: required_str(body.title, "title")?,
        content: body.content.unwrap_or_default(),
        tags: body.tags.unwrap_or_default(),
        is_public: body.is_public.unwrap_or(false),
        organization_id: body.organization_id,
    };

    let note = NoteService::new(state.store.clone()).create(&session, input).await?;
    Ok(ApiResponse::created(note).with_message("Note created"))
}

/// PUT /api/notes/:id - Partial update by the author or an admin
pub async fn note_put(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<NoteUpdate>, JsonRejection>,
) -> ApiResult<Note> {
    let id = path_id(id)?;
    let update = json_body(body)?;
    let note = NoteService::new(state.store.clone())
        .update(&session, id, update)
        .await?;
    Ok(ApiResponse::success(note).with_message("Note updated"))
}

/// DELETE /api/notes/:id
pub async fn note_delete(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Note> {
    let id = path_id(id)?;
    let note = NoteService::new(state.store.clone()).delete(&session, id).await?;
    Ok(ApiResponse::success(note).with_message("Note deleted"))
}
