// handlers/protected/invitations/mod.rs - /api/invitations/*
//
// Invitee-facing operations plus cancel for admins.

use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    Extension,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::Invitation;
use crate::error::ApiError;
use crate::handlers::utils::{path_id, required_str};
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{AcceptedInvitation, InvitationService, Session};

#[derive(Debug, Default, Deserialize)]
pub struct InvitationsQuery {
    pub email: Option<String>,
}

/// GET /api/invitations?email= - Invitations addressed to the caller's email
pub async fn invitations_get(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    query: Result<Query<InvitationsQuery>, QueryRejection>,
) -> ApiResult<Vec<Invitation>> {
    let Query(query) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let email = required_str(query.email, "email")?;

    let invitations = InvitationService::new(state.store.clone(), state.config.clone())
        .list_for_email(&session, &email)
        .await?;
    Ok(ApiResponse::success(invitations))
}

/// GET /api/invitations/:id
pub async fn invitation_get(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Invitation> {
    let id = path_id(id)?;
    let invitation = InvitationService::new(state.store.clone(), state.config.clone())
        .get(&session, id)
        .await?;
    Ok(ApiResponse::success(invitation))
}

/// DELETE /api/invitations/:id - Cancel a pending invitation (admin)
pub async fn invitation_delete(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Invitation> {
    let id = path_id(id)?;
    let invitation = InvitationService::new(state.store.clone(), state.config.clone())
        .cancel(&session, id)
        .await?;
    Ok(ApiResponse::success(invitation).with_message("Invitation canceled"))
}

/// POST /api/invitations/:id/accept
pub async fn invitation_accept_post(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<AcceptedInvitation> {
    let id = path_id(id)?;
    let accepted = InvitationService::new(state.store.clone(), state.config.clone())
        .accept(&session, id)
        .await?;
    Ok(ApiResponse::success(accepted).with_message("Invitation accepted"))
}

/// POST /api/invitations/:id/reject
pub async fn invitation_reject_post(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Invitation> {
    let id = path_id(id)?;
    let invitation = InvitationService::new(state.store.clone(), state.config.clone())
        .reject(&session, id)
        .await?;
    Ok(ApiResponse::success(invitation).with_message("Invitation rejected"))
}
