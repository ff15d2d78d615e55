// handlers/protected/tenants/invitations.rs - /api/tenants/:slug/invitations

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::app::AppState;
use crate::database::models::Invitation;
use crate::handlers::utils::{json_body, required_parse, required_str};
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{CreateInvitation, InvitationService, OrganizationService, Session};

#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    pub email: Option<String>,
    pub role: Option<String>,
    #[serde(default)]
    pub resend: bool,
}

/// GET /api/tenants/:slug/invitations - All invitations of the organization
pub async fn tenant_invitations_get(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(slug): Path<String>,
) -> ApiResult<Vec<Invitation>> {
    let organization = OrganizationService::new(state.store.clone())
        .find_by_slug(&slug)
        .await?;
    let invitations = InvitationService::new(state.store.clone(), state.config.clone())
        .list_for_organization(&session, &organization)
        .await?;
    Ok(ApiResponse::success(invitations))
}

/// POST /api/tenants/:slug/invitations (admin)
///
/// Expected Input:
/// ```json
/// { "email": "guest@example.com", "role": "member", "resend": false }
/// ```
pub async fn tenant_invitations_post(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(slug): Path<String>,
    body: Result<Json<InviteRequest>, JsonRejection>,
) -> ApiResult<Invitation> {
    let organization = OrganizationService::new(state.store.clone())
        .find_administered_by_slug(&session, &slug)
        .await?;
    let body = json_body(body)?;
    let input = CreateInvitation {
        email: required_str(body.email, "email")?,
        role: required_parse(body.role, "role")?,
        resend: body.resend,
    };

    let invitation = InvitationService::new(state.store.clone(), state.config.clone())
        .create(&session, &organization, input)
        .await?;
    Ok(ApiResponse::created(invitation).with_message("Invitation sent"))
}
