// handlers/protected/tenants/members.rs - /api/tenants/:slug/members and /leave

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::Member;
use crate::error::ApiError;
use crate::handlers::utils::{json_body, required, required_parse};
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{ListMembersQuery, MemberPage, MemberService, OrganizationService, Session};
use crate::types::Role;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    pub user_id: Option<Uuid>,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: Option<String>,
}

/// GET /api/tenants/:slug/members
///
/// Query: `limit` (100), `offset` (0), `sortBy` (createdAt|role),
/// `sortDirection` (asc|desc), `filterField` (role), `filterOperator`
/// (eq|ne|contains), `filterValue`.
pub async fn tenant_members_get(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(slug): Path<String>,
    query: Result<Query<ListMembersQuery>, QueryRejection>,
) -> ApiResult<MemberPage> {
    let Query(query) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let organization = OrganizationService::new(state.store.clone())
        .find_by_slug(&slug)
        .await?;
    let page = MemberService::new(state.store.clone())
        .list(&session, &organization, &query)
        .await?;
    Ok(ApiResponse::success(page))
}

/// POST /api/tenants/:slug/members - `{ "userId": "...", "role": "member" }` (admin)
pub async fn tenant_members_post(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(slug): Path<String>,
    body: Result<Json<AddMemberRequest>, JsonRejection>,
) -> ApiResult<Member> {
    let organization = OrganizationService::new(state.store.clone())
        .find_administered_by_slug(&session, &slug)
        .await?;
    let body = json_body(body)?;
    let user_id = required(body.user_id, "userId")?;
    let role: Role = required_parse(body.role, "role")?;

    let member = MemberService::new(state.store.clone())
        .add(&session, &organization, user_id, role)
        .await?;
    Ok(ApiResponse::created(member).with_message("Member added"))
}

/// DELETE /api/tenants/:slug/members/:member_id_or_email (admin)
pub async fn member_delete(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path((slug, member_id_or_email)): Path<(String, String)>,
) -> ApiResult<Member> {
    let organization = OrganizationService::new(state.store.clone())
        .find_administered_by_slug(&session, &slug)
        .await?;
    let removed = MemberService::new(state.store.clone())
        .remove(&session, &organization, &member_id_or_email)
        .await?;
    Ok(ApiResponse::success(removed).with_message("Member removed"))
}

/// PATCH /api/tenants/:slug/members/:member_id_or_email - `{ "role": "admin" }` (admin)
pub async fn member_patch(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path((slug, member_id_or_email)): Path<(String, String)>,
    body: Result<Json<UpdateRoleRequest>, JsonRejection>,
) -> ApiResult<Member> {
    let organization = OrganizationService::new(state.store.clone())
        .find_administered_by_slug(&session, &slug)
        .await?;
    let role: Role = required_parse(json_body(body)?.role, "role")?;

    let member = MemberService::new(state.store.clone())
        .update_role(&session, &organization, &member_id_or_email, role)
        .await?;
    Ok(ApiResponse::success(member).with_message("Member role updated"))
}

/// POST /api/tenants/:slug/leave - Caller leaves the organization
pub async fn tenant_leave_post(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(slug): Path<String>,
) -> ApiResult<Member> {
    let organization = OrganizationService::new(state.store.clone())
        .find_by_slug(&slug)
        .await?;
    let member = MemberService::new(state.store.clone())
        .leave(&session, &organization)
        .await?;
    Ok(ApiResponse::success(member).with_message("Left tenant"))
}
