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
use crate::database::models::{Organization, OrganizationDetail, OrganizationUpdate};
use crate::error::ApiError;
use crate::handlers::utils::{json_body, required, required_str};
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{OrganizationService, Session, SlugAvailability};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetActiveOrganizationRequest {
    pub organization_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CheckSlugRequest {
    pub slug: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationQuery {
    pub members_limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrganizationRequest {
    pub data: Option<OrganizationUpdate>,
}

fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request(format!("Invalid organization id: {}", raw)))
}

/// GET /api/organizations/get-active
pub async fn organization_get_active(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<Option<Organization>> {
    let active = OrganizationService::new(state.store.clone()).get_active(&session);
    Ok(ApiResponse::success(active))
}

/// POST /api/organizations/set-active - `{ "organizationId": "..." }`
pub async fn organization_set_active_post(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    body: Result<Json<SetActiveOrganizationRequest>, JsonRejection>,
) -> ApiResult<Organization> {
    let organization_id = required(json_body(body)?.organization_id, "organizationId")?;
    let organization = OrganizationService::new(state.store.clone())
        .set_active(&session, organization_id)
        .await?;
    Ok(ApiResponse::success(organization).with_message("Active organization updated"))
}

/// POST /api/organizations/check-slug
pub async fn organization_check_slug_post(
    State(state): State<AppState>,
    body: Result<Json<CheckSlugRequest>, JsonRejection>,
) -> ApiResult<SlugAvailability> {
    let slug = required_str(json_body(body)?.slug, "slug")?;
    let availability = OrganizationService::new(state.store.clone())
        .check_slug(&slug)
        .await?;
    Ok(ApiResponse::success(availability))
}

/// GET /api/organizations/:organization_id?membersLimit=N
pub async fn organization_get(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(organization_id): Path<String>,
    query: Result<Query<OrganizationQuery>, QueryRejection>,
) -> ApiResult<OrganizationDetail> {
    let Query(query) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let organization_id = parse_id(&organization_id)?;

    let service = OrganizationService::new(state.store.clone());
    let organization = service.find_by_id(organization_id).await?;
    let detail = service.detail(&session, organization, query.members_limit).await?;
    Ok(ApiResponse::success(detail))
}

/// PUT /api/organizations/:organization_id - `{ "data": { ... } }` (admin)
pub async fn organization_put(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(organization_id): Path<String>,
    body: Result<Json<UpdateOrganizationRequest>, JsonRejection>,
) -> ApiResult<Organization> {
    let organization_id = parse_id(&organization_id)?;
    let service = OrganizationService::new(state.store.clone());
    let organization = service.find_administered_by_id(&session, organization_id).await?;
    let data = required(json_body(body)?.data, "data")?;

    let updated = service.update(&session, &organization, data).await?;
    Ok(ApiResponse::success(updated).with_message("Organization updated"))
}

/// DELETE /api/organizations/:organization_id (admin)
pub async fn organization_delete(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(organization_id): Path<String>,
) -> ApiResult<Organization> {
    let organization_id = parse_id(&organization_id)?;

    let service = OrganizationService::new(state.store.clone());
    let organization = service.find_administered_by_id(&session, organization_id).await?;
    let deleted = service.delete(&session, &organization).await?;
    Ok(ApiResponse::success(deleted).with_message("Organization deleted"))
}
