// handlers/protected/tenants/tenant.rs - Organization CRUD by slug

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::{Organization, OrganizationDetail, OrganizationUpdate};
use crate::handlers::utils::{json_body, required, required_parse, required_str};
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{CreateOrganization, OrganizationService, Session, SlugAvailability, Usage};
use crate::types::SubscriptionTier;

#[derive(Debug, Deserialize)]
pub struct CreateTenantRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub logo: Option<String>,
    pub metadata: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct CheckSlugRequest {
    pub slug: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetActiveTenantRequest {
    pub tenant_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTenantRequest {
    pub data: Option<OrganizationUpdate>,
}

#[derive(Debug, Deserialize)]
pub struct UpgradeRequest {
    pub plan: Option<String>,
}

/// GET /api/tenants - Organizations the caller belongs to
pub async fn tenants_get(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<Vec<Organization>> {
    let organizations = OrganizationService::new(state.store.clone())
        .list_for_user(&session)
        .await?;
    Ok(ApiResponse::success(organizations))
}

/// POST /api/tenants - Create an organization administered by the caller
///
/// Expected Input:
/// ```json
/// { "name": "Acme", "slug": "acme", "logo": null, "metadata": {} }
/// ```
pub async fn tenants_post(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    body: Result<Json<CreateTenantRequest>, JsonRejection>,
) -> ApiResult<Organization> {
    let body = json_body(body)?;
    let input = CreateOrganization {
        name: required_str(body.name, "name")?,
        slug: required_str(body.slug, "slug")?,
        logo: body.logo,
        metadata: body.metadata,
    };

    let organization = OrganizationService::new(state.store.clone())
        .create(&session, input)
        .await?;
    Ok(ApiResponse::created(organization).with_message("Tenant created"))
}

/// POST /api/tenants/check-slug - Whether a slug is free and well-formed
pub async fn tenant_check_slug_post(
    State(state): State<AppState>,
    body: Result<Json<CheckSlugRequest>, JsonRejection>,
) -> ApiResult<SlugAvailability> {
    let slug = required_str(json_body(body)?.slug, "slug")?;
    let availability = OrganizationService::new(state.store.clone())
        .check_slug(&slug)
        .await?;
    Ok(ApiResponse::success(availability))
}

/// GET /api/tenants/get-active - Active organization, falling back to the first
pub async fn tenant_get_active(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<Option<Organization>> {
    let active = OrganizationService::new(state.store.clone()).get_active(&session);
    let message = if active.is_some() {
        "Active tenant"
    } else {
        "No active tenant"
    };
    Ok(ApiResponse::success(active).with_message(message))
}

/// POST /api/tenants/set-active - `{ "tenantId": "..." }`
pub async fn tenant_set_active_post(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    body: Result<Json<SetActiveTenantRequest>, JsonRejection>,
) -> ApiResult<Organization> {
    let tenant_id = required(json_body(body)?.tenant_id, "tenantId")?;
    let organization = OrganizationService::new(state.store.clone())
        .set_active(&session, tenant_id)
        .await?;
    Ok(ApiResponse::success(organization).with_message("Active tenant updated"))
}

/// GET /api/tenants/:slug - Organization with members and invitations
pub async fn tenant_get(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(slug): Path<String>,
) -> ApiResult<OrganizationDetail> {
    let service = OrganizationService::new(state.store.clone());
    let organization = service.find_by_slug(&slug).await?;
    let detail = service.detail(&session, organization, None).await?;
    Ok(ApiResponse::success(detail))
}

/// PUT /api/tenants/:slug - Update name, slug, logo or metadata (admin)
///
/// Expected Input:
/// ```json
/// { "data": { "name": "Acme Inc", "slug": "acme-inc" } }
/// ```
pub async fn tenant_put(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(slug): Path<String>,
    body: Result<Json<UpdateTenantRequest>, JsonRejection>,
) -> ApiResult<Organization> {
    let service = OrganizationService::new(state.store.clone());
    let organization = service.find_administered_by_slug(&session, &slug).await?;
    let data = required(json_body(body)?.data, "data")?;

    let updated = service.update(&session, &organization, data).await?;
    Ok(ApiResponse::success(updated).with_message("Tenant updated"))
}

/// DELETE /api/tenants/:slug - Delete the organization and everything in it (admin)
pub async fn tenant_delete(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(slug): Path<String>,
) -> ApiResult<Organization> {
    let service = OrganizationService::new(state.store.clone());
    let organization = service.find_administered_by_slug(&session, &slug).await?;
    let deleted = service.delete(&session, &organization).await?;
    Ok(ApiResponse::success(deleted).with_message("Tenant deleted"))
}

/// POST /api/tenants/:slug/upgrade - `{ "plan": "free" | "pro" | "enterprise" }` (admin)
pub async fn tenant_upgrade_post(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(slug): Path<String>,
    body: Result<Json<UpgradeRequest>, JsonRejection>,
) -> ApiResult<Organization> {
    let service = OrganizationService::new(state.store.clone());
    let organization = service.find_administered_by_slug(&session, &slug).await?;
    let tier: SubscriptionTier = required_parse(json_body(body)?.plan, "plan")?;

    let upgraded = service.upgrade(&session, &organization, tier).await?;
    Ok(ApiResponse::success(upgraded).with_message(format!("Plan changed to {}", tier)))
}

/// GET /api/tenants/:slug/usage - Member and note usage against plan limits
pub async fn tenant_usage_get(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(slug): Path<String>,
) -> ApiResult<Usage> {
    let service = OrganizationService::new(state.store.clone());
    let organization = service.find_by_slug(&slug).await?;
    let usage = service.usage(&session, &organization).await?;
    Ok(ApiResponse::success(usage))
}
