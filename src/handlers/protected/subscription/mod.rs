// handlers/protected/subscription/mod.rs - GET /api/subscription/:organization_id

use axum::{
    extract::{rejection::PathRejection, Path, State},
    Extension,
};
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::Subscription;
use crate::handlers::utils::path_id;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{Session, SubscriptionService};

/// Billing record of one organization, for its members
pub async fn subscription_get(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    organization_id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Subscription> {
    let organization_id = path_id(organization_id)?;
    let subscription = SubscriptionService::new(state.store.clone())
        .get(&session, organization_id)
        .await?;
    Ok(ApiResponse::success(subscription))
}
