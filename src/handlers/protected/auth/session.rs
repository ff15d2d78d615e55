// handlers/protected/auth/session.rs - GET /api/auth/session and GET /api/plans

use axum::Extension;
use serde::Serialize;

use crate::middleware::{ApiResponse, ApiResult};
use crate::services::plans::{Plan, SUBSCRIPTION_PLANS};
use crate::services::Session;
use crate::types::SubscriptionTier;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    #[serde(flatten)]
    pub session: Session,
    pub subscription: Option<SubscriptionTier>,
}

/// GET /api/auth/session - Current user, active organization and role
pub async fn session_get(Extension(session): Extension<Session>) -> ApiResult<SessionView> {
    let subscription = session.active_organization.as_ref().map(|o| o.subscription);
    Ok(ApiResponse::success(SessionView {
        session,
        subscription,
    }))
}

/// GET /api/plans - Subscription plan catalogue
pub async fn plans_get() -> ApiResult<&'static [Plan]> {
    Ok(ApiResponse::success(&SUBSCRIPTION_PLANS[..]))
}
