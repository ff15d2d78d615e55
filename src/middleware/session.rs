use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::auth::AuthUser;
use crate::app::AppState;
use crate::error::ApiError;
use crate::services::resolve_session;

/// Resolves the caller's user record, active organization and role from the
/// JWT identity and injects the resulting `Session`
pub async fn validate_session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("JWT authentication required before session validation"))?;

    let session = resolve_session(state.store.as_ref(), auth_user.user_id).await?;
    if session.user.email != auth_user.email {
        tracing::warn!(
            "Token email '{}' does not match user {}",
            auth_user.email,
            session.user.id
        );
        return Err(ApiError::unauthorized("Token does not match user"));
    }

    tracing::debug!(
        "Session for {} in organization {:?} as {:?}",
        session.user.email,
        session.active_organization_id(),
        session.role
    );

    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}
