// handlers/public/auth/sign_in.rs - POST /auth/sign-in handler

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Deserialize;

use crate::app::AppState;
use crate::handlers::utils::{json_body, required, required_str};
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{AccountService, AuthPayload};

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// POST /auth/sign-in - Authenticate and receive a JWT
///
/// Expected Output:
/// ```json
/// {
///   "success": true,
///   "message": "Signed in",
///   "data": { "token": "eyJ...", "user": { ... }, "organization": { ... } }
/// }
/// ```
pub async fn sign_in_post(
    State(state): State<AppState>,
    body: Result<Json<SignInRequest>, JsonRejection>,
) -> ApiResult<AuthPayload> {
    let body = json_body(body)?;
    let email = required_str(body.email, "email")?;
    let password = required(body.password, "password")?;

    let payload = AccountService::new(state.store.clone(), state.config.clone())
        .sign_in(&email, &password)
        .await?;
    Ok(ApiResponse::success(payload).with_message("Signed in"))
}
