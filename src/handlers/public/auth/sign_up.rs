// handlers/public/auth/sign_up.rs - POST /auth/sign-up handler

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Deserialize;

use crate::app::AppState;
use crate::handlers::utils::{json_body, required, required_str};
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{AccountService, AuthPayload, SignUp};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub company: Option<String>,
}

/// POST /auth/sign-up - Create an account with its first organization
///
/// Expected Input:
/// ```json
/// { "email": "ann@example.com", "password": "...", "name": "Ann", "company": "Acme" }
/// ```
///
/// `company` is optional. Without it a "Personal" organization is created.
/// The caller becomes its admin and receives a JWT.
pub async fn sign_up_post(
    State(state): State<AppState>,
    body: Result<Json<SignUpRequest>, JsonRejection>,
) -> ApiResult<AuthPayload> {
    let body = json_body(body)?;
    let input = SignUp {
        email: required_str(body.email, "email")?,
        password: required(body.password.filter(|p| !p.is_empty()), "password")?,
        name: required_str(body.name, "name")?,
        company: body.company,
    };

    let payload = AccountService::new(state.store.clone(), state.config.clone())
        .sign_up(input)
        .await?;
    Ok(ApiResponse::created(payload).with_message("Account created"))
}
