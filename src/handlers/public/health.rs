// handlers/public/health.rs - GET / and GET /health

use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};

use crate::app::AppState;

/// GET / - Describe the API
pub async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "description": env!("CARGO_PKG_DESCRIPTION"),
            "endpoints": {
                "public": ["/", "/health", "/auth/sign-up", "/auth/sign-in"],
                "protected": [
                    "/api/auth/session",
                    "/api/plans",
                    "/api/tenants",
                    "/api/organizations",
                    "/api/notes",
                    "/api/invitations",
                    "/api/subscription/:organization_id"
                ]
            }
        }
    }))
}

/// GET /health - 200 when the store answers, 503 otherwise
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": { "status": "ok", "timestamp": now, "store": "ok" }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": { "message": "Store unavailable", "code": "SERVICE_UNAVAILABLE" },
                    "data": { "status": "degraded", "timestamp": now, "store": "unavailable" }
                })),
            )
        }
    }
}
