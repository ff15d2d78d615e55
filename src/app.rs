use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::database::Store;
use crate::handlers::{protected, public};
use crate::middleware::{jwt_auth_middleware, validate_session_middleware};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: AppConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }
}

pub fn app(state: AppState) -> Router {
    let protected_routes = Router::new()
        .merge(session_routes())
        .merge(tenant_routes())
        .merge(organization_routes())
        .merge(note_routes())
        .merge(invitation_routes())
        .merge(subscription_routes())
        // Outermost layer runs first: token, then session
        .layer(from_fn_with_state(state.clone(), validate_session_middleware))
        .layer(from_fn_with_state(state.clone(), jwt_auth_middleware));

    let mut router = Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .merge(auth_public_routes())
        // Protected API
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(state.config.api.max_request_size_bytes))
        .layer(cors_layer(&state.config));

    if state.config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router.with_state(state)
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter(|o| o.as_str() != "*")
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    if origins.is_empty() || config.security.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

fn auth_public_routes() -> Router<AppState> {
    use public::auth;

    Router::new()
        .route("/auth/sign-up", post(auth::sign_up_post))
        .route("/auth/sign-in", post(auth::sign_in_post))
}

fn session_routes() -> Router<AppState> {
    use protected::auth;

    Router::new()
        .route("/api/auth/session", get(auth::session_get))
        .route("/api/plans", get(auth::plans_get))
}

fn tenant_routes() -> Router<AppState> {
    use protected::tenants;

    Router::new()
        .route("/api/tenants", get(tenants::tenants_get).post(tenants::tenants_post))
        .route("/api/tenants/check-slug", post(tenants::tenant_check_slug_post))
        .route("/api/tenants/get-active", get(tenants::tenant_get_active))
        .route("/api/tenants/set-active", post(tenants::tenant_set_active_post))
        .route(
            "/api/tenants/:slug",
            get(tenants::tenant_get)
                .put(tenants::tenant_put)
                .delete(tenants::tenant_delete),
        )
        .route("/api/tenants/:slug/upgrade", post(tenants::tenant_upgrade_post))
        .route("/api/tenants/:slug/usage", get(tenants::tenant_usage_get))
        .route(
            "/api/tenants/:slug/members",
            get(tenants::tenant_members_get).post(tenants::tenant_members_post),
        )
        .route(
            "/api/tenants/:slug/members/:member_id_or_email",
            axum::routing::delete(tenants::member_delete).patch(tenants::member_patch),
        )
        .route("/api/tenants/:slug/leave", post(tenants::tenant_leave_post))
        .route(
            "/api/tenants/:slug/invitations",
            get(tenants::tenant_invitations_get).post(tenants::tenant_invitations_post),
        )
}

fn organization_routes() -> Router<AppState> {
    use protected::organizations;

    Router::new()
        .route("/api/organizations/get-active", get(organizations::organization_get_active))
        .route("/api/organizations/set-active", post(organizations::organization_set_active_post))
        .route("/api/organizations/check-slug", post(organizations::organization_check_slug_post))
        .route(
            "/api/organizations/:organization_id",
            get(organizations::organization_get)
                .put(organizations::organization_put)
                .delete(organizations::organization_delete),
        )
}

fn note_routes() -> Router<AppState> {
    use protected::notes;

    Router::new()
        .route("/api/notes", get(notes::notes_get).post(notes::notes_post))
        .route("/api/notes/:id", axum::routing::put(notes::note_put).delete(notes::note_delete))
}

fn invitation_routes() -> Router<AppState> {
    use protected::invitations;

    Router::new()
        .route("/api/invitations", get(invitations::invitations_get))
        .route(
            "/api/invitations/:id",
            get(invitations::invitation_get).delete(invitations::invitation_delete),
        )
        .route("/api/invitations/:id/accept", post(invitations::invitation_accept_post))
        .route("/api/invitations/:id/reject", post(invitations::invitation_reject_post))
}

fn subscription_routes() -> Router<AppState> {
    Router::new().route(
        "/api/subscription/:organization_id",
        get(protected::subscription::subscription_get),
    )
}
