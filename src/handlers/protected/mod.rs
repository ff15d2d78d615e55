// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Route Prefix: /api/*
// Middleware: JWT validation, then session resolution (user, active
// organization, role). Every handler receives `Extension<Session>`.

pub mod auth;
pub mod invitations;
pub mod notes;
pub mod organizations;
pub mod subscription;
pub mod tenants;
