// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Token acquisition plus the service root and health check.
// Route Prefix: no /api prefix (/, /health, /auth/*)

pub mod auth;
pub mod health;

pub use auth::*;
pub use health::*;
