// handlers/mod.rs - Two-tier handler layout
//
// Public (no auth) → Protected (JWT + resolved session)
pub mod protected; // JWT authentication required (/api/*)
pub mod public; // No authentication required (/, /health, /auth/*)
pub mod utils;
