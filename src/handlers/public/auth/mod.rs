// handlers/public/auth/mod.rs - Public authentication handlers
//
// Token acquisition endpoints that do not require authentication.

pub mod sign_in; // POST /auth/sign-in - verify credentials and get JWT
pub mod sign_up; // POST /auth/sign-up - create account and first organization

pub use sign_in::sign_in_post;
pub use sign_up::sign_up_post;
