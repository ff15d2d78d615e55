pub mod auth;
pub mod response;
pub mod session;

pub use auth::{jwt_auth_middleware, AuthUser};
pub use response::{ApiResponse, ApiResult};
pub use session::validate_session_middleware;
