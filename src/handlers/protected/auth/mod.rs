pub mod session;

pub use session::{plans_get, session_get};
