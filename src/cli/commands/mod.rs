pub mod auth;
pub mod invite;
pub mod member;
pub mod note;
pub mod org;
pub mod server;
