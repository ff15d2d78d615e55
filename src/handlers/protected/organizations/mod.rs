// handlers/protected/organizations/mod.rs - /api/organizations/*
//
// Same operations as the tenant routes, addressed by organization id.

pub mod organization;

pub use organization::{
    organization_check_slug_post, organization_delete, organization_get,
    organization_get_active, organization_put, organization_set_active_post,
};
