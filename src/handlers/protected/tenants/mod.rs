// handlers/protected/tenants/mod.rs - /api/tenants/*
//
// Organizations addressed by slug, their members and invitations.

pub mod invitations;
pub mod members;
pub mod tenant;

pub use invitations::{tenant_invitations_get, tenant_invitations_post};
pub use members::{
    member_delete, member_patch, tenant_leave_post, tenant_members_get, tenant_members_post,
};
pub use tenant::{
    tenant_check_slug_post, tenant_delete, tenant_get, tenant_get_active, tenant_put,
    tenant_set_active_post, tenant_upgrade_post, tenant_usage_get, tenants_get, tenants_post,
};
