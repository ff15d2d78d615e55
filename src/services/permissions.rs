use serde::Serialize;
use uuid::Uuid;

use super::error::{ServiceError, ServiceResult};
use super::session::Session;
use crate::database::models::Member;
use crate::database::Store;
use crate::types::Role;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionCheck {
    pub success: bool,
    pub error: Option<String>,
}

/// Whether the caller holds `admin` in their active organization
pub fn is_admin(session: &Session) -> PermissionCheck {
    match session.role {
        Some(Role::Admin) => PermissionCheck {
            success: true,
            error: None,
        },
        Some(Role::Member) => PermissionCheck {
            success: false,
            error: Some("Admin role required".to_string()),
        },
        None => PermissionCheck {
            success: false,
            error: Some("No role in the active organization".to_string()),
        },
    }
}

/// Caller's membership in `organization_id`, 401 when there is none
pub async fn require_member_of(store: &dyn Store, session: &Session, organization_id: Uuid) -> ServiceResult<Member> {
    store
        .find_member(organization_id, session.user_id())
        .await?
        .ok_or_else(|| {
            tracing::warn!(
                "User {} is not a member of organization {}",
                session.user_id(),
                organization_id
            );
            ServiceError::unauthorized("Not a member of this organization")
        })
}

/// Caller's membership in `organization_id`, 401 unless it is `admin`
pub async fn require_admin_of(store: &dyn Store, session: &Session, organization_id: Uuid) -> ServiceResult<Member> {
    let member = require_member_of(store, session, organization_id).await?;
    if member.role != Role::Admin {
        tracing::warn!(
            "User {} is not an admin of organization {}",
            session.user_id(),
            organization_id
        );
        return Err(ServiceError::unauthorized("Admin role required"));
    }
    Ok(member)
}
