use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{ServiceError, ServiceResult};
use crate::database::models::{Organization, User};
use crate::database::Store;
use crate::types::Role;

/// Caller identity for one request, resolved from the bearer token.
///
/// `role` is the caller's role in `active_organization`, if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user: User,
    pub active_organization: Option<Organization>,
    pub role: Option<Role>,
}

impl Session {
    pub fn user_id(&self) -> Uuid {
        self.user.id
    }

    pub fn email(&self) -> &str {
        &self.user.email
    }

    pub fn active_organization_id(&self) -> Option<Uuid> {
        self.active_organization.as_ref().map(|o| o.id)
    }

    /// Active organization or the 404 every tenant-scoped route returns
    pub fn require_active_organization(&self) -> ServiceResult<&Organization> {
        self.active_organization
            .as_ref()
            .ok_or_else(ServiceError::tenant_not_found)
    }
}

/// Load the user and settle the active organization.
///
/// A stored active organization the user no longer belongs to is ignored and
/// the first membership is used instead.
pub async fn resolve_session(store: &dyn Store, user_id: Uuid) -> ServiceResult<Session> {
    let user = store
        .find_user_by_id(user_id)
        .await?
        .ok_or_else(|| ServiceError::unauthorized("User not found"))?;

    if let Some(org_id) = user.active_organization_id {
        if let Some(member) = store.find_member(org_id, user.id).await? {
            if let Some(org) = store.find_organization_by_id(org_id).await? {
                return Ok(Session {
                    user,
                    active_organization: Some(org),
                    role: Some(member.role),
                });
            }
        }
    }

    let first = store.list_organizations_for_user(user.id).await?.into_iter().next();
    let Some(org) = first else {
        tracing::debug!("User {} has no organizations", user.id);
        return Ok(Session {
            user,
            active_organization: None,
            role: None,
        });
    };

    let role = store.find_member(org.id, user.id).await?.map(|m| m.role);
    Ok(Session {
        user,
        active_organization: Some(org),
        role,
    })
}
