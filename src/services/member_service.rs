use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::error::{ServiceError, ServiceResult};
use super::permissions::{require_admin_of, require_member_of};
use super::plans::check_member_quota;
use super::session::Session;
use crate::database::models::{Member, MemberDetail, Organization};
use crate::database::{Store, StoreError};
use crate::types::Role;

pub const DEFAULT_MEMBERS_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MemberSortField {
    #[default]
    CreatedAt,
    Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    Eq,
    Ne,
    Contains,
}

/// Query options for member listing
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMembersQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub sort_by: Option<MemberSortField>,
    pub sort_direction: Option<SortDirection>,
    /// Only `role` is filterable
    pub filter_field: Option<String>,
    pub filter_operator: Option<FilterOperator>,
    pub filter_value: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberPage {
    pub members: Vec<MemberDetail>,
    /// Matches before limit/offset
    pub total: usize,
}

fn apply_query(mut members: Vec<MemberDetail>, query: &ListMembersQuery) -> ServiceResult<MemberPage> {
    if let Some(field) = query.filter_field.as_deref() {
        if field != "role" {
            return Err(ServiceError::validation(format!("Cannot filter members by '{}'", field)));
        }
        let value = query.filter_value.clone().unwrap_or_default().to_ascii_lowercase();
        let operator = query.filter_operator.unwrap_or(FilterOperator::Eq);
        members.retain(|m| {
            let role = m.role.as_str();
            match operator {
                FilterOperator::Eq => role == value,
                FilterOperator::Ne => role != value,
                FilterOperator::Contains => role.contains(&value),
            }
        });
    }

    match query.sort_by.unwrap_or_default() {
        MemberSortField::CreatedAt => members.sort_by_key(|m| m.created_at),
        MemberSortField::Role => members.sort_by(|a, b| {
            a.role.as_str().cmp(b.role.as_str()).then(a.created_at.cmp(&b.created_at))
        }),
    }
    if query.sort_direction.unwrap_or_default() == SortDirection::Desc {
        members.reverse();
    }

    let total = members.len();
    let members = members
        .into_iter()
        .skip(query.offset.unwrap_or(0))
        .take(query.limit.unwrap_or(DEFAULT_MEMBERS_LIMIT))
        .collect();

    Ok(MemberPage { members, total })
}

/// Membership management inside one organization
pub struct MemberService {
    store: Arc<dyn Store>,
}

impl MemberService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list(
        &self,
        session: &Session,
        organization: &Organization,
        query: &ListMembersQuery,
    ) -> ServiceResult<MemberPage> {
        require_member_of(self.store.as_ref(), session, organization.id).await?;
        let members = self.store.list_members(organization.id).await?;
        apply_query(members, query)
    }

    /// Add an existing user directly, subject to the member quota
    pub async fn add(
        &self,
        session: &Session,
        organization: &Organization,
        user_id: Uuid,
        role: Role,
    ) -> ServiceResult<Member> {
        require_admin_of(self.store.as_ref(), session, organization.id).await?;

        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User not found"))?;
        if self.store.find_member(organization.id, user.id).await?.is_some() {
            return Err(ServiceError::conflict("User is already a member"));
        }

        let count = self.store.count_members(organization.id).await?;
        check_member_quota(organization, count)?;

        let member = match self.store.create_member(organization.id, user.id, role).await {
            Ok(member) => member,
            Err(StoreError::UniqueViolation(_)) => {
                return Err(ServiceError::conflict("User is already a member"));
            }
            Err(e) => return Err(e.into()),
        };
        tracing::info!("Added {} to organization {} as {}", user.email, organization.slug, role);
        Ok(member)
    }

    pub async fn remove(
        &self,
        session: &Session,
        organization: &Organization,
        member_id_or_email: &str,
    ) -> ServiceResult<Member> {
        require_admin_of(self.store.as_ref(), session, organization.id).await?;

        let member = self.resolve(organization, member_id_or_email).await?;
        self.ensure_admin_remains(organization, &member).await?;

        let removed = self.store.delete_member(member.id).await?;
        self.clear_active_if(removed.user_id, organization.id).await?;
        tracing::info!("Removed member {} from organization {}", removed.id, organization.slug);
        Ok(removed)
    }

    pub async fn update_role(
        &self,
        session: &Session,
        organization: &Organization,
        member_id_or_email: &str,
        role: Role,
    ) -> ServiceResult<Member> {
        require_admin_of(self.store.as_ref(), session, organization.id).await?;

        let member = self.resolve(organization, member_id_or_email).await?;
        if member.role == role {
            return Ok(member);
        }
        if role != Role::Admin {
            self.ensure_admin_remains(organization, &member).await?;
        }

        let updated = self.store.update_member_role(member.id, role).await?;
        tracing::info!("Member {} of {} is now {}", updated.id, organization.slug, role);
        Ok(updated)
    }

    /// Caller leaves the organization
    pub async fn leave(&self, session: &Session, organization: &Organization) -> ServiceResult<Member> {
        let member = require_member_of(self.store.as_ref(), session, organization.id).await?;
        self.ensure_admin_remains(organization, &member).await?;

        let removed = self.store.delete_member(member.id).await?;
        self.clear_active_if(removed.user_id, organization.id).await?;
        tracing::info!("User {} left organization {}", session.user_id(), organization.slug);
        Ok(removed)
    }

    /// A member id, or the email of a member's user
    async fn resolve(&self, organization: &Organization, member_id_or_email: &str) -> ServiceResult<Member> {
        let key = member_id_or_email.trim();
        let member = if let Ok(id) = Uuid::parse_str(key) {
            self.store
                .find_member_by_id(id)
                .await?
                .filter(|m| m.organization_id == organization.id)
        } else if key.contains('@') {
            match self.store.find_user_by_email(key).await? {
                Some(user) => self.store.find_member(organization.id, user.id).await?,
                None => None,
            }
        } else {
            return Err(ServiceError::validation("Expected a member id or an email"));
        };

        member.ok_or_else(|| ServiceError::not_found("Member not found"))
    }

    /// Refuse to drop the last admin of an organization
    async fn ensure_admin_remains(&self, organization: &Organization, leaving: &Member) -> ServiceResult<()> {
        if leaving.role != Role::Admin {
            return Ok(());
        }
        let admins = self
            .store
            .list_members(organization.id)
            .await?
            .into_iter()
            .filter(|m| m.role == Role::Admin)
            .count();
        if admins <= 1 {
            return Err(ServiceError::conflict("An organization must keep at least one admin"));
        }
        Ok(())
    }

    async fn clear_active_if(&self, user_id: Uuid, organization_id: Uuid) -> ServiceResult<()> {
        let Some(user) = self.store.find_user_by_id(user_id).await? else {
            return Ok(());
        };
        if user.active_organization_id == Some(organization_id) {
            self.store.set_active_organization(user_id, None).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestContext;

    #[tokio::test]
    async fn add_respects_member_quota() {
        let ctx = TestContext::new();
        let owner = ctx.sign_up("owner@example.com").await.unwrap();
        let service = MemberService::new(ctx.store.clone());

        for email in ["b@example.com", "c@example.com"] {
            let user = ctx.sign_up(email).await.unwrap().user;
            service
                .add(&owner.session, &owner.organization, user.id, Role::Member)
                .await
                .unwrap();
        }

        let fourth = ctx.sign_up("d@example.com").await.unwrap().user;
        let err = service
            .add(&owner.session, &owner.organization, fourth.id, Role::Member)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::QuotaExceeded { .. }));
    }

    #[tokio::test]
    async fn members_cannot_manage_members() {
        let ctx = TestContext::new();
        let owner = ctx.sign_up("owner@example.com").await.unwrap();
        let member = ctx.join(&owner, "member@example.com", Role::Member).await.unwrap();
        let service = MemberService::new(ctx.store.clone());

        let err = service
            .remove(&member.session, &owner.organization, "owner@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn last_admin_is_protected() {
        let ctx = TestContext::new();
        let owner = ctx.sign_up("owner@example.com").await.unwrap();
        let service = MemberService::new(ctx.store.clone());

        let err = service.leave(&owner.session, &owner.organization).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let err = service
            .update_role(&owner.session, &owner.organization, "owner@example.com", Role::Member)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn removal_clears_active_organization() {
        let ctx = TestContext::new();
        let owner = ctx.sign_up("owner@example.com").await.unwrap();
        let member = ctx.join(&owner, "member@example.com", Role::Member).await.unwrap();
        ctx.store
            .set_active_organization(member.user.id, Some(owner.organization.id))
            .await
            .unwrap();

        let service = MemberService::new(ctx.store.clone());
        service
            .remove(&owner.session, &owner.organization, &member.user.email)
            .await
            .unwrap();

        let user = ctx.store.find_user_by_id(member.user.id).await.unwrap().unwrap();
        assert_ne!(user.active_organization_id, Some(owner.organization.id));
    }

    #[tokio::test]
    async fn listing_filters_sorts_and_pages() {
        let ctx = TestContext::new();
        let owner = ctx.sign_up("owner@example.com").await.unwrap();
        ctx.join(&owner, "m1@example.com", Role::Member).await.unwrap();
        ctx.join(&owner, "m2@example.com", Role::Member).await.unwrap();
        let service = MemberService::new(ctx.store.clone());

        let query = ListMembersQuery {
            filter_field: Some("role".to_string()),
            filter_operator: Some(FilterOperator::Eq),
            filter_value: Some("member".to_string()),
            limit: Some(1),
            ..Default::default()
        };
        let page = service.list(&owner.session, &owner.organization, &query).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.members.len(), 1);
        assert_eq!(page.members[0].email, "m1@example.com");

        let query = ListMembersQuery {
            sort_by: Some(MemberSortField::Role),
            sort_direction: Some(SortDirection::Asc),
            ..Default::default()
        };
        let page = service.list(&owner.session, &owner.organization, &query).await.unwrap();
        assert_eq!(page.members[0].role, Role::Admin);
    }
}
