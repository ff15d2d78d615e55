use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use super::error::{ServiceError, ServiceResult};
use super::permissions::{require_admin_of, require_member_of};
use super::plans::{self, usage_percentage, Limit};
use super::session::Session;
use crate::database::models::{
    Member, NewOrganization, NewSubscription, Organization, OrganizationDetail, OrganizationUpdate,
};
use crate::database::{Store, StoreError};
use crate::types::SubscriptionTier;

const MAX_SLUG_LENGTH: usize = 64;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrganization {
    pub name: String,
    pub slug: String,
    pub logo: Option<String>,
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlugAvailability {
    pub slug: String,
    pub available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetric {
    pub count: i64,
    /// Stored limit, `1` meaning unlimited
    pub limit: i32,
    pub unlimited: bool,
    pub percentage: u32,
}

impl UsageMetric {
    fn new(count: i64, stored_max: i32) -> Self {
        Self {
            count,
            limit: stored_max,
            unlimited: Limit::from_stored(stored_max) == Limit::Unlimited,
            percentage: usage_percentage(count, stored_max),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub organization_id: Uuid,
    pub subscription: SubscriptionTier,
    pub members: UsageMetric,
    pub notes: UsageMetric,
}

/// Lowercase, ASCII alphanumerics and single hyphens
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.len() <= MAX_SLUG_LENGTH
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--")
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Turn a display name into a slug candidate
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    slug.chars().take(MAX_SLUG_LENGTH).collect::<String>().trim_end_matches('-').to_string()
}

/// Create an organization on the free plan with `creator_id` as its admin and
/// a free subscription record running for one year. Nothing is left behind
/// when the subscription cannot be written.
pub async fn provision_organization(
    store: &dyn Store,
    creator_id: Uuid,
    input: CreateOrganization,
) -> ServiceResult<(Organization, Member)> {
    let plan = plans::plan_for(SubscriptionTier::Free);
    let new = NewOrganization {
        name: input.name,
        slug: input.slug,
        logo: input.logo,
        metadata: input.metadata,
        subscription: plan.id,
        max_users: plan.max_users,
        max_notes: plan.max_notes,
    };

    let (organization, member) = match store.create_organization(new, creator_id).await {
        Ok(created) => created,
        Err(StoreError::UniqueViolation(_)) => {
            return Err(ServiceError::conflict("Slug is already taken"));
        }
        Err(e) => return Err(e.into()),
    };

    let now = Utc::now();
    let subscription = store
        .create_subscription(NewSubscription {
            organization_id: organization.id,
            external_subscription_id: format!("free_{}", organization.id.simple()),
            status: "active".to_string(),
            plan_name: plan.id.as_str().to_string(),
            amount: plan.price_cents,
            currency: "usd".to_string(),
            current_period_start: now,
            current_period_end: now + Duration::days(365),
        })
        .await;
    if let Err(e) = subscription {
        tracing::error!("Subscription setup failed for {}: {}", organization.slug, e);
        if let Err(cleanup) = store.delete_organization(organization.id).await {
            tracing::error!("Failed to remove organization {}: {}", organization.id, cleanup);
        }
        return Err(e.into());
    }

    tracing::info!("Provisioned organization {} ({})", organization.slug, organization.id);
    Ok((organization, member))
}

/// Organization CRUD, active-organization selection and plan changes
pub struct OrganizationService {
    store: Arc<dyn Store>,
}

impl OrganizationService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list_for_user(&self, session: &Session) -> ServiceResult<Vec<Organization>> {
        Ok(self.store.list_organizations_for_user(session.user_id()).await?)
    }

    /// Create an organization owned by the caller and make it active
    pub async fn create(&self, session: &Session, input: CreateOrganization) -> ServiceResult<Organization> {
        if input.name.trim().is_empty() {
            return Err(ServiceError::validation("name must not be empty"));
        }
        if !is_valid_slug(&input.slug) {
            return Err(ServiceError::validation(
                "slug may only contain lowercase letters, digits and single hyphens",
            ));
        }

        let (organization, _) = provision_organization(self.store.as_ref(), session.user_id(), input).await?;
        self.store
            .set_active_organization(session.user_id(), Some(organization.id))
            .await?;
        Ok(organization)
    }

    pub async fn check_slug(&self, slug: &str) -> ServiceResult<SlugAvailability> {
        let available = is_valid_slug(slug) && self.store.find_organization_by_slug(slug).await?.is_none();
        Ok(SlugAvailability {
            slug: slug.to_string(),
            available,
        })
    }

    pub async fn find_by_slug(&self, slug: &str) -> ServiceResult<Organization> {
        self.store
            .find_organization_by_slug(slug)
            .await?
            .ok_or_else(ServiceError::tenant_not_found)
    }

    pub async fn find_by_id(&self, id: Uuid) -> ServiceResult<Organization> {
        self.store
            .find_organization_by_id(id)
            .await?
            .ok_or_else(ServiceError::tenant_not_found)
    }

    /// Organization by slug, 401 unless the caller administers it
    pub async fn find_administered_by_slug(&self, session: &Session, slug: &str) -> ServiceResult<Organization> {
        let organization = self.find_by_slug(slug).await?;
        require_admin_of(self.store.as_ref(), session, organization.id).await?;
        Ok(organization)
    }

    pub async fn find_administered_by_id(&self, session: &Session, id: Uuid) -> ServiceResult<Organization> {
        let organization = self.find_by_id(id).await?;
        require_admin_of(self.store.as_ref(), session, organization.id).await?;
        Ok(organization)
    }

    pub fn get_active(&self, session: &Session) -> Option<Organization> {
        session.active_organization.clone()
    }

    pub async fn set_active(&self, session: &Session, organization_id: Uuid) -> ServiceResult<Organization> {
        let organization = self.find_by_id(organization_id).await?;
        require_member_of(self.store.as_ref(), session, organization.id).await?;

        self.store
            .set_active_organization(session.user_id(), Some(organization.id))
            .await?;
        tracing::info!("User {} switched to organization {}", session.user_id(), organization.slug);
        Ok(organization)
    }

    /// Organization with members and invitations, for members only.
    /// `members_limit` truncates the member list.
    pub async fn detail(
        &self,
        session: &Session,
        organization: Organization,
        members_limit: Option<usize>,
    ) -> ServiceResult<OrganizationDetail> {
        require_member_of(self.store.as_ref(), session, organization.id).await?;

        let mut members = self.store.list_members(organization.id).await?;
        if let Some(limit) = members_limit {
            members.truncate(limit);
        }
        let invitations = self.store.list_invitations(organization.id).await?;

        Ok(OrganizationDetail {
            organization,
            members,
            invitations,
        })
    }

    pub async fn update(
        &self,
        session: &Session,
        organization: &Organization,
        update: OrganizationUpdate,
    ) -> ServiceResult<Organization> {
        require_admin_of(self.store.as_ref(), session, organization.id).await?;

        if update.is_empty() {
            return Err(ServiceError::validation("No updatable fields in data"));
        }
        if let Some(name) = &update.name {
            if name.trim().is_empty() {
                return Err(ServiceError::validation("name must not be empty"));
            }
        }
        if let Some(slug) = &update.slug {
            if !is_valid_slug(slug) {
                return Err(ServiceError::validation(
                    "slug may only contain lowercase letters, digits and single hyphens",
                ));
            }
        }

        match self.store.update_organization(organization.id, update).await {
            Ok(updated) => {
                tracing::info!("Updated organization {}", updated.id);
                Ok(updated)
            }
            Err(StoreError::UniqueViolation(_)) => Err(ServiceError::conflict("Slug is already taken")),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn delete(&self, session: &Session, organization: &Organization) -> ServiceResult<Organization> {
        require_admin_of(self.store.as_ref(), session, organization.id).await?;

        let deleted = self.store.delete_organization(organization.id).await?;
        tracing::info!("Deleted organization {} ({})", deleted.slug, deleted.id);
        Ok(deleted)
    }

    /// Move the organization to `tier`, taking limits from the plan catalogue
    pub async fn upgrade(
        &self,
        session: &Session,
        organization: &Organization,
        tier: SubscriptionTier,
    ) -> ServiceResult<Organization> {
        require_admin_of(self.store.as_ref(), session, organization.id).await?;

        let plan = plans::plan_for(tier);
        let updated = self.store.change_plan(organization.id, plan.plan_change()).await?;

        let synced = self
            .store
            .update_subscription_plan(organization.id, plan.id.as_str(), plan.price_cents)
            .await?;
        if synced.is_none() {
            let now = Utc::now();
            self.store
                .create_subscription(NewSubscription {
                    organization_id: organization.id,
                    external_subscription_id: format!("{}_{}", plan.id, organization.id.simple()),
                    status: "active".to_string(),
                    plan_name: plan.id.as_str().to_string(),
                    amount: plan.price_cents,
                    currency: "usd".to_string(),
                    current_period_start: now,
                    current_period_end: now + Duration::days(30),
                })
                .await?;
        }

        tracing::info!(
            "Organization {} moved from {} to {}",
            organization.slug,
            organization.subscription,
            tier
        );
        Ok(updated)
    }

    pub async fn usage(&self, session: &Session, organization: &Organization) -> ServiceResult<Usage> {
        require_member_of(self.store.as_ref(), session, organization.id).await?;

        let member_count = self.store.count_members(organization.id).await?;
        let note_count = self.store.count_notes(organization.id, None).await?;

        Ok(Usage {
            organization_id: organization.id,
            subscription: organization.subscription,
            members: UsageMetric::new(member_count, organization.max_users),
            notes: UsageMetric::new(note_count, organization.max_notes),
        })
    }
}
