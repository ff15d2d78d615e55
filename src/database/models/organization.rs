use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use super::invitation::Invitation;
use super::member::MemberDetail;
use crate::types::SubscriptionTier;

/// Tenant record. Every member, note and invitation hangs off one of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub logo: Option<String>,
    pub metadata: Option<Value>,
    #[sqlx(try_from = "String")]
    pub subscription: SubscriptionTier,
    pub max_users: i32,
    pub max_notes: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOrganization {
    pub name: String,
    pub slug: String,
    pub logo: Option<String>,
    pub metadata: Option<Value>,
    pub subscription: SubscriptionTier,
    pub max_users: i32,
    pub max_notes: i32,
}

/// Editable organization fields. Plan fields only change through an upgrade.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationUpdate {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub logo: Option<String>,
    pub metadata: Option<Value>,
}

impl OrganizationUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.slug.is_none() && self.logo.is_none() && self.metadata.is_none()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PlanChange {
    pub subscription: SubscriptionTier,
    pub max_users: i32,
    pub max_notes: i32,
}

/// Organization together with its members and invitations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationDetail {
    #[serde(flatten)]
    pub organization: Organization,
    pub members: Vec<MemberDetail>,
    pub invitations: Vec<Invitation>,
}
