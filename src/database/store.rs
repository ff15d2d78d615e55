use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use super::models::{
    Invitation, Member, MemberDetail, NewInvitation, NewNote, NewOrganization, NewSubscription,
    NewUser, Note, NoteScope, NoteUpdate, Organization, OrganizationUpdate, PlanChange,
    Subscription, User,
};
use crate::types::{InvitationStatus, Role};

/// Errors from the persistence layer
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    UniqueViolation(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Query/mutation interface over the relational schema.
///
/// Each call is its own atomic unit. Nothing spans two calls, so guards that
/// read a count and then write are racy by construction.
#[async_trait]
pub trait Store: Send + Sync {
    async fn health_check(&self) -> StoreResult<()>;

    // Users
    async fn create_user(&self, new: NewUser) -> StoreResult<User>;
    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn set_active_organization(&self, user_id: Uuid, organization_id: Option<Uuid>) -> StoreResult<()>;
    /// Deletes the user with their memberships, notes and sent invitations
    async fn delete_user(&self, id: Uuid) -> StoreResult<User>;

    // Organizations
    /// Creates the organization and its first admin member together
    async fn create_organization(&self, new: NewOrganization, creator_id: Uuid) -> StoreResult<(Organization, Member)>;
    async fn find_organization_by_id(&self, id: Uuid) -> StoreResult<Option<Organization>>;
    async fn find_organization_by_slug(&self, slug: &str) -> StoreResult<Option<Organization>>;
    async fn list_organizations_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Organization>>;
    async fn update_organization(&self, id: Uuid, update: OrganizationUpdate) -> StoreResult<Organization>;
    async fn change_plan(&self, id: Uuid, plan: PlanChange) -> StoreResult<Organization>;
    /// Deletes the organization with everything scoped to it
    async fn delete_organization(&self, id: Uuid) -> StoreResult<Organization>;

    // Members
    async fn create_member(&self, organization_id: Uuid, user_id: Uuid, role: Role) -> StoreResult<Member>;
    async fn find_member(&self, organization_id: Uuid, user_id: Uuid) -> StoreResult<Option<Member>>;
    async fn find_member_by_id(&self, id: Uuid) -> StoreResult<Option<Member>>;
    /// Members of one organization ordered by creation time
    async fn list_members(&self, organization_id: Uuid) -> StoreResult<Vec<MemberDetail>>;
    async fn count_members(&self, organization_id: Uuid) -> StoreResult<i64>;
    async fn update_member_role(&self, id: Uuid, role: Role) -> StoreResult<Member>;
    async fn delete_member(&self, id: Uuid) -> StoreResult<Member>;

    // Notes
    async fn create_note(&self, new: NewNote) -> StoreResult<Note>;
    async fn find_note(&self, id: Uuid) -> StoreResult<Option<Note>>;
    /// Notes of one organization, most recently updated first
    async fn list_notes(&self, organization_id: Uuid, scope: NoteScope) -> StoreResult<Vec<Note>>;
    async fn count_notes(&self, organization_id: Uuid, author_id: Option<Uuid>) -> StoreResult<i64>;
    async fn update_note(&self, id: Uuid, update: NoteUpdate) -> StoreResult<Note>;
    async fn delete_note(&self, id: Uuid) -> StoreResult<Note>;

    // Invitations
    async fn create_invitation(&self, new: NewInvitation) -> StoreResult<Invitation>;
    async fn find_invitation(&self, id: Uuid) -> StoreResult<Option<Invitation>>;
    async fn find_pending_invitation(&self, organization_id: Uuid, email: &str) -> StoreResult<Option<Invitation>>;
    async fn list_invitations(&self, organization_id: Uuid) -> StoreResult<Vec<Invitation>>;
    async fn list_invitations_for_email(&self, email: &str) -> StoreResult<Vec<Invitation>>;
    async fn update_invitation_status(&self, id: Uuid, status: InvitationStatus) -> StoreResult<Invitation>;
    async fn refresh_invitation(&self, id: Uuid, role: Role, expires_at: DateTime<Utc>) -> StoreResult<Invitation>;

    // Subscriptions
    async fn create_subscription(&self, new: NewSubscription) -> StoreResult<Subscription>;
    async fn find_subscription(&self, organization_id: Uuid) -> StoreResult<Option<Subscription>>;
    async fn update_subscription_plan(&self, organization_id: Uuid, plan_name: &str, amount: i64) -> StoreResult<Option<Subscription>>;
}

/// Emails are compared case-insensitively everywhere
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}
