use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::database::models::{
    Invitation, Member, MemberDetail, NewInvitation, NewNote, NewOrganization, NewSubscription,
    NewUser, Note, NoteScope, NoteUpdate, Organization, OrganizationUpdate, PlanChange,
    Subscription, User,
};
use crate::database::{MemoryStore, Store, StoreError, StoreResult};
use crate::services::{resolve_session, AccountService, Session, SignUp};
use crate::types::{InvitationStatus, Role};

/// In-memory store plus development config for service tests
pub struct TestContext {
    pub store: Arc<dyn Store>,
    pub config: Arc<AppConfig>,
}

/// A signed-up user with their current session
#[derive(Debug, Clone)]
pub struct TestAccount {
    pub user: User,
    pub organization: Organization,
    pub token: String,
    pub session: Session,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    pub fn with_store(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            config: Arc::new(AppConfig::development()),
        }
    }

    /// Sign up a user with a personal organization
    pub async fn sign_up(&self, email: &str) -> anyhow::Result<TestAccount> {
        let accounts = AccountService::new(self.store.clone(), self.config.clone());
        let payload = accounts
            .sign_up(SignUp {
                email: email.to_string(),
                password: "test-password".to_string(),
                name: email.split('@').next().unwrap_or("test").to_string(),
                company: None,
            })
            .await?;

        let organization = payload
            .organization
            .ok_or_else(|| anyhow::anyhow!("sign-up created no organization"))?;
        let session = resolve_session(self.store.as_ref(), payload.user.id).await?;

        Ok(TestAccount {
            user: payload.user,
            organization,
            token: payload.token,
            session,
        })
    }

    /// Sign up `email` and add them to `owner`'s organization, active there
    pub async fn join(&self, owner: &TestAccount, email: &str, role: Role) -> anyhow::Result<TestAccount> {
        let mut account = self.sign_up(email).await?;
        self.store
            .create_member(owner.organization.id, account.user.id, role)
            .await?;
        self.store
            .set_active_organization(account.user.id, Some(owner.organization.id))
            .await?;

        account.session = resolve_session(self.store.as_ref(), account.user.id).await?;
        account.organization = owner.organization.clone();
        Ok(account)
    }

    /// Freshly resolved session for `user_id`
    pub async fn session(&self, user_id: Uuid) -> Session {
        match resolve_session(self.store.as_ref(), user_id).await {
            Ok(session) => session,
            Err(e) => panic!("failed to resolve session for {user_id}: {e}"),
        }
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// `MemoryStore` whose subscription writes fail while `fail_subscriptions` is set
#[derive(Default)]
pub struct FailingSubscriptionStore {
    inner: MemoryStore,
    pub fail_subscriptions: AtomicBool,
}

#[async_trait]
impl Store for FailingSubscriptionStore {
    async fn health_check(&self) -> StoreResult<()> {
        self.inner.health_check().await
    }

    async fn create_user(&self, new: NewUser) -> StoreResult<User> {
        self.inner.create_user(new).await
    }
    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        self.inner.find_user_by_id(id).await
    }
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.inner.find_user_by_email(email).await
    }
    async fn set_active_organization(&self, user_id: Uuid, organization_id: Option<Uuid>) -> StoreResult<()> {
        self.inner.set_active_organization(user_id, organization_id).await
    }
    async fn delete_user(&self, id: Uuid) -> StoreResult<User> {
        self.inner.delete_user(id).await
    }

    async fn create_organization(&self, new: NewOrganization, creator_id: Uuid) -> StoreResult<(Organization, Member)> {
        self.inner.create_organization(new, creator_id).await
    }
    async fn find_organization_by_id(&self, id: Uuid) -> StoreResult<Option<Organization>> {
        self.inner.find_organization_by_id(id).await
    }
    async fn find_organization_by_slug(&self, slug: &str) -> StoreResult<Option<Organization>> {
        self.inner.find_organization_by_slug(slug).await
    }
    async fn list_organizations_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Organization>> {
        self.inner.list_organizations_for_user(user_id).await
    }
    async fn update_organization(&self, id: Uuid, update: OrganizationUpdate) -> StoreResult<Organization> {
        self.inner.update_organization(id, update).await
    }
    async fn change_plan(&self, id: Uuid, plan: PlanChange) -> StoreResult<Organization> {
        self.inner.change_plan(id, plan).await
    }
    async fn delete_organization(&self, id: Uuid) -> StoreResult<Organization> {
        self.inner.delete_organization(id).await
    }

    async fn create_member(&self, organization_id: Uuid, user_id: Uuid, role: Role) -> StoreResult<Member> {
        self.inner.create_member(organization_id, user_id, role).await
    }
    async fn find_member(&self, organization_id: Uuid, user_id: Uuid) -> StoreResult<Option<Member>> {
        self.inner.find_member(organization_id, user_id).await
    }
    async fn find_member_by_id(&self, id: Uuid) -> StoreResult<Option<Member>> {
        self.inner.find_member_by_id(id).await
    }
    async fn list_members(&self, organization_id: Uuid) -> StoreResult<Vec<MemberDetail>> {
        self.inner.list_members(organization_id).await
    }
    async fn count_members(&self, organization_id: Uuid) -> StoreResult<i64> {
        self.inner.count_members(organization_id).await
    }
    async fn update_member_role(&self, id: Uuid, role: Role) -> StoreResult<Member> {
        self.inner.update_member_role(id, role).await
    }
    async fn delete_member(&self, id: Uuid) -> StoreResult<Member> {
        self.inner.delete_member(id).await
    }

    async fn create_note(&self, new: NewNote) -> StoreResult<Note> {
        self.inner.create_note(new).await
    }
    async fn find_note(&self, id: Uuid) -> StoreResult<Option<Note>> {
        self.inner.find_note(id).await
    }
    async fn list_notes(&self, organization_id: Uuid, scope: NoteScope) -> StoreResult<Vec<Note>> {
        self.inner.list_notes(organization_id, scope).await
    }
    async fn count_notes(&self, organization_id: Uuid, author_id: Option<Uuid>) -> StoreResult<i64> {
        self.inner.count_notes(organization_id, author_id).await
    }
    async fn update_note(&self, id: Uuid, update: NoteUpdate) -> StoreResult<Note> {
        self.inner.update_note(id, update).await
    }
    async fn delete_note(&self, id: Uuid) -> StoreResult<Note> {
        self.inner.delete_note(id).await
    }

    async fn create_invitation(&self, new: NewInvitation) -> StoreResult<Invitation> {
        self.inner.create_invitation(new).await
    }
    async fn find_invitation(&self, id: Uuid) -> StoreResult<Option<Invitation>> {
        self.inner.find_invitation(id).await
    }
    async fn find_pending_invitation(&self, organization_id: Uuid, email: &str) -> StoreResult<Option<Invitation>> {
        self.inner.find_pending_invitation(organization_id, email).await
    }
    async fn list_invitations(&self, organization_id: Uuid) -> StoreResult<Vec<Invitation>> {
        self.inner.list_invitations(organization_id).await
    }
    async fn list_invitations_for_email(&self, email: &str) -> StoreResult<Vec<Invitation>> {
        self.inner.list_invitations_for_email(email).await
    }
    async fn update_invitation_status(&self, id: Uuid, status: InvitationStatus) -> StoreResult<Invitation> {
        self.inner.update_invitation_status(id, status).await
    }
    async fn refresh_invitation(&self, id: Uuid, role: Role, expires_at: DateTime<Utc>) -> StoreResult<Invitation> {
        self.inner.refresh_invitation(id, role, expires_at).await
    }

    async fn create_subscription(&self, new: NewSubscription) -> StoreResult<Subscription> {
        if self.fail_subscriptions.load(Ordering::SeqCst) {
            return Err(StoreError::QueryError("subscriptions table unavailable".to_string()));
        }
        self.inner.create_subscription(new).await
    }
    async fn find_subscription(&self, organization_id: Uuid) -> StoreResult<Option<Subscription>> {
        self.inner.find_subscription(organization_id).await
    }
    async fn update_subscription_plan(&self, organization_id: Uuid, plan_name: &str, amount: i64) -> StoreResult<Option<Subscription>> {
        self.inner.update_subscription_plan(organization_id, plan_name, amount).await
    }
}
