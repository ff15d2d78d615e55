use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{
    Invitation, Member, MemberDetail, NewInvitation, NewNote, NewOrganization, NewSubscription,
    NewUser, Note, NoteScope, NoteUpdate, Organization, OrganizationUpdate, PlanChange,
    Subscription, User,
};
use super::store::{normalize_email, Store, StoreError, StoreResult};
use crate::types::{InvitationStatus, Role};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    organizations: HashMap<Uuid, Organization>,
    members: HashMap<Uuid, Member>,
    notes: HashMap<Uuid, Note>,
    invitations: HashMap<Uuid, Invitation>,
    subscriptions: HashMap<Uuid, Subscription>,
}

impl Tables {
    fn slug_taken(&self, slug: &str, except: Option<Uuid>) -> bool {
        self.organizations
            .values()
            .any(|o| o.slug == slug && Some(o.id) != except)
    }

    fn member_detail(&self, member: &Member) -> MemberDetail {
        let (email, name) = self
            .users
            .get(&member.user_id)
            .map(|u| (u.email.clone(), u.name.clone()))
            .unwrap_or_default();

        MemberDetail {
            id: member.id,
            organization_id: member.organization_id,
            user_id: member.user_id,
            role: member.role,
            created_at: member.created_at,
            email,
            name,
        }
    }
}

/// Store kept entirely in process memory.
///
/// Mirrors the Postgres schema constraints (unique slug, email and membership,
/// cascading deletes) so it can stand in for the database in tests and local runs.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn create_user(&self, new: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        let email = normalize_email(&new.email);
        if tables.users.values().any(|u| u.email == email) {
            return Err(StoreError::UniqueViolation(format!("user email '{}'", email)));
        }

        let user = User {
            id: Uuid::new_v4(),
            name: new.name,
            email,
            password_hash: new.password_hash,
            active_organization_id: None,
            created_at: Utc::now(),
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let email = normalize_email(email);
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn set_active_organization(&self, user_id: Uuid, organization_id: Option<Uuid>) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(org_id) = organization_id {
            if !tables.organizations.contains_key(&org_id) {
                return Err(StoreError::NotFound(format!("organization {}", org_id)));
            }
        }
        let user = tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", user_id)))?;
        user.active_organization_id = organization_id;
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .remove(&id)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", id)))?;

        tables.members.retain(|_, m| m.user_id != id);
        tables.notes.retain(|_, n| n.author_id != id);
        tables.invitations.retain(|_, i| i.inviter_id != id);
        Ok(user)
    }

    async fn create_organization(&self, new: NewOrganization, creator_id: Uuid) -> StoreResult<(Organization, Member)> {
        let mut tables = self.tables.write().await;
        if tables.slug_taken(&new.slug, None) {
            return Err(StoreError::UniqueViolation(format!("organization slug '{}'", new.slug)));
        }
        if !tables.users.contains_key(&creator_id) {
            return Err(StoreError::NotFound(format!("user {}", creator_id)));
        }

        let now = Utc::now();
        let organization = Organization {
            id: Uuid::new_v4(),
            name: new.name,
            slug: new.slug,
            logo: new.logo,
            metadata: new.metadata,
            subscription: new.subscription,
            max_users: new.max_users,
            max_notes: new.max_notes,
            created_at: now,
        };
        let member = Member {
            id: Uuid::new_v4(),
            organization_id: organization.id,
            user_id: creator_id,
            role: Role::Admin,
            created_at: now,
        };

        tables.organizations.insert(organization.id, organization.clone());
        tables.members.insert(member.id, member.clone());
        Ok((organization, member))
    }

    async fn find_organization_by_id(&self, id: Uuid) -> StoreResult<Option<Organization>> {
        Ok(self.tables.read().await.organizations.get(&id).cloned())
    }

    async fn find_organization_by_slug(&self, slug: &str) -> StoreResult<Option<Organization>> {
        let tables = self.tables.read().await;
        Ok(tables.organizations.values().find(|o| o.slug == slug).cloned())
    }

    async fn list_organizations_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Organization>> {
        let tables = self.tables.read().await;
        let mut memberships: Vec<&Member> = tables
            .members
            .values()
            .filter(|m| m.user_id == user_id)
            .collect();
        memberships.sort_by_key(|m| m.created_at);

        Ok(memberships
            .into_iter()
            .filter_map(|m| tables.organizations.get(&m.organization_id).cloned())
            .collect())
    }

    async fn update_organization(&self, id: Uuid, update: OrganizationUpdate) -> StoreResult<Organization> {
        let mut tables = self.tables.write().await;
        if let Some(slug) = &update.slug {
            if tables.slug_taken(slug, Some(id)) {
                return Err(StoreError::UniqueViolation(format!("organization slug '{}'", slug)));
            }
        }

        let org = tables
            .organizations
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("organization {}", id)))?;
        if let Some(name) = update.name {
            org.name = name;
        }
        if let Some(slug) = update.slug {
            org.slug = slug;
        }
        if let Some(logo) = update.logo {
            org.logo = Some(logo);
        }
        if let Some(metadata) = update.metadata {
            org.metadata = Some(metadata);
        }
        Ok(org.clone())
    }

    async fn change_plan(&self, id: Uuid, plan: PlanChange) -> StoreResult<Organization> {
        let mut tables = self.tables.write().await;
        let org = tables
            .organizations
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("organization {}", id)))?;
        org.subscription = plan.subscription;
        org.max_users = plan.max_users;
        org.max_notes = plan.max_notes;
        Ok(org.clone())
    }

    async fn delete_organization(&self, id: Uuid) -> StoreResult<Organization> {
        let mut tables = self.tables.write().await;
        let org = tables
            .organizations
            .remove(&id)
            .ok_or_else(|| StoreError::NotFound(format!("organization {}", id)))?;

        tables.members.retain(|_, m| m.organization_id != id);
        tables.notes.retain(|_, n| n.organization_id != id);
        tables.invitations.retain(|_, i| i.organization_id != id);
        tables.subscriptions.retain(|_, s| s.organization_id != id);
        for user in tables.users.values_mut() {
            if user.active_organization_id == Some(id) {
                user.active_organization_id = None;
            }
        }
        Ok(org)
    }

    async fn create_member(&self, organization_id: Uuid, user_id: Uuid, role: Role) -> StoreResult<Member> {
        let mut tables = self.tables.write().await;
        if !tables.organizations.contains_key(&organization_id) {
            return Err(StoreError::NotFound(format!("organization {}", organization_id)));
        }
        if !tables.users.contains_key(&user_id) {
            return Err(StoreError::NotFound(format!("user {}", user_id)));
        }
        if tables
            .members
            .values()
            .any(|m| m.organization_id == organization_id && m.user_id == user_id)
        {
            return Err(StoreError::UniqueViolation(format!(
                "member {} of organization {}",
                user_id, organization_id
            )));
        }

        let member = Member {
            id: Uuid::new_v4(),
            organization_id,
            user_id,
            role,
            created_at: Utc::now(),
        };
        tables.members.insert(member.id, member.clone());
        Ok(member)
    }

    async fn find_member(&self, organization_id: Uuid, user_id: Uuid) -> StoreResult<Option<Member>> {
        let tables = self.tables.read().await;
        Ok(tables
            .members
            .values()
            .find(|m| m.organization_id == organization_id && m.user_id == user_id)
            .cloned())
    }

    async fn find_member_by_id(&self, id: Uuid) -> StoreResult<Option<Member>> {
        Ok(self.tables.read().await.members.get(&id).cloned())
    }

    async fn list_members(&self, organization_id: Uuid) -> StoreResult<Vec<MemberDetail>> {
        let tables = self.tables.read().await;
        let mut members: Vec<MemberDetail> = tables
            .members
            .values()
            .filter(|m| m.organization_id == organization_id)
            .map(|m| tables.member_detail(m))
            .collect();
        members.sort_by_key(|m| m.created_at);
        Ok(members)
    }

    async fn count_members(&self, organization_id: Uuid) -> StoreResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables
            .members
            .values()
            .filter(|m| m.organization_id == organization_id)
            .count() as i64)
    }

    async fn update_member_role(&self, id: Uuid, role: Role) -> StoreResult<Member> {
        let mut tables = self.tables.write().await;
        let member = tables
            .members
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("member {}", id)))?;
        member.role = role;
        Ok(member.clone())
    }

    async fn delete_member(&self, id: Uuid) -> StoreResult<Member> {
        let mut tables = self.tables.write().await;
        tables
            .members
            .remove(&id)
            .ok_or_else(|| StoreError::NotFound(format!("member {}", id)))
    }

    async fn create_note(&self, new: NewNote) -> StoreResult<Note> {
        let mut tables = self.tables.write().await;
        if !tables.organizations.contains_key(&new.organization_id) {
            return Err(StoreError::NotFound(format!("organization {}", new.organization_id)));
        }

        let now = Utc::now();
        let note = Note {
            id: Uuid::new_v4(),
            organization_id: new.organization_id,
            author_id: new.author_id,
            title: new.title,
            content: new.content,
            tags: new.tags,
            is_public: new.is_public,
            created_at: now,
            updated_at: now,
        };
        tables.notes.insert(note.id, note.clone());
        Ok(note)
    }

    async fn find_note(&self, id: Uuid) -> StoreResult<Option<Note>> {
        Ok(self.tables.read().await.notes.get(&id).cloned())
    }

    async fn list_notes(&self, organization_id: Uuid, scope: NoteScope) -> StoreResult<Vec<Note>> {
        let tables = self.tables.read().await;
        let mut notes: Vec<Note> = tables
            .notes
            .values()
            .filter(|n| n.organization_id == organization_id)
            .filter(|n| match scope {
                NoteScope::Organization => true,
                NoteScope::AuthorOrPublic(author) => n.author_id == author || n.is_public,
            })
            .cloned()
            .collect();
        notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(notes)
    }

    async fn count_notes(&self, organization_id: Uuid, author_id: Option<Uuid>) -> StoreResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables
            .notes
            .values()
            .filter(|n| n.organization_id == organization_id)
            .filter(|n| author_id.map_or(true, |a| n.author_id == a))
            .count() as i64)
    }

    async fn update_note(&self, id: Uuid, update: NoteUpdate) -> StoreResult<Note> {
        let mut tables = self.tables.write().await;
        let note = tables
            .notes
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("note {}", id)))?;
        if let Some(title) = update.title {
            note.title = title;
        }
        if let Some(content) = update.content {
            note.content = content;
        }
        if let Some(tags) = update.tags {
            note.tags = tags;
        }
        if let Some(is_public) = update.is_public {
            note.is_public = is_public;
        }
        note.updated_at = Utc::now();
        Ok(note.clone())
    }

    async fn delete_note(&self, id: Uuid) -> StoreResult<Note> {
        let mut tables = self.tables.write().await;
        tables
            .notes
            .remove(&id)
            .ok_or_else(|| StoreError::NotFound(format!("note {}", id)))
    }

    async fn create_invitation(&self, new: NewInvitation) -> StoreResult<Invitation> {
        let mut tables = self.tables.write().await;
        if !tables.organizations.contains_key(&new.organization_id) {
            return Err(StoreError::NotFound(format!("organization {}", new.organization_id)));
        }

        let invitation = Invitation {
            id: Uuid::new_v4(),
            organization_id: new.organization_id,
            email: normalize_email(&new.email),
            role: new.role,
            status: InvitationStatus::Pending,
            inviter_id: new.inviter_id,
            expires_at: new.expires_at,
            created_at: Utc::now(),
        };
        tables.invitations.insert(invitation.id, invitation.clone());
        Ok(invitation)
    }

    async fn find_invitation(&self, id: Uuid) -> StoreResult<Option<Invitation>> {
        Ok(self.tables.read().await.invitations.get(&id).cloned())
    }

    async fn find_pending_invitation(&self, organization_id: Uuid, email: &str) -> StoreResult<Option<Invitation>> {
        let email = normalize_email(email);
        let tables = self.tables.read().await;
        Ok(tables
            .invitations
            .values()
            .find(|i| {
                i.organization_id == organization_id
                    && i.email == email
                    && i.status == InvitationStatus::Pending
            })
            .cloned())
    }

    async fn list_invitations(&self, organization_id: Uuid) -> StoreResult<Vec<Invitation>> {
        let tables = self.tables.read().await;
        let mut invitations: Vec<Invitation> = tables
            .invitations
            .values()
            .filter(|i| i.organization_id == organization_id)
            .cloned()
            .collect();
        invitations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(invitations)
    }

    async fn list_invitations_for_email(&self, email: &str) -> StoreResult<Vec<Invitation>> {
        let email = normalize_email(email);
        let tables = self.tables.read().await;
        let mut invitations: Vec<Invitation> = tables
            .invitations
            .values()
            .filter(|i| i.email == email)
            .cloned()
            .collect();
        invitations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(invitations)
    }

    async fn update_invitation_status(&self, id: Uuid, status: InvitationStatus) -> StoreResult<Invitation> {
        let mut tables = self.tables.write().await;
        let invitation = tables
            .invitations
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("invitation {}", id)))?;
        invitation.status = status;
        Ok(invitation.clone())
    }

    async fn refresh_invitation(&self, id: Uuid, role: Role, expires_at: DateTime<Utc>) -> StoreResult<Invitation> {
        let mut tables = self.tables.write().await;
        let invitation = tables
            .invitations
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("invitation {}", id)))?;
        invitation.role = role;
        invitation.expires_at = expires_at;
        Ok(invitation.clone())
    }

    async fn create_subscription(&self, new: NewSubscription) -> StoreResult<Subscription> {
        let mut tables = self.tables.write().await;
        if !tables.organizations.contains_key(&new.organization_id) {
            return Err(StoreError::NotFound(format!("organization {}", new.organization_id)));
        }
        if tables
            .subscriptions
            .values()
            .any(|s| s.organization_id == new.organization_id)
        {
            return Err(StoreError::UniqueViolation(format!(
                "subscription for organization {}",
                new.organization_id
            )));
        }

        let now = Utc::now();
        let subscription = Subscription {
            id: Uuid::new_v4(),
            organization_id: new.organization_id,
            external_subscription_id: new.external_subscription_id,
            status: new.status,
            plan_name: new.plan_name,
            amount: new.amount,
            currency: new.currency,
            current_period_start: new.current_period_start,
            current_period_end: new.current_period_end,
            cancel_at_period_end: false,
            created_at: now,
            updated_at: now,
        };
        tables.subscriptions.insert(subscription.id, subscription.clone());
        Ok(subscription)
    }

    async fn find_subscription(&self, organization_id: Uuid) -> StoreResult<Option<Subscription>> {
        let tables = self.tables.read().await;
        Ok(tables
            .subscriptions
            .values()
            .find(|s| s.organization_id == organization_id)
            .cloned())
    }

    async fn update_subscription_plan(&self, organization_id: Uuid, plan_name: &str, amount: i64) -> StoreResult<Option<Subscription>> {
        let mut tables = self.tables.write().await;
        let Some(subscription) = tables
            .subscriptions
            .values_mut()
            .find(|s| s.organization_id == organization_id)
        else {
            return Ok(None);
        };
        subscription.plan_name = plan_name.to_string();
        subscription.amount = amount;
        subscription.updated_at = Utc::now();
        Ok(Some(subscription.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SubscriptionTier;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Test".to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
        }
    }

    fn new_org(slug: &str) -> NewOrganization {
        NewOrganization {
            name: slug.to_string(),
            slug: slug.to_string(),
            logo: None,
            metadata: None,
            subscription: SubscriptionTier::Free,
            max_users: 3,
            max_notes: 3,
        }
    }

    #[tokio::test]
    async fn rejects_duplicate_emails_case_insensitively() {
        let store = MemoryStore::new();
        store.create_user(new_user("a@example.com")).await.unwrap();
        let err = store.create_user(new_user("A@Example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(_)));
    }

    #[tokio::test]
    async fn organization_creator_becomes_admin() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("a@example.com")).await.unwrap();
        let (org, member) = store.create_organization(new_org("acme"), user.id).await.unwrap();

        assert_eq!(member.role, Role::Admin);
        assert_eq!(store.count_members(org.id).await.unwrap(), 1);

        let err = store.create_organization(new_org("acme"), user.id).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(_)));
    }

    #[tokio::test]
    async fn deleting_organization_cascades_and_clears_active_pointer() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("a@example.com")).await.unwrap();
        let (org, _) = store.create_organization(new_org("acme"), user.id).await.unwrap();
        store.set_active_organization(user.id, Some(org.id)).await.unwrap();
        store
            .create_note(NewNote {
                organization_id: org.id,
                author_id: user.id,
                title: "t".to_string(),
                content: "c".to_string(),
                tags: vec![],
                is_public: false,
            })
            .await
            .unwrap();

        store.delete_organization(org.id).await.unwrap();

        assert_eq!(store.count_notes(org.id, None).await.unwrap(), 0);
        assert_eq!(store.count_members(org.id).await.unwrap(), 0);
        let user = store.find_user_by_id(user.id).await.unwrap().unwrap();
        assert!(user.active_organization_id.is_none());
    }

    #[tokio::test]
    async fn note_listing_never_crosses_organizations() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("a@example.com")).await.unwrap();
        let (first, _) = store.create_organization(new_org("first"), user.id).await.unwrap();
        let (second, _) = store.create_organization(new_org("second"), user.id).await.unwrap();

        for org in [first.id, second.id] {
            store
                .create_note(NewNote {
                    organization_id: org,
                    author_id: user.id,
                    title: "t".to_string(),
                    content: "c".to_string(),
                    tags: vec![],
                    is_public: true,
                })
                .await
                .unwrap();
        }

        let notes = store.list_notes(first.id, NoteScope::Organization).await.unwrap();
        assert_eq!(notes.len(), 1);
        assert!(notes.iter().all(|n| n.organization_id == first.id));
    }
}
