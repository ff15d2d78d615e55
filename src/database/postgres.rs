use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::models::{
    Invitation, Member, MemberDetail, NewInvitation, NewNote, NewOrganization, NewSubscription,
    NewUser, Note, NoteScope, NoteUpdate, Organization, OrganizationUpdate, PlanChange,
    Subscription, User,
};
use super::store::{normalize_email, Store, StoreError, StoreResult};
use crate::types::{InvitationStatus, Role};

const UNIQUE_VIOLATION: &str = "23505";

const ORGANIZATION_COLUMNS: &str =
    "id, name, slug, logo, metadata, subscription, max_users, max_notes, created_at";
const USER_COLUMNS: &str = "id, name, email, password_hash, active_organization_id, created_at";
const MEMBER_COLUMNS: &str = "id, organization_id, user_id, role, created_at";
const NOTE_COLUMNS: &str =
    "id, organization_id, author_id, title, content, tags, is_public, created_at, updated_at";
const INVITATION_COLUMNS: &str =
    "id, organization_id, email, role, status, inviter_id, expires_at, created_at";
const SUBSCRIPTION_COLUMNS: &str = "id, organization_id, external_subscription_id, status, plan_name, amount, currency, current_period_start, current_period_end, cancel_at_period_end, created_at, updated_at";

/// Maps Postgres unique-constraint failures onto `StoreError::UniqueViolation`
fn map_unique(err: sqlx::Error, what: impl Into<String>) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            StoreError::UniqueViolation(what.into())
        }
        _ => StoreError::Sqlx(err),
    }
}

fn not_found<T>(row: Option<T>, what: impl FnOnce() -> String) -> StoreResult<T> {
    row.ok_or_else(|| StoreError::NotFound(what()))
}

/// Store backed by a Postgres connection pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn create_user(&self, new: NewUser) -> StoreResult<User> {
        let email = normalize_email(&new.email);
        let query = format!(
            "INSERT INTO users (name, email, password_hash) VALUES ($1, $2, $3) RETURNING {}",
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&new.name)
            .bind(&email)
            .bind(&new.password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_unique(e, format!("user email '{}'", email)))
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn set_active_organization(&self, user_id: Uuid, organization_id: Option<Uuid>) -> StoreResult<()> {
        let result = sqlx::query("UPDATE users SET active_organization_id = $2 WHERE id = $1")
            .bind(user_id)
            .bind(organization_id)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                    StoreError::NotFound(format!("organization {:?}", organization_id))
                }
                other => StoreError::Sqlx(other),
            })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("user {}", user_id)));
        }
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<User> {
        let query = format!("DELETE FROM users WHERE id = $1 RETURNING {}", USER_COLUMNS);
        let row = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        not_found(row, || format!("user {}", id))
    }

    async fn create_organization(&self, new: NewOrganization, creator_id: Uuid) -> StoreResult<(Organization, Member)> {
        let mut tx = self.pool.begin().await?;

        let query = format!(
            "INSERT INTO organizations (name, slug, logo, metadata, subscription, max_users, max_notes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            ORGANIZATION_COLUMNS
        );
        let organization = sqlx::query_as::<_, Organization>(&query)
            .bind(&new.name)
            .bind(&new.slug)
            .bind(&new.logo)
            .bind(&new.metadata)
            .bind(new.subscription.as_str())
            .bind(new.max_users)
            .bind(new.max_notes)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_unique(e, format!("organization slug '{}'", new.slug)))?;

        let query = format!(
            "INSERT INTO members (organization_id, user_id, role) VALUES ($1, $2, $3) RETURNING {}",
            MEMBER_COLUMNS
        );
        let member = sqlx::query_as::<_, Member>(&query)
            .bind(organization.id)
            .bind(creator_id)
            .bind(Role::Admin.as_str())
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok((organization, member))
    }

    async fn find_organization_by_id(&self, id: Uuid) -> StoreResult<Option<Organization>> {
        let query = format!("SELECT {} FROM organizations WHERE id = $1", ORGANIZATION_COLUMNS);
        Ok(sqlx::query_as::<_, Organization>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_organization_by_slug(&self, slug: &str) -> StoreResult<Option<Organization>> {
        let query = format!("SELECT {} FROM organizations WHERE slug = $1", ORGANIZATION_COLUMNS);
        Ok(sqlx::query_as::<_, Organization>(&query)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_organizations_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Organization>> {
        let query = "SELECT o.id, o.name, o.slug, o.logo, o.metadata, o.subscription, o.max_users, o.max_notes, o.created_at \
                     FROM organizations o JOIN members m ON m.organization_id = o.id \
                     WHERE m.user_id = $1 ORDER BY m.created_at";
        Ok(sqlx::query_as::<_, Organization>(query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_organization(&self, id: Uuid, update: OrganizationUpdate) -> StoreResult<Organization> {
        let query = format!(
            "UPDATE organizations SET \
               name = COALESCE($2, name), \
               slug = COALESCE($3, slug), \
               logo = COALESCE($4, logo), \
               metadata = COALESCE($5, metadata) \
             WHERE id = $1 RETURNING {}",
            ORGANIZATION_COLUMNS
        );
        let slug = update.slug.clone().unwrap_or_default();
        let row = sqlx::query_as::<_, Organization>(&query)
            .bind(id)
            .bind(update.name)
            .bind(update.slug)
            .bind(update.logo)
            .bind(update.metadata)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_unique(e, format!("organization slug '{}'", slug)))?;
        not_found(row, || format!("organization {}", id))
    }

    async fn change_plan(&self, id: Uuid, plan: PlanChange) -> StoreResult<Organization> {
        let query = format!(
            "UPDATE organizations SET subscription = $2, max_users = $3, max_notes = $4 \
             WHERE id = $1 RETURNING {}",
            ORGANIZATION_COLUMNS
        );
        let row = sqlx::query_as::<_, Organization>(&query)
            .bind(id)
            .bind(plan.subscription.as_str())
            .bind(plan.max_users)
            .bind(plan.max_notes)
            .fetch_optional(&self.pool)
            .await?;
        not_found(row, || format!("organization {}", id))
    }

    async fn delete_organization(&self, id: Uuid) -> StoreResult<Organization> {
        // Dependent rows go through ON DELETE CASCADE / SET NULL
        let query = format!("DELETE FROM organizations WHERE id = $1 RETURNING {}", ORGANIZATION_COLUMNS);
        let row = sqlx::query_as::<_, Organization>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        not_found(row, || format!("organization {}", id))
    }

    async fn create_member(&self, organization_id: Uuid, user_id: Uuid, role: Role) -> StoreResult<Member> {
        let query = format!(
            "INSERT INTO members (organization_id, user_id, role) VALUES ($1, $2, $3) RETURNING {}",
            MEMBER_COLUMNS
        );
        sqlx::query_as::<_, Member>(&query)
            .bind(organization_id)
            .bind(user_id)
            .bind(role.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                map_unique(e, format!("member {} of organization {}", user_id, organization_id))
            })
    }

    async fn find_member(&self, organization_id: Uuid, user_id: Uuid) -> StoreResult<Option<Member>> {
        let query = format!(
            "SELECT {} FROM members WHERE organization_id = $1 AND user_id = $2",
            MEMBER_COLUMNS
        );
        Ok(sqlx::query_as::<_, Member>(&query)
            .bind(organization_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_member_by_id(&self, id: Uuid) -> StoreResult<Option<Member>> {
        let query = format!("SELECT {} FROM members WHERE id = $1", MEMBER_COLUMNS);
        Ok(sqlx::query_as::<_, Member>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_members(&self, organization_id: Uuid) -> StoreResult<Vec<MemberDetail>> {
        let query = "SELECT m.id, m.organization_id, m.user_id, m.role, m.created_at, u.email, u.name \
                     FROM members m JOIN users u ON u.id = m.user_id \
                     WHERE m.organization_id = $1 ORDER BY m.created_at";
        Ok(sqlx::query_as::<_, MemberDetail>(query)
            .bind(organization_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn count_members(&self, organization_id: Uuid) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM members WHERE organization_id = $1")
            .bind(organization_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn update_member_role(&self, id: Uuid, role: Role) -> StoreResult<Member> {
        let query = format!("UPDATE members SET role = $2 WHERE id = $1 RETURNING {}", MEMBER_COLUMNS);
        let row = sqlx::query_as::<_, Member>(&query)
            .bind(id)
            .bind(role.as_str())
            .fetch_optional(&self.pool)
            .await?;
        not_found(row, || format!("member {}", id))
    }

    async fn delete_member(&self, id: Uuid) -> StoreResult<Member> {
        let query = format!("DELETE FROM members WHERE id = $1 RETURNING {}", MEMBER_COLUMNS);
        let row = sqlx::query_as::<_, Member>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        not_found(row, || format!("member {}", id))
    }

    async fn create_note(&self, new: NewNote) -> StoreResult<Note> {
        let query = format!(
            "INSERT INTO notes (organization_id, author_id, title, content, tags, is_public) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            NOTE_COLUMNS
        );
        Ok(sqlx::query_as::<_, Note>(&query)
            .bind(new.organization_id)
            .bind(new.author_id)
            .bind(&new.title)
            .bind(&new.content)
            .bind(&new.tags)
            .bind(new.is_public)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn find_note(&self, id: Uuid) -> StoreResult<Option<Note>> {
        let query = format!("SELECT {} FROM notes WHERE id = $1", NOTE_COLUMNS);
        Ok(sqlx::query_as::<_, Note>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_notes(&self, organization_id: Uuid, scope: NoteScope) -> StoreResult<Vec<Note>> {
        let (filter, author) = match scope {
            NoteScope::Organization => ("", None),
            NoteScope::AuthorOrPublic(author) => (" AND (author_id = $2 OR is_public)", Some(author)),
        };
        let query = format!(
            "SELECT {} FROM notes WHERE organization_id = $1{} ORDER BY updated_at DESC",
            NOTE_COLUMNS, filter
        );

        let mut q = sqlx::query_as::<_, Note>(&query).bind(organization_id);
        if let Some(author) = author {
            q = q.bind(author);
        }
        Ok(q.fetch_all(&self.pool).await?)
    }

    async fn count_notes(&self, organization_id: Uuid, author_id: Option<Uuid>) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notes WHERE organization_id = $1 AND ($2::uuid IS NULL OR author_id = $2)",
        )
        .bind(organization_id)
        .bind(author_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn update_note(&self, id: Uuid, update: NoteUpdate) -> StoreResult<Note> {
        let query = format!(
            "UPDATE notes SET \
               title = COALESCE($2, title), \
               content = COALESCE($3, content), \
               tags = COALESCE($4, tags), \
               is_public = COALESCE($5, is_public), \
               updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            NOTE_COLUMNS
        );
        let row = sqlx::query_as::<_, Note>(&query)
            .bind(id)
            .bind(update.title)
            .bind(update.content)
            .bind(update.tags)
            .bind(update.is_public)
            .fetch_optional(&self.pool)
            .await?;
        not_found(row, || format!("note {}", id))
    }

    async fn delete_note(&self, id: Uuid) -> StoreResult<Note> {
        let query = format!("DELETE FROM notes WHERE id = $1 RETURNING {}", NOTE_COLUMNS);
        let row = sqlx::query_as::<_, Note>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        not_found(row, || format!("note {}", id))
    }

    async fn create_invitation(&self, new: NewInvitation) -> StoreResult<Invitation> {
        let query = format!(
            "INSERT INTO invitations (organization_id, email, role, status, inviter_id, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            INVITATION_COLUMNS
        );
        Ok(sqlx::query_as::<_, Invitation>(&query)
            .bind(new.organization_id)
            .bind(normalize_email(&new.email))
            .bind(new.role.as_str())
            .bind(InvitationStatus::Pending.as_str())
            .bind(new.inviter_id)
            .bind(new.expires_at)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn find_invitation(&self, id: Uuid) -> StoreResult<Option<Invitation>> {
        let query = format!("SELECT {} FROM invitations WHERE id = $1", INVITATION_COLUMNS);
        Ok(sqlx::query_as::<_, Invitation>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_pending_invitation(&self, organization_id: Uuid, email: &str) -> StoreResult<Option<Invitation>> {
        let query = format!(
            "SELECT {} FROM invitations WHERE organization_id = $1 AND email = $2 AND status = $3 LIMIT 1",
            INVITATION_COLUMNS
        );
        Ok(sqlx::query_as::<_, Invitation>(&query)
            .bind(organization_id)
            .bind(normalize_email(email))
            .bind(InvitationStatus::Pending.as_str())
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_invitations(&self, organization_id: Uuid) -> StoreResult<Vec<Invitation>> {
        let query = format!(
            "SELECT {} FROM invitations WHERE organization_id = $1 ORDER BY created_at DESC",
            INVITATION_COLUMNS
        );
        Ok(sqlx::query_as::<_, Invitation>(&query)
            .bind(organization_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn list_invitations_for_email(&self, email: &str) -> StoreResult<Vec<Invitation>> {
        let query = format!(
            "SELECT {} FROM invitations WHERE email = $1 ORDER BY created_at DESC",
            INVITATION_COLUMNS
        );
        Ok(sqlx::query_as::<_, Invitation>(&query)
            .bind(normalize_email(email))
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_invitation_status(&self, id: Uuid, status: InvitationStatus) -> StoreResult<Invitation> {
        let query = format!(
            "UPDATE invitations SET status = $2 WHERE id = $1 RETURNING {}",
            INVITATION_COLUMNS
        );
        let row = sqlx::query_as::<_, Invitation>(&query)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(&self.pool)
            .await?;
        not_found(row, || format!("invitation {}", id))
    }

    async fn refresh_invitation(&self, id: Uuid, role: Role, expires_at: DateTime<Utc>) -> StoreResult<Invitation> {
        let query = format!(
            "UPDATE invitations SET role = $2, expires_at = $3 WHERE id = $1 RETURNING {}",
            INVITATION_COLUMNS
        );
        let row = sqlx::query_as::<_, Invitation>(&query)
            .bind(id)
            .bind(role.as_str())
            .bind(expires_at)
            .fetch_optional(&self.pool)
            .await?;
        not_found(row, || format!("invitation {}", id))
    }

    async fn create_subscription(&self, new: NewSubscription) -> StoreResult<Subscription> {
        let query = format!(
            "INSERT INTO subscriptions (organization_id, external_subscription_id, status, plan_name, amount, currency, current_period_start, current_period_end) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {}",
            SUBSCRIPTION_COLUMNS
        );
        sqlx::query_as::<_, Subscription>(&query)
            .bind(new.organization_id)
            .bind(&new.external_subscription_id)
            .bind(&new.status)
            .bind(&new.plan_name)
            .bind(new.amount)
            .bind(&new.currency)
            .bind(new.current_period_start)
            .bind(new.current_period_end)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                map_unique(e, format!("subscription for organization {}", new.organization_id))
            })
    }

    async fn find_subscription(&self, organization_id: Uuid) -> StoreResult<Option<Subscription>> {
        let query = format!(
            "SELECT {} FROM subscriptions WHERE organization_id = $1",
            SUBSCRIPTION_COLUMNS
        );
        Ok(sqlx::query_as::<_, Subscription>(&query)
            .bind(organization_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_subscription_plan(&self, organization_id: Uuid, plan_name: &str, amount: i64) -> StoreResult<Option<Subscription>> {
        let query = format!(
            "UPDATE subscriptions SET plan_name = $2, amount = $3, updated_at = NOW() \
             WHERE organization_id = $1 RETURNING {}",
            SUBSCRIPTION_COLUMNS
        );
        Ok(sqlx::query_as::<_, Subscription>(&query)
            .bind(organization_id)
            .bind(plan_name)
            .bind(amount)
            .fetch_optional(&self.pool)
            .await?)
    }
}
