use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::{ServiceError, ServiceResult};
use super::organization_service::{is_valid_slug, provision_organization, slugify, CreateOrganization};
use super::session::{resolve_session, Session};
use crate::auth::{hash_password, issue_token, verify_password};
use crate::config::AppConfig;
use crate::database::models::{NewUser, Organization, User};
use crate::database::{normalize_email, Store, StoreError};

const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Clone)]
pub struct SignUp {
    pub email: String,
    pub password: String,
    pub name: String,
    pub company: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthPayload {
    pub token: String,
    pub user: User,
    pub organization: Option<Organization>,
}

/// Sign-up, sign-in and session lookup
pub struct AccountService {
    store: Arc<dyn Store>,
    config: Arc<AppConfig>,
}

impl AccountService {
    pub fn new(store: Arc<dyn Store>, config: Arc<AppConfig>) -> Self {
        Self { store, config }
    }

    /// Create the user with a first organization they administer, either a
    /// personal one or one named after `company`
    pub async fn sign_up(&self, input: SignUp) -> ServiceResult<AuthPayload> {
        let email = normalize_email(&input.email);
        if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
            return Err(ServiceError::validation("email is not a valid address"));
        }
        if input.password.len() < MIN_PASSWORD_LENGTH {
            return Err(ServiceError::validation(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }
        if input.name.trim().is_empty() {
            return Err(ServiceError::validation("name must not be empty"));
        }
        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(ServiceError::conflict("User already exists"));
        }

        let password_hash = hash_password(&input.password)?;
        let user = match self
            .store
            .create_user(NewUser {
                name: input.name.trim().to_string(),
                email,
                password_hash,
            })
            .await
        {
            Ok(user) => user,
            Err(StoreError::UniqueViolation(_)) => return Err(ServiceError::conflict("User already exists")),
            Err(e) => return Err(e.into()),
        };

        let organization = match self.provision_first_organization(&user, input.company.as_deref()).await {
            Ok(organization) => organization,
            Err(e) => {
                tracing::error!("Sign-up for {} failed after the user was created: {}", user.email, e);
                if let Err(cleanup) = self.store.delete_user(user.id).await {
                    tracing::error!("Failed to remove user {}: {}", user.id, cleanup);
                }
                return Err(e);
            }
        };

        let token = issue_token(&self.config.security, user.id, &user.email)?;
        tracing::info!("Signed up {} with organization {}", user.email, organization.slug);

        Ok(AuthPayload {
            token,
            user: User {
                active_organization_id: Some(organization.id),
                ..user
            },
            organization: Some(organization),
        })
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> ServiceResult<AuthPayload> {
        let invalid = || ServiceError::unauthorized("Invalid email or password");

        let Some(user) = self.store.find_user_by_email(email).await? else {
            tracing::warn!("Sign-in for unknown email");
            return Err(invalid());
        };
        if !verify_password(password, &user.password_hash)? {
            tracing::warn!("Sign-in with wrong password for {}", user.email);
            return Err(invalid());
        }

        let session = resolve_session(self.store.as_ref(), user.id).await?;
        let token = issue_token(&self.config.security, user.id, &user.email)?;
        tracing::info!("Signed in {}", user.email);

        Ok(AuthPayload {
            token,
            user: session.user,
            organization: session.active_organization,
        })
    }

    pub async fn session(&self, user_id: uuid::Uuid) -> ServiceResult<Session> {
        resolve_session(self.store.as_ref(), user_id).await
    }

    /// The company or personal organization of a new user, made active.
    /// On failure the organization is removed again.
    async fn provision_first_organization(&self, user: &User, company: Option<&str>) -> ServiceResult<Organization> {
        let suffix = user.id.simple().to_string();
        let company = company.map(str::trim).filter(|c| !c.is_empty());
        let (name, slug) = match company {
            Some(company) => (company.to_string(), self.free_slug(&slugify(company), &suffix).await?),
            None => (
                self.config.tenancy.personal_organization_name.clone(),
                format!("personal-{}", &suffix[..8]),
            ),
        };

        let (organization, _) = provision_organization(
            self.store.as_ref(),
            user.id,
            CreateOrganization {
                name,
                slug,
                logo: None,
                metadata: None,
            },
        )
        .await?;

        if let Err(e) = self
            .store
            .set_active_organization(user.id, Some(organization.id))
            .await
        {
            if let Err(cleanup) = self.store.delete_organization(organization.id).await {
                tracing::error!("Failed to remove organization {}: {}", organization.id, cleanup);
            }
            return Err(e.into());
        }
        Ok(organization)
    }

    /// `base`, or `base-<suffix>` when taken or unusable
    async fn free_slug(&self, base: &str, suffix: &str) -> ServiceResult<String> {
        if is_valid_slug(base) && self.store.find_organization_by_slug(base).await?.is_none() {
            return Ok(base.to_string());
        }
        let base = if base.is_empty() { "org" } else { base };
        let trimmed: String = base.chars().take(48).collect();
        Ok(format!("{}-{}", trimmed.trim_end_matches('-'), &suffix[..8]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingSubscriptionStore, TestContext};
    use crate::types::{Role, SubscriptionTier};
    use std::sync::atomic::Ordering;

    fn sign_up(email: &str, company: Option<&str>) -> SignUp {
        SignUp {
            email: email.to_string(),
            password: "correct-horse".to_string(),
            name: "Ann".to_string(),
            company: company.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn sign_up_creates_personal_organization_with_one_admin() {
        let ctx = TestContext::new();
        let service = AccountService::new(ctx.store.clone(), ctx.config.clone());

        let payload = service.sign_up(sign_up("ann@example.com", None)).await.unwrap();
        let org = payload.organization.unwrap();
        assert_eq!(org.name, "Personal");
        assert!(org.slug.starts_with("personal-"));
        assert_eq!(org.subscription, SubscriptionTier::Free);

        let members = ctx.store.list_members(org.id).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].role, Role::Admin);
        assert_eq!(members[0].user_id, payload.user.id);

        let subscription = ctx.store.find_subscription(org.id).await.unwrap().unwrap();
        assert_eq!(subscription.plan_name, "free");
    }

    #[tokio::test]
    async fn company_slugs_stay_unique() {
        let ctx = TestContext::new();
        let service = AccountService::new(ctx.store.clone(), ctx.config.clone());

        let first = service.sign_up(sign_up("a@example.com", Some("Acme Corp"))).await.unwrap();
        let second = service.sign_up(sign_up("b@example.com", Some("Acme Corp"))).await.unwrap();

        assert_eq!(first.organization.unwrap().slug, "acme-corp");
        let second_slug = second.organization.unwrap().slug;
        assert!(second_slug.starts_with("acme-corp-"));
    }

    #[tokio::test]
    async fn sign_in_checks_password() {
        let ctx = TestContext::new();
        let service = AccountService::new(ctx.store.clone(), ctx.config.clone());
        service.sign_up(sign_up("ann@example.com", None)).await.unwrap();

        let ok = service.sign_in("ANN@example.com", "correct-horse").await.unwrap();
        assert!(!ok.token.is_empty());
        assert!(ok.organization.is_some());

        let err = service.sign_in("ann@example.com", "wrong-horse").await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let ctx = TestContext::new();
        let service = AccountService::new(ctx.store.clone(), ctx.config.clone());
        service.sign_up(sign_up("ann@example.com", None)).await.unwrap();

        let err = service.sign_up(sign_up("Ann@Example.com", None)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn failed_provisioning_leaves_no_user_behind() {
        let store = Arc::new(FailingSubscriptionStore::default());
        store.fail_subscriptions.store(true, Ordering::SeqCst);
        let ctx = TestContext::with_store(store.clone());
        let service = AccountService::new(ctx.store.clone(), ctx.config.clone());

        let err = service
            .sign_up(sign_up("ann@example.com", Some("Acme")))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Store(_)));
        assert!(ctx.store.find_user_by_email("ann@example.com").await.unwrap().is_none());
        assert!(ctx.store.find_organization_by_slug("acme").await.unwrap().is_none());

        store.fail_subscriptions.store(false, Ordering::SeqCst);
        let payload = service
            .sign_up(sign_up("ann@example.com", Some("Acme")))
            .await
            .unwrap();
        let org = payload.organization.unwrap();
        assert_eq!(org.slug, "acme");
        let members = ctx.store.list_members(org.id).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].role, Role::Admin);
    }
}
