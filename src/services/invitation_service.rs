use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::error::{ServiceError, ServiceResult};
use super::permissions::{require_admin_of, require_member_of};
use super::plans::check_member_quota;
use super::session::Session;
use crate::config::AppConfig;
use crate::database::models::{Invitation, Member, NewInvitation, Organization};
use crate::database::{normalize_email, Store, StoreError};
use crate::types::{InvitationAction, InvitationStatus, Role};

#[derive(Debug, Clone)]
pub struct CreateInvitation {
    pub email: String,
    pub role: Role,
    /// Refresh the expiry of an existing pending invitation instead of failing
    pub resend: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedInvitation {
    pub invitation: Invitation,
    pub member: Member,
}

/// Invitation lifecycle: create, list, accept, reject, cancel
pub struct InvitationService {
    store: Arc<dyn Store>,
    config: Arc<AppConfig>,
}

impl InvitationService {
    pub fn new(store: Arc<dyn Store>, config: Arc<AppConfig>) -> Self {
        Self { store, config }
    }

    fn expiry(&self) -> chrono::DateTime<Utc> {
        Utc::now() + Duration::hours(self.config.tenancy.invitation_expiry_hours)
    }

    pub async fn create(
        &self,
        session: &Session,
        organization: &Organization,
        input: CreateInvitation,
    ) -> ServiceResult<Invitation> {
        require_admin_of(self.store.as_ref(), session, organization.id).await?;

        let email = normalize_email(&input.email);
        if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
            return Err(ServiceError::validation("email is not a valid address"));
        }

        if let Some(user) = self.store.find_user_by_email(&email).await? {
            if self.store.find_member(organization.id, user.id).await?.is_some() {
                return Err(ServiceError::conflict("User is already a member of this organization"));
            }
        }

        if let Some(pending) = self.store.find_pending_invitation(organization.id, &email).await? {
            // An expired invitation is reissued as if none existed
            if !input.resend && !pending.is_expired(Utc::now()) {
                return Err(ServiceError::conflict("An invitation is already pending for this email"));
            }
            let refreshed = self
                .store
                .refresh_invitation(pending.id, input.role, self.expiry())
                .await?;
            tracing::info!("Resent invitation {} to {}", refreshed.id, email);
            return Ok(refreshed);
        }

        let invitation = self
            .store
            .create_invitation(NewInvitation {
                organization_id: organization.id,
                email: email.clone(),
                role: input.role,
                inviter_id: session.user_id(),
                expires_at: self.expiry(),
            })
            .await?;
        tracing::info!("Invited {} to organization {} as {}", email, organization.slug, input.role);
        Ok(invitation)
    }

    pub async fn list_for_organization(
        &self,
        session: &Session,
        organization: &Organization,
    ) -> ServiceResult<Vec<Invitation>> {
        require_member_of(self.store.as_ref(), session, organization.id).await?;
        Ok(self.store.list_invitations(organization.id).await?)
    }

    /// Invitations addressed to `email`, which must be the caller's own
    pub async fn list_for_email(&self, session: &Session, email: &str) -> ServiceResult<Vec<Invitation>> {
        if normalize_email(email) != normalize_email(session.email()) {
            return Err(ServiceError::unauthorized("Cannot list invitations for another email"));
        }
        Ok(self.store.list_invitations_for_email(email).await?)
    }

    /// Visible to the invitee and to members of the inviting organization
    pub async fn get(&self, session: &Session, id: Uuid) -> ServiceResult<Invitation> {
        let invitation = self.find(id).await?;
        if self.is_invitee(session, &invitation) {
            return Ok(invitation);
        }
        require_member_of(self.store.as_ref(), session, invitation.organization_id).await?;
        Ok(invitation)
    }

    pub async fn accept(&self, session: &Session, id: Uuid) -> ServiceResult<AcceptedInvitation> {
        let invitation = self.find(id).await?;
        if !self.is_invitee(session, &invitation) {
            return Err(ServiceError::unauthorized("Invitation was sent to a different email"));
        }
        let next = self.transition(&invitation, InvitationAction::Accept)?;
        if invitation.is_expired(Utc::now()) {
            return Err(ServiceError::conflict("Invitation has expired"));
        }

        let organization = self
            .store
            .find_organization_by_id(invitation.organization_id)
            .await?
            .ok_or_else(ServiceError::tenant_not_found)?;
        if self.store.find_member(organization.id, session.user_id()).await?.is_some() {
            return Err(ServiceError::conflict("Already a member of this organization"));
        }
        let count = self.store.count_members(organization.id).await?;
        check_member_quota(&organization, count)?;

        let member = match self
            .store
            .create_member(organization.id, session.user_id(), invitation.role)
            .await
        {
            Ok(member) => member,
            Err(StoreError::UniqueViolation(_)) => {
                return Err(ServiceError::conflict("Already a member of this organization"));
            }
            Err(e) => return Err(e.into()),
        };
        let invitation = self.store.update_invitation_status(invitation.id, next).await?;
        self.store
            .set_active_organization(session.user_id(), Some(organization.id))
            .await?;

        tracing::info!("{} joined organization {}", session.email(), organization.slug);
        Ok(AcceptedInvitation { invitation, member })
    }

    pub async fn reject(&self, session: &Session, id: Uuid) -> ServiceResult<Invitation> {
        let invitation = self.find(id).await?;
        if !self.is_invitee(session, &invitation) {
            return Err(ServiceError::unauthorized("Invitation was sent to a different email"));
        }
        let next = self.transition(&invitation, InvitationAction::Reject)?;

        let invitation = self.store.update_invitation_status(invitation.id, next).await?;
        tracing::info!("Invitation {} rejected", invitation.id);
        Ok(invitation)
    }

    /// Admins of the inviting organization cancel pending invitations
    pub async fn cancel(&self, session: &Session, id: Uuid) -> ServiceResult<Invitation> {
        let invitation = self.find(id).await?;
        require_admin_of(self.store.as_ref(), session, invitation.organization_id).await?;
        let next = self.transition(&invitation, InvitationAction::Cancel)?;

        let invitation = self.store.update_invitation_status(invitation.id, next).await?;
        tracing::info!("Invitation {} canceled", invitation.id);
        Ok(invitation)
    }

    async fn find(&self, id: Uuid) -> ServiceResult<Invitation> {
        self.store
            .find_invitation(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Invitation not found"))
    }

    fn is_invitee(&self, session: &Session, invitation: &Invitation) -> bool {
        normalize_email(session.email()) == invitation.email
    }

    fn transition(&self, invitation: &Invitation, action: InvitationAction) -> ServiceResult<InvitationStatus> {
        invitation.status.transition(action).map_err(|e| {
            tracing::warn!("Invitation {}: {}", invitation.id, e);
            ServiceError::conflict(format!("Invitation is already {}", invitation.status))
        })
    }
}
