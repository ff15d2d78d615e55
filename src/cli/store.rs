use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cli::client::ApiClient;
use crate::cli::config::{load_json, save_json, ORGANIZATION_FILE};
use crate::database::models::{Invitation, MemberDetail, Organization, OrganizationDetail};
use crate::types::{InvitationStatus, Role};

/// Where the mirror pulls the active organization from
#[async_trait]
pub trait OrganizationSource: Send + Sync {
    async fn fetch_active(&self) -> anyhow::Result<Option<OrganizationDetail>>;
}

#[async_trait]
impl OrganizationSource for ApiClient {
    async fn fetch_active(&self) -> anyhow::Result<Option<OrganizationDetail>> {
        let active: Option<Organization> = self.get("/api/tenants/get-active").await?;
        match active {
            Some(organization) => {
                let detail = self.get(&format!("/api/tenants/{}", organization.slug)).await?;
                Ok(Some(detail))
            }
            None => Ok(None),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationSnapshot {
    pub organization: Option<Organization>,
    #[serde(default)]
    pub members: Vec<MemberDetail>,
    #[serde(default)]
    pub invitations: Vec<Invitation>,
    pub refreshed_at: Option<DateTime<Utc>>,
}

/// Local copy of the active organization with its members and invitations.
///
/// The server stays authoritative. Nothing here is consulted for plan limits.
#[derive(Debug, Clone, Default)]
pub struct OrganizationStore {
    snapshot: OrganizationSnapshot,
}

impl OrganizationStore {
    pub fn load() -> anyhow::Result<Self> {
        Ok(Self {
            snapshot: load_json(ORGANIZATION_FILE)?,
        })
    }

    pub fn save(&self) -> anyhow::Result<()> {
        save_json(ORGANIZATION_FILE, &self.snapshot)
    }

    /// Replace the snapshot with what the source currently reports
    pub async fn refresh(&mut self, source: &dyn OrganizationSource) -> anyhow::Result<()> {
        self.snapshot = match source.fetch_active().await? {
            Some(detail) => OrganizationSnapshot {
                organization: Some(detail.organization),
                members: detail.members,
                invitations: detail.invitations,
                refreshed_at: Some(Utc::now()),
            },
            None => OrganizationSnapshot {
                refreshed_at: Some(Utc::now()),
                ..Default::default()
            },
        };
        tracing::debug!(
            "Organization mirror refreshed: {:?}",
            self.snapshot.organization.as_ref().map(|o| &o.slug)
        );
        Ok(())
    }

    pub fn clear(&mut self) {
        self.snapshot = OrganizationSnapshot::default();
    }

    pub fn snapshot(&self) -> &OrganizationSnapshot {
        &self.snapshot
    }

    pub fn organization(&self) -> Option<&Organization> {
        self.snapshot.organization.as_ref()
    }

    pub fn active_slug(&self) -> Option<String> {
        self.organization().map(|o| o.slug.clone())
    }

    pub fn members(&self) -> &[MemberDetail] {
        &self.snapshot.members
    }

    pub fn pending_invitations(&self) -> impl Iterator<Item = &Invitation> {
        self.snapshot
            .invitations
            .iter()
            .filter(|i| i.status == InvitationStatus::Pending)
    }

    pub fn role_of(&self, user_id: Uuid) -> Option<Role> {
        self.members()
            .iter()
            .find(|m| m.user_id == user_id)
            .map(|m| m.role)
    }
}

/// Reload the persisted mirror from the server and write it back
pub async fn refresh_store(client: &ApiClient) -> anyhow::Result<OrganizationStore> {
    let mut store = OrganizationStore::load()?;
    store.refresh(client).await?;
    store.save()?;
    Ok(store)
}
