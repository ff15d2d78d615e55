use std::sync::Arc;
use uuid::Uuid;

use super::error::{ServiceError, ServiceResult};
use super::permissions::require_member_of;
use super::session::Session;
use crate::database::models::Subscription;
use crate::database::Store;

pub struct SubscriptionService {
    store: Arc<dyn Store>,
}

impl SubscriptionService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Billing record of an organization the caller belongs to
    pub async fn get(&self, session: &Session, organization_id: Uuid) -> ServiceResult<Subscription> {
        if self.store.find_organization_by_id(organization_id).await?.is_none() {
            return Err(ServiceError::tenant_not_found());
        }
        require_member_of(self.store.as_ref(), session, organization_id).await?;

        self.store
            .find_subscription(organization_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Subscription not found"))
    }
}
