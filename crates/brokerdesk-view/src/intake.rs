//! Form submissions that create records.
//!
//! Forms are validated before anything leaves the process; a validation
//! failure never reaches the backend. The stored row returned by the
//! backend is merged into the page's store.

use std::sync::Arc;

use tracing::{info, warn};

use brokerdesk_core::result::AppResult;
use brokerdesk_core::traits::gateway::DataGateway;
use brokerdesk_entity::business::Business;
use brokerdesk_entity::form::{BusinessListingForm, LeadForm, validate_form};
use brokerdesk_entity::lead::Lead;
use brokerdesk_entity::record::Record;

use crate::notice::NoticeBoard;
use crate::session::Session;
use crate::store::{CollectionStore, Placement};

/// Insert `record`, then place the stored version at the head of `store`.
async fn insert_record<T: Record>(
    gateway: &dyn DataGateway,
    store: &CollectionStore<T>,
    notices: &NoticeBoard,
    record: T,
) -> AppResult<T> {
    record.check()?;
    let row = serde_json::to_value(&record)?;

    let stored = match gateway.insert(T::COLLECTION, row).await {
        Ok(stored) => stored,
        Err(e) => {
            let err = e.into_write(format!("Failed to create {} record", T::COLLECTION));
            warn!(collection = T::COLLECTION, error = %err, "Insert failed");
            notices.post_error(&err);
            return Err(err);
        }
    };

    let record = match serde_json::from_value::<T>(stored) {
        Ok(stored) => stored,
        Err(e) => {
            warn!(collection = T::COLLECTION, error = %e, "Stored row did not decode, keeping submitted values");
            record
        }
    };

    info!(collection = T::COLLECTION, id = %record.id(), "Record created");
    store.upsert_local_at(record.clone(), Placement::Head);
    Ok(record)
}

/// Creates leads from the intake form.
#[derive(Debug, Clone)]
pub struct LeadIntake {
    gateway: Arc<dyn DataGateway>,
    session: Session,
    store: Arc<CollectionStore<Lead>>,
    notices: Arc<NoticeBoard>,
}

impl LeadIntake {
    /// Create an intake feeding `store`.
    pub fn new(
        gateway: Arc<dyn DataGateway>,
        session: Session,
        store: Arc<CollectionStore<Lead>>,
        notices: Arc<NoticeBoard>,
    ) -> Self {
        Self {
            gateway,
            session,
            store,
            notices,
        }
    }

    /// Validate and create a lead owned by the session user.
    pub async fn create(&self, form: LeadForm) -> AppResult<Lead> {
        validate_form(&form)?;
        let lead = form.into_lead(self.session.user_id());
        insert_record(self.gateway.as_ref(), &self.store, &self.notices, lead).await
    }
}

/// Creates business listings from the seller form.
#[derive(Debug, Clone)]
pub struct ListingIntake {
    gateway: Arc<dyn DataGateway>,
    session: Session,
    store: Arc<CollectionStore<Business>>,
    notices: Arc<NoticeBoard>,
}

impl ListingIntake {
    /// Create an intake feeding `store`.
    pub fn new(
        gateway: Arc<dyn DataGateway>,
        session: Session,
        store: Arc<CollectionStore<Business>>,
        notices: Arc<NoticeBoard>,
    ) -> Self {
        Self {
            gateway,
            session,
            store,
            notices,
        }
    }

    /// Validate and create a listing owned by the session user.
    pub async fn submit(&self, form: BusinessListingForm) -> AppResult<Business> {
        validate_form(&form)?;
        let listing = form.into_business(self.session.user_id());
        insert_record(self.gateway.as_ref(), &self.store, &self.notices, listing).await
    }
}
