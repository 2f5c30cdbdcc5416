// Discovery service - Use case for finding devices eligible for sync
use crate::application::device_store::DocumentStore;
use crate::application::sync_error::SyncError;
use crate::domain::device::AccessType;
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Clone)]
pub struct DiscoveryService {
    documents: Arc<dyn DocumentStore>,
}

impl DiscoveryService {
    pub fn new(documents: Arc<dyn DocumentStore>) -> Self {
        Self { documents }
    }

    /// Deduplicated ids of every device that has at least one owner grant.
    ///
    /// An empty set is a valid answer. A backend failure is returned as
    /// [`SyncError::Discovery`] so callers can tell the two apart.
    pub async fn list_owned_device_ids(&self) -> Result<BTreeSet<String>, SyncError> {
        let grants = self
            .documents
            .list_access_grants(&AccessType::Owner)
            .await
            .map_err(SyncError::Discovery)?;

        let mut device_ids = BTreeSet::new();
        for grant in grants.into_iter().filter(|g| g.is_owner()) {
            if grant.device_id.is_empty() {
                tracing::debug!(user_id = ?grant.user_id, "skipping owner grant without device id");
                continue;
            }
            device_ids.insert(grant.device_id);
        }

        tracing::info!("Found {} devices with owner access", device_ids.len());
        Ok(device_ids)
    }
}
