// Sync orchestrator - One discovery-then-sync pass over all owned devices
use crate::application::device_sync_service::DeviceSyncService;
use crate::application::discovery_service::DiscoveryService;
use crate::application::sync_error::{PassSummary, SyncOutcome};
use futures::stream::{self, StreamExt};

#[derive(Clone)]
pub struct SyncOrchestrator {
    discovery: DiscoveryService,
    device_sync: DeviceSyncService,
    concurrency: usize,
}

impl SyncOrchestrator {
    /// `concurrency` of 1 syncs devices one after another in id order;
    /// anything higher runs up to that many devices at once, unordered.
    pub fn new(discovery: DiscoveryService, device_sync: DeviceSyncService, concurrency: usize) -> Self {
        Self {
            discovery,
            device_sync,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn run_sync_pass(&self) -> PassSummary {
        tracing::info!("Starting tank data synchronization");

        let device_ids = match self.discovery.list_owned_device_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping sync pass");
                return PassSummary::default();
            }
        };

        if device_ids.is_empty() {
            tracing::warn!("No devices found to process");
            return PassSummary::default();
        }

        let outcomes: Vec<SyncOutcome> = if self.concurrency == 1 {
            let mut outcomes = Vec::with_capacity(device_ids.len());
            for device_id in &device_ids {
                outcomes.push(self.device_sync.sync_device(device_id).await);
            }
            outcomes
        } else {
            stream::iter(device_ids.iter().cloned())
                .map(|device_id| {
                    let device_sync = self.device_sync.clone();
                    async move { device_sync.sync_device(&device_id).await }
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await
        };

        let mut summary = PassSummary::default();
        for outcome in &outcomes {
            summary.record(outcome);
        }

        tracing::info!(
            skipped = summary.skipped,
            failed = summary.failed,
            "Completed synchronization. Processed {}/{} devices successfully",
            summary.succeeded,
            summary.total
        );
        summary
    }
}
