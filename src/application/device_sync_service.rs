// Device sync service - Copies one device's latest reading into the document store
use crate::application::clock::Clock;
use crate::application::device_store::{DocumentStore, RealtimeStore};
use crate::application::sync_error::SyncOutcome;
use crate::domain::device::{HistoryRecord, TankDataPoint};
use crate::domain::timestamp::iso_timestamp;
use anyhow::Context;
use std::sync::Arc;

#[derive(Clone)]
pub struct DeviceSyncService {
    realtime: Arc<dyn RealtimeStore>,
    documents: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
}

impl DeviceSyncService {
    pub fn new(
        realtime: Arc<dyn RealtimeStore>,
        documents: Arc<dyn DocumentStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            realtime,
            documents,
            clock,
        }
    }

    /// Sync a single device. Never fails outward: errors become [`SyncOutcome::Failed`].
    pub async fn sync_device(&self, device_id: &str) -> SyncOutcome {
        tracing::info!(device_id, "Processing device");

        match self.try_sync_device(device_id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(device_id, error = %format!("{e:#}"), "Error processing device");
                SyncOutcome::Failed(format!("{e:#}"))
            }
        }
    }

    async fn try_sync_device(&self, device_id: &str) -> anyhow::Result<SyncOutcome> {
        let Some(reading) = self
            .realtime
            .read_latest(device_id)
            .await
            .context("failed to read realtime data")?
        else {
            tracing::warn!(device_id, "No data found in realtime database for device");
            return Ok(SyncOutcome::NoReading);
        };

        let timestamp = iso_timestamp(self.clock.now());
        tracing::debug!(
            device_id,
            water_level = reading.water_level,
            distance = reading.distance,
            device_timestamp = %reading.timestamp,
            "Fetched latest reading"
        );

        let exists = self
            .documents
            .device_exists(device_id)
            .await
            .context("failed to look up device document")?;
        if !exists {
            tracing::warn!(device_id, "Device document doesn't exist in document store");
            return Ok(SyncOutcome::MissingDocument);
        }

        // Recent array first, history second. A crash in between leaves
        // the recent entry without its history record, never the reverse.
        let point = TankDataPoint::new(timestamp.clone(), reading.water_level);
        self.documents
            .append_recent(device_id, &point, &timestamp)
            .await
            .context("failed to update device document")?;

        let record = HistoryRecord::new(timestamp, reading.water_level, reading.distance);
        self.documents
            .write_history(device_id, &record.key(), &record)
            .await
            .context("failed to write history record")?;

        tracing::info!(device_id, "Successfully updated document store for device");
        Ok(SyncOutcome::Synced)
    }
}
