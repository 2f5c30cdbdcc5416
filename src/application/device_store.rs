// Store traits for the realtime and document backends
use crate::domain::device::{AccessType, DeviceAccessGrant, HistoryRecord, Reading, TankDataPoint};
use async_trait::async_trait;

/// Low-latency store holding the latest reading per device.
#[async_trait]
pub trait RealtimeStore: Send + Sync {
    /// Latest reading for a device, or `None` when the device never reported
    async fn read_latest(&self, device_id: &str) -> anyhow::Result<Option<Reading>>;
}

/// Persistent store holding access grants, device documents and history.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Access grants whose access type equals `access_type`
    async fn list_access_grants(&self, access_type: &AccessType) -> anyhow::Result<Vec<DeviceAccessGrant>>;

    /// Whether the device document exists
    async fn device_exists(&self, device_id: &str) -> anyhow::Result<bool>;

    /// Union `point` into the device's `data` array and set `lastUpdated`, as one update.
    /// Must fail rather than create the document when it is missing.
    async fn append_recent(
        &self,
        device_id: &str,
        point: &TankDataPoint,
        last_updated: &str,
    ) -> anyhow::Result<()>;

    /// Create or overwrite `devices/{device_id}/history/{key}`
    async fn write_history(&self, device_id: &str, key: &str, record: &HistoryRecord) -> anyhow::Result<()>;
}
