// In-memory store fakes for application tests
use crate::application::clock::Clock;
use crate::application::device_store::{DocumentStore, RealtimeStore};
use crate::domain::device::{AccessType, DeviceAccessGrant, HistoryRecord, Reading, TankDataPoint};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Default)]
pub struct InMemoryRealtimeStore {
    readings: Mutex<HashMap<String, Reading>>,
    failing: Mutex<HashSet<String>>,
    reads: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl InMemoryRealtimeStore {
    pub fn with_reading(self, device_id: &str, water_level: f64, distance: f64) -> Self {
        self.readings.lock().unwrap().insert(
            device_id.to_string(),
            Reading::new(water_level, distance, "2024-05-01T12:00:00Z".to_string()),
        );
        self
    }

    pub fn failing_for(self, device_id: &str) -> Self {
        self.failing.lock().unwrap().insert(device_id.to_string());
        self
    }

    /// Every read takes `delay` of tokio time to answer
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn reads(&self) -> Vec<String> {
        self.reads.lock().unwrap().clone()
    }
}

#[async_trait]
impl RealtimeStore for InMemoryRealtimeStore {
    async fn read_latest(&self, device_id: &str) -> anyhow::Result<Option<Reading>> {
        self.reads.lock().unwrap().push(device_id.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.lock().unwrap().contains(device_id) {
            anyhow::bail!("realtime store unavailable");
        }
        Ok(self.readings.lock().unwrap().get(device_id).cloned())
    }
}

/// Stored state of a device document.
#[derive(Debug, Clone, Default)]
pub struct StoredDevice {
    pub data: Vec<TankDataPoint>,
    pub last_updated: Option<String>,
}

#[derive(Default)]
pub struct InMemoryDocumentStore {
    grants: Mutex<Vec<DeviceAccessGrant>>,
    devices: Mutex<HashMap<String, StoredDevice>>,
    history: Mutex<HashMap<String, BTreeMap<String, HistoryRecord>>>,
    fail_discovery: Mutex<bool>,
    fail_history: Mutex<HashSet<String>>,
    writes: AtomicUsize,
}

impl InMemoryDocumentStore {
    pub fn with_grant(self, device_id: &str, access_type: AccessType) -> Self {
        self.grants.lock().unwrap().push(DeviceAccessGrant::new(
            device_id.to_string(),
            Some(format!("user-of-{}", device_id)),
            access_type,
        ));
        self
    }

    pub fn with_device(self, device_id: &str) -> Self {
        self.devices
            .lock()
            .unwrap()
            .insert(device_id.to_string(), StoredDevice::default());
        self
    }

    pub fn failing_discovery(self) -> Self {
        *self.fail_discovery.lock().unwrap() = true;
        self
    }

    pub fn failing_history_for(self, device_id: &str) -> Self {
        self.fail_history.lock().unwrap().insert(device_id.to_string());
        self
    }

    pub fn device(&self, device_id: &str) -> Option<StoredDevice> {
        self.devices.lock().unwrap().get(device_id).cloned()
    }

    pub fn history(&self, device_id: &str) -> BTreeMap<String, HistoryRecord> {
        self.history
            .lock()
            .unwrap()
            .get(device_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn list_access_grants(&self, access_type: &AccessType) -> anyhow::Result<Vec<DeviceAccessGrant>> {
        if *self.fail_discovery.lock().unwrap() {
            anyhow::bail!("document store unreachable");
        }
        Ok(self
            .grants
            .lock()
            .unwrap()
            .iter()
            .filter(|g| &g.access_type == access_type)
            .cloned()
            .collect())
    }

    async fn device_exists(&self, device_id: &str) -> anyhow::Result<bool> {
        Ok(self.devices.lock().unwrap().contains_key(device_id))
    }

    async fn append_recent(
        &self,
        device_id: &str,
        point: &TankDataPoint,
        last_updated: &str,
    ) -> anyhow::Result<()> {
        let mut devices = self.devices.lock().unwrap();
        let Some(doc) = devices.get_mut(device_id) else {
            anyhow::bail!("device {} does not exist", device_id);
        };
        if !doc.data.contains(point) {
            doc.data.push(point.clone());
        }
        doc.last_updated = Some(last_updated.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn write_history(&self, device_id: &str, key: &str, record: &HistoryRecord) -> anyhow::Result<()> {
        if self.fail_history.lock().unwrap().contains(device_id) {
            anyhow::bail!("history write rejected");
        }
        self.history
            .lock()
            .unwrap()
            .entry(device_id.to_string())
            .or_default()
            .insert(key.to_string(), record.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Clock that advances one second per call, starting at a fixed instant.
pub struct SteppingClock {
    start: NaiveDateTime,
    calls: AtomicUsize,
}

impl SteppingClock {
    pub fn starting_at(start: NaiveDateTime) -> Self {
        Self {
            start,
            calls: AtomicUsize::new(0),
        }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> NaiveDateTime {
        let step = self.calls.fetch_add(1, Ordering::SeqCst) as i64;
        self.start + chrono::Duration::seconds(step)
    }

    fn now_utc(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self.now())
    }
}

/// Clock driven by tokio time, so paused-time tests move it with `sleep`.
/// `shift` skews it against the timer, like a wall clock stepped by NTP.
pub struct VirtualClock {
    base: DateTime<Utc>,
    started: tokio::time::Instant,
    offset: Mutex<chrono::Duration>,
}

impl VirtualClock {
    pub fn starting_at(base: DateTime<Utc>) -> Self {
        Self {
            base,
            started: tokio::time::Instant::now(),
            offset: Mutex::new(chrono::Duration::zero()),
        }
    }

    pub fn shift(&self, by: chrono::Duration) {
        *self.offset.lock().unwrap() += by;
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> NaiveDateTime {
        self.now_utc().naive_utc()
    }

    fn now_utc(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.started.elapsed()).unwrap();
        self.base + elapsed + *self.offset.lock().unwrap()
    }
}
