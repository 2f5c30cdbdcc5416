// Device domain models
use std::fmt;

/// Relation a user holds on a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessType {
    Owner,
    Viewer,
    Other(String),
}

impl AccessType {
    pub fn parse(value: &str) -> Self {
        match value {
            "owner" => AccessType::Owner,
            "viewer" => AccessType::Viewer,
            other => AccessType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            AccessType::Owner => "owner",
            AccessType::Viewer => "viewer",
            AccessType::Other(value) => value,
        }
    }
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceAccessGrant {
    pub device_id: String,
    pub user_id: Option<String>,
    pub access_type: AccessType,
}

impl DeviceAccessGrant {
    pub fn new(device_id: String, user_id: Option<String>, access_type: AccessType) -> Self {
        Self {
            device_id,
            user_id,
            access_type,
        }
    }

    pub fn is_owner(&self) -> bool {
        self.access_type == AccessType::Owner
    }
}

/// Latest reading a device pushed to the realtime store.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub water_level: f64,
    pub distance: f64,
    /// Producer-assigned, may be empty
    pub timestamp: String,
}

impl Reading {
    pub fn new(water_level: f64, distance: f64, timestamp: String) -> Self {
        Self {
            water_level,
            distance,
            timestamp,
        }
    }
}

/// One entry of the bounded "recent" array on a device document.
#[derive(Debug, Clone, PartialEq)]
pub struct TankDataPoint {
    pub timestamp: String,
    pub level: f64,
}

impl TankDataPoint {
    pub fn new(timestamp: String, level: f64) -> Self {
        Self { timestamp, level }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRecord {
    pub timestamp: String,
    pub level: f64,
    pub distance: f64,
}

impl HistoryRecord {
    pub fn new(timestamp: String, level: f64, distance: f64) -> Self {
        Self {
            timestamp,
            level,
            distance,
        }
    }

    /// Document id under the device's history sub-collection.
    pub fn key(&self) -> String {
        history_key(&self.timestamp)
    }
}

/// Turns an ISO timestamp into a storage-safe document id.
pub fn history_key(timestamp: &str) -> String {
    timestamp.replace([':', '.'], "_")
}
