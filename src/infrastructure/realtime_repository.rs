// Firebase Realtime Database repository implementation (REST API)
use crate::application::device_store::RealtimeStore;
use crate::domain::device::Reading;
use crate::infrastructure::credentials::TokenProvider;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

#[derive(Clone)]
pub struct RealtimeDatabaseRepository {
    http: reqwest::Client,
    database_url: String,
    tokens: Arc<dyn TokenProvider>,
}

impl RealtimeDatabaseRepository {
    pub fn new(http: reqwest::Client, database_url: String, tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            http,
            database_url: database_url.trim_end_matches('/').to_string(),
            tokens,
        }
    }

    fn node_url(&self, device_id: &str) -> String {
        format!("{}/{}.json", self.database_url, urlencoding::encode(device_id))
    }
}

/// Interpret the node stored at `/{deviceId}`.
///
/// Null and empty values (`{}`, `[]`, `""`, `0`, `false`) mean the device
/// has not reported. Missing fields fall back to 0 / 0 / "".
pub fn reading_from_value(value: &Value) -> Result<Option<Reading>> {
    let node = match value {
        Value::Null => return Ok(None),
        Value::Bool(b) if !b => return Ok(None),
        Value::Number(n) if n.as_f64() == Some(0.0) => return Ok(None),
        Value::String(s) if s.is_empty() => return Ok(None),
        Value::Array(a) if a.is_empty() => return Ok(None),
        Value::Object(o) if o.is_empty() => return Ok(None),
        Value::Object(o) => o,
        other => anyhow::bail!("Unexpected realtime payload: {}", other),
    };

    let number = |field: &str| -> Result<f64> {
        match node.get(field) {
            None | Some(Value::Null) => Ok(0.0),
            Some(v) => v
                .as_f64()
                .with_context(|| format!("Field {} is not a number: {}", field, v)),
        }
    };

    let timestamp = match node.get("timestamp") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };

    Ok(Some(Reading::new(number("waterLevel")?, number("distance")?, timestamp)))
}

#[async_trait]
impl RealtimeStore for RealtimeDatabaseRepository {
    async fn read_latest(&self, device_id: &str) -> Result<Option<Reading>> {
        let token = self.tokens.access_token().await?;

        let response = self
            .http
            .get(self.node_url(device_id))
            .query(&[("access_token", token.as_str())])
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to send request to Realtime Database")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Realtime Database read failed with status {}: {}", status, body);
        }

        let value = response
            .json::<Value>()
            .await
            .context("Failed to parse Realtime Database response")?;

        reading_from_value(&value)
    }
}
