// Cloud Firestore repository implementation (REST API)
use crate::application::device_store::DocumentStore;
use crate::domain::device::{AccessType, DeviceAccessGrant, HistoryRecord, TankDataPoint};
use crate::infrastructure::credentials::TokenProvider;
use crate::infrastructure::firestore_value::{
    decode_access_grant, encode_data_point, encode_history, string_value, FirestoreDocument,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

const ACCESS_COLLECTION: &str = "device_access";
const DEVICES_COLLECTION: &str = "devices";
const HISTORY_COLLECTION: &str = "history";

#[derive(Clone)]
pub struct FirestoreRepository {
    http: reqwest::Client,
    base_url: String,
    project_id: String,
    tokens: Arc<dyn TokenProvider>,
}

#[derive(Debug, Deserialize)]
struct RunQueryItem {
    #[serde(default)]
    document: Option<FirestoreDocument>,
}

impl FirestoreRepository {
    pub fn new(http: reqwest::Client, base_url: String, project_id: String, tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            project_id,
            tokens,
        }
    }

    /// Resource name of the database's document root
    fn documents_name(&self) -> String {
        format!("projects/{}/databases/(default)/documents", self.project_id)
    }

    fn documents_url(&self) -> String {
        format!("{}/{}", self.base_url, self.documents_name())
    }

    /// Device path for request URLs, percent-escaped
    fn device_path(device_id: &str) -> String {
        format!("{}/{}", DEVICES_COLLECTION, urlencoding::encode(device_id))
    }

    /// Device resource name for request bodies, which Firestore reads verbatim
    fn device_name(&self, device_id: &str) -> String {
        format!("{}/{}/{}", self.documents_name(), DEVICES_COLLECTION, device_id)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let token = self.tokens.access_token().await?;
        request
            .bearer_auth(token)
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to send request to Firestore")
    }

    async fn ensure_success(response: Response, action: &str) -> Result<Response> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Firestore {} failed with status {}: {}", action, status, body);
        }
        Ok(response)
    }
}

#[async_trait]
impl DocumentStore for FirestoreRepository {
    async fn list_access_grants(&self, access_type: &AccessType) -> Result<Vec<DeviceAccessGrant>> {
        let query = json!({
            "structuredQuery": {
                "from": [{ "collectionId": ACCESS_COLLECTION }],
                "where": {
                    "fieldFilter": {
                        "field": { "fieldPath": "accessType" },
                        "op": "EQUAL",
                        "value": string_value(access_type.as_str())
                    }
                }
            }
        });

        let url = format!("{}:runQuery", self.documents_url());
        let response = self.send(self.http.post(&url).json(&query)).await?;
        let items = Self::ensure_success(response, "runQuery")
            .await?
            .json::<Vec<RunQueryItem>>()
            .await
            .context("Failed to parse Firestore query response")?;

        let grants: Vec<DeviceAccessGrant> = items
            .iter()
            .filter_map(|item| item.document.as_ref())
            .map(decode_access_grant)
            .collect();

        tracing::debug!("Firestore returned {} {} grants", grants.len(), access_type);
        Ok(grants)
    }

    async fn device_exists(&self, device_id: &str) -> Result<bool> {
        // Mask keeps the unbounded data array out of the response
        let url = format!("{}/{}", self.documents_url(), Self::device_path(device_id));
        let response = self
            .send(self.http.get(&url).query(&[("mask.fieldPaths", "lastUpdated")]))
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }

        Self::ensure_success(response, "get").await?;
        Ok(true)
    }

    async fn append_recent(&self, device_id: &str, point: &TankDataPoint, last_updated: &str) -> Result<()> {
        // Single write: field update, array-union transform and an
        // exists precondition so a missing document is never created.
        let write = json!({
            "update": {
                "name": self.device_name(device_id),
                "fields": { "lastUpdated": string_value(last_updated) }
            },
            "updateMask": { "fieldPaths": ["lastUpdated"] },
            "updateTransforms": [{
                "fieldPath": "data",
                "appendMissingElements": { "values": [encode_data_point(point)] }
            }],
            "currentDocument": { "exists": true }
        });

        let url = format!("{}:commit", self.documents_url());
        let response = self
            .send(self.http.post(&url).json(&json!({ "writes": [write] })))
            .await?;
        Self::ensure_success(response, "commit").await?;
        Ok(())
    }

    async fn write_history(&self, device_id: &str, key: &str, record: &HistoryRecord) -> Result<()> {
        let url = format!(
            "{}/{}/{}/{}",
            self.documents_url(),
            Self::device_path(device_id),
            HISTORY_COLLECTION,
            urlencoding::encode(key)
        );
        let response = self
            .send(self.http.patch(&url).json(&json!({ "fields": encode_history(record) })))
            .await?;
        Self::ensure_success(response, "history write").await?;
        Ok(())
    }
}
