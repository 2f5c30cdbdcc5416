// Service-account credentials and OAuth2 access tokens
use anyhow::Context;
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::sync::Mutex;

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: u64 = 3600;
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Scopes covering Firestore and the Realtime Database.
pub const FIREBASE_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/datastore",
    "https://www.googleapis.com/auth/firebase.database",
    "https://www.googleapis.com/auth/userinfo.email",
];

#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("failed to read credentials file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid credentials file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid service account private key: {0}")]
    Key(#[from] jsonwebtoken::errors::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccount {
    pub project_id: String,
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccount {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CredentialsError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| CredentialsError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, CredentialsError> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> anyhow::Result<String>;
}

/// Always hands out the same token.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: String) -> Self {
        Self { token }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> anyhow::Result<String> {
        Ok(self.token.clone())
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    ASSERTION_LIFETIME_SECS
}

struct CachedToken {
    token: String,
    refresh_at: SystemTime,
}

/// Mints access tokens from a signed JWT assertion and caches them until
/// shortly before expiry.
pub struct ServiceAccountTokenProvider {
    account: ServiceAccount,
    key: EncodingKey,
    http: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountTokenProvider {
    pub fn new(account: ServiceAccount, http: reqwest::Client) -> Result<Self, CredentialsError> {
        let key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())?;
        Ok(Self {
            account,
            key,
            http,
            cached: Mutex::new(None),
        })
    }

    fn signed_assertion(&self, now: u64) -> anyhow::Result<String> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.account.private_key_id.clone();

        let claims = AssertionClaims {
            iss: &self.account.client_email,
            scope: FIREBASE_SCOPES.join(" "),
            aud: &self.account.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };

        jsonwebtoken::encode(&header, &claims, &self.key).context("Failed to sign token assertion")
    }

    async fn fetch_token(&self) -> anyhow::Result<TokenResponse> {
        let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
        let assertion = self.signed_assertion(now)?;

        let response = self
            .http
            .post(&self.account.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .context("Failed to send token request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Token exchange failed with status {}: {}", status, body);
        }

        response
            .json::<TokenResponse>()
            .await
            .context("Failed to parse token response")
    }
}

#[async_trait]
impl TokenProvider for ServiceAccountTokenProvider {
    async fn access_token(&self) -> anyhow::Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if SystemTime::now() < token.refresh_at {
                return Ok(token.token.clone());
            }
        }

        let fresh = self.fetch_token().await?;
        let lifetime = Duration::from_secs(fresh.expires_in).saturating_sub(REFRESH_MARGIN);
        tracing::debug!(expires_in = fresh.expires_in, "Obtained new access token");

        *cached = Some(CachedToken {
            token: fresh.access_token.clone(),
            refresh_at: SystemTime::now() + lifetime,
        });
        Ok(fresh.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SERVICE_ACCOUNT_JSON: &str = include_str!("testdata/service_account.json");

    fn account_for(server: &MockServer) -> ServiceAccount {
        let mut account = ServiceAccount::from_json(SERVICE_ACCOUNT_JSON).unwrap();
        account.token_uri = format!("{}/token", server.uri());
        account
    }

    #[test]
    fn test_parse_service_account() {
        let account = ServiceAccount::from_json(SERVICE_ACCOUNT_JSON).unwrap();
        assert_eq!(account.project_id, "tanklens-test");
        assert_eq!(account.client_email, "sync@tanklens-test.iam.gserviceaccount.com");
        assert_eq!(account.private_key_id.as_deref(), Some("test-key-1"));
    }

    #[test]
    fn test_token_uri_defaults() {
        let account = ServiceAccount::from_json(
            r#"{"project_id": "p", "client_email": "e@p.iam.gserviceaccount.com", "private_key": "k"}"#,
        )
        .unwrap();
        assert_eq!(account.token_uri, DEFAULT_TOKEN_URI);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = ServiceAccount::from_file("/nonexistent/firebase-credentials.json").unwrap_err();
        assert!(matches!(err, CredentialsError::Read { .. }));
    }

    #[test]
    fn test_garbage_private_key_is_rejected() {
        let account = ServiceAccount::from_json(
            r#"{"project_id": "p", "client_email": "e@p.iam.gserviceaccount.com", "private_key": "not a key"}"#,
        )
        .unwrap();
        let result = ServiceAccountTokenProvider::new(account, reqwest::Client::new());
        assert!(matches!(result, Err(CredentialsError::Key(_))));
    }

    #[tokio::test]
    async fn test_token_is_minted_once_and_cached() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer"))
            .and(body_string_contains("assertion="))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.test-token",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = ServiceAccountTokenProvider::new(account_for(&server), reqwest::Client::new()).unwrap();

        assert_eq!(provider.access_token().await.unwrap(), "ya29.test-token");
        assert_eq!(provider.access_token().await.unwrap(), "ya29.test-token");
    }

    #[tokio::test]
    async fn test_rejected_exchange_is_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_string(r#"{"error":"invalid_grant"}"#))
            .mount(&server)
            .await;

        let provider = ServiceAccountTokenProvider::new(account_for(&server), reqwest::Client::new()).unwrap();

        let err = provider.access_token().await.unwrap_err();
        assert!(err.to_string().contains("400"));
    }

    #[tokio::test]
    async fn test_static_token() {
        let provider = StaticTokenProvider::new("owner".to_string());
        assert_eq!(provider.access_token().await.unwrap(), "owner");
    }
}
