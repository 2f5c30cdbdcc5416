use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";
const ENV_PREFIX: &str = "TANKLENS";
const CREDENTIALS_PATH_VAR: &str = "FIREBASE_CREDENTIALS_PATH";
const DATABASE_URL_VAR: &str = "FIREBASE_DATABASE_URL";

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub firebase: FirebaseSettings,
    pub sync: SyncSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FirebaseSettings {
    pub credentials_path: String,
    #[serde(default)]
    pub database_url: String,
    /// Falls back to the service account's project
    pub project_id: Option<String>,
    pub firestore_base_url: String,
    /// Fixed bearer token, used instead of the service account (emulators)
    pub access_token: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SyncSettings {
    pub interval_minutes: u64,
    pub concurrency: usize,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: String,
    pub file: Option<String>,
}

impl AppConfig {
    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync.interval_minutes * 60)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.sync.request_timeout_secs)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.firebase.database_url.trim().is_empty() {
            anyhow::bail!("{} is required but not set", DATABASE_URL_VAR);
        }
        if self.sync.interval_minutes == 0 {
            anyhow::bail!("sync.interval_minutes must be greater than zero");
        }
        if self.sync.concurrency == 0 {
            anyhow::bail!("sync.concurrency must be greater than zero");
        }
        Ok(())
    }
}

/// Load configuration from `.env`, `config/tanklens.*` and the process environment.
pub fn load_app_config() -> anyhow::Result<AppConfig> {
    // Best-effort .env load; ignore if missing
    let _ = dotenvy::dotenv();

    let vars: config::Map<String, String> = std::env::vars().collect();
    load_app_config_from(Some("config/tanklens"), vars)
}

/// Layering, lowest first: built-in defaults, optional config file,
/// `TANKLENS_*` variables, then the two `FIREBASE_*` variables.
pub fn load_app_config_from(file: Option<&str>, vars: config::Map<String, String>) -> anyhow::Result<AppConfig> {
    let credentials_path = vars.get(CREDENTIALS_PATH_VAR).cloned();
    let database_url = vars.get(DATABASE_URL_VAR).cloned();

    let mut builder = config::Config::builder()
        .set_default("firebase.credentials_path", "firebase-credentials.json")?
        .set_default("firebase.firestore_base_url", DEFAULT_FIRESTORE_BASE_URL)?
        .set_default("sync.interval_minutes", 10)?
        .set_default("sync.concurrency", 1)?
        .set_default("sync.request_timeout_secs", 30)?
        .set_default("logging.level", "info")?;

    if let Some(file) = file {
        builder = builder.add_source(config::File::with_name(file).required(false));
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(Some(vars)),
        )
        .set_override_option("firebase.credentials_path", credentials_path)?
        .set_override_option("firebase.database_url", database_url)?
        .build()?;

    let config: AppConfig = settings.try_deserialize()?;
    config.validate()?;
    Ok(config)
}
