//! Pluggable load/save of the settings record.
//!
//! The trainer only sees `SettingsPersistence`. Two backings exist: the HTTP
//! settings API and a local JSON key-value file for use without a server.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::validate::{validate_update, FieldErrors};
use super::{NewSightWords, SettingsUpdate, SightWords, DEFAULT_USER_ID};
use crate::api::SETTINGS_PATH;
use crate::config::{StorageBackend, StorageConfig};
use crate::errors::PersistenceError;

/// Key the record is stored under in the local key-value file.
pub const FILE_RECORD_KEY: &str = "sightWords";

pub trait SettingsPersistence {
    /// Current record, or `None` if nothing has been saved yet.
    async fn load(&self) -> Result<Option<SightWords>, PersistenceError>;

    /// Replace the record, creating it on first save.
    async fn save(&self, update: &SettingsUpdate) -> Result<SightWords, PersistenceError>;
}

// --- HTTP API ---

#[derive(Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
    #[serde(default)]
    errors: FieldErrors,
}

pub struct ApiPersistence {
    client: Client,
    url: String,
}

impl ApiPersistence {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, PersistenceError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: format!("{}{SETTINGS_PATH}", base_url.trim_end_matches('/')),
        })
    }

    async fn unexpected(resp: reqwest::Response) -> PersistenceError {
        let status = resp.status().as_u16();
        let message = match resp.json::<ApiErrorBody>().await {
            Ok(body) => body.message.unwrap_or_default(),
            Err(_) => String::new(),
        };
        PersistenceError::Status { status, message }
    }
}

impl SettingsPersistence for ApiPersistence {
    async fn load(&self) -> Result<Option<SightWords>, PersistenceError> {
        debug!("GET {}", self.url);
        let resp = self.client.get(&self.url).send().await?;
        match resp.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => Ok(Some(resp.json().await?)),
            _ => Err(Self::unexpected(resp).await),
        }
    }

    async fn save(&self, update: &SettingsUpdate) -> Result<SightWords, PersistenceError> {
        debug!("POST {} ({} words)", self.url, update.words.len());
        let resp = self.client.post(&self.url).json(update).send().await?;
        match resp.status() {
            s if s.is_success() => Ok(resp.json().await?),
            StatusCode::BAD_REQUEST => {
                let body: ApiErrorBody = resp.json().await?;
                Err(PersistenceError::Rejected {
                    message: body.message.unwrap_or_default(),
                    errors: body.errors,
                })
            }
            _ => Err(Self::unexpected(resp).await),
        }
    }
}

// --- Local file ---

pub struct FilePersistence {
    path: PathBuf,
}

impl FilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_entries(&self) -> Result<Map<String, Value>, PersistenceError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) if contents.trim().is_empty() => Ok(Map::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Map::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write via a sibling temp file and rename, so readers never see a partial file.
    async fn write_entries(&self, entries: &Map<String, Value>) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(entries)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

impl SettingsPersistence for FilePersistence {
    async fn load(&self) -> Result<Option<SightWords>, PersistenceError> {
        let mut entries = self.read_entries().await?;
        match entries.remove(FILE_RECORD_KEY) {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, update: &SettingsUpdate) -> Result<SightWords, PersistenceError> {
        validate_update(&serde_json::to_value(update)?).map_err(|errors| {
            PersistenceError::Rejected {
                message: "Invalid data provided".into(),
                errors,
            }
        })?;

        let mut entries = self.read_entries().await?;
        let record = match entries.get(FILE_RECORD_KEY) {
            Some(value) => {
                let mut record: SightWords = serde_json::from_value(value.clone())?;
                record.replace_with(update);
                record
            }
            None => NewSightWords::for_user(DEFAULT_USER_ID, update.clone()).into_record(1),
        };

        entries.insert(FILE_RECORD_KEY.to_string(), serde_json::to_value(&record)?);
        self.write_entries(&entries).await?;
        info!("Saved settings to {}", self.path.display());
        Ok(record)
    }
}

// --- Runtime selection ---

pub enum Backend {
    Api(ApiPersistence),
    File(FilePersistence),
}

impl Backend {
    pub fn from_config(config: &StorageConfig, offline: bool) -> Result<Self, PersistenceError> {
        if offline || config.backend == StorageBackend::File {
            let file = FilePersistence::new(config.resolved_file_path());
            info!("Using local settings file {}", file.path().display());
            Ok(Backend::File(file))
        } else {
            info!("Using settings API at {}", config.api_url);
            Ok(Backend::Api(ApiPersistence::new(
                &config.api_url,
                Duration::from_secs(config.timeout_secs),
            )?))
        }
    }
}

impl SettingsPersistence for Backend {
    async fn load(&self) -> Result<Option<SightWords>, PersistenceError> {
        match self {
            Backend::Api(api) => api.load().await,
            Backend::File(file) => file.load().await,
        }
    }

    async fn save(&self, update: &SettingsUpdate) -> Result<SightWords, PersistenceError> {
        match self {
            Backend::Api(api) => api.save(update).await,
            Backend::File(file) => file.save(update).await,
        }
    }
}
