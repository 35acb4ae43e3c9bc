//! Configuration management for sight-words.
//!
//! Loads config from YAML files in standard locations. Every section has
//! defaults, so an empty or missing file yields a working setup.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Seed the default user with the built-in word list at startup.
    pub seed_defaults: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 5000,
            seed_defaults: true,
        }
    }
}

impl ServerConfig {
    /// Whether `serve` starts with the seed list. Unseeded, a GET before the
    /// first POST answers 404.
    pub fn seeds(&self, no_seed: bool) -> bool {
        self.seed_defaults && !no_seed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Api,
    File,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub api_url: String,
    pub file_path: Option<PathBuf>,
    pub timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Api,
            api_url: "http://127.0.0.1:5000".into(),
            file_path: None,
            timeout_secs: 10,
        }
    }
}

impl StorageConfig {
    /// Local settings file, `<data dir>/sight-words/settings.json` unless overridden.
    pub fn resolved_file_path(&self) -> PathBuf {
        self.file_path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .or_else(dirs::home_dir)
                .unwrap_or_else(|| PathBuf::from("."))
                .join("sight-words")
                .join("settings.json")
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub auto_advance_ms: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            auto_advance_ms: 3000,
        }
    }
}

impl TrainerConfig {
    pub fn dwell(&self) -> Duration {
        Duration::from_millis(self.auto_advance_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub program: String,
    pub volume: f32,
    pub voice_poll_interval_ms: u64,
    pub voice_poll_attempts: u32,
    pub voice_refresh_delays_ms: Vec<u64>,
    /// Whether the host's voices-changed signal can be trusted. When false the
    /// catalog is refreshed on `voice_refresh_delays_ms` instead.
    pub voices_changed_reliable: bool,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            program: "espeak-ng".into(),
            volume: 0.8,
            voice_poll_interval_ms: 50,
            voice_poll_attempts: 20,
            voice_refresh_delays_ms: vec![50, 100, 250, 500, 1000, 2000],
            voices_changed_reliable: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    pub notifications: bool,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            notifications: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub trainer: TrainerConfig,
    pub speech: SpeechConfig,
    pub feedback: FeedbackConfig,
}

impl Config {
    /// Load configuration from YAML file.
    ///
    /// Searches standard locations if no path is provided:
    /// 1. ./config.yaml
    /// 2. ~/.config/sight-words/config.yaml
    /// 3. /etc/sight-words/config.yaml
    pub fn load(path: Option<&Path>) -> Self {
        let resolved = path.map(PathBuf::from).or_else(|| {
            let candidates = [
                std::env::current_dir().ok().map(|d| d.join("config.yaml")),
                dirs::home_dir().map(|h| h.join(".config/sight-words/config.yaml")),
                Some(PathBuf::from("/etc/sight-words/config.yaml")),
            ];
            candidates.into_iter().flatten().find(|p| p.exists())
        });

        let Some(config_path) = resolved else {
            info!("No config file found, using defaults");
            return Self::default();
        };

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(config) => {
                    info!("Loaded config from {}", config_path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {e}, using defaults", config_path.display());
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read {}: {e}, using defaults", config_path.display());
                Self::default()
            }
        }
    }

    pub fn parse(contents: &str) -> Result<Self, serde_yml::Error> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yml::from_str(contents)
    }
}
