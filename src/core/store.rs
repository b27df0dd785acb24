//! Persistent store adapter.
//!
//! State lives under a handful of string keys in a [`KeyValueStore`]. Values
//! are JSON documents. Reads that fail or hold corrupt JSON are logged and
//! replaced by defaults; they never stop the app from starting.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use base64::Engine;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::warn;

use crate::core::analytics::AnalyticsCounters;
use crate::core::personality::DEFAULT_PERSONALITY;
use crate::core::session::ChatSession;

pub const SETTINGS_KEY: &str = "nexus_settings";
pub const THEME_KEY: &str = "nexus_theme";
pub const USER_PROFILE_KEY: &str = "nexus_user_profile";
pub const PINNED_MESSAGES_KEY: &str = "nexus_pinned_messages";

pub const DEFAULT_MODEL: &str = "gemini";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access stored '{key}': {source}")]
    Io {
        key: String,
        source: std::io::Error,
    },

    #[error("Failed to encode '{key}': {source}")]
    Encode {
        key: String,
        source: serde_json::Error,
    },

    #[error("Storage lock poisoned")]
    Poisoned,
}

/// String key-value persistence.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// One `<key>.json` file per key inside a data directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            key: key.to_string(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(io_err)?;
        let mut temp_file = NamedTempFile::new_in(&self.dir).map_err(io_err)?;
        temp_file.write_all(value.as_bytes()).map_err(io_err)?;
        temp_file.as_file_mut().sync_all().map_err(io_err)?;
        temp_file
            .persist(self.path_for(key))
            .map_err(|err| io_err(err.error))?;
        Ok(())
    }
}

/// In-process store. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Auto,
    Light,
    Dark,
    Matrix,
    Cyberpunk,
}

impl Theme {
    pub const ALL: [Theme; 5] = [
        Theme::Auto,
        Theme::Light,
        Theme::Dark,
        Theme::Matrix,
        Theme::Cyberpunk,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Auto => "auto",
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::Matrix => "matrix",
            Theme::Cyberpunk => "cyberpunk",
        }
    }

    /// The theme after this one, wrapping around.
    pub fn next(self) -> Theme {
        let index = Self::ALL.iter().position(|theme| *theme == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|theme| theme.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!("Unknown theme '{s}'. Available themes: auto, light, dark, matrix, cyberpunk")
            })
    }
}

pub const DEFAULT_PROFILE_NAME: &str = "User";
pub const DEFAULT_PROFILE_IMAGE: &str = "/images/user-default.png";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    pub name: String,
    /// A path or a `data:` URL.
    pub image: String,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            name: DEFAULT_PROFILE_NAME.to_string(),
            image: DEFAULT_PROFILE_IMAGE.to_string(),
        }
    }
}

impl UserProfile {
    /// Encode an image file as a `data:` URL.
    pub fn image_data_url(path: &Path) -> std::io::Result<String> {
        let bytes = fs::read(path)?;
        let mime = match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("png") => "image/png",
            Some("jpg" | "jpeg") => "image/jpeg",
            Some("gif") => "image/gif",
            Some("webp") => "image/webp",
            Some("svg") => "image/svg+xml",
            _ => "application/octet-stream",
        };
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        Ok(format!("data:{mime};base64,{encoded}"))
    }
}

/// The `config` member of the settings blob.
///
/// `max_retries` and `retry_delay` are persisted but no exchange retries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BehaviorConfig {
    pub max_retries: u32,
    pub retry_delay: u64,
    pub max_tokens: u32,
    pub streaming_enabled: bool,
    pub auto_save: bool,
    pub auto_save_interval: u64,
    pub temperature: f32,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: 1000,
            max_tokens: 2048,
            streaming_enabled: true,
            auto_save: true,
            auto_save_interval: 300_000,
            temperature: 0.7,
        }
    }
}

fn default_personality() -> String {
    DEFAULT_PERSONALITY.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_true() -> bool {
    true
}

/// Everything saved under [`SETTINGS_KEY`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsBlob {
    #[serde(default)]
    pub chat_history: BTreeMap<String, ChatSession>,
    #[serde(default = "default_personality")]
    pub current_personality: String,
    #[serde(default = "default_model")]
    pub current_model: String,
    #[serde(default = "default_true")]
    pub memory_enabled: bool,
    #[serde(default)]
    pub config: BehaviorConfig,
    #[serde(default)]
    pub analytics: AnalyticsCounters,
    #[serde(default)]
    pub command_usage: BTreeMap<String, u64>,
    #[serde(default)]
    pub pinned_messages: Vec<String>,
    #[serde(default)]
    pub user_profile: UserProfile,
}

impl Default for SettingsBlob {
    fn default() -> Self {
        Self {
            chat_history: BTreeMap::new(),
            current_personality: default_personality(),
            current_model: default_model(),
            memory_enabled: true,
            config: BehaviorConfig::default(),
            analytics: AnalyticsCounters::default(),
            command_usage: BTreeMap::new(),
            pinned_messages: Vec::new(),
            user_profile: UserProfile::default(),
        }
    }
}

/// Typed access to the keys NEXUS persists.
pub struct Store {
    backend: Box<dyn KeyValueStore>,
}

impl Store {
    pub fn new(backend: impl KeyValueStore + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    fn load_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.backend.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("{e}; using defaults");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring corrupt '{key}': {e}");
                None
            }
        }
    }

    fn save_json<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value).map_err(|source| StoreError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.backend.set(key, &raw)
    }

    /// Saved settings, or `None` on first run or when the blob is unreadable.
    pub fn load_saved_settings(&self) -> Option<SettingsBlob> {
        self.load_json(SETTINGS_KEY)
    }

    pub fn load_settings(&self) -> SettingsBlob {
        self.load_saved_settings().unwrap_or_default()
    }

    pub fn save_settings(&mut self, settings: &SettingsBlob) -> Result<(), StoreError> {
        self.save_json(SETTINGS_KEY, settings)
    }

    pub fn load_theme(&self) -> Theme {
        self.load_json::<String>(THEME_KEY)
            .and_then(|name| name.parse().ok())
            .unwrap_or_default()
    }

    pub fn save_theme(&mut self, theme: Theme) -> Result<(), StoreError> {
        self.save_json(THEME_KEY, &theme)
    }

    pub fn load_user_profile(&self) -> Option<UserProfile> {
        self.load_json(USER_PROFILE_KEY)
    }

    pub fn save_user_profile(&mut self, profile: &UserProfile) -> Result<(), StoreError> {
        self.save_json(USER_PROFILE_KEY, profile)
    }

    pub fn load_pinned(&self) -> Option<Vec<String>> {
        self.load_json(PINNED_MESSAGES_KEY)
    }

    pub fn save_pinned(&mut self, pinned: &[String]) -> Result<(), StoreError> {
        self.save_json(PINNED_MESSAGES_KEY, &pinned)
    }
}
