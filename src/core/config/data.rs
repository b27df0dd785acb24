use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Per-provider overrides layered over the built-in endpoint table.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct ProviderOverride {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub streaming: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    /// Provider id used when the settings store has none (e.g., "gpt4")
    pub default_provider: Option<String>,
    /// Personality id used when the settings store has none
    pub default_personality: Option<String>,
    /// Directory holding the persisted key-value store
    pub data_dir: Option<PathBuf>,
    /// Keyed by provider id ("gemini", "gpt4", "claude")
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderOverride>,
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}

impl Config {
    pub fn provider_override(&self, id: &str) -> Option<&ProviderOverride> {
        self.providers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(id))
            .map(|(_, value)| value)
    }

    pub fn set_api_key(&mut self, provider: &str, api_key: String) {
        self.providers
            .entry(provider.to_lowercase())
            .or_default()
            .api_key = Some(api_key);
    }
}
