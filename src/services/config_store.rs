// Configuration Storage Service
// Handles config file read/write, version backup, and API-key change notification

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tokio::sync::watch;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub version: String,
    /// Provider selected when the caller does not name one ("mock", "gemini", "openrouter").
    pub default_provider: Option<String>,
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    #[serde(default)]
    pub api_keys: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisConfig {
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_top_p")]
    pub top_p: f64,
    #[serde(default = "default_top_k")]
    pub top_k: i32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: i32,
    #[serde(default = "default_retries")]
    pub max_retries: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            top_p: 0.9,
            top_k: 40,
            max_tokens: 2048,
            max_retries: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    pub enabled: bool,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

fn default_temperature() -> f64 { 0.3 }
fn default_top_p() -> f64 { 0.9 }
fn default_top_k() -> i32 { 40 }
fn default_max_tokens() -> i32 { 2048 }
fn default_retries() -> u32 { 2 }

pub struct ConfigStore {
    config_dir: PathBuf,
    config_file: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: PathBuf) -> Self {
        let config_file = config_dir.join("config.json");
        Self { config_dir, config_file }
    }

    /// Get default config directory
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("veritext"))
    }

    /// Ensure config directory exists
    pub fn ensure_dir(&self) -> Result<(), String> {
        fs::create_dir_all(&self.config_dir)
            .map_err(|e| format!("Failed to create config dir: {}", e))
    }

    /// Load configuration from file
    pub fn load(&self) -> Result<AppConfig, String> {
        if !self.config_file.exists() {
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.config_file)
            .map_err(|e| format!("Failed to read config: {}", e))?;

        serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config: {}", e))
    }

    /// Save configuration to file
    pub fn save(&self, config: &AppConfig) -> Result<(), String> {
        self.ensure_dir()?;

        // Create backup if file exists
        if self.config_file.exists() {
            self.create_backup()?;
        }

        let content = serde_json::to_string_pretty(config)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        fs::write(&self.config_file, content)
            .map_err(|e| format!("Failed to write config: {}", e))
    }

    /// Create a backup of current config
    fn create_backup(&self) -> Result<(), String> {
        let backup_dir = self.config_dir.join("backups");
        fs::create_dir_all(&backup_dir)
            .map_err(|e| format!("Failed to create backup dir: {}", e))?;

        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
        let backup_file = backup_dir.join(format!("config_{}.json", timestamp));

        fs::copy(&self.config_file, &backup_file)
            .map_err(|e| format!("Failed to create backup: {}", e))?;

        // Keep only last 10 backups
        self.cleanup_old_backups(&backup_dir, 10)?;

        Ok(())
    }

    /// Remove old backups, keeping only the most recent N
    fn cleanup_old_backups(&self, backup_dir: &PathBuf, keep: usize) -> Result<(), String> {
        let mut entries: Vec<_> = fs::read_dir(backup_dir)
            .map_err(|e| format!("Failed to read backup dir: {}", e))?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map_or(false, |ext| ext == "json"))
            .collect();

        if entries.len() <= keep {
            return Ok(());
        }

        // Sort by modification time (oldest first)
        entries.sort_by_key(|e| {
            e.metadata()
                .and_then(|m| m.modified())
                .unwrap_or(std::time::SystemTime::UNIX_EPOCH)
        });

        // Remove oldest entries
        for entry in entries.iter().take(entries.len() - keep) {
            let _ = fs::remove_file(entry.path());
        }

        Ok(())
    }

    /// Get provider API key from config file
    pub fn get_api_key(&self, provider: &str) -> Result<Option<String>, String> {
        let config = self.load()?;
        Ok(config.api_keys.get(provider).cloned())
    }

    /// Store provider API key in config file
    pub fn set_api_key(&self, provider: &str, key: &str) -> Result<(), String> {
        let mut config = self.load()?;
        config.api_keys.insert(provider.to_string(), key.to_string());
        self.save(&config)
    }

    /// Delete provider API key from config file
    pub fn delete_api_key(&self, provider: &str) -> Result<(), String> {
        let mut config = self.load()?;
        config.api_keys.remove(provider);
        self.save(&config)
    }

    /// Get provider base URL from config file
    pub fn get_provider_url(&self, provider: &str) -> Result<Option<String>, String> {
        let config = self.load()?;
        Ok(config.providers.get(provider).and_then(|p| p.base_url.clone()))
    }

    /// Set provider base URL in config file
    pub fn set_provider_url(&self, provider: &str, url: &str) -> Result<(), String> {
        let mut config = self.load()?;
        let provider_config = config.providers.entry(provider.to_string()).or_default();
        provider_config.base_url = Some(url.to_string());
        self.save(&config)
    }
}

/// Shared configuration with explicit key-change notification.
///
/// Credentials are injected into clients at construction; interested
/// components subscribe to a watch channel instead of re-reading
/// ambient global state. Last write wins, matching the original
/// single-writer contract.
pub struct SharedConfig {
    store: ConfigStore,
    key_tx: watch::Sender<HashMap<String, String>>,
}

impl SharedConfig {
    pub fn new(config_dir: PathBuf) -> Result<Self, String> {
        let store = ConfigStore::new(config_dir);
        let initial = store.load()?.api_keys;
        let (key_tx, _) = watch::channel(initial);
        Ok(Self { store, key_tx })
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Current key for a provider, if configured.
    pub fn api_key(&self, provider: &str) -> Option<String> {
        self.key_tx.borrow().get(provider).cloned()
    }

    /// Persist a key and notify subscribers.
    pub fn set_api_key(&self, provider: &str, key: &str) -> Result<(), String> {
        self.store.set_api_key(provider, key)?;
        self.key_tx.send_modify(|keys| {
            keys.insert(provider.to_string(), key.to_string());
        });
        Ok(())
    }

    /// Remove a key and notify subscribers.
    pub fn delete_api_key(&self, provider: &str) -> Result<(), String> {
        self.store.delete_api_key(provider)?;
        self.key_tx.send_modify(|keys| {
            keys.remove(provider);
        });
        Ok(())
    }

    /// Subscribe to key changes.
    pub fn subscribe_keys(&self) -> watch::Receiver<HashMap<String, String>> {
        self.key_tx.subscribe()
    }
}

/// Get provider API key from environment variables only
pub fn env_api_key(provider: &str) -> Option<String> {
    let env_keys = match provider {
        "gemini" => vec!["GEMINI_API_KEY", "VERITEXT_GEMINI_API_KEY"],
        "openrouter" => vec!["OPENROUTER_API_KEY", "VERITEXT_OPENROUTER_API_KEY"],
        _ => vec![],
    };

    for key in env_keys {
        if let Ok(val) = std::env::var(key) {
            let v = val.trim();
            if !v.is_empty() {
                return Some(v.to_string());
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.analysis.max_retries, 2);
        assert_eq!(config.analysis.max_tokens, 2048);
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig {
            version: "1.0.0".to_string(),
            default_provider: Some("gemini".to_string()),
            analysis: AnalysisConfig::default(),
            providers: HashMap::new(),
            api_keys: HashMap::new(),
        };

        let json = serde_json::to_string(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.version, "1.0.0");
        assert_eq!(parsed.default_provider.as_deref(), Some("gemini"));
    }

    #[test]
    fn test_api_key_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().to_path_buf());

        store.set_api_key("gemini", "sk-test").unwrap();
        assert_eq!(store.get_api_key("gemini").unwrap().as_deref(), Some("sk-test"));

        store.delete_api_key("gemini").unwrap();
        assert_eq!(store.get_api_key("gemini").unwrap(), None);
    }

    #[tokio::test]
    async fn test_shared_config_notifies_subscribers() {
        let dir = tempfile::tempdir().unwrap();
        let shared = SharedConfig::new(dir.path().to_path_buf()).unwrap();
        let mut rx = shared.subscribe_keys();

        shared.set_api_key("openrouter", "or-key").unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().get("openrouter").map(String::as_str), Some("or-key"));

        shared.delete_api_key("openrouter").unwrap();
        rx.changed().await.unwrap();
        assert!(rx.borrow().get("openrouter").is_none());
    }
}
