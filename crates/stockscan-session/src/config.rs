//! # Scan Configuration
//!
//! Configuration management for scan sessions.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     STOCKSCAN_STORE_ID=store-001                                       │
//! │     STOCKSCAN_MAX_KEY_GAP_MS=40                                        │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/stockscan/scan.toml (Linux)                              │
//! │     ~/Library/Application Support/com.stockscan.stockscan/scan.toml    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     50 ms key gap, 5 camera attempts, 3 stock write retries            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # scan.toml
//! [store]
//! id = "store-001"
//! name = "Downtown Branch"
//!
//! [keyboard]
//! max_key_gap_ms = 50
//! min_code_len = 1
//!
//! [camera]
//! max_init_attempts = 5
//! retry_backoff_ms = 250
//! frame_interval_ms = 100
//! repeat_cooldown_ms = 1500
//!
//! [stock]
//! cas_max_retries = 3
//!
//! [database]
//! path = "/var/lib/stockscan/stockscan.db"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use stockscan_db::DbConfig;
use tracing::{debug, info, warn};

use crate::error::{SessionError, SessionResult};

// =============================================================================
// Store Configuration
// =============================================================================

/// The store whose catalog and ledger the session works against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Unique store identifier.
    pub id: String,

    /// Human-readable store name.
    #[serde(default)]
    pub name: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            id: "default-store".to_string(),
            name: "Default Store".to_string(),
        }
    }
}

// =============================================================================
// Keyboard-Wedge Settings
// =============================================================================

/// Timing for external scanners that type the code and press Enter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyboardSettings {
    /// Largest gap between two keystrokes of one scan (milliseconds).
    /// A slower gap is human typing and discards the buffer.
    #[serde(default = "default_max_key_gap")]
    pub max_key_gap_ms: u64,

    /// Shortest buffer accepted on Enter.
    #[serde(default = "default_min_code_len")]
    pub min_code_len: usize,
}

fn default_max_key_gap() -> u64 {
    stockscan_core::MAX_KEY_GAP_MS
}

fn default_min_code_len() -> usize {
    1
}

impl Default for KeyboardSettings {
    fn default() -> Self {
        KeyboardSettings {
            max_key_gap_ms: default_max_key_gap(),
            min_code_len: default_min_code_len(),
        }
    }
}

// =============================================================================
// Camera Settings
// =============================================================================

/// Camera decoder behavior.
///
/// ## Init Retry Timeline (defaults)
/// ```text
/// attempt 1 ✗ ─ ~250ms ─ attempt 2 ✗ ─ ~500ms ─ attempt 3 ✗ ─ … ─ attempt 5 ✗
///                                                                    │
///                                          ScannerInitFailure ◄──────┘
///                                          (arbiter drops to manual)
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraSettings {
    /// Attempts before a scanner init failure becomes fatal.
    #[serde(default = "default_max_init_attempts")]
    pub max_init_attempts: u32,

    /// First delay between init attempts (milliseconds); doubles each time.
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_ms: u64,

    /// Delay between decoded frames (milliseconds).
    #[serde(default = "default_frame_interval")]
    pub frame_interval_ms: u64,

    /// Window in which the same code is not emitted twice (milliseconds).
    #[serde(default = "default_repeat_cooldown")]
    pub repeat_cooldown_ms: u64,
}

fn default_max_init_attempts() -> u32 {
    stockscan_core::MAX_SCANNER_INIT_ATTEMPTS
}

fn default_retry_backoff() -> u64 {
    250
}

fn default_frame_interval() -> u64 {
    100
}

fn default_repeat_cooldown() -> u64 {
    1500
}

impl Default for CameraSettings {
    fn default() -> Self {
        CameraSettings {
            max_init_attempts: default_max_init_attempts(),
            retry_backoff_ms: default_retry_backoff(),
            frame_interval_ms: default_frame_interval(),
            repeat_cooldown_ms: default_repeat_cooldown(),
        }
    }
}

impl CameraSettings {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn repeat_cooldown(&self) -> Duration {
        Duration::from_millis(self.repeat_cooldown_ms)
    }
}

// =============================================================================
// Stock Settings
// =============================================================================

/// Stock counter writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockSettings {
    /// Re-reads allowed when a compare-and-set write loses a race.
    #[serde(default = "default_cas_max_retries")]
    pub cas_max_retries: u32,
}

fn default_cas_max_retries() -> u32 {
    3
}

impl Default for StockSettings {
    fn default() -> Self {
        StockSettings {
            cas_max_retries: default_cas_max_retries(),
        }
    }
}

// =============================================================================
// Database Settings
// =============================================================================

/// Where the SQLite store lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

fn default_db_path() -> PathBuf {
    directories::ProjectDirs::from("com", "stockscan", "stockscan")
        .map(|dirs| dirs.data_dir().join("stockscan.db"))
        .unwrap_or_else(|| PathBuf::from("stockscan.db"))
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
        }
    }
}

// =============================================================================
// Main Scan Configuration
// =============================================================================

/// Complete scan session configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub keyboard: KeyboardSettings,

    #[serde(default)]
    pub camera: CameraSettings,

    #[serde(default)]
    pub stock: StockSettings,

    #[serde(default)]
    pub database: DatabaseSettings,
}

impl ScanConfig {
    /// Creates a new config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults for the given store.
    pub fn for_store(store_id: impl Into<String>) -> Self {
        let mut config = Self::default();
        config.store.id = store_id.into();
        config
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (scan.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SessionResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading scan config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load scan config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SessionResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SessionError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SessionError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| SessionError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Scan config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SessionResult<()> {
        if self.store.id.trim().is_empty() {
            return Err(SessionError::InvalidConfig("store.id must not be empty".into()));
        }

        if self.keyboard.max_key_gap_ms == 0 {
            return Err(SessionError::InvalidConfig(
                "keyboard.max_key_gap_ms must be greater than 0".into(),
            ));
        }

        if self.camera.max_init_attempts == 0 {
            return Err(SessionError::InvalidConfig(
                "camera.max_init_attempts must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(id) = lookup("STOCKSCAN_STORE_ID") {
            debug!(store_id = %id, "Overriding store ID from environment");
            self.store.id = id;
        }

        if let Some(name) = lookup("STOCKSCAN_STORE_NAME") {
            self.store.name = name;
        }

        if let Some(gap) = lookup("STOCKSCAN_MAX_KEY_GAP_MS") {
            match gap.parse::<u64>() {
                Ok(ms) => self.keyboard.max_key_gap_ms = ms,
                Err(_) => warn!(value = %gap, "Ignoring invalid STOCKSCAN_MAX_KEY_GAP_MS"),
            }
        }

        if let Some(attempts) = lookup("STOCKSCAN_CAMERA_ATTEMPTS") {
            match attempts.parse::<u32>() {
                Ok(n) => self.camera.max_init_attempts = n,
                Err(_) => warn!(value = %attempts, "Ignoring invalid STOCKSCAN_CAMERA_ATTEMPTS"),
            }
        }

        if let Some(path) = lookup("STOCKSCAN_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "stockscan", "stockscan")
            .map(|dirs| dirs.config_dir().join("scan.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Returns the store ID.
    pub fn store_id(&self) -> &str {
        &self.store.id
    }

    /// Largest keystroke gap of a hardware scan burst.
    pub fn max_key_gap(&self) -> Duration {
        Duration::from_millis(self.keyboard.max_key_gap_ms)
    }

    /// SQLite settings for the configured path.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = ScanConfig::default();
        assert_eq!(config.keyboard.max_key_gap_ms, 50);
        assert_eq!(config.camera.max_init_attempts, 5);
        assert_eq!(config.stock.cas_max_retries, 3);
        assert_eq!(config.max_key_gap(), Duration::from_millis(50));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ScanConfig::for_store("store-1");
        assert!(config.validate().is_ok());

        config.store.id = "  ".into();
        assert!(config.validate().is_err());

        config.store.id = "store-1".into();
        config.keyboard.max_key_gap_ms = 0;
        assert!(config.validate().is_err());

        config.keyboard.max_key_gap_ms = 50;
        config.camera.max_init_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ScanConfig = toml::from_str(
            r#"
            [store]
            id = "store-9"

            [camera]
            max_init_attempts = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.store_id(), "store-9");
        assert_eq!(config.camera.max_init_attempts, 2);
        assert_eq!(config.camera.repeat_cooldown_ms, 1500);
        assert_eq!(config.keyboard.min_code_len, 1);
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("STOCKSCAN_STORE_ID", "store-env"),
            ("STOCKSCAN_MAX_KEY_GAP_MS", "35"),
            ("STOCKSCAN_CAMERA_ATTEMPTS", "not-a-number"),
            ("STOCKSCAN_DB_PATH", "/tmp/scan.db"),
        ]
        .into();

        let mut config = ScanConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.store_id(), "store-env");
        assert_eq!(config.keyboard.max_key_gap_ms, 35);
        assert_eq!(config.camera.max_init_attempts, 5);
        assert_eq!(config.database.path, PathBuf::from("/tmp/scan.db"));
    }

    #[test]
    fn test_toml_serialization() {
        let config = ScanConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[store]"));
        assert!(toml_str.contains("[camera]"));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let path = std::env::temp_dir()
            .join(format!("stockscan-missing-{}.toml", uuid::Uuid::new_v4()));
        let config = ScanConfig::load_or_default(Some(path));
        assert_eq!(config.camera.frame_interval_ms, 100);
    }
}
