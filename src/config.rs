//! Configuration management for the bridge.
//!
//! Loads configuration from TOML files and provides runtime defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub scraping: ScrapingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Whether the bridge is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Interval between player state polls once the hook is attached
    #[serde(default = "default_interval_ms")]
    pub hook_poll_interval_ms: u64,

    /// Interval between extraction + emission cycles
    #[serde(default = "default_interval_ms")]
    pub extraction_interval_ms: u64,

    /// Give up on a native clipboard read after this long (unset = never)
    #[serde(default)]
    pub clipboard_timeout_ms: Option<u64>,

    /// Upper bound for backoff after consecutive task failures (0 = no backoff)
    #[serde(default)]
    pub max_backoff_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            hook_poll_interval_ms: default_interval_ms(),
            extraction_interval_ms: default_interval_ms(),
            clipboard_timeout_ms: None,
            max_backoff_ms: 0,
        }
    }
}

impl TimingConfig {
    pub fn hook_poll_interval(&self) -> Duration {
        Duration::from_millis(self.hook_poll_interval_ms)
    }

    pub fn extraction_interval(&self) -> Duration {
        Duration::from_millis(self.extraction_interval_ms)
    }

    pub fn clipboard_timeout(&self) -> Option<Duration> {
        self.clipboard_timeout_ms.map(Duration::from_millis)
    }

    pub fn max_backoff(&self) -> Option<Duration> {
        match self.max_backoff_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapingConfig {
    /// Page title the web app shows when nothing is playing
    #[serde(default = "default_placeholder_title")]
    pub placeholder_title: String,

    /// Substring identifying logo images in artwork URLs
    #[serde(default = "default_logo_marker")]
    pub logo_marker: String,

    /// Domain passed to the in-page service's `getState`
    #[serde(default = "default_state_domain")]
    pub state_domain: String,

    #[serde(default = "default_title_selectors")]
    pub title_selectors: Vec<String>,

    #[serde(default = "default_artist_selectors")]
    pub artist_selectors: Vec<String>,

    #[serde(default = "default_art_selectors")]
    pub art_selectors: Vec<String>,

    #[serde(default = "default_logo_selectors")]
    pub logo_selectors: Vec<String>,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            placeholder_title: default_placeholder_title(),
            logo_marker: default_logo_marker(),
            state_domain: default_state_domain(),
            title_selectors: default_title_selectors(),
            artist_selectors: default_artist_selectors(),
            art_selectors: default_art_selectors(),
            logo_selectors: default_logo_selectors(),
        }
    }
}

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_interval_ms() -> u64 {
    2000
}

fn default_placeholder_title() -> String {
    "Stremio".to_string()
}

fn default_logo_marker() -> String {
    "logo".to_string()
}

fn default_state_domain() -> String {
    "player".to_string()
}

fn default_title_selectors() -> Vec<String> {
    vec![
        "[class*='player-container'] [class*='title']".to_string(),
        "[class*='nav-bar'] [class*='title']".to_string(),
        "[class*='meta-info'] [class*='title']".to_string(),
    ]
}

fn default_artist_selectors() -> Vec<String> {
    vec![
        "[class*='meta-info'] [class*='name']".to_string(),
        "[class*='series-title']".to_string(),
    ]
}

fn default_art_selectors() -> Vec<String> {
    vec![
        "[class*='poster-container'] img".to_string(),
        "img[class*='poster']".to_string(),
        "[class*='background-image']".to_string(),
        "[class*='thumbnail'] img".to_string(),
    ]
}

fn default_logo_selectors() -> Vec<String> {
    vec![
        "img[class*='logo']".to_string(),
        "[class*='logo-container'] img".to_string(),
    ]
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Self {
        Self::load_from_path(Self::default_config_path())
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: PathBuf) -> Self {
        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    info!("Loaded configuration from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!("Failed to parse config file: {}, using defaults", e);
                    Self::default()
                }
            },
            Err(_) => {
                info!("No config file found at {:?}, using defaults", path);
                Self::default()
            }
        }
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("webview-bridge")
            .join("config.toml")
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, path: PathBuf) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;

        std::fs::write(&path, contents)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.general.enabled);
        assert_eq!(config.timing.hook_poll_interval(), Duration::from_secs(2));
        assert_eq!(config.timing.extraction_interval(), Duration::from_secs(2));
        assert!(config.timing.clipboard_timeout().is_none());
        assert!(config.timing.max_backoff().is_none());
        assert_eq!(config.scraping.placeholder_title, "Stremio");
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
[general]
log_level = "debug"

[timing]
extraction_interval_ms = 500
clipboard_timeout_ms = 3000

[scraping]
title_selectors = [".title"]
"#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.timing.extraction_interval_ms, 500);
        assert_eq!(config.timing.hook_poll_interval_ms, 2000);
        assert_eq!(config.timing.clipboard_timeout(), Some(Duration::from_secs(3)));
        assert_eq!(config.scraping.title_selectors, vec![".title".to_string()]);
        assert_eq!(config.scraping.logo_marker, "logo");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.timing.max_backoff_ms = 8000;
        config.save_to_path(path.clone()).unwrap();

        let loaded = Config::load_from_path(path);
        assert_eq!(loaded.timing.max_backoff(), Some(Duration::from_secs(8)));
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is = = not toml").unwrap();

        let config = Config::load_from_path(path);
        assert_eq!(config.timing.extraction_interval_ms, 2000);
    }
}
