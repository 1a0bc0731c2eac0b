//! Configuration management

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::api::DEFAULT_PLAYLIST_URL;

pub const APP_DIR: &str = "iptv_browser";
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";
pub const ENV_API_BASE_URL: &str = "IPTV_API_BASE_URL";
pub const ENV_LOG_LEVEL: &str = "IPTV_LOG_LEVEL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_playlist_url")]
    pub playlist_url: String,
    #[serde(default)]
    pub external_player: String,
    #[serde(default = "default_true")]
    pub single_window_mode: bool,
    #[serde(default = "default_true")]
    pub dark_mode: bool,
    // Timings (seconds)
    #[serde(default = "default_watchdog_interval")]
    pub watchdog_interval_secs: u64,
    #[serde(default = "default_network_check")]
    pub network_check_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_recent_limit")]
    pub recent_limit: i64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_api_base_url() -> String { DEFAULT_API_BASE_URL.to_string() }
fn default_playlist_url() -> String { DEFAULT_PLAYLIST_URL.to_string() }
fn default_true() -> bool { true }
fn default_watchdog_interval() -> u64 { 60 }
fn default_network_check() -> u64 { 10 }
fn default_request_timeout() -> u64 { 30 }
fn default_recent_limit() -> i64 { 10 }
fn default_log_level() -> String { "info".to_string() }

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            playlist_url: default_playlist_url(),
            external_player: String::new(),
            single_window_mode: true,
            dark_mode: true,
            watchdog_interval_secs: 60,
            network_check_secs: 10,
            request_timeout_secs: 30,
            recent_limit: 10,
            log_level: default_log_level(),
        }
    }
}

/// `<config_dir>/iptv_browser`, or the working directory when the platform has none.
pub fn app_dir() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(APP_DIR);
    path
}

pub fn session_path() -> PathBuf {
    app_dir().join("session.json")
}

impl AppConfig {
    fn config_path() -> PathBuf {
        app_dir().join("config.json")
    }

    pub fn load() -> Self {
        let mut config = Self::load_from(&Self::config_path());
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    pub fn load_from(path: &Path) -> Self {
        fs::read_to_string(path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default()
    }

    pub fn save(&self) {
        if let Err(e) = self.save_to(&Self::config_path()) {
            tracing::warn!("Failed to save config: {}", e);
        }
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
    }

    /// Environment overrides win over the file. Blank values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let value = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        if let Some(url) = value(ENV_API_BASE_URL) {
            self.api_base_url = url;
        }
        if let Some(level) = value(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"dark_mode":false}"#).unwrap();
        assert!(!config.dark_mode);
        assert_eq!(config.api_base_url, "http://localhost:8080");
        assert_eq!(config.watchdog_interval_secs, 60);
        assert_eq!(config.recent_limit, 10);
        assert!(config.single_window_mode);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("iptv_browser").join("config.json");
        let config = AppConfig {
            external_player: "/usr/bin/mpv".to_string(),
            request_timeout_secs: 5,
            ..AppConfig::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(AppConfig::load_from(&path), config);
    }

    #[test]
    fn test_corrupt_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(AppConfig::load_from(&path), AppConfig::default());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config.apply_env(|key| match key {
            ENV_API_BASE_URL => Some(" https://api.example.com ".to_string()),
            ENV_LOG_LEVEL => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.api_base_url, "https://api.example.com");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_session_path_under_app_dir() {
        assert!(session_path().starts_with(app_dir()));
        assert!(session_path().ends_with("iptv_browser/session.json"));
    }
}
