use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::app::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdbSettings {
    /// Explicit adb program path; empty means "probe SDK locations, then PATH".
    pub command_path: String,
    pub default_timeout_secs: u64,
    pub devices_timeout_secs: u64,
    pub install_timeout_secs: u64,
}

impl Default for AdbSettings {
    fn default() -> Self {
        Self {
            command_path: String::new(),
            default_timeout_secs: 30,
            devices_timeout_secs: 10,
            install_timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceSettings {
    pub refresh_interval_ms: u64,
    pub show_offline_devices: bool,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            refresh_interval_ms: 2000,
            show_offline_devices: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScreenRecordSettings {
    pub bit_rate: String,
    pub time_limit_sec: i32,
    pub size: String,
}

impl Default for ScreenRecordSettings {
    fn default() -> Self {
        Self {
            bit_rate: String::new(),
            time_limit_sec: 0,
            size: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub adb: AdbSettings,
    #[serde(default)]
    pub device: DeviceSettings,
    #[serde(default)]
    pub screen_record: ScreenRecordSettings,
    #[serde(default)]
    pub output_path: String,
    #[serde(default)]
    pub version: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            adb: AdbSettings::default(),
            device: DeviceSettings::default(),
            screen_record: ScreenRecordSettings::default(),
            output_path: String::new(),
            version: "0.1.7".to_string(),
        }
    }
}

pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("ADBTOOLS_CONFIG_PATH") {
        return PathBuf::from(path);
    }
    home_dir().join(".adbtools_config.json")
}

pub fn backup_config_path() -> PathBuf {
    home_dir().join(".adbtools_config.backup.json")
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

pub fn load_config() -> Result<AppConfig, AppError> {
    load_config_from_path(&config_path())
}

pub fn save_config(config: &AppConfig) -> Result<(), AppError> {
    save_config_to_path(config, &config_path(), &backup_config_path())
}

pub fn load_config_from_path(path: &Path) -> Result<AppConfig, AppError> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let raw = fs::read_to_string(path)
        .map_err(|err| AppError::system(format!("Failed to read config: {err}"), ""))?;
    let config: AppConfig = serde_json::from_str(&raw)
        .map_err(|err| AppError::system(format!("Failed to parse config: {err}"), ""))?;
    Ok(validate_config(config))
}

pub fn save_config_to_path(
    config: &AppConfig,
    path: &Path,
    backup_path: &Path,
) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    if path.exists() {
        let _ = fs::copy(path, backup_path);
    }
    let payload = serde_json::to_string_pretty(config)
        .map_err(|err| AppError::system(format!("Failed to serialize config: {err}"), ""))?;
    fs::write(path, payload)
        .map_err(|err| AppError::system(format!("Failed to write config: {err}"), ""))?;
    Ok(())
}

fn validate_config(mut config: AppConfig) -> AppConfig {
    if config.adb.default_timeout_secs < 5 {
        config.adb.default_timeout_secs = 30;
    }
    if config.adb.devices_timeout_secs < 1 {
        config.adb.devices_timeout_secs = 10;
    }
    if config.adb.install_timeout_secs < 30 {
        config.adb.install_timeout_secs = 300;
    }
    if config.device.refresh_interval_ms < 500 {
        config.device.refresh_interval_ms = 2000;
    }
    if config.screen_record.time_limit_sec < 0 {
        config.screen_record.time_limit_sec = 0;
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let tmp = tempfile::TempDir::new().expect("tmp");
        let config = load_config_from_path(&tmp.path().join("absent.json")).expect("load");
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn round_trips_through_disk_with_backup() {
        let tmp = tempfile::TempDir::new().expect("tmp");
        let path = tmp.path().join("config.json");
        let backup = tmp.path().join("config.backup.json");

        let mut config = AppConfig::default();
        config.adb.command_path = "/opt/platform-tools/adb".to_string();
        config.output_path = "/tmp/out".to_string();

        save_config_to_path(&config, &path, &backup).expect("first save");
        assert!(!backup.exists());

        config.output_path = "/tmp/other".to_string();
        save_config_to_path(&config, &path, &backup).expect("second save");
        assert!(backup.exists());

        let loaded = load_config_from_path(&path).expect("load");
        assert_eq!(loaded.adb.command_path, "/opt/platform-tools/adb");
        assert_eq!(loaded.output_path, "/tmp/other");
    }

    #[test]
    fn clamps_invalid_values() {
        let mut config = AppConfig::default();
        config.adb.default_timeout_secs = 1;
        config.device.refresh_interval_ms = 10;
        config.screen_record.time_limit_sec = -5;
        let validated = validate_config(config);
        assert_eq!(validated.adb.default_timeout_secs, 30);
        assert_eq!(validated.device.refresh_interval_ms, 2000);
        assert_eq!(validated.screen_record.time_limit_sec, 0);
    }

    #[test]
    fn partial_config_fills_missing_sections() {
        let tmp = tempfile::TempDir::new().expect("tmp");
        let path = tmp.path().join("config.json");
        fs::write(&path, "{\"output_path\": \"/tmp/x\"}").expect("write");
        let loaded = load_config_from_path(&path).expect("load");
        assert_eq!(loaded.output_path, "/tmp/x");
        assert_eq!(loaded.adb.default_timeout_secs, 30);
        assert_eq!(loaded.device.refresh_interval_ms, 2000);
    }
}
