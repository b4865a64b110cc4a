/*
 * This file is part of Sensorview.
 *
 * Copyright (C) 2025 Sensorview contributors
 *
 * Sensorview is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Sensorview is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Sensorview. If not, see <https://www.gnu.org/licenses/>.
 */

//! Viewer settings stored as JSON under the user's config directory.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backend::hwmon::DEFAULT_SYSFS_ROOT;
use crate::topology::ChipName;

pub const MIN_REFRESH_MS: u64 = 100;
pub const MAX_REFRESH_MS: u64 = 60_000;

fn default_refresh_interval_ms() -> u64 { 1000 }
fn default_show_info_column() -> bool { true }
fn default_sysfs_root() -> PathBuf { PathBuf::from(DEFAULT_SYSFS_ROOT) }

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ViewerSettings {
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
    #[serde(default = "default_show_info_column")]
    pub show_info_column: bool,
    #[serde(default = "default_sysfs_root")]
    pub sysfs_root: PathBuf,
    /// Chip-name pattern such as `nct6775-*`.
    #[serde(default)]
    pub chip_filter: Option<String>,
    /// Path to a sensors.conf style file with label/ignore statements.
    #[serde(default)]
    pub sensors_config: Option<PathBuf>,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            refresh_interval_ms: default_refresh_interval_ms(),
            show_info_column: default_show_info_column(),
            sysfs_root: default_sysfs_root(),
            chip_filter: None,
            sensors_config: None,
        }
    }
}

impl ViewerSettings {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn chip_pattern(&self) -> Result<Option<ChipName>, String> {
        match &self.chip_filter {
            None => Ok(None),
            Some(p) => ChipName::parse(p).map(Some).map_err(|e| e.to_string()),
        }
    }
}

pub fn config_path() -> PathBuf {
    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        return Path::new(&xdg).join("sensorview").join("config.json");
    }
    if let Ok(home) = env::var("HOME") {
        return Path::new(&home)
            .join(".config")
            .join("sensorview")
            .join("config.json");
    }
    PathBuf::from("/etc/sensorview/config.json")
}

pub fn validate_settings(settings: &ViewerSettings) -> Result<(), String> {
    if !(MIN_REFRESH_MS..=MAX_REFRESH_MS).contains(&settings.refresh_interval_ms) {
        return Err(format!(
            "refresh_interval_ms must be within {}..={} (got {})",
            MIN_REFRESH_MS, MAX_REFRESH_MS, settings.refresh_interval_ms
        ));
    }
    if settings.sysfs_root.as_os_str().is_empty() {
        return Err("sysfs_root must not be empty".to_string());
    }
    settings.chip_pattern()?;
    Ok(())
}

/// Reads and validates settings from `path`. A missing file yields defaults.
pub fn load_settings_from(path: &Path) -> Result<ViewerSettings, String> {
    let data = match fs::read_to_string(path) {
        Ok(d) => d,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(ViewerSettings::default()),
        Err(e) => return Err(format!("{}: {}", path.display(), e)),
    };
    let settings: ViewerSettings =
        serde_json::from_str(&data).map_err(|e| format!("parse error in {}: {}", path.display(), e))?;
    validate_settings(&settings)?;
    Ok(settings)
}

pub fn load_settings() -> Result<ViewerSettings, String> {
    load_settings_from(&config_path())
}

pub fn save_settings_to(path: &Path, settings: &ViewerSettings) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(path, json)
}
