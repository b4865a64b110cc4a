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

//! JSON-lines event log. Off until `init_logging` is called; `log_event`
//! is a no-op before that.

use std::env;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use lazy_static::lazy_static;
use serde_json::{json, Value};

const FALLBACK_LOG_PATH: &str = "/tmp/sensorview_logs.json";

lazy_static! {
    static ref LOG_FILE: Mutex<Option<File>> = Mutex::new(None);
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

fn log_file() -> MutexGuard<'static, Option<File>> {
    match LOG_FILE.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

pub fn log_path() -> PathBuf {
    if let Ok(state) = env::var("XDG_STATE_HOME") {
        return Path::new(&state).join("sensorview").join("logs.json");
    }
    if let Ok(home) = env::var("HOME") {
        return Path::new(&home)
            .join(".local")
            .join("state")
            .join("sensorview")
            .join("logs.json");
    }
    PathBuf::from(FALLBACK_LOG_PATH)
}

fn open_append(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Opens the default log file, falling back to /tmp. Returns the path in use.
pub fn init_logging() -> Option<PathBuf> {
    let primary = log_path();
    init_logging_at(&primary)
        .or_else(|_| init_logging_at(Path::new(FALLBACK_LOG_PATH)))
        .ok()
}

pub fn init_logging_at(path: &Path) -> io::Result<PathBuf> {
    let f = open_append(path)?;
    *log_file() = Some(f);
    Ok(path.to_path_buf())
}

pub fn shutdown_logging() {
    *log_file() = None;
}

pub fn is_enabled() -> bool {
    log_file().is_some()
}

pub fn log_event(event: &str, data: Value) {
    let mut guard = log_file();
    let Some(f) = guard.as_mut() else { return };
    let line = json!({
        "ts_ms": now_millis(),
        "event": event,
        "data": data,
    });
    let _ = writeln!(f, "{}", line);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn test_disabled_logger_is_noop() {
        shutdown_logging();
        assert!(!is_enabled());
        log_event("startup", json!({}));
    }

    #[test]
    #[serial]
    fn test_events_are_json_lines() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("logs.json");
        init_logging_at(&path).unwrap();
        assert!(is_enabled());

        log_event("startup", json!({ "version": "test" }));
        log_event("refresh", json!({ "rows": 7 }));
        shutdown_logging();
        log_event("ignored", json!({}));

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "startup");
        assert_eq!(lines[0]["data"]["version"], "test");
        assert_eq!(lines[1]["data"]["rows"], 7);
        assert!(lines[1]["ts_ms"].as_u64().unwrap() > 0);
    }

    #[test]
    #[serial]
    fn test_log_path_honours_xdg_state_home() {
        let old = env::var("XDG_STATE_HOME").ok();
        env::set_var("XDG_STATE_HOME", "/tmp/xdg-state");
        assert_eq!(log_path(), PathBuf::from("/tmp/xdg-state/sensorview/logs.json"));
        match old {
            Some(v) => env::set_var("XDG_STATE_HOME", v),
            None => env::remove_var("XDG_STATE_HOME"),
        }
    }
}
