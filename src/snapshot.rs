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

//! Display-ready tree built from one discovery pass plus one read of every
//! subfeature.

use std::collections::HashSet;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use serde_json::json;

use crate::backend::SensorBackend;
use crate::discovery::Sensors;
use crate::error::Result;
use crate::logger;
use crate::topology::{ChipEntry, ChipName, FeatureEntry, Subfeature};

pub const ERROR_MARKER: &str = "ERROR";
pub const UNAVAILABLE: &str = "unavailable";

const NAME_WIDTH: usize = 40;

/// Structural identity of a row; stable across rebuilds as long as the
/// hardware does not change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "level", rename_all = "snake_case")]
pub enum RowKey {
    Chip { chip: ChipName },
    Feature { chip: ChipName, name: String, number: u32 },
    Subfeature { chip: ChipName, number: u32 },
}

impl RowKey {
    pub fn chip(&self) -> &ChipName {
        match self {
            RowKey::Chip { chip } | RowKey::Feature { chip, .. } | RowKey::Subfeature { chip, .. } => chip,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    #[serde(skip)]
    pub key: RowKey,
    pub name: String,
    pub value: String,
    pub info: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Row>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub rows: Vec<Row>,
    #[serde(skip)]
    pub built_at: Instant,
    pub timestamp_ms: u128,
    pub chip_count: usize,
    pub row_count: usize,
    pub read_failures: usize,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::from_rows(Vec::new(), 0)
    }
}

impl Snapshot {
    fn from_rows(rows: Vec<Row>, read_failures: usize) -> Self {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let row_count = count_rows(&rows);
        Self {
            chip_count: rows.len(),
            rows,
            built_at: Instant::now(),
            timestamp_ms,
            row_count,
            read_failures,
        }
    }

    /// Discovers the topology and reads every readable subfeature once.
    pub fn build<B: SensorBackend>(sensors: &Sensors<'_, B>) -> Result<Self> {
        let topology = sensors.discover()?;
        let mut failures = 0usize;
        let rows = topology
            .chips
            .iter()
            .map(|entry| chip_row(sensors, entry, &mut failures))
            .collect();
        Ok(Self::from_rows(rows, failures))
    }

    pub fn find(&self, key: &RowKey) -> Option<&Row> {
        fn walk<'r>(rows: &'r [Row], key: &RowKey) -> Option<&'r Row> {
            for row in rows {
                if &row.key == key {
                    return Some(row);
                }
                if let Some(found) = walk(&row.children, key) {
                    return Some(found);
                }
            }
            None
        }
        walk(&self.rows, key)
    }

    /// Every row with its depth, ignoring expand state.
    pub fn all_rows(&self) -> Vec<VisibleRow<'_>> {
        ExpandState::default().visible_rows(self)
    }

    /// Indented plain-text rendering used by `--dump`.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for (i, chip) in self.rows.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&chip.name);
            out.push('\n');
            if !chip.value.is_empty() {
                out.push_str(&format!("Adapter: {}\n", chip.value));
            }
            for feature in &chip.children {
                push_line(&mut out, 1, &feature.name, &feature.value);
                for sub in &feature.children {
                    push_line(&mut out, 2, &sub.name, &sub.value);
                }
            }
        }
        out
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn push_line(out: &mut String, depth: usize, name: &str, value: &str) {
    let label = format!("{}{}:", "  ".repeat(depth), name);
    let line = format!("{:<width$} {}", label, value, width = NAME_WIDTH);
    out.push_str(line.trim_end());
    out.push('\n');
}

fn count_rows(rows: &[Row]) -> usize {
    rows.iter().map(|r| 1 + count_rows(&r.children)).sum()
}

fn chip_row<B: SensorBackend>(sensors: &Sensors<'_, B>, entry: &ChipEntry, failures: &mut usize) -> Row {
    let chip = &entry.chip;
    let (value, info) = match &entry.error {
        Some(err) => (ERROR_MARKER.to_string(), format!("{} {}", chip.describe(), err)),
        None => (entry.adapter.clone().unwrap_or_default(), chip.describe()),
    };
    Row {
        key: RowKey::Chip { chip: chip.clone() },
        name: chip.to_string(),
        value,
        info,
        children: entry
            .features
            .iter()
            .map(|f| feature_row(sensors, chip, f, failures))
            .collect(),
    }
}

fn feature_row<B: SensorBackend>(
    sensors: &Sensors<'_, B>,
    chip: &ChipName,
    entry: &FeatureEntry,
    failures: &mut usize,
) -> Row {
    let children: Vec<Row> = entry
        .subfeatures
        .iter()
        .map(|s| subfeature_row(sensors, chip, s, failures))
        .collect();

    // The feature shows the value of its main measurement, if it has one.
    let value = match &entry.error {
        Some(_) => ERROR_MARKER.to_string(),
        None => entry
            .subfeatures
            .iter()
            .zip(children.iter())
            .find(|(s, _)| !s.kind.is_flag_like())
            .map(|(_, row)| row.value.clone())
            .unwrap_or_default(),
    };
    let info = match &entry.error {
        Some(err) => format!("{} {}", entry.feature.describe(), err),
        None => entry.feature.describe(),
    };

    Row {
        key: RowKey::Feature {
            chip: chip.clone(),
            name: entry.feature.name.clone(),
            number: entry.feature.number,
        },
        name: entry.label.clone(),
        value,
        info,
        children,
    }
}

fn subfeature_row<B: SensorBackend>(
    sensors: &Sensors<'_, B>,
    chip: &ChipName,
    sub: &Subfeature,
    failures: &mut usize,
) -> Row {
    let value = if !sub.flags.readable {
        UNAVAILABLE.to_string()
    } else {
        match sensors.get_value(chip, sub.number) {
            Ok(reading) => reading.format(),
            Err(e) => {
                *failures += 1;
                logger::log_event(
                    "read_failure",
                    json!({ "chip": chip.to_string(), "subfeature": sub.name, "error": e.to_string() }),
                );
                ERROR_MARKER.to_string()
            }
        }
    };
    Row {
        key: RowKey::Subfeature { chip: chip.clone(), number: sub.number },
        name: sub.name.clone(),
        value,
        info: sub.describe(),
        children: Vec::new(),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct VisibleRow<'a> {
    pub row: &'a Row,
    pub depth: usize,
}

/// Rows the user collapsed. Everything else is expanded, including rows
/// that first appear in a later snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpandState {
    collapsed: HashSet<RowKey>,
}

impl ExpandState {
    pub fn is_expanded(&self, key: &RowKey) -> bool {
        !self.collapsed.contains(key)
    }

    pub fn collapse(&mut self, key: &RowKey) {
        self.collapsed.insert(key.clone());
    }

    pub fn expand(&mut self, key: &RowKey) {
        self.collapsed.remove(key);
    }

    pub fn toggle(&mut self, key: &RowKey) {
        if !self.collapsed.remove(key) {
            self.collapsed.insert(key.clone());
        }
    }

    pub fn expand_all(&mut self) {
        self.collapsed.clear();
    }

    /// Collapses every row that has children.
    pub fn collapse_all(&mut self, snapshot: &Snapshot) {
        for vr in snapshot.all_rows() {
            if !vr.row.children.is_empty() {
                self.collapsed.insert(vr.row.key.clone());
            }
        }
    }

    /// Drops keys of chips that left the snapshot. Keys under a chip that is
    /// still listed are kept even when its rows are missing, since a chip
    /// that failed enumeration shows up without children until it recovers.
    pub fn retain_present(&mut self, snapshot: &Snapshot) {
        let chips: HashSet<&ChipName> = snapshot.rows.iter().map(|r| r.key.chip()).collect();
        self.collapsed.retain(|k| chips.contains(k.chip()));
    }

    pub fn visible_rows<'a>(&self, snapshot: &'a Snapshot) -> Vec<VisibleRow<'a>> {
        let mut out = Vec::with_capacity(snapshot.row_count);
        self.flatten(&snapshot.rows, 0, &mut out);
        out
    }

    fn flatten<'a>(&self, rows: &'a [Row], depth: usize, out: &mut Vec<VisibleRow<'a>>) {
        for row in rows {
            out.push(VisibleRow { row, depth });
            if self.is_expanded(&row.key) {
                self.flatten(&row.children, depth + 1, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Adapter, MockBackend, MockValue};
    use crate::topology::{BusNumber, BusType, FeatureType, SubfeatureFlags, SubfeatureKind};

    fn create_test_chip() -> ChipName {
        ChipName::new("c1", BusType::Virtual, BusNumber::Nr(0), 0, None)
    }

    fn create_test_backend() -> MockBackend {
        let backend = MockBackend::new();
        let chip = create_test_chip();
        backend.add_chip(chip.clone());
        backend.set_adapter_name(BusType::Virtual, BusNumber::Nr(0), "Virtual device");
        backend.add_feature(&chip, "F1", FeatureType::Temperature, None);
        backend.add_subfeature(&chip, "F1", "S1", SubfeatureKind::TempInput, MockValue::Value(42.0));
        backend.add_subfeature(&chip, "F1", "S2", SubfeatureKind::TempCritAlarm, MockValue::Value(0.0));
        backend.add_feature(&chip, "F2", FeatureType::Fan, Some("CPU fan"));
        backend.add_subfeature(&chip, "F2", "S3", SubfeatureKind::FanInput, MockValue::Fail("EIO".into()));
        backend.add_subfeature_with_flags(
            &chip,
            "F2",
            "S4",
            SubfeatureKind::FanMin,
            SubfeatureFlags { readable: false, writable: true, compute_mapping: true },
            MockValue::Value(600.0),
        );
        backend
    }

    fn build(backend: &MockBackend) -> Snapshot {
        let mut adapter = Adapter::new(backend.clone());
        adapter.initialize().unwrap();
        Snapshot::build(&Sensors::new(&adapter)).unwrap()
    }

    #[test]
    fn test_build_rows() {
        let backend = create_test_backend();
        let snap = build(&backend);

        assert_eq!(snap.chip_count, 1);
        assert_eq!(snap.row_count, 7);
        assert_eq!(snap.read_failures, 1);

        let chip = &snap.rows[0];
        assert_eq!(chip.name, "c1-virtual-0");
        assert_eq!(chip.value, "Virtual device");
        assert!(chip.info.starts_with("ChipName(prefix=c1"));

        let f1 = &chip.children[0];
        assert_eq!(f1.name, "F1");
        assert_eq!(f1.value, "42.00");
        assert_eq!(f1.children[0].value, "42.00");
        assert_eq!(f1.children[1].value, "0.00");

        let f2 = &chip.children[1];
        assert_eq!(f2.name, "CPU fan");
        assert_eq!(f2.value, ERROR_MARKER);
        assert_eq!(f2.children[0].value, ERROR_MARKER);
        assert_eq!(f2.children[1].value, UNAVAILABLE);
    }

    #[test]
    fn test_unreadable_subfeature_is_not_read() {
        let backend = create_test_backend();
        build(&backend);
        // S1, S2, S3 read; S4 is write-only
        assert_eq!(backend.stats().read_calls, 3);
    }

    #[test]
    fn test_find_by_key() {
        let backend = create_test_backend();
        let snap = build(&backend);
        let key = RowKey::Subfeature { chip: create_test_chip(), number: 0 };
        assert_eq!(snap.find(&key).unwrap().name, "S1");
        let key = RowKey::Subfeature { chip: create_test_chip(), number: 99 };
        assert!(snap.find(&key).is_none());
    }

    #[test]
    fn test_expand_state_survives_rebuild() {
        let backend = create_test_backend();
        let first = build(&backend);
        let mut state = ExpandState::default();
        assert_eq!(state.visible_rows(&first).len(), 7);

        let f1 = first.rows[0].children[0].key.clone();
        state.toggle(&f1);
        assert_eq!(state.visible_rows(&first).len(), 5);

        backend.set_value(&create_test_chip(), 0, MockValue::Unavailable);
        let second = build(&backend);
        let rows = state.visible_rows(&second);
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[1].row.name, "F1");
        assert_eq!(rows[1].row.value, UNAVAILABLE);
        assert_eq!(rows[1].depth, 1);

        state.toggle(&f1);
        assert_eq!(state.visible_rows(&second).len(), 7);
    }

    #[test]
    fn test_collapse_all_and_retain() {
        let backend = create_test_backend();
        let snap = build(&backend);
        let mut state = ExpandState::default();
        state.collapse_all(&snap);
        assert_eq!(state.visible_rows(&snap).len(), 1);

        state.collapse(&RowKey::Chip { chip: ChipName::any() });
        state.retain_present(&snap);
        assert!(state.is_expanded(&RowKey::Chip { chip: ChipName::any() }));
        assert!(!state.is_expanded(&snap.rows[0].key));

        state.expand_all();
        assert_eq!(state.visible_rows(&snap).len(), 7);
    }

    #[test]
    fn test_text_dump() {
        let backend = create_test_backend();
        let text = build(&backend).to_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "c1-virtual-0");
        assert_eq!(lines[1], "Adapter: Virtual device");
        assert!(lines[2].starts_with("  F1:"));
        assert!(lines[2].ends_with("42.00"));
        assert!(lines[3].starts_with("    S1:"));
        assert!(lines[5].starts_with("  CPU fan:"));
        assert!(lines[5].ends_with(ERROR_MARKER));
    }

    #[test]
    fn test_json_dump() {
        let backend = create_test_backend();
        let json = build(&backend).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["chip_count"], 1);
        assert_eq!(value["rows"][0]["name"], "c1-virtual-0");
        assert_eq!(value["rows"][0]["children"][0]["value"], "42.00");
    }

    #[test]
    fn test_failing_chip_row() {
        let backend = create_test_backend();
        backend.fail_features(&create_test_chip(), Some("bus error"));
        let snap = build(&backend);
        assert_eq!(snap.rows[0].value, ERROR_MARKER);
        assert!(snap.rows[0].info.contains("bus error"));
        assert!(snap.rows[0].children.is_empty());
    }
}
