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

//! Scriptable in-memory backend.
//!
//! Clones share state, so a test can keep one handle and change readings
//! while the adapter owns the other:
//!
//! ```ignore
//! let backend = MockBackend::new();
//! let chip = ChipName::new("c1", BusType::Virtual, BusNumber::Nr(0), 0, None);
//! backend.add_chip(chip.clone());
//! backend.add_feature(&chip, "F1", FeatureType::Temperature, None);
//! let s1 = backend
//!     .add_subfeature(&chip, "F1", "S1", SubfeatureKind::TempInput, MockValue::Value(42.0))
//!     .unwrap();
//!
//! let mut adapter = Adapter::new(backend.clone());
//! adapter.initialize()?;
//! backend.set_value(&chip, s1, MockValue::Unavailable);
//! ```

use std::sync::{Arc, Mutex, MutexGuard};

use super::SensorBackend;
use crate::error::{Result, SensorsError};
use crate::topology::{
    BusNumber, BusType, ChipName, Feature, FeatureType, Subfeature, SubfeatureFlags, SubfeatureKind,
};

/// What a read of a mock subfeature returns.
#[derive(Debug, Clone, PartialEq)]
pub enum MockValue {
    Value(f64),
    Unavailable,
    Fail(String),
}

#[derive(Debug, Clone)]
struct MockSubfeature {
    subfeature: Subfeature,
    value: MockValue,
}

#[derive(Debug, Clone)]
struct MockFeature {
    feature: Feature,
    label: Option<String>,
    subfeatures: Vec<MockSubfeature>,
}

#[derive(Debug, Clone)]
struct MockChip {
    chip: ChipName,
    features: Vec<MockFeature>,
    fail_features: Option<String>,
    next_subfeature: u32,
}

/// Call counters, for asserting how often the core hit the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockStats {
    pub initialize_calls: usize,
    pub cleanup_calls: usize,
    pub enumerate_chips_calls: usize,
    pub read_calls: usize,
}

#[derive(Debug, Default)]
struct MockState {
    chips: Vec<MockChip>,
    adapters: Vec<(BusType, BusNumber, String)>,
    fail_initialize: Option<String>,
    stats: MockStats,
}

#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn add_chip(&self, chip: ChipName) {
        self.state().chips.push(MockChip {
            chip,
            features: Vec::new(),
            fail_features: None,
            next_subfeature: 0,
        });
    }

    pub fn remove_chip(&self, chip: &ChipName) {
        self.state().chips.retain(|c| &c.chip != chip);
    }

    /// Appends a feature; its number is its position on the chip.
    pub fn add_feature(&self, chip: &ChipName, name: &str, kind: FeatureType, label: Option<&str>) -> Option<Feature> {
        let mut state = self.state();
        let entry = state.chips.iter_mut().find(|c| &c.chip == chip)?;
        let feature = Feature::new(chip.clone(), name, entry.features.len() as u32, kind);
        entry.features.push(MockFeature {
            feature: feature.clone(),
            label: label.map(String::from),
            subfeatures: Vec::new(),
        });
        Some(feature)
    }

    /// Appends a readable subfeature and returns its chip-wide number, or
    /// `None` when the chip or feature does not exist.
    pub fn add_subfeature(
        &self,
        chip: &ChipName,
        feature: &str,
        name: &str,
        kind: SubfeatureKind,
        value: MockValue,
    ) -> Option<u32> {
        let flags = SubfeatureFlags {
            readable: true,
            writable: false,
            compute_mapping: !kind.is_flag_like(),
        };
        self.add_subfeature_with_flags(chip, feature, name, kind, flags, value)
    }

    pub fn add_subfeature_with_flags(
        &self,
        chip: &ChipName,
        feature: &str,
        name: &str,
        kind: SubfeatureKind,
        flags: SubfeatureFlags,
        value: MockValue,
    ) -> Option<u32> {
        let mut state = self.state();
        let entry = state.chips.iter_mut().find(|c| &c.chip == chip)?;
        let number = entry.next_subfeature;
        let f = entry.features.iter_mut().find(|f| f.feature.name == feature)?;
        f.subfeatures.push(MockSubfeature {
            subfeature: Subfeature::new(name, number, kind, f.feature.number, flags),
            value,
        });
        entry.next_subfeature += 1;
        Some(number)
    }

    pub fn set_value(&self, chip: &ChipName, number: u32, value: MockValue) {
        let mut state = self.state();
        if let Some(sub) = state
            .chips
            .iter_mut()
            .filter(|c| &c.chip == chip)
            .flat_map(|c| c.features.iter_mut())
            .flat_map(|f| f.subfeatures.iter_mut())
            .find(|s| s.subfeature.number == number)
        {
            sub.value = value;
        }
    }

    pub fn set_label(&self, chip: &ChipName, feature: &str, label: Option<&str>) {
        let mut state = self.state();
        if let Some(f) = state
            .chips
            .iter_mut()
            .filter(|c| &c.chip == chip)
            .flat_map(|c| c.features.iter_mut())
            .find(|f| f.feature.name == feature)
        {
            f.label = label.map(String::from);
        }
    }

    /// Makes feature enumeration of `chip` fail until cleared with `None`.
    pub fn fail_features(&self, chip: &ChipName, reason: Option<&str>) {
        let mut state = self.state();
        if let Some(entry) = state.chips.iter_mut().find(|c| &c.chip == chip) {
            entry.fail_features = reason.map(String::from);
        }
    }

    pub fn fail_initialize(&self, reason: &str) {
        self.state().fail_initialize = Some(reason.to_string());
    }

    pub fn set_adapter_name(&self, bus_type: BusType, bus_nr: BusNumber, name: &str) {
        self.state().adapters.push((bus_type, bus_nr, name.to_string()));
    }

    pub fn stats(&self) -> MockStats {
        self.state().stats
    }
}

impl SensorBackend for MockBackend {
    fn initialize(&mut self) -> Result<()> {
        let mut state = self.state();
        state.stats.initialize_calls += 1;
        match &state.fail_initialize {
            Some(reason) => Err(SensorsError::BackendUnavailable(reason.clone())),
            None => Ok(()),
        }
    }

    fn cleanup(&mut self) {
        self.state().stats.cleanup_calls += 1;
    }

    fn enumerate_chips(&self) -> Result<Vec<ChipName>> {
        let mut state = self.state();
        state.stats.enumerate_chips_calls += 1;
        Ok(state.chips.iter().map(|c| c.chip.clone()).collect())
    }

    fn enumerate_features(&self, chip: &ChipName) -> Result<Vec<Feature>> {
        let state = self.state();
        let entry = state
            .chips
            .iter()
            .find(|c| &c.chip == chip)
            .ok_or_else(|| SensorsError::discovery(chip, "no such chip"))?;
        if let Some(reason) = &entry.fail_features {
            return Err(SensorsError::discovery(chip, reason));
        }
        Ok(entry.features.iter().map(|f| f.feature.clone()).collect())
    }

    fn enumerate_subfeatures(&self, chip: &ChipName, feature: &Feature) -> Result<Vec<Subfeature>> {
        let state = self.state();
        Ok(state
            .chips
            .iter()
            .filter(|c| &c.chip == chip)
            .flat_map(|c| c.features.iter())
            .find(|f| f.feature.number == feature.number)
            .map(|f| f.subfeatures.iter().map(|s| s.subfeature.clone()).collect())
            .unwrap_or_default())
    }

    fn read_value(&self, chip: &ChipName, number: u32) -> Result<Option<f64>> {
        let mut state = self.state();
        state.stats.read_calls += 1;
        let value = state
            .chips
            .iter()
            .filter(|c| &c.chip == chip)
            .flat_map(|c| c.features.iter())
            .flat_map(|f| f.subfeatures.iter())
            .find(|s| s.subfeature.number == number)
            .map(|s| s.value.clone())
            .ok_or_else(|| SensorsError::read_failure(chip, number, "no such subfeature"))?;
        match value {
            MockValue::Value(v) => Ok(Some(v)),
            MockValue::Unavailable => Ok(None),
            MockValue::Fail(reason) => Err(SensorsError::read_failure(chip, number, reason)),
        }
    }

    fn get_label(&self, chip: &ChipName, feature: &Feature) -> Option<String> {
        let state = self.state();
        state
            .chips
            .iter()
            .filter(|c| &c.chip == chip)
            .flat_map(|c| c.features.iter())
            .find(|f| f.feature.number == feature.number)
            .and_then(|f| f.label.clone())
    }

    fn adapter_name(&self, bus_type: BusType, bus_nr: BusNumber) -> Option<String> {
        self.state()
            .adapters
            .iter()
            .find(|(t, n, _)| *t == bus_type && *n == bus_nr)
            .map(|(_, _, name)| name.clone())
    }
}
