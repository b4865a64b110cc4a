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

//! Chip → feature → subfeature model.
//!
//! Every type here compares by value. Discovery hands out fresh instances on
//! each pass, and the refresher relies on a rediscovered chip or feature being
//! equal to the one it saw last tick.

mod chip;
mod feature;

pub use chip::{BusNumber, BusType, ChipName};
pub use feature::{
    Feature, FeatureType, Subfeature, SubfeatureFlags, SubfeatureKind, SUBFEATURE_TABLE,
};

/// A feature together with its subfeatures, as produced by one discovery pass.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureEntry {
    pub feature: Feature,
    pub label: String,
    pub subfeatures: Vec<Subfeature>,
    /// Set when the subfeature list could not be enumerated.
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChipEntry {
    pub chip: ChipName,
    pub adapter: Option<String>,
    pub features: Vec<FeatureEntry>,
    /// Set when the feature list could not be enumerated.
    pub error: Option<String>,
}

/// Whole tree from one discovery pass, in backend enumeration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Topology {
    pub chips: Vec<ChipEntry>,
}

impl Topology {
    pub fn chip(&self, chip: &ChipName) -> Option<&ChipEntry> {
        self.chips.iter().find(|c| &c.chip == chip)
    }

    pub fn feature_count(&self) -> usize {
        self.chips.iter().map(|c| c.features.len()).sum()
    }

    pub fn subfeature_count(&self) -> usize {
        self.chips
            .iter()
            .flat_map(|c| c.features.iter())
            .map(|f| f.subfeatures.len())
            .sum()
    }
}
