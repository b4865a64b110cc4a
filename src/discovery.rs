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

//! Queries over an initialised backend.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::json;

use crate::backend::{Adapter, SensorBackend};
use crate::error::{Result, SensorsError};
use crate::logger;
use crate::sensors_conf::SensorsConfig;
use crate::topology::{
    BusNumber, BusType, ChipEntry, ChipName, Feature, FeatureEntry, Subfeature, SubfeatureKind, Topology,
};

/// Result of reading one subfeature. A sensor with nothing to report (stopped
/// fan, sleeping disk) is `Unavailable`, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reading {
    Value(f64),
    Unavailable,
}

impl Reading {
    pub fn value(&self) -> Option<f64> {
        match self {
            Reading::Value(v) => Some(*v),
            Reading::Unavailable => None,
        }
    }

    pub fn format(&self) -> String {
        match self {
            Reading::Value(v) => format!("{:.2}", v),
            Reading::Unavailable => "unavailable".to_string(),
        }
    }
}

impl From<Option<f64>> for Reading {
    fn from(v: Option<f64>) -> Self {
        match v {
            Some(v) => Reading::Value(v),
            None => Reading::Unavailable,
        }
    }
}

pub struct Sensors<'a, B: SensorBackend> {
    adapter: &'a Adapter<B>,
    config: Option<&'a SensorsConfig>,
    chip_filter: Option<ChipName>,
}

impl<'a, B: SensorBackend> Sensors<'a, B> {
    pub fn new(adapter: &'a Adapter<B>) -> Self {
        Self { adapter, config: None, chip_filter: None }
    }

    pub fn with_config(mut self, config: &'a SensorsConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Restricts `discover` to chips matching `pattern`.
    pub fn with_chip_filter(mut self, pattern: Option<ChipName>) -> Self {
        self.chip_filter = pattern;
        self
    }

    fn backend(&self) -> Result<&'a B> {
        self.adapter.backend()
    }

    pub fn list_chips(&self, pattern: Option<&ChipName>) -> Result<Vec<ChipName>> {
        let chips = self.backend()?.enumerate_chips()?;
        Ok(match pattern {
            Some(p) => chips.into_iter().filter(|c| c.matches(p)).collect(),
            None => chips,
        })
    }

    pub fn list_features(&self, chip: &ChipName) -> Result<Vec<Feature>> {
        let features = self.backend()?.enumerate_features(chip)?;
        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(features.len());
        for feature in features {
            if !seen.insert(feature.number) {
                logger::log_event(
                    "duplicate_dropped",
                    json!({ "chip": chip.to_string(), "feature": feature.name, "number": feature.number }),
                );
                continue;
            }
            if self.config.is_some_and(|c| c.is_ignored(chip, &feature.name)) {
                continue;
            }
            out.push(feature);
        }
        Ok(out)
    }

    pub fn list_subfeatures(&self, chip: &ChipName, feature: &Feature) -> Result<Vec<Subfeature>> {
        let subfeatures = self.backend()?.enumerate_subfeatures(chip, feature)?;
        let mut seen = HashSet::new();
        Ok(subfeatures
            .into_iter()
            .filter(|s| {
                let fresh = seen.insert(s.number);
                if !fresh {
                    logger::log_event(
                        "duplicate_dropped",
                        json!({ "chip": chip.to_string(), "subfeature": s.name, "number": s.number }),
                    );
                }
                fresh
            })
            .collect())
    }

    pub fn get_subfeature(&self, chip: &ChipName, feature: &Feature, kind: SubfeatureKind) -> Option<Subfeature> {
        self.list_subfeatures(chip, feature)
            .ok()?
            .into_iter()
            .find(|s| s.kind == kind)
    }

    pub fn get_value(&self, chip: &ChipName, number: u32) -> Result<Reading> {
        Ok(self.backend()?.read_value(chip, number)?.into())
    }

    /// Like `get_value` but folds read failures into `None` after logging them.
    pub fn get_value_or_none(&self, chip: &ChipName, number: u32) -> Option<f64> {
        match self.get_value(chip, number) {
            Ok(reading) => reading.value(),
            Err(e) => {
                logger::log_event(
                    "read_failure",
                    json!({ "chip": chip.to_string(), "number": number, "error": e.to_string() }),
                );
                None
            }
        }
    }

    /// Label from the configuration file, else from the backend.
    pub fn get_label(&self, chip: &ChipName, feature: &Feature) -> Result<String> {
        if let Some(label) = self.config.and_then(|c| c.label_for(chip, &feature.name)) {
            return Ok(label.to_string());
        }
        self.backend()?
            .get_label(chip, feature)
            .ok_or_else(|| SensorsError::LabelUnavailable {
                chip: chip.to_string(),
                feature: feature.name.clone(),
            })
    }

    pub fn display_label(&self, chip: &ChipName, feature: &Feature) -> String {
        self.get_label(chip, feature).unwrap_or_else(|_| feature.name.clone())
    }

    pub fn adapter_name(&self, bus_type: BusType, bus_nr: BusNumber) -> Option<String> {
        self.backend().ok()?.adapter_name(bus_type, bus_nr)
    }

    /// Whole tree. Only a failure to list chips is fatal; a chip or feature
    /// that cannot be enumerated is recorded on its entry and skipped.
    pub fn discover(&self) -> Result<Topology> {
        let chips = self.list_chips(self.chip_filter.as_ref())?;
        let mut topology = Topology::default();

        for chip in chips {
            let adapter = self.adapter_name(chip.bus_type(), chip.bus_nr());
            let features = match self.list_features(&chip) {
                Ok(features) => features,
                Err(e) => {
                    logger::log_event(
                        "discovery_failure",
                        json!({ "chip": chip.to_string(), "error": e.to_string() }),
                    );
                    topology.chips.push(ChipEntry {
                        chip,
                        adapter,
                        features: Vec::new(),
                        error: Some(e.to_string()),
                    });
                    continue;
                }
            };

            let features = features
                .into_iter()
                .map(|feature| {
                    let label = self.display_label(&chip, &feature);
                    let (subfeatures, error) = match self.list_subfeatures(&chip, &feature) {
                        Ok(subs) => (subs, None),
                        Err(e) => {
                            logger::log_event(
                                "discovery_failure",
                                json!({ "chip": chip.to_string(), "feature": feature.name, "error": e.to_string() }),
                            );
                            (Vec::new(), Some(e.to_string()))
                        }
                    };
                    FeatureEntry { feature, label, subfeatures, error }
                })
                .collect();

            topology.chips.push(ChipEntry { chip, adapter, features, error: None });
        }

        Ok(topology)
    }
}
