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

//! Error taxonomy shared by the backend, discovery and refresh layers.
//!
//! A missing reading is not an error: see [`crate::discovery::Reading`].

use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SensorsError>;

#[derive(Error, Debug)]
pub enum SensorsError {
    /// Fatal at startup: the sensor subsystem cannot be reached.
    #[error("Sensor backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Failed to read subfeature {number} of {chip}: {reason}")]
    ReadFailure {
        chip: String,
        number: u32,
        reason: String,
    },

    #[error("No label for feature {feature} of {chip}")]
    LabelUnavailable { chip: String, feature: String },

    #[error("Invalid chip name: {0}")]
    InvalidChipName(String),

    #[error("Chip name contains wildcards: {0}")]
    WildcardChipName(String),

    #[error("Discovery failed for {chip}: {reason}")]
    Discovery { chip: String, reason: String },

    #[error("Config parse error at line {line}: {message}")]
    ConfigParse { line: usize, message: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SensorsError {
    pub fn read_failure<C: ToString, R: ToString>(chip: C, number: u32, reason: R) -> Self {
        SensorsError::ReadFailure {
            chip: chip.to_string(),
            number,
            reason: reason.to_string(),
        }
    }

    pub fn discovery<C: ToString, R: ToString>(chip: C, reason: R) -> Self {
        SensorsError::Discovery {
            chip: chip.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Errors the refresher may show in a row and keep going.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, SensorsError::BackendUnavailable(_))
    }
}
