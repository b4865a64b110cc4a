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

//! Access to the sensor subsystem.
//!
//! [`SensorBackend`] is the seam between the core and whatever actually
//! reads the hardware. [`Adapter`] wraps a backend and owns its
//! initialisation state; everything above it assumes `initialize` succeeded.

use std::sync::{Mutex, MutexGuard};

use lazy_static::lazy_static;
use serde_json::json;

use crate::error::{Result, SensorsError};
use crate::logger;
use crate::topology::{BusNumber, BusType, ChipName, Feature, Subfeature};

pub mod hwmon;
pub mod mock;

pub use hwmon::HwmonBackend;
pub use mock::{MockBackend, MockValue};

#[cfg_attr(test, mockall::automock)]
pub trait SensorBackend {
    /// Establish access. Fails with `BackendUnavailable`.
    fn initialize(&mut self) -> Result<()>;

    fn cleanup(&mut self);

    fn enumerate_chips(&self) -> Result<Vec<ChipName>>;

    fn enumerate_features(&self, chip: &ChipName) -> Result<Vec<Feature>>;

    fn enumerate_subfeatures(&self, chip: &ChipName, feature: &Feature) -> Result<Vec<Subfeature>>;

    /// `Ok(None)` when the sensor legitimately has no reading right now.
    /// `Err` only for hard failures (chip gone, permission revoked).
    fn read_value(&self, chip: &ChipName, number: u32) -> Result<Option<f64>>;

    fn get_label(&self, chip: &ChipName, feature: &Feature) -> Option<String>;

    fn adapter_name(&self, bus_type: BusType, bus_nr: BusNumber) -> Option<String>;
}

lazy_static! {
    // Serialises initialize/cleanup across every adapter in the process.
    static ref INIT_LOCK: Mutex<()> = Mutex::new(());
}

fn init_lock() -> MutexGuard<'static, ()> {
    match INIT_LOCK.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterState {
    Uninitialized,
    Ready,
}

pub struct Adapter<B: SensorBackend> {
    backend: B,
    state: AdapterState,
}

impl<B: SensorBackend> Adapter<B> {
    pub fn new(backend: B) -> Self {
        Self { backend, state: AdapterState::Uninitialized }
    }

    /// Idempotent: an already initialised adapter returns `Ok` untouched.
    pub fn initialize(&mut self) -> Result<()> {
        let _guard = init_lock();
        if self.state == AdapterState::Ready {
            return Ok(());
        }
        match self.backend.initialize() {
            Ok(()) => {
                self.state = AdapterState::Ready;
                logger::log_event("backend_init", json!({ "ok": true }));
                Ok(())
            }
            Err(e) => {
                let reason = match e {
                    SensorsError::BackendUnavailable(msg) => msg,
                    other => other.to_string(),
                };
                logger::log_event("backend_init", json!({ "ok": false, "error": reason }));
                Err(SensorsError::BackendUnavailable(reason))
            }
        }
    }

    /// No-op unless initialised; safe to call any number of times.
    pub fn cleanup(&mut self) {
        let _guard = init_lock();
        if self.state == AdapterState::Ready {
            self.backend.cleanup();
            self.state = AdapterState::Uninitialized;
            logger::log_event("backend_cleanup", json!({}));
        }
    }

    pub fn state(&self) -> AdapterState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == AdapterState::Ready
    }

    pub fn backend(&self) -> Result<&B> {
        if self.is_ready() {
            Ok(&self.backend)
        } else {
            Err(SensorsError::BackendUnavailable("sensor backend not initialized".to_string()))
        }
    }
}

impl<B: SensorBackend> Drop for Adapter<B> {
    fn drop(&mut self) {
        self.cleanup();
    }
}
