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

//! Fixed-cadence snapshot rebuilding.
//!
//! The host loop calls [`Refresher::tick`] whenever it wakes up. A tick that
//! arrives while a rebuild is still in progress is dropped, never queued.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;

use crate::backend::SensorBackend;
use crate::discovery::Sensors;
use crate::error::Result;
use crate::logger;
use crate::snapshot::Snapshot;

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Refreshing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    NotDue,
    Refreshed,
    Dropped,
}

pub struct Refresher {
    state: RefreshState,
    interval: Duration,
    last_refresh: Option<Instant>,
    started: Option<Instant>,
    snapshot: Arc<Snapshot>,
    rebuilds: u64,
    drops: u64,
    last_error: Option<String>,
}

impl Default for Refresher {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL)
    }
}

impl Refresher {
    pub fn new(interval: Duration) -> Self {
        Self {
            state: RefreshState::Idle,
            interval,
            last_refresh: None,
            started: None,
            snapshot: Arc::new(Snapshot::default()),
            rebuilds: 0,
            drops: 0,
            last_error: None,
        }
    }

    pub fn state(&self) -> RefreshState {
        self.state
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    /// The snapshot currently on display.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot)
    }

    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }

    pub fn drops(&self) -> u64 {
        self.drops
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_refresh {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        }
    }

    /// How long the host may sleep before the next tick is due.
    pub fn time_until_due(&self, now: Instant) -> Duration {
        match self.last_refresh {
            None => Duration::ZERO,
            Some(last) => self.interval.saturating_sub(now.saturating_duration_since(last)),
        }
    }

    /// Makes the next tick due regardless of the interval.
    pub fn force(&mut self) {
        self.last_refresh = None;
    }

    /// Idle → Refreshing. Returns false, and counts a drop, when a rebuild is
    /// already in progress.
    pub fn begin(&mut self, now: Instant) -> bool {
        match self.state {
            RefreshState::Refreshing => {
                self.drops += 1;
                logger::log_event("refresh_dropped", json!({ "drops": self.drops }));
                false
            }
            RefreshState::Idle => {
                self.state = RefreshState::Refreshing;
                self.last_refresh = Some(now);
                self.started = Some(Instant::now());
                true
            }
        }
    }

    /// Swaps in a finished snapshot and returns to Idle.
    pub fn complete(&mut self, snapshot: Snapshot) {
        let elapsed_ms = self.started.take().map(|s| s.elapsed().as_millis()).unwrap_or(0);
        logger::log_event(
            "refresh",
            json!({
                "elapsed_ms": elapsed_ms,
                "chips": snapshot.chip_count,
                "rows": snapshot.row_count,
                "read_failures": snapshot.read_failures,
            }),
        );
        self.snapshot = Arc::new(snapshot);
        self.state = RefreshState::Idle;
        self.rebuilds += 1;
        self.last_error = None;
    }

    /// Returns to Idle keeping the previous snapshot.
    pub fn abort(&mut self, error: String) {
        self.started = None;
        self.state = RefreshState::Idle;
        self.last_error = Some(error);
    }

    pub fn tick<B: SensorBackend>(&mut self, now: Instant, sensors: &Sensors<'_, B>) -> Result<TickOutcome> {
        if !self.is_due(now) {
            return Ok(TickOutcome::NotDue);
        }
        if !self.begin(now) {
            return Ok(TickOutcome::Dropped);
        }
        match Snapshot::build(sensors) {
            Ok(snapshot) => {
                self.complete(snapshot);
                Ok(TickOutcome::Refreshed)
            }
            Err(e) => {
                self.abort(e.to_string());
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Adapter, MockBackend, MockValue};
    use crate::error::SensorsError;
    use crate::topology::{BusNumber, BusType, ChipName, FeatureType, SubfeatureKind};

    fn create_test_chip() -> ChipName {
        ChipName::new("C1", BusType::Virtual, BusNumber::Nr(0), 0, None)
    }

    /// Chip C1, feature F1, subfeature S1 = 42.0.
    fn create_test_backend() -> (MockBackend, u32) {
        let backend = MockBackend::new();
        let chip = create_test_chip();
        backend.add_chip(chip.clone());
        backend.add_feature(&chip, "F1", FeatureType::Temperature, None);
        let s1 = backend
            .add_subfeature(&chip, "F1", "S1", SubfeatureKind::TempInput, MockValue::Value(42.0))
            .unwrap();
        (backend, s1)
    }

    fn ready(backend: &MockBackend) -> Adapter<MockBackend> {
        let mut adapter = Adapter::new(backend.clone());
        adapter.initialize().unwrap();
        adapter
    }

    fn f1_row(refresher: &Refresher) -> (String, String) {
        let snap = refresher.snapshot();
        let row = &snap.rows[0].children[0];
        (row.name.clone(), row.value.clone())
    }

    #[test]
    fn test_refresh_cycle() {
        let (backend, s1) = create_test_backend();
        let adapter = ready(&backend);
        let sensors = Sensors::new(&adapter);
        let mut refresher = Refresher::new(Duration::from_millis(1000));
        let t0 = Instant::now();

        assert_eq!(refresher.tick(t0, &sensors).unwrap(), TickOutcome::Refreshed);
        assert_eq!(f1_row(&refresher), ("F1".to_string(), "42.00".to_string()));

        backend.set_value(&create_test_chip(), s1, MockValue::Unavailable);
        assert_eq!(
            refresher.tick(t0 + Duration::from_millis(500), &sensors).unwrap(),
            TickOutcome::NotDue
        );
        assert_eq!(
            refresher.tick(t0 + Duration::from_millis(1000), &sensors).unwrap(),
            TickOutcome::Refreshed
        );
        assert_eq!(f1_row(&refresher), ("F1".to_string(), "unavailable".to_string()));
        assert_eq!(refresher.rebuilds(), 2);
        assert_eq!(refresher.state(), RefreshState::Idle);
    }

    #[test]
    fn test_tick_while_refreshing_is_dropped() {
        let (backend, _) = create_test_backend();
        let adapter = ready(&backend);
        let sensors = Sensors::new(&adapter);
        let mut refresher = Refresher::default();
        let now = Instant::now();

        assert!(refresher.begin(now));
        assert_eq!(refresher.state(), RefreshState::Refreshing);
        refresher.force();
        assert_eq!(refresher.tick(now, &sensors).unwrap(), TickOutcome::Dropped);
        assert_eq!(backend.stats().enumerate_chips_calls, 0);

        refresher.complete(Snapshot::build(&sensors).unwrap());
        assert_eq!(refresher.rebuilds(), 1);
        assert_eq!(refresher.drops(), 1);
        assert_eq!(backend.stats().enumerate_chips_calls, 1);
        assert_eq!(refresher.state(), RefreshState::Idle);
    }

    #[test]
    fn test_time_until_due() {
        let mut refresher = Refresher::new(Duration::from_millis(1000));
        let t0 = Instant::now();
        assert_eq!(refresher.time_until_due(t0), Duration::ZERO);
        assert!(refresher.begin(t0));
        refresher.complete(Snapshot::default());
        assert_eq!(refresher.time_until_due(t0 + Duration::from_millis(300)), Duration::from_millis(700));
        assert_eq!(refresher.time_until_due(t0 + Duration::from_millis(1500)), Duration::ZERO);
        refresher.force();
        assert!(refresher.is_due(t0));
    }

    #[test]
    fn test_failed_rebuild_keeps_previous_snapshot() {
        let (backend, _) = create_test_backend();
        let adapter = ready(&backend);
        let sensors = Sensors::new(&adapter);
        let mut refresher = Refresher::default();
        let t0 = Instant::now();
        refresher.tick(t0, &sensors).unwrap();

        let uninit = Adapter::new(backend.clone());
        let broken = Sensors::new(&uninit);
        let err = refresher.tick(t0 + Duration::from_secs(2), &broken).unwrap_err();
        assert!(matches!(err, SensorsError::BackendUnavailable(_)));
        assert_eq!(refresher.state(), RefreshState::Idle);
        assert!(refresher.last_error().is_some());
        assert_eq!(f1_row(&refresher).1, "42.00");
        assert_eq!(refresher.rebuilds(), 1);
    }
}
