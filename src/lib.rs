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

//! Sensorview - live hardware sensor tree viewer for Linux
//!
//! This library discovers sensor chips through a pluggable backend (hwmon
//! sysfs by default), builds a chip / feature / subfeature snapshot on a
//! fixed refresh interval, and renders it as a collapsible terminal tree.

pub mod error;
pub mod topology;
pub mod backend;
pub mod sensors_conf;
pub mod discovery;
pub mod snapshot;
pub mod refresher;
pub mod app;
pub mod config;
pub mod events;
pub mod ui;
pub mod logger;

#[cfg(test)]
pub mod test_utils;
