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

//! Backend reading the Linux hwmon class under `<root>/class/hwmon`.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{self, Read};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::json;

use super::SensorBackend;
use crate::error::{Result, SensorsError};
use crate::logger;
use crate::topology::{
    BusNumber, BusType, ChipName, Feature, FeatureType, Subfeature, SubfeatureFlags, SubfeatureKind,
};

pub const DEFAULT_SYSFS_ROOT: &str = "/sys";

#[derive(Debug, Clone)]
struct LayoutSubfeature {
    subfeature: Subfeature,
    path: PathBuf,
}

#[derive(Debug, Clone)]
struct LayoutFeature {
    feature: Feature,
    subfeatures: Vec<LayoutSubfeature>,
}

/// Attribute files of one chip, numbered the way discovery hands them out.
#[derive(Debug, Clone)]
struct ChipLayout {
    attr_dir: PathBuf,
    features: Vec<LayoutFeature>,
}

impl ChipLayout {
    fn subfeature(&self, number: u32) -> Option<&LayoutSubfeature> {
        self.features
            .iter()
            .flat_map(|f| f.subfeatures.iter())
            .find(|s| s.subfeature.number == number)
    }
}

pub struct HwmonBackend {
    root: PathBuf,
    layouts: Mutex<HashMap<ChipName, Arc<ChipLayout>>>,
}

impl HwmonBackend {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            layouts: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn hwmon_dir(&self) -> PathBuf {
        self.root.join("class").join("hwmon")
    }

    fn layouts(&self) -> MutexGuard<'_, HashMap<ChipName, Arc<ChipLayout>>> {
        match self.layouts.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Cached layout for `chip`, scanning sysfs on first use.
    fn layout(&self, chip: &ChipName) -> Result<Arc<ChipLayout>> {
        if let Some(layout) = self.layouts().get(chip) {
            return Ok(layout.clone());
        }
        self.rescan(chip)
    }

    fn rescan(&self, chip: &ChipName) -> Result<Arc<ChipLayout>> {
        let dir = chip
            .path()
            .map(PathBuf::from)
            .ok_or_else(|| SensorsError::discovery(chip, "chip has no sysfs path"))?;
        let layout = Arc::new(scan_layout(chip, &dir)?);
        self.layouts().insert(chip.clone(), layout.clone());
        Ok(layout)
    }

    fn read_chip(&self, dir: &Path) -> Option<ChipName> {
        let prefix = read_trimmed(attr_dir(dir).join("name")).ok()?;
        if prefix.is_empty() {
            return None;
        }
        let device = dir.join("device");
        let (bus_type, bus_nr, addr) = if device.exists() {
            let dev = fs::canonicalize(&device).unwrap_or(device);
            let dev_name = dev.file_name().and_then(|s| s.to_str()).unwrap_or("").to_string();
            let subsystem = fs::read_link(dev.join("subsystem"))
                .ok()
                .and_then(|p| p.file_name().and_then(|s| s.to_str()).map(String::from))
                .unwrap_or_default();
            match bus_from_device(&subsystem, &dev_name) {
                Some(bus) => bus,
                None => {
                    logger::log_event(
                        "unknown_bus",
                        json!({ "path": dir.display().to_string(), "device": dev_name, "subsystem": subsystem }),
                    );
                    (BusType::Virtual, BusNumber::Nr(0), 0)
                }
            }
        } else {
            // virtual chips all sit at address 0; the sysfs path tells them apart
            (BusType::Virtual, BusNumber::Nr(0), 0)
        };

        Some(ChipName::new(
            prefix,
            bus_type,
            bus_nr,
            addr,
            Some(dir.to_string_lossy().into_owned()),
        ))
    }
}

impl Default for HwmonBackend {
    fn default() -> Self {
        Self::new(DEFAULT_SYSFS_ROOT)
    }
}

impl SensorBackend for HwmonBackend {
    fn initialize(&mut self) -> Result<()> {
        let dir = self.hwmon_dir();
        fs::read_dir(&dir).map_err(|e| {
            SensorsError::BackendUnavailable(format!("cannot read {}: {}", dir.display(), e))
        })?;
        Ok(())
    }

    fn cleanup(&mut self) {
        self.layouts().clear();
    }

    fn enumerate_chips(&self) -> Result<Vec<ChipName>> {
        let entries = fs::read_dir(self.hwmon_dir())?;
        let mut found: Vec<(usize, ChipName)> = Vec::new();
        for ent in entries.flatten() {
            let dir = ent.path();
            let tag = ent.file_name().to_string_lossy().into_owned();
            let Some(index) = extract_index(&tag, "hwmon", "") else { continue };
            if let Some(chip) = self.read_chip(&dir) {
                found.push((index, chip));
            }
        }
        // read_dir order is arbitrary; hwmon index gives a stable one
        found.sort_by_key(|(index, _)| *index);
        Ok(found.into_iter().map(|(_, chip)| chip).collect())
    }

    fn enumerate_features(&self, chip: &ChipName) -> Result<Vec<Feature>> {
        let layout = self.rescan(chip)?;
        Ok(layout.features.iter().map(|f| f.feature.clone()).collect())
    }

    fn enumerate_subfeatures(&self, chip: &ChipName, feature: &Feature) -> Result<Vec<Subfeature>> {
        let layout = self.layout(chip)?;
        Ok(layout
            .features
            .iter()
            .find(|f| f.feature.number == feature.number && f.feature.name == feature.name)
            .map(|f| f.subfeatures.iter().map(|s| s.subfeature.clone()).collect())
            .unwrap_or_default())
    }

    fn read_value(&self, chip: &ChipName, number: u32) -> Result<Option<f64>> {
        let layout = self.layout(chip)?;
        let entry = layout
            .subfeature(number)
            .ok_or_else(|| SensorsError::read_failure(chip, number, "no such subfeature"))?;

        match read_trimmed(&entry.path) {
            Ok(raw) => Ok(raw
                .parse::<f64>()
                .ok()
                .map(|v| v / entry.subfeature.kind.scale())),
            Err(e) if is_transient(&e) => Ok(None),
            Err(e) => Err(SensorsError::read_failure(chip, number, e)),
        }
    }

    fn get_label(&self, chip: &ChipName, feature: &Feature) -> Option<String> {
        let dir = match self.layout(chip) {
            Ok(layout) => layout.attr_dir.clone(),
            Err(_) => attr_dir(Path::new(chip.path()?)),
        };
        read_trimmed(dir.join(format!("{}_label", feature.name)))
            .ok()
            .filter(|s| !s.is_empty())
    }

    fn adapter_name(&self, bus_type: BusType, bus_nr: BusNumber) -> Option<String> {
        let name = match bus_type {
            BusType::Isa => "ISA adapter",
            BusType::Pci => "PCI adapter",
            BusType::Spi => "SPI adapter",
            BusType::Virtual => "Virtual device",
            BusType::Acpi => "ACPI interface",
            BusType::Hid => "HID adapter",
            BusType::I2c => {
                let BusNumber::Nr(nr) = bus_nr else { return None };
                let path = self
                    .root
                    .join("class")
                    .join("i2c-adapter")
                    .join(format!("i2c-{}", nr))
                    .join("name");
                return read_trimmed(path).ok().filter(|s| !s.is_empty());
            }
            BusType::Any => return None,
        };
        Some(name.to_string())
    }
}

/// Errors meaning "no value right now" rather than a broken chip.
fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.raw_os_error(),
        Some(libc::ENODATA) | Some(libc::EAGAIN) | Some(libc::EBUSY) | Some(libc::ETIMEDOUT)
    )
}

/// Older drivers keep their attributes on the parent device.
fn attr_dir(dir: &Path) -> PathBuf {
    if !dir.join("name").exists() && dir.join("device").join("name").exists() {
        dir.join("device")
    } else {
        dir.to_path_buf()
    }
}

/// Bus identity from the device's subsystem and sysfs directory name.
fn bus_from_device(subsystem: &str, dev_name: &str) -> Option<(BusType, BusNumber, u32)> {
    match subsystem {
        // "1-0048"
        "i2c" => {
            let (nr, addr) = dev_name.split_once('-')?;
            Some((
                BusType::I2c,
                BusNumber::Nr(nr.parse().ok()?),
                u32::from_str_radix(addr, 16).ok()?,
            ))
        }
        // "spi0.1"
        "spi" => {
            let (nr, cs) = dev_name.strip_prefix("spi")?.split_once('.')?;
            Some((BusType::Spi, BusNumber::Nr(nr.parse().ok()?), cs.parse().ok()?))
        }
        // "0000:00:18.3"
        "pci" => {
            let mut parts = dev_name.split(':');
            let domain = u32::from_str_radix(parts.next()?, 16).ok()?;
            let bus = u32::from_str_radix(parts.next()?, 16).ok()?;
            let (slot, func) = parts.next()?.split_once('.')?;
            let slot = u32::from_str_radix(slot, 16).ok()?;
            let func = u32::from_str_radix(func, 16).ok()?;
            Some((BusType::Pci, BusNumber::Nr(0), (domain << 16) + (bus << 8) + (slot << 3) + func))
        }
        // "nct6775.656", "coretemp.0"
        "platform" | "of_platform" | "isa" => {
            let addr = dev_name
                .rsplit_once('.')
                .and_then(|(_, n)| n.parse().ok())
                .unwrap_or(0);
            Some((BusType::Isa, BusNumber::Nr(0), addr))
        }
        "acpi" => Some((BusType::Acpi, BusNumber::Nr(0), 0)),
        // "0003:046D:C52B.0004"
        "hid" => {
            let mut parts = dev_name.split(':');
            let bus = u16::from_str_radix(parts.next()?, 16).ok()?;
            let (_, id) = parts.nth(1)?.split_once('.')?;
            Some((BusType::Hid, BusNumber::Nr(bus), u32::from_str_radix(id, 16).ok()?))
        }
        _ => None,
    }
}

/// Split an attribute file name into feature type, index and subfeature kind.
fn parse_attribute(fname: &str) -> Option<(FeatureType, u32, SubfeatureKind)> {
    if fname == "beep_enable" {
        return Some((FeatureType::BeepEnable, 0, SubfeatureKind::BeepEnable));
    }
    let (head, suffix) = fname.split_once('_')?;
    let digits = head.find(|c: char| c.is_ascii_digit())?;
    let (prefix, index) = head.split_at(digits);
    let index = index.parse().ok()?;
    let feature_type = FeatureType::from_sysfs_prefix(prefix)?;
    let kind = SubfeatureKind::from_suffix(feature_type, suffix)?;
    Some((feature_type, index, kind))
}

fn feature_name(feature_type: FeatureType, index: u32) -> String {
    match feature_type {
        FeatureType::Vid => format!("cpu{}_vid", index),
        FeatureType::BeepEnable => "beep_enable".to_string(),
        other => format!("{}{}", other.sysfs_prefix(), index),
    }
}

fn scan_layout(chip: &ChipName, dir: &Path) -> Result<ChipLayout> {
    let attr_dir = attr_dir(dir);
    let entries = fs::read_dir(&attr_dir).map_err(|e| SensorsError::discovery(chip, e))?;

    let mut grouped: BTreeMap<(FeatureType, u32), Vec<(SubfeatureKind, String, SubfeatureFlags)>> =
        BTreeMap::new();
    for ent in entries.flatten() {
        let fname = ent.file_name().to_string_lossy().into_owned();
        let Some((feature_type, index, kind)) = parse_attribute(&fname) else { continue };
        let mode = match ent.metadata() {
            Ok(meta) if meta.is_file() => meta.permissions().mode(),
            _ => continue,
        };
        let flags = SubfeatureFlags {
            readable: mode & 0o400 != 0,
            writable: mode & 0o200 != 0,
            compute_mapping: !kind.is_flag_like(),
        };
        grouped.entry((feature_type, index)).or_default().push((kind, fname, flags));
    }

    let mut features = Vec::with_capacity(grouped.len());
    let mut next_subfeature = 0u32;
    for (feature_number, ((feature_type, index), mut subs)) in grouped.into_iter().enumerate() {
        let feature_number = feature_number as u32;
        subs.sort_by_key(|(kind, _, _)| kind.order());
        let feature = Feature::new(
            chip.clone(),
            feature_name(feature_type, index),
            feature_number,
            feature_type,
        );
        let subfeatures = subs
            .into_iter()
            .map(|(kind, fname, flags)| {
                let number = next_subfeature;
                next_subfeature += 1;
                LayoutSubfeature {
                    path: attr_dir.join(&fname),
                    subfeature: Subfeature::new(fname, number, kind, feature_number, flags),
                }
            })
            .collect();
        features.push(LayoutFeature { feature, subfeatures });
    }

    Ok(ChipLayout { attr_dir, features })
}

fn read_trimmed<P: AsRef<Path>>(p: P) -> io::Result<String> {
    let mut s = String::new();
    fs::File::open(p)?.read_to_string(&mut s)?;
    Ok(s.trim().to_string())
}

pub fn extract_index(fname: &str, prefix: &str, suffix: &str) -> Option<usize> {
    if fname.starts_with(prefix) && fname.ends_with(suffix) && fname.len() >= prefix.len() + suffix.len() {
        let mid = &fname[prefix.len()..fname.len() - suffix.len()];
        mid.parse().ok()
    } else {
        None
    }
}
