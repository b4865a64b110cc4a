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

use serde::Serialize;

use super::chip::ChipName;

/// Declaration order is the display order of features on a chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FeatureType {
    Voltage,
    Fan,
    Temperature,
    Power,
    Energy,
    Current,
    Humidity,
    Vid,
    Intrusion,
    BeepEnable,
    #[default]
    Other,
}

impl FeatureType {
    /// Attribute file prefix used by hwmon (`in0_input`, `fan1_input`, ...).
    pub fn sysfs_prefix(&self) -> &'static str {
        match self {
            FeatureType::Voltage => "in",
            FeatureType::Fan => "fan",
            FeatureType::Temperature => "temp",
            FeatureType::Power => "power",
            FeatureType::Energy => "energy",
            FeatureType::Current => "curr",
            FeatureType::Humidity => "humidity",
            FeatureType::Vid => "cpu",
            FeatureType::Intrusion => "intrusion",
            FeatureType::BeepEnable => "beep_enable",
            FeatureType::Other => "",
        }
    }

    pub fn from_sysfs_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "in" => Some(FeatureType::Voltage),
            "fan" => Some(FeatureType::Fan),
            "temp" => Some(FeatureType::Temperature),
            "power" => Some(FeatureType::Power),
            "energy" => Some(FeatureType::Energy),
            "curr" => Some(FeatureType::Current),
            "humidity" => Some(FeatureType::Humidity),
            "cpu" => Some(FeatureType::Vid),
            "intrusion" => Some(FeatureType::Intrusion),
            _ => None,
        }
    }
}

/// One measurement point of a chip, e.g. `temp1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Default)]
pub struct Feature {
    #[serde(skip)]
    pub chip: ChipName,
    pub name: String,
    pub number: u32,
    pub kind: FeatureType,
}

impl Feature {
    pub fn new(chip: ChipName, name: impl Into<String>, number: u32, kind: FeatureType) -> Self {
        Self { chip, name: name.into(), number, kind }
    }

    pub fn describe(&self) -> String {
        format!("Feature(name={}, number={}, type={:?})", self.name, self.number, self.kind)
    }
}

/// What a subfeature measures. `SUBFEATURE_TABLE` fixes the ordering of
/// subfeatures within a feature and their sysfs suffixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubfeatureKind {
    InInput,
    InMin,
    InMax,
    InLcrit,
    InCrit,
    InAverage,
    InLowest,
    InHighest,
    InAlarm,
    InMinAlarm,
    InMaxAlarm,
    InBeep,
    InLcritAlarm,
    InCritAlarm,

    FanInput,
    FanMin,
    FanMax,
    FanAlarm,
    FanFault,
    FanDiv,
    FanBeep,
    FanPulses,
    FanMinAlarm,
    FanMaxAlarm,

    TempInput,
    TempMax,
    TempMaxHyst,
    TempMin,
    TempCrit,
    TempCritHyst,
    TempLcrit,
    TempEmergency,
    TempEmergencyHyst,
    TempLowest,
    TempHighest,
    TempMinHyst,
    TempLcritHyst,
    TempAlarm,
    TempMaxAlarm,
    TempMinAlarm,
    TempCritAlarm,
    TempFault,
    TempType,
    TempOffset,
    TempBeep,
    TempEmergencyAlarm,
    TempLcritAlarm,

    PowerAverage,
    PowerAverageHighest,
    PowerAverageLowest,
    PowerInput,
    PowerInputHighest,
    PowerInputLowest,
    PowerCap,
    PowerCapHyst,
    PowerMax,
    PowerCrit,
    PowerAverageInterval,
    PowerAlarm,
    PowerCapAlarm,
    PowerMaxAlarm,
    PowerCritAlarm,

    EnergyInput,

    CurrInput,
    CurrMin,
    CurrMax,
    CurrLcrit,
    CurrCrit,
    CurrAverage,
    CurrLowest,
    CurrHighest,
    CurrAlarm,
    CurrMinAlarm,
    CurrMaxAlarm,
    CurrBeep,
    CurrLcritAlarm,
    CurrCritAlarm,

    HumidityInput,

    Vid,

    IntrusionAlarm,
    IntrusionBeep,

    BeepEnable,

    #[default]
    Unknown,
}

use SubfeatureKind as K;

/// (kind, feature type, sysfs suffix). Order matters: it is the order in
/// which subfeatures of one feature are enumerated.
pub const SUBFEATURE_TABLE: &[(SubfeatureKind, FeatureType, &str)] = &[
    (K::InInput, FeatureType::Voltage, "input"),
    (K::InMin, FeatureType::Voltage, "min"),
    (K::InMax, FeatureType::Voltage, "max"),
    (K::InLcrit, FeatureType::Voltage, "lcrit"),
    (K::InCrit, FeatureType::Voltage, "crit"),
    (K::InAverage, FeatureType::Voltage, "average"),
    (K::InLowest, FeatureType::Voltage, "lowest"),
    (K::InHighest, FeatureType::Voltage, "highest"),
    (K::InAlarm, FeatureType::Voltage, "alarm"),
    (K::InMinAlarm, FeatureType::Voltage, "min_alarm"),
    (K::InMaxAlarm, FeatureType::Voltage, "max_alarm"),
    (K::InBeep, FeatureType::Voltage, "beep"),
    (K::InLcritAlarm, FeatureType::Voltage, "lcrit_alarm"),
    (K::InCritAlarm, FeatureType::Voltage, "crit_alarm"),
    (K::FanInput, FeatureType::Fan, "input"),
    (K::FanMin, FeatureType::Fan, "min"),
    (K::FanMax, FeatureType::Fan, "max"),
    (K::FanAlarm, FeatureType::Fan, "alarm"),
    (K::FanFault, FeatureType::Fan, "fault"),
    (K::FanDiv, FeatureType::Fan, "div"),
    (K::FanBeep, FeatureType::Fan, "beep"),
    (K::FanPulses, FeatureType::Fan, "pulses"),
    (K::FanMinAlarm, FeatureType::Fan, "min_alarm"),
    (K::FanMaxAlarm, FeatureType::Fan, "max_alarm"),
    (K::TempInput, FeatureType::Temperature, "input"),
    (K::TempMax, FeatureType::Temperature, "max"),
    (K::TempMaxHyst, FeatureType::Temperature, "max_hyst"),
    (K::TempMin, FeatureType::Temperature, "min"),
    (K::TempCrit, FeatureType::Temperature, "crit"),
    (K::TempCritHyst, FeatureType::Temperature, "crit_hyst"),
    (K::TempLcrit, FeatureType::Temperature, "lcrit"),
    (K::TempEmergency, FeatureType::Temperature, "emergency"),
    (K::TempEmergencyHyst, FeatureType::Temperature, "emergency_hyst"),
    (K::TempLowest, FeatureType::Temperature, "lowest"),
    (K::TempHighest, FeatureType::Temperature, "highest"),
    (K::TempMinHyst, FeatureType::Temperature, "min_hyst"),
    (K::TempLcritHyst, FeatureType::Temperature, "lcrit_hyst"),
    (K::TempAlarm, FeatureType::Temperature, "alarm"),
    (K::TempMaxAlarm, FeatureType::Temperature, "max_alarm"),
    (K::TempMinAlarm, FeatureType::Temperature, "min_alarm"),
    (K::TempCritAlarm, FeatureType::Temperature, "crit_alarm"),
    (K::TempFault, FeatureType::Temperature, "fault"),
    (K::TempType, FeatureType::Temperature, "type"),
    (K::TempOffset, FeatureType::Temperature, "offset"),
    (K::TempBeep, FeatureType::Temperature, "beep"),
    (K::TempEmergencyAlarm, FeatureType::Temperature, "emergency_alarm"),
    (K::TempLcritAlarm, FeatureType::Temperature, "lcrit_alarm"),
    (K::PowerAverage, FeatureType::Power, "average"),
    (K::PowerAverageHighest, FeatureType::Power, "average_highest"),
    (K::PowerAverageLowest, FeatureType::Power, "average_lowest"),
    (K::PowerInput, FeatureType::Power, "input"),
    (K::PowerInputHighest, FeatureType::Power, "input_highest"),
    (K::PowerInputLowest, FeatureType::Power, "input_lowest"),
    (K::PowerCap, FeatureType::Power, "cap"),
    (K::PowerCapHyst, FeatureType::Power, "cap_hyst"),
    (K::PowerMax, FeatureType::Power, "max"),
    (K::PowerCrit, FeatureType::Power, "crit"),
    (K::PowerAverageInterval, FeatureType::Power, "average_interval"),
    (K::PowerAlarm, FeatureType::Power, "alarm"),
    (K::PowerCapAlarm, FeatureType::Power, "cap_alarm"),
    (K::PowerMaxAlarm, FeatureType::Power, "max_alarm"),
    (K::PowerCritAlarm, FeatureType::Power, "crit_alarm"),
    (K::EnergyInput, FeatureType::Energy, "input"),
    (K::CurrInput, FeatureType::Current, "input"),
    (K::CurrMin, FeatureType::Current, "min"),
    (K::CurrMax, FeatureType::Current, "max"),
    (K::CurrLcrit, FeatureType::Current, "lcrit"),
    (K::CurrCrit, FeatureType::Current, "crit"),
    (K::CurrAverage, FeatureType::Current, "average"),
    (K::CurrLowest, FeatureType::Current, "lowest"),
    (K::CurrHighest, FeatureType::Current, "highest"),
    (K::CurrAlarm, FeatureType::Current, "alarm"),
    (K::CurrMinAlarm, FeatureType::Current, "min_alarm"),
    (K::CurrMaxAlarm, FeatureType::Current, "max_alarm"),
    (K::CurrBeep, FeatureType::Current, "beep"),
    (K::CurrLcritAlarm, FeatureType::Current, "lcrit_alarm"),
    (K::CurrCritAlarm, FeatureType::Current, "crit_alarm"),
    (K::HumidityInput, FeatureType::Humidity, "input"),
    (K::Vid, FeatureType::Vid, "vid"),
    (K::IntrusionAlarm, FeatureType::Intrusion, "alarm"),
    (K::IntrusionBeep, FeatureType::Intrusion, "beep"),
    (K::BeepEnable, FeatureType::BeepEnable, ""),
];

impl SubfeatureKind {
    pub fn from_suffix(feature: FeatureType, suffix: &str) -> Option<Self> {
        SUBFEATURE_TABLE
            .iter()
            .find(|(_, ft, sfx)| *ft == feature && *sfx == suffix)
            .map(|(kind, _, _)| *kind)
    }

    fn entry(&self) -> Option<&'static (SubfeatureKind, FeatureType, &'static str)> {
        SUBFEATURE_TABLE.iter().find(|(kind, _, _)| kind == self)
    }

    pub fn feature_type(&self) -> FeatureType {
        self.entry().map(|(_, ft, _)| *ft).unwrap_or(FeatureType::Other)
    }

    pub fn suffix(&self) -> &'static str {
        self.entry().map(|(_, _, sfx)| *sfx).unwrap_or("")
    }

    /// Position in `SUBFEATURE_TABLE`; unknown kinds sort last.
    pub fn order(&self) -> usize {
        SUBFEATURE_TABLE
            .iter()
            .position(|(kind, _, _)| kind == self)
            .unwrap_or(SUBFEATURE_TABLE.len())
    }

    /// Alarm, beep, fault and similar 0/1 or enumerated values.
    pub fn is_flag_like(&self) -> bool {
        let sfx = self.suffix();
        sfx.ends_with("alarm")
            || sfx == "beep"
            || sfx == "fault"
            || sfx == "div"
            || sfx == "pulses"
            || sfx == "type"
            || matches!(self, K::BeepEnable | K::Unknown)
    }

    /// Divisor turning the raw sysfs integer into the displayed unit.
    pub fn scale(&self) -> f64 {
        if self.is_flag_like() {
            return 1.0;
        }
        match self.feature_type() {
            FeatureType::Fan => 1.0,
            FeatureType::Power if *self == K::PowerAverageInterval => 1000.0,
            FeatureType::Power | FeatureType::Energy => 1_000_000.0,
            _ => 1000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
pub struct SubfeatureFlags {
    pub readable: bool,
    pub writable: bool,
    pub compute_mapping: bool,
}

impl SubfeatureFlags {
    pub const MODE_R: u32 = 0x1;
    pub const MODE_W: u32 = 0x2;
    pub const COMPUTE_MAPPING: u32 = 0x4;

    pub fn bits(&self) -> u32 {
        let mut bits = 0;
        if self.readable {
            bits |= Self::MODE_R;
        }
        if self.writable {
            bits |= Self::MODE_W;
        }
        if self.compute_mapping {
            bits |= Self::COMPUTE_MAPPING;
        }
        bits
    }

    pub fn from_bits(bits: u32) -> Self {
        Self {
            readable: bits & Self::MODE_R != 0,
            writable: bits & Self::MODE_W != 0,
            compute_mapping: bits & Self::COMPUTE_MAPPING != 0,
        }
    }
}

/// Handle on one readable quantity. The value lives in the backend and is
/// fetched through `number`; `mapping` is the owning feature's number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Default)]
pub struct Subfeature {
    pub name: String,
    pub number: u32,
    pub kind: SubfeatureKind,
    pub mapping: u32,
    pub flags: SubfeatureFlags,
}

impl Subfeature {
    pub fn new(
        name: impl Into<String>,
        number: u32,
        kind: SubfeatureKind,
        mapping: u32,
        flags: SubfeatureFlags,
    ) -> Self {
        Self { name: name.into(), number, kind, mapping, flags }
    }

    pub fn describe(&self) -> String {
        format!(
            "Subfeature(name={}, number={}, type={:?}, mapping={}, flags={})",
            self.name,
            self.number,
            self.kind,
            self.mapping,
            self.flags.bits()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::chip::{BusNumber, BusType};

    #[test]
    fn test_default_values_compare_equal() {
        assert_eq!(Feature::default(), Feature::default());
        assert_eq!(Subfeature::default(), Subfeature::default());
        assert_eq!(Feature::default().kind, FeatureType::Other);
        assert_eq!(Subfeature::default().kind, SubfeatureKind::Unknown);
    }

    #[test]
    fn test_feature_equality_includes_chip() {
        let a = ChipName::new("coretemp", BusType::Isa, BusNumber::Nr(0), 0, None);
        let b = ChipName::new("k10temp", BusType::Pci, BusNumber::Nr(0), 0xc3, None);
        let fa = Feature::new(a.clone(), "temp1", 0, FeatureType::Temperature);
        assert_eq!(fa, Feature::new(a, "temp1", 0, FeatureType::Temperature));
        assert_ne!(fa, Feature::new(b, "temp1", 0, FeatureType::Temperature));
    }

    #[test]
    fn test_suffix_lookup() {
        assert_eq!(SubfeatureKind::from_suffix(FeatureType::Temperature, "input"), Some(K::TempInput));
        assert_eq!(SubfeatureKind::from_suffix(FeatureType::Fan, "min"), Some(K::FanMin));
        assert_eq!(SubfeatureKind::from_suffix(FeatureType::Voltage, "crit_alarm"), Some(K::InCritAlarm));
        assert_eq!(SubfeatureKind::from_suffix(FeatureType::Fan, "max_hyst"), None);
        assert_eq!(K::CurrMax.feature_type(), FeatureType::Current);
        assert_eq!(K::PowerCap.suffix(), "cap");
        assert_eq!(K::Unknown.feature_type(), FeatureType::Other);
    }

    #[test]
    fn test_scale() {
        assert_eq!(K::TempInput.scale(), 1000.0);
        assert_eq!(K::InInput.scale(), 1000.0);
        assert_eq!(K::FanInput.scale(), 1.0);
        assert_eq!(K::PowerAverage.scale(), 1_000_000.0);
        assert_eq!(K::EnergyInput.scale(), 1_000_000.0);
        assert_eq!(K::PowerAverageInterval.scale(), 1000.0);
        assert_eq!(K::TempCritAlarm.scale(), 1.0);
        assert_eq!(K::FanDiv.scale(), 1.0);
        assert_eq!(K::TempType.scale(), 1.0);
    }

    #[test]
    fn test_ordering_input_first() {
        assert!(K::TempInput.order() < K::TempMax.order());
        assert!(K::TempMax.order() < K::TempCritAlarm.order());
        assert!(K::Unknown.order() > K::BeepEnable.order());
        assert!(FeatureType::Voltage < FeatureType::Fan);
        assert!(FeatureType::Fan < FeatureType::Temperature);
    }

    #[test]
    fn test_flags_bits() {
        let flags = SubfeatureFlags { readable: true, writable: false, compute_mapping: true };
        assert_eq!(flags.bits(), 0x5);
        assert_eq!(SubfeatureFlags::from_bits(0x5), flags);
        assert_eq!(SubfeatureFlags::default().bits(), 0);
    }

    #[test]
    fn test_describe() {
        let s = Subfeature::new(
            "temp1_input",
            0,
            K::TempInput,
            0,
            SubfeatureFlags { readable: true, writable: false, compute_mapping: true },
        );
        assert_eq!(s.describe(), "Subfeature(name=temp1_input, number=0, type=TempInput, mapping=0, flags=5)");
        let f = Feature::new(ChipName::any(), "fan2", 3, FeatureType::Fan);
        assert_eq!(f.describe(), "Feature(name=fan2, number=3, type=Fan)");
    }
}
