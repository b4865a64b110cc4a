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

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::SensorsError;

/// Bus a chip sits on. `Any` only appears in patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BusType {
    #[default]
    Any,
    Isa,
    I2c,
    Pci,
    Spi,
    Virtual,
    Acpi,
    Hid,
}

impl BusType {
    pub fn keyword(&self) -> &'static str {
        match self {
            BusType::Any => "*",
            BusType::Isa => "isa",
            BusType::I2c => "i2c",
            BusType::Pci => "pci",
            BusType::Spi => "spi",
            BusType::Virtual => "virtual",
            BusType::Acpi => "acpi",
            BusType::Hid => "hid",
        }
    }

    pub fn from_keyword(s: &str) -> Option<Self> {
        match s {
            "*" => Some(BusType::Any),
            "isa" => Some(BusType::Isa),
            "i2c" => Some(BusType::I2c),
            "pci" => Some(BusType::Pci),
            "spi" => Some(BusType::Spi),
            "virtual" => Some(BusType::Virtual),
            "acpi" => Some(BusType::Acpi),
            "hid" => Some(BusType::Hid),
            _ => None,
        }
    }

    /// Buses whose chip names carry a bus number (`prefix-i2c-NR-ADDR`).
    pub fn has_bus_number(&self) -> bool {
        matches!(self, BusType::I2c | BusType::Spi | BusType::Hid)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BusNumber {
    #[default]
    Any,
    Nr(u16),
}

impl BusNumber {
    fn is_wildcard(&self) -> bool {
        !matches!(self, BusNumber::Nr(_))
    }
}

impl fmt::Display for BusNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusNumber::Nr(n) => write!(f, "{}", n),
            BusNumber::Any => write!(f, "*"),
        }
    }
}

/// Identity of one sensor chip. Two names are the same chip iff all five
/// fields are equal; wildcard fields (`None`, `Any`) turn a name into a
/// pattern usable with [`ChipName::matches`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Default)]
pub struct ChipName {
    prefix: Option<String>,
    bus_type: BusType,
    bus_nr: BusNumber,
    addr: Option<u32>,
    path: Option<String>,
}

impl ChipName {
    /// A fully specified chip.
    pub fn new(
        prefix: impl Into<String>,
        bus_type: BusType,
        bus_nr: BusNumber,
        addr: u32,
        path: Option<String>,
    ) -> Self {
        Self {
            prefix: Some(prefix.into()),
            bus_type,
            bus_nr,
            addr: Some(addr),
            path,
        }
    }

    pub fn from_parts(
        prefix: Option<String>,
        bus_type: BusType,
        bus_nr: BusNumber,
        addr: Option<u32>,
        path: Option<String>,
    ) -> Self {
        Self { prefix, bus_type, bus_nr, addr, path }
    }

    /// Pattern matching every chip.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn bus_type(&self) -> BusType {
        self.bus_type
    }

    pub fn bus_nr(&self) -> BusNumber {
        self.bus_nr
    }

    pub fn addr(&self) -> Option<u32> {
        self.addr
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn is_wildcard(&self) -> bool {
        self.prefix.is_none()
            || self.bus_type == BusType::Any
            || self.bus_nr.is_wildcard()
            || self.addr.is_none()
    }

    /// True when `self` (a concrete chip) is selected by `pattern`.
    /// The path never takes part in matching.
    pub fn matches(&self, pattern: &ChipName) -> bool {
        if let Some(p) = &pattern.prefix {
            if self.prefix.as_deref() != Some(p.as_str()) {
                return false;
            }
        }
        if pattern.bus_type != BusType::Any && pattern.bus_type != self.bus_type {
            return false;
        }
        if let BusNumber::Nr(n) = pattern.bus_nr {
            if self.bus_nr != BusNumber::Nr(n) {
                return false;
            }
        }
        if let Some(a) = pattern.addr {
            if self.addr != Some(a) {
                return false;
            }
        }
        true
    }

    /// Printed name, refusing wildcards.
    pub fn to_canonical_string(&self) -> Result<String, SensorsError> {
        if self.is_wildcard() {
            return Err(SensorsError::WildcardChipName(self.describe()));
        }
        Ok(self.to_string())
    }

    pub fn describe(&self) -> String {
        format!(
            "ChipName(prefix={}, bus_type={}, bus_nr={}, addr={}, path={})",
            self.prefix.as_deref().unwrap_or("None"),
            self.bus_type.keyword(),
            self.bus_nr,
            self.addr.map(|a| format!("{:#x}", a)).unwrap_or_else(|| "*".to_string()),
            self.path.as_deref().unwrap_or("None"),
        )
    }

    pub fn parse(name: &str) -> Result<Self, SensorsError> {
        name.parse()
    }
}

fn hex_or_any(addr: Option<u32>, width: usize) -> String {
    match addr {
        Some(a) => format!("{:0width$x}", a, width = width),
        None => "*".to_string(),
    }
}

impl fmt::Display for ChipName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = self.prefix.as_deref().unwrap_or("*");
        match self.bus_type {
            BusType::Any => write!(f, "{}-*", prefix),
            BusType::Isa => write!(f, "{}-isa-{}", prefix, hex_or_any(self.addr, 4)),
            BusType::Pci => write!(f, "{}-pci-{}", prefix, hex_or_any(self.addr, 4)),
            BusType::I2c => write!(f, "{}-i2c-{}-{}", prefix, self.bus_nr, hex_or_any(self.addr, 2)),
            BusType::Spi => write!(f, "{}-spi-{}-{}", prefix, self.bus_nr, hex_or_any(self.addr, 0)),
            BusType::Virtual => write!(f, "{}-virtual-{}", prefix, hex_or_any(self.addr, 0)),
            BusType::Acpi => write!(f, "{}-acpi-{}", prefix, hex_or_any(self.addr, 0)),
            BusType::Hid => write!(f, "{}-hid-{}-{}", prefix, self.bus_nr, hex_or_any(self.addr, 0)),
        }
    }
}

impl FromStr for ChipName {
    type Err = SensorsError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let invalid = || SensorsError::InvalidChipName(name.to_string());
        if name.is_empty() {
            return Err(invalid());
        }

        let (prefix_part, rest) = match name.split_once('-') {
            Some((p, r)) => (p, Some(r)),
            None => (name, None),
        };
        if prefix_part.is_empty() {
            return Err(invalid());
        }
        let prefix = if prefix_part == "*" { None } else { Some(prefix_part.to_string()) };

        let Some(rest) = rest else {
            return Ok(Self { prefix, ..Self::default() });
        };

        let mut parts = rest.split('-');
        let bus_type = parts
            .next()
            .and_then(BusType::from_keyword)
            .ok_or_else(invalid)?;

        if bus_type == BusType::Any {
            if parts.next().is_some() {
                return Err(invalid());
            }
            return Ok(Self { prefix, ..Self::default() });
        }

        let bus_nr = if bus_type.has_bus_number() {
            match parts.next() {
                Some("*") => BusNumber::Any,
                Some(nr) => BusNumber::Nr(nr.parse::<u16>().map_err(|_| invalid())?),
                None => return Err(invalid()),
            }
        } else {
            BusNumber::Any
        };

        let addr = match parts.next() {
            Some("*") => None,
            Some(a) if !a.is_empty() => Some(u32::from_str_radix(a, 16).map_err(|_| invalid())?),
            _ => return Err(invalid()),
        };

        if parts.next().is_some() {
            return Err(invalid());
        }

        Ok(Self { prefix, bus_type, bus_nr, addr, path: None })
    }
}
