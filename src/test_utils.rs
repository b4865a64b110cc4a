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

#[cfg(test)]
pub mod test_helpers {
    use crate::backend::{MockBackend, MockValue};
    use crate::topology::{BusNumber, BusType, ChipName, FeatureType, SubfeatureKind};

    pub fn coretemp_chip() -> ChipName {
        ChipName::new("coretemp", BusType::Isa, BusNumber::Nr(0), 0, None)
    }

    pub fn nct6775_chip() -> ChipName {
        ChipName::new("nct6775", BusType::Isa, BusNumber::Nr(0), 0x290, None)
    }

    /// Two ISA chips laid out like a typical desktop board:
    ///
    /// ```text
    /// coretemp-isa-0000
    ///   Package id 0   temp1_input 42.0, temp1_max 80.0, temp1_crit_alarm 0
    ///   Core 0         temp2_input 39.5
    /// nct6775-isa-0290
    ///   CPU fan        fan1_input 1200, fan1_min 300
    ///   Vcore          in0_input 0.9
    /// ```
    pub fn create_mock_board() -> MockBackend {
        let backend = MockBackend::new();
        backend.set_adapter_name(BusType::Isa, BusNumber::Nr(0), "ISA adapter");

        let c = coretemp_chip();
        backend.add_chip(c.clone());
        backend.add_feature(&c, "temp1", FeatureType::Temperature, Some("Package id 0"));
        backend.add_subfeature(&c, "temp1", "temp1_input", SubfeatureKind::TempInput, MockValue::Value(42.0));
        backend.add_subfeature(&c, "temp1", "temp1_max", SubfeatureKind::TempMax, MockValue::Value(80.0));
        backend.add_subfeature(&c, "temp1", "temp1_crit_alarm", SubfeatureKind::TempCritAlarm, MockValue::Value(0.0));
        backend.add_feature(&c, "temp2", FeatureType::Temperature, Some("Core 0"));
        backend.add_subfeature(&c, "temp2", "temp2_input", SubfeatureKind::TempInput, MockValue::Value(39.5));

        let n = nct6775_chip();
        backend.add_chip(n.clone());
        backend.add_feature(&n, "fan1", FeatureType::Fan, Some("CPU fan"));
        backend.add_subfeature(&n, "fan1", "fan1_input", SubfeatureKind::FanInput, MockValue::Value(1200.0));
        backend.add_subfeature(&n, "fan1", "fan1_min", SubfeatureKind::FanMin, MockValue::Value(300.0));
        backend.add_feature(&n, "in0", FeatureType::Voltage, Some("Vcore"));
        backend.add_subfeature(&n, "in0", "in0_input", SubfeatureKind::InInput, MockValue::Value(0.9));

        backend
    }
}
