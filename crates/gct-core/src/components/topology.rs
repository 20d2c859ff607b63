//! Topology components: areas, load zones, buses, loads.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::components::{impl_component, BusType, ExtValue};
use crate::units::Quantity;

/// Aggregation region above load zones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Area {
    pub name: String,
    pub category: Option<String>,
    pub available: bool,
    pub uuid: Uuid,
    pub ext: BTreeMap<String, ExtValue>,
}

impl Area {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: None,
            available: true,
            uuid: Uuid::new_v4(),
            ext: BTreeMap::new(),
        }
    }
}

impl_component!(Area, "Area");

/// Load aggregation region; the unit load profiles attach to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadZone {
    pub name: String,
    pub category: Option<String>,
    pub available: bool,
    pub uuid: Uuid,
    pub ext: BTreeMap<String, ExtValue>,
}

impl LoadZone {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: None,
            available: true,
            uuid: Uuid::new_v4(),
            ext: BTreeMap::new(),
        }
    }
}

impl_component!(LoadZone, "LoadZone");

/// AC bus. `area` and `load_zone` are component names resolved against
/// the System on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ACBus {
    pub name: String,
    pub category: Option<String>,
    pub available: bool,
    pub uuid: Uuid,
    pub ext: BTreeMap<String, ExtValue>,
    pub id: u64,
    pub area: Option<String>,
    pub load_zone: Option<String>,
    pub base_voltage: Option<Quantity>,
    pub bus_type: BusType,
    /// Voltage magnitude, per-unit.
    pub magnitude: f64,
}

impl ACBus {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: None,
            available: true,
            uuid: Uuid::new_v4(),
            ext: BTreeMap::new(),
            id,
            area: None,
            load_zone: None,
            base_voltage: None,
            bus_type: BusType::PV,
            magnitude: 1.0,
        }
    }

    pub fn with_load_zone(mut self, zone: impl Into<String>) -> Self {
        self.load_zone = Some(zone.into());
        self
    }
}

impl_component!(ACBus, "ACBus");

/// Static peak load at a bus; the hourly shape attaches as a time series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerLoad {
    pub name: String,
    pub category: Option<String>,
    pub available: bool,
    pub uuid: Uuid,
    pub ext: BTreeMap<String, ExtValue>,
    pub bus: String,
    pub max_active_power: Option<Quantity>,
}

impl PowerLoad {
    pub fn new(name: impl Into<String>, bus: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: None,
            available: true,
            uuid: Uuid::new_v4(),
            ext: BTreeMap::new(),
            bus: bus.into(),
            max_active_power: None,
        }
    }
}

impl_component!(PowerLoad, "PowerLoad");

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Component;
    use crate::units::Unit;

    #[test]
    fn test_bus_defaults() {
        let bus = ACBus::new(1, "node-1").with_load_zone("z1");
        assert_eq!(bus.bus_type, BusType::PV);
        assert_eq!(bus.magnitude, 1.0);
        assert_eq!(bus.load_zone.as_deref(), Some("z1"));
        assert_eq!(bus.component_type(), "ACBus");
    }

    #[test]
    fn test_load_carries_quantity() {
        let mut load = PowerLoad::new("load-1", "node-1");
        load.max_active_power = Some(Quantity::new(120.0, Unit::Megawatt).unwrap());
        assert_eq!(load.max_active_power.unwrap().magnitude(), 120.0);
    }
}
