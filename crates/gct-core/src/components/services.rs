//! Service components: reserves, interfaces, emissions, membership maps.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::components::{
    impl_component, EmissionType, ExtValue, MinMax, ReserveDirection, ReserveType,
};
use crate::units::Quantity;

/// Operating-reserve product for a region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reserve {
    pub name: String,
    pub category: Option<String>,
    pub available: bool,
    pub uuid: Uuid,
    pub ext: BTreeMap<String, ExtValue>,
    pub region: Option<String>,
    pub reserve_type: ReserveType,
    pub direction: ReserveDirection,
    /// Response window, seconds.
    pub time_frame: Option<f64>,
    /// Sustain duration, hours.
    pub duration: Option<f64>,
    /// Value of reserve shortage, usd/MWh.
    pub vors: Option<f64>,
    pub max_requirement: Option<Quantity>,
}

impl Reserve {
    pub fn new(
        name: impl Into<String>,
        reserve_type: ReserveType,
        direction: ReserveDirection,
    ) -> Self {
        Self {
            name: name.into(),
            category: None,
            available: true,
            uuid: Uuid::new_v4(),
            ext: BTreeMap::new(),
            region: None,
            reserve_type,
            direction,
            time_frame: None,
            duration: None,
            vors: None,
            max_requirement: None,
        }
    }
}

impl_component!(Reserve, "Reserve");

/// Flow-limited corridor over a set of member lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransmissionInterface {
    pub name: String,
    pub category: Option<String>,
    pub available: bool,
    pub uuid: Uuid,
    pub ext: BTreeMap<String, ExtValue>,
    pub active_power_flow_limits: MinMax,
    pub ramp_up: Option<Quantity>,
    pub ramp_down: Option<Quantity>,
}

impl TransmissionInterface {
    pub fn new(name: impl Into<String>, flow_limits: MinMax) -> Self {
        Self {
            name: name.into(),
            category: None,
            available: true,
            uuid: Uuid::new_v4(),
            ext: BTreeMap::new(),
            active_power_flow_limits: flow_limits,
            ramp_up: None,
            ramp_down: None,
        }
    }
}

impl_component!(TransmissionInterface, "TransmissionInterface");

/// Emission rate attached to a named generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Emission {
    pub name: String,
    pub category: Option<String>,
    pub available: bool,
    pub uuid: Uuid,
    pub ext: BTreeMap<String, ExtValue>,
    pub emission_type: EmissionType,
    pub generator_name: String,
    /// kg per MWh generated.
    pub rate: Quantity,
}

impl Emission {
    pub fn new(
        generator_name: impl Into<String>,
        emission_type: EmissionType,
        rate: Quantity,
    ) -> Self {
        let generator_name = generator_name.into();
        Self {
            name: format!("{generator_name}_{emission_type}"),
            category: None,
            available: true,
            uuid: Uuid::new_v4(),
            ext: BTreeMap::new(),
            emission_type,
            generator_name,
            rate,
        }
    }
}

impl_component!(Emission, "Emission");

/// Reserve name -> member generator names. BTreeMap keeps exported
/// membership tables deterministic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReserveMap {
    pub name: String,
    pub category: Option<String>,
    pub available: bool,
    pub uuid: Uuid,
    pub ext: BTreeMap<String, ExtValue>,
    pub mapping: BTreeMap<String, Vec<String>>,
}

impl ReserveMap {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: None,
            available: true,
            uuid: Uuid::new_v4(),
            ext: BTreeMap::new(),
            mapping: BTreeMap::new(),
        }
    }

    /// Add a member, skipping duplicates.
    pub fn add_member(&mut self, reserve: &str, member: &str) {
        let members = self.mapping.entry(reserve.to_string()).or_default();
        if !members.iter().any(|m| m == member) {
            members.push(member.to_string());
        }
    }
}

impl_component!(ReserveMap, "ReserveMap");

/// Interface name -> member line names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransmissionInterfaceMap {
    pub name: String,
    pub category: Option<String>,
    pub available: bool,
    pub uuid: Uuid,
    pub ext: BTreeMap<String, ExtValue>,
    pub mapping: BTreeMap<String, Vec<String>>,
}

impl TransmissionInterfaceMap {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: None,
            available: true,
            uuid: Uuid::new_v4(),
            ext: BTreeMap::new(),
            mapping: BTreeMap::new(),
        }
    }

    pub fn add_member(&mut self, interface: &str, line: &str) {
        let members = self.mapping.entry(interface.to_string()).or_default();
        if !members.iter().any(|m| m == line) {
            members.push(line.to_string());
        }
    }

    /// Interface a line belongs to, if any. A line is a member of at most
    /// one interface.
    pub fn interface_of(&self, line: &str) -> Option<&str> {
        self.mapping
            .iter()
            .find(|(_, members)| members.iter().any(|m| m == line))
            .map(|(name, _)| name.as_str())
    }
}

impl_component!(TransmissionInterfaceMap, "TransmissionInterfaceMap");
