//! Typed component model for translated systems.
//!
//! Every concrete component carries the same identity block (name, optional
//! category, availability flag, uuid, open-ended `ext` map) and implements
//! [`Component`]. Cross-references between components are by name, matching
//! how source models address objects; the [`crate::system::System`] container
//! validates those names on load.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod branch;
pub mod enums;
pub mod generator;
pub mod services;
pub mod topology;

pub use branch::{DCLine, MonitoredLine, Transformer2W};
pub use enums::{
    BusType, EmissionType, Fuel, GeneratorFamily, PrimeMover, ReserveDirection, ReserveType,
};
pub use generator::{Generator, OperatingCost};
pub use services::{
    Emission, Reserve, ReserveMap, TransmissionInterface, TransmissionInterfaceMap,
};
pub use topology::{ACBus, Area, LoadZone, PowerLoad};

/// Primitive value stored in a component's `ext` map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl From<&str> for ExtValue {
    fn from(v: &str) -> Self {
        ExtValue::Str(v.to_string())
    }
}
impl From<String> for ExtValue {
    fn from(v: String) -> Self {
        ExtValue::Str(v)
    }
}
impl From<i64> for ExtValue {
    fn from(v: i64) -> Self {
        ExtValue::Int(v)
    }
}
impl From<f64> for ExtValue {
    fn from(v: f64) -> Self {
        ExtValue::Float(v)
    }
}
impl From<bool> for ExtValue {
    fn from(v: bool) -> Self {
        ExtValue::Bool(v)
    }
}

impl ExtValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ExtValue::Float(v) => Some(*v),
            ExtValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ExtValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// Inclusive numeric bounds, used for power limits and interface flows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMax {
    pub min: f64,
    pub max: f64,
}

impl MinMax {
    /// Bounds with the ordering and finiteness invariants checked.
    pub fn new(min: f64, max: f64) -> crate::GctResult<Self> {
        if !min.is_finite() || !max.is_finite() {
            return Err(crate::GctError::Validation(format!(
                "non-finite bounds [{min}, {max}]"
            )));
        }
        if min > max {
            return Err(crate::GctError::Validation(format!(
                "min {min} exceeds max {max}"
            )));
        }
        Ok(Self { min, max })
    }

    /// Symmetric bounds around zero.
    pub fn symmetric(limit: f64) -> Self {
        Self {
            min: -limit.abs(),
            max: limit.abs(),
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Shared identity block common to every component.
pub trait Component {
    fn name(&self) -> &str;
    fn category(&self) -> Option<&str>;
    fn available(&self) -> bool;
    fn uuid(&self) -> Uuid;
    fn ext(&self) -> &BTreeMap<String, ExtValue>;
    fn ext_mut(&mut self) -> &mut BTreeMap<String, ExtValue>;
    /// Static discriminator used as half of the System key.
    fn component_type(&self) -> &'static str;
}

/// Implement [`Component`] for a struct carrying the standard identity
/// fields (`name`, `category`, `available`, `uuid`, `ext`).
macro_rules! impl_component {
    ($ty:ty, $type_name:literal) => {
        impl crate::components::Component for $ty {
            fn name(&self) -> &str {
                &self.name
            }
            fn category(&self) -> Option<&str> {
                self.category.as_deref()
            }
            fn available(&self) -> bool {
                self.available
            }
            fn uuid(&self) -> uuid::Uuid {
                self.uuid
            }
            fn ext(&self) -> &std::collections::BTreeMap<String, crate::components::ExtValue> {
                &self.ext
            }
            fn ext_mut(
                &mut self,
            ) -> &mut std::collections::BTreeMap<String, crate::components::ExtValue> {
                &mut self.ext
            }
            fn component_type(&self) -> &'static str {
                $type_name
            }
        }
    };
}
pub(crate) use impl_component;

/// Closed union over every concrete component, so a heterogeneous System
/// can hold them in one map and serde can round-trip them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "component_type")]
pub enum AnyComponent {
    Area(Area),
    LoadZone(LoadZone),
    #[serde(rename = "ACBus")]
    ACBus(ACBus),
    PowerLoad(PowerLoad),
    MonitoredLine(MonitoredLine),
    Transformer2W(Transformer2W),
    #[serde(rename = "DCLine")]
    DCLine(DCLine),
    Generator(Generator),
    Reserve(Reserve),
    TransmissionInterface(TransmissionInterface),
    Emission(Emission),
    ReserveMap(ReserveMap),
    TransmissionInterfaceMap(TransmissionInterfaceMap),
}

macro_rules! dispatch_any {
    ($self:expr, $inner:ident => $body:expr) => {
        match $self {
            AnyComponent::Area($inner) => $body,
            AnyComponent::LoadZone($inner) => $body,
            AnyComponent::ACBus($inner) => $body,
            AnyComponent::PowerLoad($inner) => $body,
            AnyComponent::MonitoredLine($inner) => $body,
            AnyComponent::Transformer2W($inner) => $body,
            AnyComponent::DCLine($inner) => $body,
            AnyComponent::Generator($inner) => $body,
            AnyComponent::Reserve($inner) => $body,
            AnyComponent::TransmissionInterface($inner) => $body,
            AnyComponent::Emission($inner) => $body,
            AnyComponent::ReserveMap($inner) => $body,
            AnyComponent::TransmissionInterfaceMap($inner) => $body,
        }
    };
}

impl AnyComponent {
    pub fn name(&self) -> &str {
        dispatch_any!(self, c => c.name())
    }

    pub fn category(&self) -> Option<&str> {
        dispatch_any!(self, c => c.category())
    }

    pub fn available(&self) -> bool {
        dispatch_any!(self, c => c.available())
    }

    pub fn uuid(&self) -> Uuid {
        dispatch_any!(self, c => c.uuid())
    }

    pub fn component_type(&self) -> &'static str {
        dispatch_any!(self, c => c.component_type())
    }

    pub fn ext(&self) -> &BTreeMap<String, ExtValue> {
        dispatch_any!(self, c => c.ext())
    }

    pub fn ext_mut(&mut self) -> &mut BTreeMap<String, ExtValue> {
        dispatch_any!(self, c => c.ext_mut())
    }

    /// Rename and reissue identity, for explicit component copies.
    pub(crate) fn reissue(&mut self, new_name: String) {
        dispatch_any!(self, c => {
            c.name = new_name;
            c.uuid = Uuid::new_v4();
        })
    }
}

macro_rules! impl_into_any {
    ($ty:ty, $variant:ident) => {
        impl From<$ty> for AnyComponent {
            fn from(c: $ty) -> Self {
                AnyComponent::$variant(c)
            }
        }
    };
}

impl_into_any!(Area, Area);
impl_into_any!(LoadZone, LoadZone);
impl_into_any!(ACBus, ACBus);
impl_into_any!(PowerLoad, PowerLoad);
impl_into_any!(MonitoredLine, MonitoredLine);
impl_into_any!(Transformer2W, Transformer2W);
impl_into_any!(DCLine, DCLine);
impl_into_any!(Generator, Generator);
impl_into_any!(Reserve, Reserve);
impl_into_any!(TransmissionInterface, TransmissionInterface);
impl_into_any!(Emission, Emission);
impl_into_any!(ReserveMap, ReserveMap);
impl_into_any!(TransmissionInterfaceMap, TransmissionInterfaceMap);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minmax_ordering_enforced() {
        assert!(MinMax::new(0.0, 10.0).is_ok());
        assert!(MinMax::new(5.0, 1.0).is_err());
    }

    #[test]
    fn test_minmax_rejects_non_finite_bounds() {
        assert!(MinMax::new(f64::NEG_INFINITY, 10.0).is_err());
        assert!(MinMax::new(0.0, f64::INFINITY).is_err());
        assert!(MinMax::new(f64::NAN, 1.0).is_err());
    }

    #[test]
    fn test_minmax_symmetric() {
        let m = MinMax::symmetric(-30.0);
        assert_eq!(m.min, -30.0);
        assert_eq!(m.max, 30.0);
        assert!(m.contains(0.0));
        assert!(!m.contains(31.0));
    }

    #[test]
    fn test_ext_value_coercions() {
        assert_eq!(ExtValue::Int(3).as_f64(), Some(3.0));
        assert_eq!(ExtValue::Float(2.5).as_f64(), Some(2.5));
        assert_eq!(ExtValue::from("x").as_str(), Some("x"));
        assert_eq!(ExtValue::Bool(true).as_f64(), None);
    }

    #[test]
    fn test_any_component_dispatch() {
        let area = Area::new("west");
        let any: AnyComponent = area.into();
        assert_eq!(any.name(), "west");
        assert_eq!(any.component_type(), "Area");
        assert!(any.available());
    }
}
