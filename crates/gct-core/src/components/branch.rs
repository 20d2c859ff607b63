//! Branch components: AC lines, two-winding transformers, DC links.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::components::{impl_component, ExtValue};
use crate::units::Quantity;

/// AC transmission line with directional flow ratings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoredLine {
    pub name: String,
    pub category: Option<String>,
    pub available: bool,
    pub uuid: Uuid,
    pub ext: BTreeMap<String, ExtValue>,
    pub from_bus: String,
    pub to_bus: String,
    /// Forward flow limit.
    pub rating_up: Option<Quantity>,
    /// Reverse flow limit (stored positive).
    pub rating_down: Option<Quantity>,
    pub resistance: Option<f64>,
    pub reactance: Option<f64>,
    pub susceptance: Option<f64>,
    /// Fractional losses applied to flow.
    pub losses: Option<f64>,
}

impl MonitoredLine {
    pub fn new(
        name: impl Into<String>,
        from_bus: impl Into<String>,
        to_bus: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category: None,
            available: true,
            uuid: Uuid::new_v4(),
            ext: BTreeMap::new(),
            from_bus: from_bus.into(),
            to_bus: to_bus.into(),
            rating_up: None,
            rating_down: None,
            resistance: None,
            reactance: None,
            susceptance: None,
            losses: None,
        }
    }

    pub fn with_ratings(mut self, up: Quantity, down: Quantity) -> Self {
        self.rating_up = Some(up);
        self.rating_down = Some(down);
        self
    }
}

impl_component!(MonitoredLine, "MonitoredLine");

/// Two-winding transformer; adds tap and winding loss to the line shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transformer2W {
    pub name: String,
    pub category: Option<String>,
    pub available: bool,
    pub uuid: Uuid,
    pub ext: BTreeMap<String, ExtValue>,
    pub from_bus: String,
    pub to_bus: String,
    pub rating_up: Option<Quantity>,
    pub rating_down: Option<Quantity>,
    pub resistance: Option<f64>,
    pub reactance: Option<f64>,
    pub tap: f64,
    pub winding_loss: Option<f64>,
}

impl Transformer2W {
    pub fn new(
        name: impl Into<String>,
        from_bus: impl Into<String>,
        to_bus: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category: None,
            available: true,
            uuid: Uuid::new_v4(),
            ext: BTreeMap::new(),
            from_bus: from_bus.into(),
            to_bus: to_bus.into(),
            rating_up: None,
            rating_down: None,
            resistance: None,
            reactance: None,
            tap: 1.0,
            winding_loss: None,
        }
    }
}

impl_component!(Transformer2W, "Transformer2W");

/// DC link between two buses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DCLine {
    pub name: String,
    pub category: Option<String>,
    pub available: bool,
    pub uuid: Uuid,
    pub ext: BTreeMap<String, ExtValue>,
    pub from_bus: String,
    pub to_bus: String,
    pub rating_up: Option<Quantity>,
    pub rating_down: Option<Quantity>,
    /// Fractional transfer loss.
    pub loss: Option<f64>,
}

impl DCLine {
    pub fn new(
        name: impl Into<String>,
        from_bus: impl Into<String>,
        to_bus: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category: None,
            available: true,
            uuid: Uuid::new_v4(),
            ext: BTreeMap::new(),
            from_bus: from_bus.into(),
            to_bus: to_bus.into(),
            rating_up: None,
            rating_down: None,
            loss: None,
        }
    }
}

impl_component!(DCLine, "DCLine");

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Component;
    use crate::units::{Quantity, Unit};

    #[test]
    fn test_line_ratings() {
        let line = MonitoredLine::new("l1", "a", "b").with_ratings(
            Quantity::new(400.0, Unit::Megawatt).unwrap(),
            Quantity::new(350.0, Unit::Megawatt).unwrap(),
        );
        assert_eq!(line.rating_up.unwrap().magnitude(), 400.0);
        assert_eq!(line.rating_down.unwrap().magnitude(), 350.0);
        assert_eq!(line.component_type(), "MonitoredLine");
    }

    #[test]
    fn test_transformer_default_tap() {
        let xf = Transformer2W::new("t1", "a", "b");
        assert_eq!(xf.tap, 1.0);
    }
}
