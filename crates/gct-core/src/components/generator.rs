//! Generators and their per-family operating costs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::components::{impl_component, ExtValue, Fuel, GeneratorFamily, MinMax, PrimeMover};
use crate::error::{GctError, GctResult};
use crate::units::Quantity;

/// Cost sub-object dispatched on the generator's family.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperatingCost {
    Thermal {
        heat_rate: Option<Quantity>,
        fuel_price: Option<Quantity>,
        vom_price: Option<Quantity>,
        start_up_cost: Option<Quantity>,
    },
    Hydro {
        vom_price: Option<Quantity>,
    },
    Renewable {
        curtailment_cost: Option<Quantity>,
    },
    Storage {
        charge_cost: Option<Quantity>,
        discharge_cost: Option<Quantity>,
    },
}

impl OperatingCost {
    /// Empty cost object of the shape matching `family`.
    pub fn for_family(family: GeneratorFamily) -> Self {
        match family {
            GeneratorFamily::Thermal => OperatingCost::Thermal {
                heat_rate: None,
                fuel_price: None,
                vom_price: None,
                start_up_cost: None,
            },
            GeneratorFamily::Hydro | GeneratorFamily::HydroPumped => {
                OperatingCost::Hydro { vom_price: None }
            }
            GeneratorFamily::RenewableDispatch | GeneratorFamily::RenewableNonDispatch => {
                OperatingCost::Renewable {
                    curtailment_cost: None,
                }
            }
            GeneratorFamily::Storage => OperatingCost::Storage {
                charge_cost: None,
                discharge_cost: None,
            },
        }
    }
}

/// Single generating unit of any family.
///
/// `bus` holds the component name of the attached bus. `base_power` is the
/// nameplate rating; `active_power_limits.max` defaults to nameplate when
/// the source gives no explicit maximum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Generator {
    pub name: String,
    pub category: Option<String>,
    pub available: bool,
    pub uuid: Uuid,
    pub ext: BTreeMap<String, ExtValue>,
    pub bus: String,
    pub family: GeneratorFamily,
    pub base_power: Option<Quantity>,
    pub active_power: Option<Quantity>,
    pub active_power_limits: Option<MinMax>,
    /// Ramp rates, MW/min.
    pub ramp_up: Option<Quantity>,
    pub ramp_down: Option<Quantity>,
    /// Minimum up/down times, hours.
    pub min_up_time: Option<f64>,
    pub min_down_time: Option<f64>,
    /// Outage rates as fractions in [0, 1].
    pub forced_outage_rate: Option<f64>,
    pub planned_outage_rate: Option<f64>,
    pub prime_mover: PrimeMover,
    pub fuel: Option<Fuel>,
    pub operating_cost: OperatingCost,
    pub must_run: bool,
    // Storage-family fields; None for non-storage units.
    pub storage_capacity: Option<Quantity>,
    pub charge_efficiency: Option<f64>,
    pub discharge_efficiency: Option<f64>,
    pub initial_energy: Option<Quantity>,
}

impl Generator {
    pub fn new(
        name: impl Into<String>,
        bus: impl Into<String>,
        family: GeneratorFamily,
        prime_mover: PrimeMover,
    ) -> Self {
        Self {
            name: name.into(),
            category: None,
            available: true,
            uuid: Uuid::new_v4(),
            ext: BTreeMap::new(),
            bus: bus.into(),
            family,
            base_power: None,
            active_power: None,
            active_power_limits: None,
            ramp_up: None,
            ramp_down: None,
            min_up_time: None,
            min_down_time: None,
            forced_outage_rate: None,
            planned_outage_rate: None,
            prime_mover,
            fuel: None,
            operating_cost: OperatingCost::for_family(family),
            must_run: false,
            storage_capacity: None,
            charge_efficiency: None,
            discharge_efficiency: None,
            initial_energy: None,
        }
    }

    pub fn with_base_power(mut self, base_power: Quantity) -> Self {
        self.base_power = Some(base_power);
        self
    }

    pub fn with_fuel(mut self, fuel: Fuel) -> Self {
        self.fuel = Some(fuel);
        self
    }

    /// Maximum active power, falling back to nameplate.
    pub fn max_active_power(&self) -> Option<f64> {
        self.active_power_limits
            .map(|l| l.max)
            .or_else(|| self.base_power.map(|q| q.magnitude()))
    }

    /// Check the cross-field invariants a fully-built unit must satisfy.
    pub fn validate(&self) -> GctResult<()> {
        if let Some(limits) = self.active_power_limits {
            if limits.min > limits.max {
                return Err(GctError::Validation(format!(
                    "generator '{}': active power min {} exceeds max {}",
                    self.name, limits.min, limits.max
                )));
            }
        }
        if let Some(cap) = self.storage_capacity {
            if cap.magnitude() < 0.0 {
                return Err(GctError::Validation(format!(
                    "generator '{}': negative storage capacity {}",
                    self.name, cap
                )));
            }
        }
        for (label, rate) in [
            ("forced outage rate", self.forced_outage_rate),
            ("planned outage rate", self.planned_outage_rate),
        ] {
            if let Some(r) = rate {
                if !(0.0..=1.0).contains(&r) {
                    return Err(GctError::Validation(format!(
                        "generator '{}': {label} {r} outside [0, 1]",
                        self.name
                    )));
                }
            }
        }
        Ok(())
    }
}

impl_component!(Generator, "Generator");

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::Unit;

    fn thermal() -> Generator {
        Generator::new("gas-1", "node-1", GeneratorFamily::Thermal, PrimeMover::CT)
            .with_base_power(Quantity::new(200.0, Unit::Megawatt).unwrap())
            .with_fuel(Fuel::NaturalGas)
    }

    #[test]
    fn test_cost_shape_follows_family() {
        let g = thermal();
        assert!(matches!(g.operating_cost, OperatingCost::Thermal { .. }));
        let s = Generator::new("batt", "n", GeneratorFamily::Storage, PrimeMover::BA);
        assert!(matches!(s.operating_cost, OperatingCost::Storage { .. }));
    }

    #[test]
    fn test_max_power_falls_back_to_nameplate() {
        let mut g = thermal();
        assert_eq!(g.max_active_power(), Some(200.0));
        g.active_power_limits = Some(MinMax::new(50.0, 180.0).unwrap());
        assert_eq!(g.max_active_power(), Some(180.0));
    }

    #[test]
    fn test_validate_rejects_bad_outage_rate() {
        let mut g = thermal();
        g.forced_outage_rate = Some(1.5);
        assert!(g.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_negative_storage() {
        let mut g = Generator::new("batt", "n", GeneratorFamily::Storage, PrimeMover::BA);
        g.storage_capacity = Some(Quantity::new(-4.0, Unit::MegawattHour).unwrap());
        assert!(g.validate().is_err());
    }
}
