//! Physical quantities with runtime unit kinds.
//!
//! Source property tables carry unit *strings* ("MW", "$/MMBtu", "kg/MWh"),
//! so units here are runtime values rather than newtypes: a [`Quantity`] is a
//! magnitude plus a [`Unit`], each unit belongs to exactly one [`UnitKind`],
//! and conversion is factor-based within a kind. Combining quantities of
//! different kinds is an error, never a silent coercion.
//!
//! # Invariants
//!
//! - A quantity's magnitude is always finite; NaN and infinities are rejected
//!   at construction and can therefore never be persisted into a component.
//! - Converting q -> u1 -> u2 equals converting q -> u2 directly (within
//!   floating tolerance), because all conversions route through the kind's
//!   base unit.
//!
//! # Example
//!
//! ```
//! use gct_core::units::{Quantity, Unit};
//!
//! let p = Quantity::new(1.5, Unit::Gigawatt).unwrap();
//! let mw = p.convert_to(Unit::Megawatt).unwrap();
//! assert_eq!(mw.magnitude(), 1500.0);
//! assert!(p.checked_add(&Quantity::new(1.0, Unit::Hour).unwrap()).is_err());
//! ```

use std::fmt;
use std::ops::{Div, Mul, Neg};

use serde::{Deserialize, Serialize};

use crate::error::{GctError, GctResult};

/// Closed set of physical dimensions the pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    Power,
    Energy,
    Time,
    Price,
    Currency,
    FuelPrice,
    HeatRate,
    EmissionRate,
    PowerRate,
    Percentage,
    Angle,
    Voltage,
    Dimensionless,
}

/// Concrete units, each with a fixed factor to its kind's base unit.
///
/// Base units: MW (power), MWh (energy), hours (time), usd/MWh (price),
/// usd (currency), usd/MMBtu (fuel price), MMBtu/MWh (heat rate),
/// kg/MWh (emission rate), MW/min (power rate), percent, degrees, kV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Kilowatt,
    Megawatt,
    Gigawatt,
    KilowattHour,
    MegawattHour,
    GigawattHour,
    MillionBtu,
    Second,
    Minute,
    Hour,
    Day,
    UsdPerMegawattHour,
    UsdPerKilowattHour,
    Usd,
    UsdPerMillionBtu,
    UsdPerGigajoule,
    MillionBtuPerMegawattHour,
    BtuPerKilowattHour,
    GigajoulePerMegawattHour,
    KilogramPerMegawattHour,
    PoundPerMegawattHour,
    MegawattPerMinute,
    MegawattPerHour,
    Percent,
    Fraction,
    Degree,
    Radian,
    Volt,
    Kilovolt,
    Unitless,
}

impl Unit {
    /// The dimension this unit measures.
    pub fn kind(&self) -> UnitKind {
        use Unit::*;
        match self {
            Kilowatt | Megawatt | Gigawatt => UnitKind::Power,
            KilowattHour | MegawattHour | GigawattHour | MillionBtu => UnitKind::Energy,
            Second | Minute | Hour | Day => UnitKind::Time,
            UsdPerMegawattHour | UsdPerKilowattHour => UnitKind::Price,
            Usd => UnitKind::Currency,
            UsdPerMillionBtu | UsdPerGigajoule => UnitKind::FuelPrice,
            MillionBtuPerMegawattHour | BtuPerKilowattHour | GigajoulePerMegawattHour => {
                UnitKind::HeatRate
            }
            KilogramPerMegawattHour | PoundPerMegawattHour => UnitKind::EmissionRate,
            MegawattPerMinute | MegawattPerHour => UnitKind::PowerRate,
            Percent | Fraction => UnitKind::Percentage,
            Degree | Radian => UnitKind::Angle,
            Volt | Kilovolt => UnitKind::Voltage,
            Unitless => UnitKind::Dimensionless,
        }
    }

    /// Multiplicative factor from this unit to the kind's base unit.
    pub fn base_factor(&self) -> f64 {
        use Unit::*;
        match self {
            Kilowatt => 1e-3,
            Megawatt => 1.0,
            Gigawatt => 1e3,
            KilowattHour => 1e-3,
            MegawattHour => 1.0,
            GigawattHour => 1e3,
            // 1 MMBtu = 293071 Wh
            MillionBtu => 0.293071,
            Second => 1.0 / 3600.0,
            Minute => 1.0 / 60.0,
            Hour => 1.0,
            Day => 24.0,
            UsdPerMegawattHour => 1.0,
            UsdPerKilowattHour => 1e3,
            Usd => 1.0,
            UsdPerMillionBtu => 1.0,
            // 1 MMBtu = 1.055056 GJ
            UsdPerGigajoule => 1.055056,
            MillionBtuPerMegawattHour => 1.0,
            BtuPerKilowattHour => 1e-3,
            GigajoulePerMegawattHour => 1.0 / 1.055056,
            KilogramPerMegawattHour => 1.0,
            PoundPerMegawattHour => 0.453592,
            MegawattPerMinute => 1.0,
            MegawattPerHour => 1.0 / 60.0,
            Percent => 1.0,
            Fraction => 100.0,
            Degree => 1.0,
            Radian => 180.0 / std::f64::consts::PI,
            Volt => 1e-3,
            Kilovolt => 1.0,
            Unitless => 1.0,
        }
    }

    /// Canonical display symbol.
    pub fn symbol(&self) -> &'static str {
        use Unit::*;
        match self {
            Kilowatt => "kW",
            Megawatt => "MW",
            Gigawatt => "GW",
            KilowattHour => "kWh",
            MegawattHour => "MWh",
            GigawattHour => "GWh",
            MillionBtu => "MMBtu",
            Second => "s",
            Minute => "min",
            Hour => "h",
            Day => "day",
            UsdPerMegawattHour => "usd/MWh",
            UsdPerKilowattHour => "usd/kWh",
            Usd => "usd",
            UsdPerMillionBtu => "usd/MMBtu",
            UsdPerGigajoule => "usd/GJ",
            MillionBtuPerMegawattHour => "MMBtu/MWh",
            BtuPerKilowattHour => "Btu/kWh",
            GigajoulePerMegawattHour => "GJ/MWh",
            KilogramPerMegawattHour => "kg/MWh",
            PoundPerMegawattHour => "lb/MWh",
            MegawattPerMinute => "MW/min",
            MegawattPerHour => "MW/h",
            Percent => "%",
            Fraction => "",
            Degree => "deg",
            Radian => "rad",
            Volt => "V",
            Kilovolt => "kV",
            Unitless => "",
        }
    }
}

/// Map a source unit string onto a [`Unit`].
///
/// Applies the currency-symbol substitution ("$" -> "usd") and lowercases
/// before matching. Returns `None` for "-", the empty string, and anything
/// outside the recognized set; callers treat those values as raw scalars.
pub fn parse_unit(raw: &str) -> Option<Unit> {
    let normalized = raw.trim().replace('$', "usd").to_lowercase();
    let unit = match normalized.as_str() {
        "" | "-" => return None,
        "kw" => Unit::Kilowatt,
        "mw" => Unit::Megawatt,
        "gw" => Unit::Gigawatt,
        "kwh" => Unit::KilowattHour,
        "mwh" => Unit::MegawattHour,
        "gwh" => Unit::GigawattHour,
        "mmbtu" | "mbtu" => Unit::MillionBtu,
        "s" | "sec" => Unit::Second,
        "min" => Unit::Minute,
        "h" | "hr" | "hrs" | "hour" | "hours" => Unit::Hour,
        "day" | "days" => Unit::Day,
        "usd/mwh" => Unit::UsdPerMegawattHour,
        "usd/kwh" => Unit::UsdPerKilowattHour,
        "usd" => Unit::Usd,
        "usd/mmbtu" | "usd/mbtu" => Unit::UsdPerMillionBtu,
        "usd/gj" => Unit::UsdPerGigajoule,
        "mmbtu/mwh" => Unit::MillionBtuPerMegawattHour,
        "btu/kwh" => Unit::BtuPerKilowattHour,
        "gj/mwh" => Unit::GigajoulePerMegawattHour,
        "kg/mwh" => Unit::KilogramPerMegawattHour,
        "lb/mwh" => Unit::PoundPerMegawattHour,
        "mw/min" => Unit::MegawattPerMinute,
        "mw/h" | "mw/hr" => Unit::MegawattPerHour,
        "%" | "percent" => Unit::Percent,
        "deg" | "degree" | "degrees" => Unit::Degree,
        "rad" => Unit::Radian,
        "v" => Unit::Volt,
        "kv" => Unit::Kilovolt,
        _ => return None,
    };
    Some(unit)
}

/// A finite magnitude paired with a unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    magnitude: f64,
    unit: Unit,
}

impl Quantity {
    /// Create a quantity. Non-finite magnitudes are rejected so they can
    /// never reach a component.
    pub fn new(magnitude: f64, unit: Unit) -> GctResult<Self> {
        if !magnitude.is_finite() {
            return Err(GctError::Unit(format!(
                "non-finite magnitude {magnitude} for unit {}",
                unit.symbol()
            )));
        }
        Ok(Self { magnitude, unit })
    }

    pub fn magnitude(&self) -> f64 {
        self.magnitude
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn kind(&self) -> UnitKind {
        self.unit.kind()
    }

    /// Convert to another unit of the same kind.
    pub fn convert_to(&self, target: Unit) -> GctResult<Quantity> {
        if self.unit.kind() != target.kind() {
            return Err(GctError::Unit(format!(
                "cannot convert {} to {}: kinds {:?} and {:?} are incompatible",
                self.unit.symbol(),
                target.symbol(),
                self.unit.kind(),
                target.kind()
            )));
        }
        let base = self.magnitude * self.unit.base_factor();
        Quantity::new(base / target.base_factor(), target)
    }

    /// The magnitude expressed in `target` units.
    pub fn value_in(&self, target: Unit) -> GctResult<f64> {
        Ok(self.convert_to(target)?.magnitude)
    }

    /// Sum with another quantity, converting `rhs` into this quantity's unit.
    pub fn checked_add(&self, rhs: &Quantity) -> GctResult<Quantity> {
        let rhs = rhs.convert_to(self.unit)?;
        Quantity::new(self.magnitude + rhs.magnitude, self.unit)
    }

    /// Difference with another quantity, converting `rhs` into this unit.
    pub fn checked_sub(&self, rhs: &Quantity) -> GctResult<Quantity> {
        let rhs = rhs.convert_to(self.unit)?;
        Quantity::new(self.magnitude - rhs.magnitude, self.unit)
    }

    pub fn abs(&self) -> Quantity {
        Quantity {
            magnitude: self.magnitude.abs(),
            unit: self.unit,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.magnitude == 0.0
    }
}

impl Mul<f64> for Quantity {
    type Output = Quantity;
    fn mul(self, rhs: f64) -> Quantity {
        Quantity {
            magnitude: self.magnitude * rhs,
            unit: self.unit,
        }
    }
}

impl Div<f64> for Quantity {
    type Output = Quantity;
    fn div(self, rhs: f64) -> Quantity {
        Quantity {
            magnitude: self.magnitude / rhs,
            unit: self.unit,
        }
    }
}

impl Neg for Quantity {
    type Output = Quantity;
    fn neg(self) -> Quantity {
        Quantity {
            magnitude: -self.magnitude,
            unit: self.unit,
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = self.unit.symbol();
        if symbol.is_empty() {
            write!(f, "{:.4}", self.magnitude)
        } else {
            write!(f, "{:.4} {}", self.magnitude, symbol)
        }
    }
}

/// Extract the magnitude from an optional quantity, defaulting to a raw
/// float. Mirrors how exporters deconstruct quantities into plain columns.
pub fn get_magnitude(value: Option<&Quantity>, fallback: f64) -> f64 {
    value.map(|q| q.magnitude()).unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_conversion() {
        let p = Quantity::new(1.5, Unit::Gigawatt).unwrap();
        assert_eq!(p.value_in(Unit::Megawatt).unwrap(), 1500.0);
        assert_eq!(p.value_in(Unit::Kilowatt).unwrap(), 1_500_000.0);
    }

    #[test]
    fn test_incompatible_kinds() {
        let p = Quantity::new(100.0, Unit::Megawatt).unwrap();
        assert!(p.convert_to(Unit::MegawattHour).is_err());
        let t = Quantity::new(1.0, Unit::Hour).unwrap();
        assert!(p.checked_add(&t).is_err());
    }

    #[test]
    fn test_conversion_path_invariance() {
        // q -> u1 -> u2 must equal q -> u2 within floating tolerance.
        let q = Quantity::new(123.456, Unit::GigajoulePerMegawattHour).unwrap();
        let direct = q.value_in(Unit::BtuPerKilowattHour).unwrap();
        let via = q
            .convert_to(Unit::MillionBtuPerMegawattHour)
            .unwrap()
            .value_in(Unit::BtuPerKilowattHour)
            .unwrap();
        assert!((direct - via).abs() < 1e-9 * direct.abs());
    }

    #[test]
    fn test_non_finite_rejected() {
        assert!(Quantity::new(f64::NAN, Unit::Megawatt).is_err());
        assert!(Quantity::new(f64::INFINITY, Unit::Hour).is_err());
    }

    #[test]
    fn test_checked_add_converts_rhs() {
        let a = Quantity::new(1.0, Unit::Gigawatt).unwrap();
        let b = Quantity::new(500.0, Unit::Megawatt).unwrap();
        let sum = a.checked_add(&b).unwrap();
        assert_eq!(sum.unit(), Unit::Gigawatt);
        assert!((sum.magnitude() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_parse_unit_currency_substitution() {
        assert_eq!(parse_unit("$/MMBtu"), Some(Unit::UsdPerMillionBtu));
        assert_eq!(parse_unit("$/MWh"), Some(Unit::UsdPerMegawattHour));
        assert_eq!(parse_unit("$"), Some(Unit::Usd));
    }

    #[test]
    fn test_parse_unit_unrecognized() {
        assert_eq!(parse_unit("-"), None);
        assert_eq!(parse_unit(""), None);
        assert_eq!(parse_unit("furlongs/fortnight"), None);
    }

    #[test]
    fn test_percent_fraction() {
        let f = Quantity::new(0.5, Unit::Fraction).unwrap();
        assert_eq!(f.value_in(Unit::Percent).unwrap(), 50.0);
    }

    #[test]
    fn test_display() {
        let q = Quantity::new(100.0, Unit::Megawatt).unwrap();
        assert_eq!(format!("{}", q), "100.0000 MW");
    }
}
