//! Closed vocabularies shared across components.
//!
//! Source models carry these as free strings; each enum offers
//! `from_source`, which normalizes and falls back to an edit-distance
//! match against the variant names so near-miss spellings still resolve.

use serde::{Deserialize, Serialize};

use crate::matching::closest_match;

macro_rules! source_resolvable {
    ($ty:ident, [$(($variant:ident, $label:literal)),+ $(,)?]) => {
        impl $ty {
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            pub fn label(&self) -> &'static str {
                match self {
                    $($ty::$variant => $label),+
                }
            }

            /// Resolve a source string, tolerating spelling variants.
            pub fn from_source(raw: &str) -> Option<Self> {
                let matched = closest_match(raw, [$($label),+])?;
                match matched {
                    $($label => Some($ty::$variant),)+
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

/// AC bus role in the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BusType {
    PV,
    PQ,
    Ref,
}

/// EIA prime-mover codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(clippy::upper_case_acronyms)]
pub enum PrimeMover {
    BA,
    BT,
    CC,
    CE,
    CP,
    CS,
    CT,
    ES,
    FC,
    GT,
    HA,
    HY,
    IC,
    OT,
    PS,
    PV,
    RTPV,
    ST,
    WT,
    WS,
}

source_resolvable!(PrimeMover, [
    (BA, "BA"),
    (BT, "BT"),
    (CC, "CC"),
    (CE, "CE"),
    (CP, "CP"),
    (CS, "CS"),
    (CT, "CT"),
    (ES, "ES"),
    (FC, "FC"),
    (GT, "GT"),
    (HA, "HA"),
    (HY, "HY"),
    (IC, "IC"),
    (OT, "OT"),
    (PS, "PS"),
    (PV, "PV"),
    (RTPV, "RTPV"),
    (ST, "ST"),
    (WT, "WT"),
    (WS, "WS"),
]);

/// Thermal and renewable fuel classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fuel {
    Coal,
    NaturalGas,
    Oil,
    Nuclear,
    Biomass,
    Geothermal,
    Hydrogen,
    LandfillGas,
    MunicipalWaste,
    Solar,
    Wind,
    Water,
    Other,
}

source_resolvable!(Fuel, [
    (Coal, "coal"),
    (NaturalGas, "natural-gas"),
    (Oil, "oil"),
    (Nuclear, "nuclear"),
    (Biomass, "biomass"),
    (Geothermal, "geothermal"),
    (Hydrogen, "hydrogen"),
    (LandfillGas, "landfill-gas"),
    (MunicipalWaste, "municipal-waste"),
    (Solar, "solar"),
    (Wind, "wind"),
    (Water, "water"),
    (Other, "other"),
]);

/// Broad device class driving which cost sub-object a generator carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorFamily {
    Thermal,
    Hydro,
    HydroPumped,
    RenewableDispatch,
    RenewableNonDispatch,
    Storage,
}

impl GeneratorFamily {
    /// Renewable families share curtailment-cost handling.
    pub fn is_renewable(&self) -> bool {
        matches!(
            self,
            GeneratorFamily::RenewableDispatch | GeneratorFamily::RenewableNonDispatch
        )
    }
}

/// Operating-reserve product class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReserveType {
    Spinning,
    Flexibility,
    Regulation,
}

source_resolvable!(ReserveType, [
    (Spinning, "spinning"),
    (Flexibility, "flexibility"),
    (Regulation, "regulation"),
]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReserveDirection {
    Up,
    Down,
}

source_resolvable!(ReserveDirection, [(Up, "up"), (Down, "down")]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(clippy::upper_case_acronyms)]
pub enum EmissionType {
    CO2,
    NOX,
    SO2,
    CH4,
}

source_resolvable!(EmissionType, [
    (CO2, "CO2"),
    (NOX, "NOX"),
    (SO2, "SO2"),
    (CH4, "CH4"),
]);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_resolution() {
        assert_eq!(Fuel::from_source("natural-gas"), Some(Fuel::NaturalGas));
        assert_eq!(ReserveType::from_source("Spinning"), Some(ReserveType::Spinning));
    }

    #[test]
    fn test_spelling_variant_resolution() {
        assert_eq!(Fuel::from_source("Natural Gas"), Some(Fuel::NaturalGas));
        assert_eq!(ReserveType::from_source("regulaton"), Some(ReserveType::Regulation));
        assert_eq!(ReserveDirection::from_source("UP"), Some(ReserveDirection::Up));
    }

    #[test]
    fn test_unresolvable_rejected() {
        assert_eq!(ReserveType::from_source("frequency-containment"), None);
    }

    #[test]
    fn test_display_labels() {
        assert_eq!(PrimeMover::CT.to_string(), "CT");
        assert_eq!(EmissionType::CO2.to_string(), "CO2");
    }
}
