//! Per-model configuration: property maps, technology classification tables.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use gct_core::matching::{closest_match, normalize_name};
use gct_core::{Fuel, GctError, GctResult, GeneratorFamily, PrimeMover, ReserveDirection, ReserveType};

/// Fuel and prime mover resolved for a device before classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TechDescriptor {
    pub fuel: Option<Fuel>,
    pub prime_mover: PrimeMover,
}

/// One row of the technology rule table.
///
/// `None` on either condition is a wildcard. Rules are evaluated in table
/// order and the first match wins, so catch-all rows belong at the end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechRule {
    pub fuel: Option<Fuel>,
    pub prime_mover: Option<PrimeMover>,
    pub family: GeneratorFamily,
}

impl TechRule {
    fn matches(&self, fuel: Option<Fuel>, prime_mover: PrimeMover) -> bool {
        let fuel_ok = match self.fuel {
            None => true,
            Some(required) => fuel == Some(required),
        };
        let pm_ok = match self.prime_mover {
            None => true,
            Some(required) => prime_mover == required,
        };
        fuel_ok && pm_ok
    }
}

/// Reserve product description keyed by a source reserve-type code.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReserveSpec {
    pub reserve_type: ReserveType,
    pub direction: ReserveDirection,
}

/// Full per-model configuration, loaded from JSON and immutable afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Source property name -> canonical field name.
    pub property_map: BTreeMap<String, String>,
    /// Canonical field name -> unit string understood by `parse_unit`.
    pub unit_map: BTreeMap<String, String>,
    /// Exact device-name overrides, highest priority in the type chain.
    pub device_map: BTreeMap<String, TechDescriptor>,
    /// Category-level overrides.
    pub category_map: BTreeMap<String, TechDescriptor>,
    /// Fuel-name overrides.
    pub fuel_map: BTreeMap<String, TechDescriptor>,
    /// Substring inference, lowest priority; keys are name fragments.
    pub device_name_inference_map: BTreeMap<String, TechDescriptor>,
    /// Ordered (fuel, prime mover) -> family rules; first match wins.
    pub tech_rule_table: Vec<TechRule>,
    /// Source reserve-type code -> reserve product.
    pub reserve_type_map: BTreeMap<String, ReserveSpec>,
    /// Miscellaneous scalar knobs (reserve multipliers, loss defaults).
    pub defaults: BTreeMap<String, serde_json::Value>,
    /// Technologies excluded from default reserve membership.
    pub excluded_reserve_techs: Vec<String>,
    /// Technologies modeled with unit commitment.
    pub commit_technologies: Vec<String>,
    /// Categories aggregated as variable renewables.
    pub vre_categories: Vec<String>,
}

impl ModelConfig {
    pub fn from_file(path: &Path) -> GctResult<Self> {
        let file = File::open(path)?;
        serde_json::from_reader(file).map_err(|e| {
            GctError::Config(format!("invalid model config {}: {e}", path.display()))
        })
    }

    /// Resolve a device's technology through the priority chain:
    /// exact device name, then category, then fuel name, then substring
    /// inference against the device name. `None` means the device cannot
    /// be typed and must be skipped by the caller.
    pub fn resolve_tech(
        &self,
        device_name: &str,
        category: Option<&str>,
        fuel_name: Option<&str>,
    ) -> Option<TechDescriptor> {
        if let Some(desc) = lookup_normalized(&self.device_map, device_name) {
            return Some(desc);
        }
        if let Some(cat) = category {
            if let Some(desc) = lookup_normalized(&self.category_map, cat) {
                return Some(desc);
            }
        }
        if let Some(fuel) = fuel_name {
            if let Some(desc) = lookup_normalized(&self.fuel_map, fuel) {
                return Some(desc);
            }
        }
        self.infer_from_name(device_name)
    }

    /// Substring inference: the longest map key contained in the
    /// normalized device name wins, so "gas-cc" beats "gas".
    fn infer_from_name(&self, device_name: &str) -> Option<TechDescriptor> {
        let haystack = normalize_name(device_name);
        self.device_name_inference_map
            .iter()
            .filter(|(fragment, _)| haystack.contains(&normalize_name(fragment)))
            .max_by_key(|(fragment, _)| fragment.len())
            .map(|(_, desc)| *desc)
    }

    /// Map a resolved (fuel, prime mover) pair onto a generator family.
    pub fn classify(&self, fuel: Option<Fuel>, prime_mover: PrimeMover) -> Option<GeneratorFamily> {
        self.tech_rule_table
            .iter()
            .find(|rule| rule.matches(fuel, prime_mover))
            .map(|rule| rule.family)
    }

    /// Canonical field name for a source property, defaulting to the
    /// source name when unmapped.
    pub fn map_property<'a>(&'a self, source_name: &'a str) -> &'a str {
        self.property_map
            .get(source_name)
            .map(String::as_str)
            .unwrap_or(source_name)
    }

    /// Reserve product for a source code, tolerating spelling variants.
    pub fn reserve_spec(&self, code: &str) -> Option<ReserveSpec> {
        if let Some(spec) = lookup_normalized(&self.reserve_type_map, code) {
            return Some(spec);
        }
        // Last resort: resolve against the enum vocabulary directly.
        let reserve_type = ReserveType::from_source(code)?;
        Some(ReserveSpec {
            reserve_type,
            direction: ReserveDirection::Up,
        })
    }

    /// Scalar knob with a fallback.
    pub fn default_f64(&self, key: &str, fallback: f64) -> f64 {
        self.defaults
            .get(key)
            .and_then(|v| v.as_f64())
            .unwrap_or(fallback)
    }

    pub fn is_vre_category(&self, category: &str) -> bool {
        let normalized = normalize_name(category);
        self.vre_categories
            .iter()
            .any(|c| normalize_name(c) == normalized)
    }

    pub fn is_commit_technology(&self, tech: &str) -> bool {
        let normalized = normalize_name(tech);
        self.commit_technologies
            .iter()
            .any(|c| normalize_name(c) == normalized)
    }
}

/// Map lookup tolerant of spelling variants: exact key first, then
/// normalized-edit-distance match against the key set.
fn lookup_normalized<V: Copy>(map: &BTreeMap<String, V>, key: &str) -> Option<V> {
    if let Some(v) = map.get(key) {
        return Some(*v);
    }
    let matched = closest_match(key, map.keys().map(String::as_str))?;
    map.get(matched).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_rules() -> ModelConfig {
        let mut cfg = ModelConfig::default();
        cfg.tech_rule_table = vec![
            TechRule {
                fuel: Some(Fuel::Water),
                prime_mover: Some(PrimeMover::PS),
                family: GeneratorFamily::HydroPumped,
            },
            TechRule {
                fuel: Some(Fuel::Water),
                prime_mover: None,
                family: GeneratorFamily::Hydro,
            },
            TechRule {
                fuel: None,
                prime_mover: Some(PrimeMover::WT),
                family: GeneratorFamily::RenewableDispatch,
            },
            TechRule {
                fuel: None,
                prime_mover: Some(PrimeMover::BA),
                family: GeneratorFamily::Storage,
            },
            TechRule {
                fuel: None,
                prime_mover: None,
                family: GeneratorFamily::Thermal,
            },
        ];
        cfg
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let cfg = config_with_rules();
        assert_eq!(
            cfg.classify(Some(Fuel::Water), PrimeMover::PS),
            Some(GeneratorFamily::HydroPumped)
        );
        assert_eq!(
            cfg.classify(Some(Fuel::Water), PrimeMover::HY),
            Some(GeneratorFamily::Hydro)
        );
        assert_eq!(
            cfg.classify(None, PrimeMover::WT),
            Some(GeneratorFamily::RenewableDispatch)
        );
        // Catch-all at the bottom.
        assert_eq!(
            cfg.classify(Some(Fuel::Coal), PrimeMover::ST),
            Some(GeneratorFamily::Thermal)
        );
    }

    #[test]
    fn test_type_chain_priority() {
        let mut cfg = ModelConfig::default();
        let gas_ct = TechDescriptor {
            fuel: Some(Fuel::NaturalGas),
            prime_mover: PrimeMover::CT,
        };
        let coal = TechDescriptor {
            fuel: Some(Fuel::Coal),
            prime_mover: PrimeMover::ST,
        };
        cfg.device_map.insert("special-unit".to_string(), gas_ct);
        cfg.category_map.insert("steam".to_string(), coal);

        // Device override beats category.
        let d = cfg.resolve_tech("special-unit", Some("steam"), None).unwrap();
        assert_eq!(d.prime_mover, PrimeMover::CT);
        // Category applies when device is unmapped.
        let d = cfg.resolve_tech("other-unit", Some("steam"), None).unwrap();
        assert_eq!(d.prime_mover, PrimeMover::ST);
        // Nothing matches: caller must skip.
        assert!(cfg.resolve_tech("mystery", None, None).is_none());
    }

    #[test]
    fn test_substring_inference_prefers_longest() {
        let mut cfg = ModelConfig::default();
        cfg.device_name_inference_map.insert(
            "gas".to_string(),
            TechDescriptor {
                fuel: Some(Fuel::NaturalGas),
                prime_mover: PrimeMover::GT,
            },
        );
        cfg.device_name_inference_map.insert(
            "gas-cc".to_string(),
            TechDescriptor {
                fuel: Some(Fuel::NaturalGas),
                prime_mover: PrimeMover::CC,
            },
        );
        let d = cfg.resolve_tech("west_gas_cc_014", None, None).unwrap();
        assert_eq!(d.prime_mover, PrimeMover::CC);
    }

    #[test]
    fn test_reserve_spec_fuzzy() {
        let mut cfg = ModelConfig::default();
        cfg.reserve_type_map.insert(
            "spin".to_string(),
            ReserveSpec {
                reserve_type: ReserveType::Spinning,
                direction: ReserveDirection::Up,
            },
        );
        assert!(cfg.reserve_spec("Spin").is_some());
        assert!(cfg.reserve_spec("regulation").is_some());
        assert!(cfg.reserve_spec("zzz-unknown").is_none());
    }
}
