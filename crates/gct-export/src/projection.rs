//! Field-to-property projection, the inverse of the resolver.
//!
//! A component's typed fields flatten into (target property, text value)
//! pairs under a shared name map with per-class overrides. Only
//! properties the target schema knows are emitted; everything else drops
//! silently. Series-valued fields are replaced by a pointer to the data
//! file that will carry them.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use gct_config::RunConfig;
use gct_core::{parse_unit, AnyComponent, GctError, GctResult, Quantity, System};

/// Target schema description, loaded from JSON per output format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSchema {
    /// Field name -> target property name, shared across classes.
    pub property_map: BTreeMap<String, String>,
    /// Class -> field name -> target property name; beats `property_map`.
    pub class_overrides: BTreeMap<String, BTreeMap<String, String>>,
    /// Class -> properties the target accepts. An empty set means the
    /// class accepts everything.
    pub valid_properties: BTreeMap<String, BTreeSet<String>>,
    /// Target property name -> unit string written beside the value.
    pub default_units: BTreeMap<String, String>,
}

impl ExportSchema {
    pub fn from_file(path: &std::path::Path) -> GctResult<Self> {
        let file = std::fs::File::open(path)?;
        serde_json::from_reader(file).map_err(|e| {
            GctError::Config(format!("invalid export schema {}: {e}", path.display()))
        })
    }

    /// Target name for a field, class overrides first.
    pub fn target_name(&self, class: &str, field: &str) -> String {
        if let Some(overrides) = self.class_overrides.get(class) {
            if let Some(name) = overrides.get(field) {
                return name.clone();
            }
        }
        self.property_map
            .get(field)
            .cloned()
            .unwrap_or_else(|| field.to_string())
    }

    /// Whether the target schema accepts `property` on `class`.
    pub fn accepts(&self, class: &str, property: &str) -> bool {
        match self.valid_properties.get(class) {
            Some(set) if !set.is_empty() => set.contains(property),
            _ => true,
        }
    }
}

/// One exported component: ordered property -> text value.
pub type ExportRow = BTreeMap<String, String>;

/// Project one component into a flat row of target properties.
///
/// Fields flatten one level: quantities collapse to their magnitude,
/// min/max pairs split into `{field}_min`/`{field}_max`, the operating
/// cost sub-object contributes its own members, and the open extension
/// map passes through under its own keys. Fields whose value is carried
/// by an attached series point at the generated data file instead.
pub fn project_component(
    component: &AnyComponent,
    series_variables: &[String],
    schema: &ExportSchema,
    run: &RunConfig,
) -> GctResult<ExportRow> {
    let class = component.component_type();
    let value = serde_json::to_value(component)
        .map_err(|e| GctError::Model(format!("cannot serialize {class}: {e}")))?;
    let Value::Object(fields) = value else {
        return Err(GctError::Model(format!(
            "{class} did not serialize to an object"
        )));
    };

    let mut row = ExportRow::new();
    for (field, value) in &fields {
        if field == "component_type" || field == "uuid" {
            continue;
        }
        // Quantity fields coerce through the unit the schema declares
        // for the target property before losing their unit tag.
        if let Some((target, text)) = coerce_quantity(class, field, value, schema)? {
            if schema.accepts(class, &target) {
                row.insert(target, text);
            }
            continue;
        }
        for (flat_name, flat_value) in flatten_field(field, value) {
            let target = schema.target_name(class, &flat_name);
            if !schema.accepts(class, &target) {
                continue;
            }
            row.insert(target, flat_value);
        }
    }

    // Series-backed fields point at the shared per-variable data file.
    for variable in series_variables {
        let target = schema.target_name(class, variable);
        if !schema.accepts(class, &target) {
            continue;
        }
        row.insert(target, run.time_series_filename(class, variable));
    }
    Ok(row)
}

/// Project every component of one type, sorted by name.
pub fn project_type(
    system: &System,
    component_type: &str,
    schema: &ExportSchema,
    run: &RunConfig,
) -> GctResult<Vec<ExportRow>> {
    let mut rows = Vec::new();
    for component in system.iter_type(component_type) {
        let variables: Vec<String> = system
            .list_time_series(component_type, component.name())
            .map(|s| s.variable_name.clone())
            .collect();
        rows.push(project_component(component, &variables, schema, run)?);
    }
    Ok(rows)
}

/// Convert a quantity-shaped field to the unit declared for its target
/// property, if any. Returns the already-renamed pair.
fn coerce_quantity(
    class: &str,
    field: &str,
    value: &Value,
    schema: &ExportSchema,
) -> GctResult<Option<(String, String)>> {
    let Value::Object(map) = value else {
        return Ok(None);
    };
    if !map.contains_key("magnitude") || !map.contains_key("unit") {
        return Ok(None);
    }
    let quantity: Quantity = serde_json::from_value(value.clone())
        .map_err(|e| GctError::Model(format!("bad quantity in {class}.{field}: {e}")))?;
    let target = schema.target_name(class, field);
    let magnitude = match schema.default_units.get(&target).and_then(|u| parse_unit(u)) {
        Some(unit) => quantity.convert_to(unit)?.magnitude(),
        None => quantity.magnitude(),
    };
    let text = serde_json::Number::from_f64(magnitude)
        .map(|n| n.to_string())
        .unwrap_or_else(|| magnitude.to_string());
    Ok(Some((target, text)))
}

/// Flatten one serialized field into text-valued leaves.
fn flatten_field(field: &str, value: &Value) -> Vec<(String, String)> {
    match value {
        Value::Null => Vec::new(),
        Value::Bool(b) => vec![(field.to_string(), b.to_string())],
        Value::Number(n) => vec![(field.to_string(), n.to_string())],
        Value::String(s) => vec![(field.to_string(), s.clone())],
        Value::Object(map) => {
            // Quantity: keep the magnitude, the unit lives in the schema.
            if let Some(magnitude) = map.get("magnitude") {
                return flatten_field(field, magnitude);
            }
            // MinMax: split into suffixed leaves.
            if map.contains_key("min") && map.contains_key("max") && map.len() == 2 {
                let mut out = Vec::new();
                out.extend(flatten_field(&format!("{field}_min"), &map["min"]));
                out.extend(flatten_field(&format!("{field}_max"), &map["max"]));
                return out;
            }
            // Sub-objects (operating cost, ext map) contribute members.
            let mut out = Vec::new();
            for (key, nested) in map {
                if key == "kind" {
                    continue;
                }
                let name = if field == "ext" {
                    key.clone()
                } else {
                    format!("{field}_{key}")
                };
                out.extend(flatten_field(&name, nested));
            }
            out
        }
        Value::Array(_) => Vec::new(),
    }
}
