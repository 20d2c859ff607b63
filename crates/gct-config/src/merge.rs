//! Deep-override merge for JSON configuration layers.

use serde_json::Value;

/// Keys replaced wholesale instead of merged. These tables are exhaustive
/// mappings: an override that supplies one supplies all of it, and merging
/// would leave stale base rows mixed into the override's table.
pub const REPLACE_KEYS: &[&str] = &[
    "tech_rule_table",
    "device_map",
    "fuel_map",
    "device_name_inference_map",
    "reserve_type_map",
];

/// Merge `overlay` into `base` in place.
///
/// Scalars and arrays in `overlay` replace the base value outright. Nested
/// objects merge key by key recursively, except for the keys listed in
/// [`REPLACE_KEYS`], whose values always replace the base value wholesale.
pub fn update_config(base: &mut Value, overlay: &Value) {
    let (Value::Object(base_map), Value::Object(overlay_map)) = (&mut *base, overlay) else {
        *base = overlay.clone();
        return;
    };
    for (key, overlay_value) in overlay_map {
        if REPLACE_KEYS.contains(&key.as_str()) {
            base_map.insert(key.clone(), overlay_value.clone());
            continue;
        }
        match base_map.get_mut(key) {
            Some(base_value) if base_value.is_object() && overlay_value.is_object() => {
                update_config(base_value, overlay_value);
            }
            _ => {
                base_map.insert(key.clone(), overlay_value.clone());
            }
        }
    }
}

/// Merge any number of override layers onto a base document, later layers
/// taking precedence.
pub fn layer_configs(base: Value, overlays: &[Value]) -> Value {
    let mut merged = base;
    for overlay in overlays {
        update_config(&mut merged, overlay);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalars_replaced() {
        let mut base = json!({"study_year": 2030, "name": "base"});
        update_config(&mut base, &json!({"study_year": 2035}));
        assert_eq!(base["study_year"], 2035);
        assert_eq!(base["name"], "base");
    }

    #[test]
    fn test_nested_objects_merged() {
        let mut base = json!({"defaults": {"voll": 2000.0, "loss": 0.02}});
        update_config(&mut base, &json!({"defaults": {"voll": 9000.0}}));
        assert_eq!(base["defaults"]["voll"], 9000.0);
        assert_eq!(base["defaults"]["loss"], 0.02);
    }

    #[test]
    fn test_replace_keys_not_merged() {
        let mut base = json!({"device_map": {"a": 1, "b": 2}});
        update_config(&mut base, &json!({"device_map": {"c": 3}}));
        // Wholesale replacement: the base entries are gone.
        assert_eq!(base["device_map"], json!({"c": 3}));
    }

    #[test]
    fn test_arrays_replaced() {
        let mut base = json!({"vre_categories": ["wind", "solar"]});
        update_config(&mut base, &json!({"vre_categories": ["solar"]}));
        assert_eq!(base["vre_categories"], json!(["solar"]));
    }

    #[test]
    fn test_layering_order() {
        let merged = layer_configs(
            json!({"x": 1}),
            &[json!({"x": 2, "y": 1}), json!({"y": 3})],
        );
        assert_eq!(merged, json!({"x": 2, "y": 3}));
    }
}
