//! The tabular property resolver.
//!
//! Takes every raw property row for one object and produces final,
//! unit-normalized values: scenario rows beat base-case rows, windowed rows
//! beat unwindowed rows for the study year, datafile/variable references
//! are chased one level and combined with their action, and timeslice rows
//! expand into hourly series. The resolver is a pure function of its
//! inputs; resolving the same rows twice yields the same result.

use std::collections::{BTreeMap, BTreeSet};

use gct_core::{parse_unit, Diagnostics, GctError, GctResult, Quantity, SingleTimeSeries};
use gct_config::ModelConfig;
use gct_core::matching::normalize_name;
use gct_ts::reconcile::reconcile;
use gct_ts::time_slice_handler;

use crate::record::PropertyRecord;
use crate::store::TableStore;
use crate::value::{ResolvedProperties, ResolvedValue};

/// A variable object's payload: a scalar or a further file reference.
#[derive(Debug, Clone, Default)]
pub struct VariableSpec {
    pub value: Option<f64>,
    pub data_file: Option<String>,
}

/// Everything the resolver needs besides the rows themselves.
pub struct ResolverContext<'a> {
    pub store: &'a dyn TableStore,
    /// Datafile object name -> file path text.
    pub datafiles: BTreeMap<String, String>,
    /// Variable object name -> payload.
    pub variables: BTreeMap<String, VariableSpec>,
    /// Scenario precedence order; first wins on conflict.
    pub active_scenarios: Vec<String>,
    pub study_year: i32,
}

impl<'a> ResolverContext<'a> {
    pub fn new(store: &'a dyn TableStore, study_year: i32) -> Self {
        Self {
            store,
            datafiles: BTreeMap::new(),
            variables: BTreeMap::new(),
            active_scenarios: Vec::new(),
            study_year,
        }
    }

    fn scenario_rank(&self, scenario: &str) -> Option<usize> {
        self.active_scenarios.iter().position(|s| s == scenario)
    }
}

/// Resolve one object's property rows.
pub fn resolve_properties(
    records: &[PropertyRecord],
    object_name: &str,
    ctx: &ResolverContext,
    config: &ModelConfig,
    diag: &mut Diagnostics,
) -> GctResult<ResolvedProperties> {
    let mut grouped: BTreeMap<String, Vec<&PropertyRecord>> = BTreeMap::new();
    for record in records {
        if record.object_name != object_name {
            continue;
        }
        grouped
            .entry(record.property_name.clone())
            .or_default()
            .push(record);
    }

    let mut resolved = ResolvedProperties::default();
    for (property_name, rows) in grouped {
        let rows = apply_scenario_precedence(rows, ctx, &property_name, object_name, diag);
        let rows = apply_date_windows(rows, ctx.study_year);
        if rows.is_empty() {
            continue;
        }
        let mapped_name = config.map_property(&property_name).to_string();

        let bands: BTreeSet<i64> = rows.iter().filter_map(|r| r.band).collect();
        if bands.len() > 1 {
            // Multiple bands are surfaced per band, never combined.
            resolved.multi_band.insert(mapped_name.clone());
            diag.add_warning_with_entity(
                "resolver",
                format!("property '{property_name}' has {} bands, left uncombined", bands.len()),
                object_name,
            );
            for row in &rows {
                let band = row.band.unwrap_or(1);
                let value = resolve_row(row, &mapped_name, object_name, ctx, config)?;
                resolved
                    .values
                    .insert(format!("{mapped_name}_{band}"), value);
            }
            continue;
        }

        if rows.iter().any(|r| r.timeslice.is_some()) {
            let slices: Vec<(String, f64)> = rows
                .iter()
                .filter_map(|r| {
                    r.timeslice
                        .clone()
                        .and_then(|t| r.value.map(|v| (t, v)))
                })
                .collect();
            let hourly = time_slice_handler(&slices, ctx.study_year)
                .map_err(|e| GctError::Parse(e.to_string()))?;
            let series =
                SingleTimeSeries::hourly_for_year(mapped_name.clone(), ctx.study_year, hourly)?;
            resolved
                .values
                .insert(mapped_name, ResolvedValue::Series(series));
            continue;
        }

        // The precedence passes usually leave one row; duplicate rows
        // surviving them keep the first and warn, like the frame dedup.
        if rows.len() > 1 {
            diag.add_warning_with_entity(
                "resolver",
                format!(
                    "{} rows remain for '{mapped_name}', keeping the first",
                    rows.len()
                ),
                object_name,
            );
        }
        let row = rows[0];
        let value = resolve_row(row, &mapped_name, object_name, ctx, config)?;
        resolved.values.insert(mapped_name, value);
    }
    Ok(resolved)
}

/// Keep scenario-tagged rows over base rows; among several active
/// scenarios the first in the configured order wins.
fn apply_scenario_precedence<'r>(
    rows: Vec<&'r PropertyRecord>,
    ctx: &ResolverContext,
    property_name: &str,
    object_name: &str,
    diag: &mut Diagnostics,
) -> Vec<&'r PropertyRecord> {
    let mut tagged: Vec<(usize, &PropertyRecord)> = Vec::new();
    let mut base: Vec<&PropertyRecord> = Vec::new();
    for row in rows {
        match &row.scenario {
            None => base.push(row),
            Some(scenario) => {
                if let Some(rank) = ctx.scenario_rank(scenario) {
                    tagged.push((rank, row));
                }
                // Rows tagged with inactive scenarios are dropped.
            }
        }
    }
    if tagged.is_empty() {
        return base;
    }
    let best = tagged.iter().map(|(rank, _)| *rank).min().unwrap_or(0);
    let distinct: BTreeSet<usize> = tagged.iter().map(|(rank, _)| *rank).collect();
    if distinct.len() > 1 {
        diag.add_warning_with_entity(
            "resolver",
            format!(
                "property '{property_name}' set by {} active scenarios, using '{}'",
                distinct.len(),
                ctx.active_scenarios[best]
            ),
            object_name,
        );
    }
    tagged
        .into_iter()
        .filter(|(rank, _)| *rank == best)
        .map(|(_, row)| row)
        .collect()
}

/// Drop rows whose window excludes the study year; windowed rows override
/// unwindowed ones when both remain.
fn apply_date_windows<'r>(
    rows: Vec<&'r PropertyRecord>,
    study_year: i32,
) -> Vec<&'r PropertyRecord> {
    let eligible: Vec<&PropertyRecord> = rows
        .into_iter()
        .filter(|r| r.window_contains(study_year))
        .collect();
    let windowed: Vec<&PropertyRecord> = eligible
        .iter()
        .copied()
        .filter(|r| r.is_windowed())
        .collect();
    if windowed.is_empty() {
        eligible
    } else {
        windowed
    }
}

/// Resolve a single effective row: chase references, apply the action,
/// attach the unit.
fn resolve_row(
    row: &PropertyRecord,
    mapped_name: &str,
    object_name: &str,
    ctx: &ResolverContext,
    config: &ModelConfig,
) -> GctResult<ResolvedValue> {
    let referenced = resolve_reference(row, object_name, ctx)?;

    let combined = match (row.value, referenced) {
        (Some(base), Some(referenced)) => {
            apply_action(row.action, base, referenced, mapped_name)?
        }
        (None, Some(referenced)) => referenced,
        (Some(base), None) => Referenced::Scalar(base),
        (None, None) => {
            return Err(GctError::Unsupported(format!(
                "property '{}' of '{object_name}' carries neither a value nor a recognized reference",
                row.property_name
            )))
        }
    };

    let unit_text = row
        .unit
        .clone()
        .or_else(|| config.unit_map.get(mapped_name).cloned());
    Ok(match combined {
        Referenced::Scalar(v) => match unit_text.as_deref().and_then(parse_unit) {
            Some(unit) => ResolvedValue::Scalar(Quantity::new(v, unit)?),
            None => ResolvedValue::Raw(v),
        },
        Referenced::Series(data) => {
            let series =
                SingleTimeSeries::hourly_for_year(mapped_name.to_string(), ctx.study_year, data)?;
            ResolvedValue::Series(series)
        }
    })
}

enum Referenced {
    Scalar(f64),
    Series(Vec<f64>),
}

/// Chase datafile/variable indirection, at most one level deep
/// (variable -> datafile).
fn resolve_reference(
    row: &PropertyRecord,
    object_name: &str,
    ctx: &ResolverContext,
) -> GctResult<Option<Referenced>> {
    if let Some(variable_tag) = &row.variable_tag {
        let spec = ctx.variables.get(variable_tag).ok_or_else(|| {
            GctError::Unsupported(format!(
                "property '{}' of '{object_name}' references unknown variable '{variable_tag}'",
                row.property_name
            ))
        })?;
        if let Some(value) = spec.value {
            return Ok(Some(Referenced::Scalar(value)));
        }
        if let Some(path) = &spec.data_file {
            return read_series(path, object_name, ctx).map(Some);
        }
        return Err(GctError::Unsupported(format!(
            "variable '{variable_tag}' carries neither a value nor a data file"
        )));
    }

    let path = match (&row.data_file, &row.data_file_tag) {
        (Some(path), _) => Some(path.clone()),
        (None, Some(tag)) => Some(ctx.datafiles.get(tag).cloned().ok_or_else(|| {
            GctError::Unsupported(format!(
                "property '{}' of '{object_name}' references unknown datafile '{tag}'",
                row.property_name
            ))
        })?),
        (None, None) => None,
    };
    match path {
        Some(path) => read_series(&path, object_name, ctx).map(Some),
        None => Ok(None),
    }
}

/// Read a referenced table and pick the column/series for this object:
/// its own name if present, otherwise the single unnamed series.
fn read_series(path: &str, object_name: &str, ctx: &ResolverContext) -> GctResult<Referenced> {
    let df = ctx.store.read_table(path)?;
    let mut scratch = Diagnostics::new();
    let by_name = reconcile(&df, ctx.study_year, &mut scratch)
        .map_err(|e| GctError::Parse(format!("data file '{path}': {e}")))?;

    let wanted = normalize_name(object_name);
    if let Some((_, data)) = by_name
        .iter()
        .find(|(name, _)| normalize_name(name) == wanted)
    {
        return Ok(Referenced::Series(data.clone()));
    }
    if by_name.len() == 1 {
        let (_, data) = by_name.into_iter().next().unwrap_or_default();
        return Ok(Referenced::Series(data));
    }
    Err(GctError::Unsupported(format!(
        "data file '{path}' has no series for object '{object_name}'"
    )))
}

/// Combine base and referenced values elementwise.
fn apply_action(
    action: Option<char>,
    base: f64,
    referenced: Referenced,
    mapped_name: &str,
) -> GctResult<Referenced> {
    let op: fn(f64, f64) -> f64 = match action {
        Some('×') | Some('*') | Some('x') => |b, r| b * r,
        Some('+') => |b, r| b + r,
        Some('-') => |b, r| b - r,
        Some('/') => |b, r| b / r,
        Some('=') | None => |_, r| r,
        Some(other) => {
            return Err(GctError::Unsupported(format!(
                "unrecognized action '{other}' on property '{mapped_name}'"
            )))
        }
    };
    Ok(match referenced {
        Referenced::Scalar(r) => Referenced::Scalar(op(base, r)),
        Referenced::Series(data) => {
            Referenced::Series(data.into_iter().map(|r| op(base, r)).collect())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryTableStore;
    use chrono::NaiveDate;
    use polars::prelude::*;

    fn date(y: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, 1, 1).unwrap()
    }

    fn resolve_with(
        records: &[PropertyRecord],
        ctx: &ResolverContext,
    ) -> (ResolvedProperties, Diagnostics) {
        let config = ModelConfig::default();
        let mut diag = Diagnostics::new();
        let props = resolve_properties(records, "gen-1", ctx, &config, &mut diag).unwrap();
        (props, diag)
    }

    #[test]
    fn test_scenario_precedence() {
        let store = MemoryTableStore::new();
        let records = vec![
            PropertyRecord::scalar("gen-1", "Max Capacity", 10.0),
            PropertyRecord::scalar("gen-1", "Max Capacity", 20.0).with_scenario("high-demand"),
        ];

        let mut ctx = ResolverContext::new(&store, 2030);
        ctx.active_scenarios = vec!["high-demand".to_string()];
        let (props, _) = resolve_with(&records, &ctx);
        assert_eq!(props.scalar("Max Capacity"), Some(20.0));

        let ctx = ResolverContext::new(&store, 2030);
        let (props, _) = resolve_with(&records, &ctx);
        assert_eq!(props.scalar("Max Capacity"), Some(10.0));
    }

    #[test]
    fn test_first_active_scenario_wins_with_warning() {
        let store = MemoryTableStore::new();
        let records = vec![
            PropertyRecord::scalar("gen-1", "p", 1.0).with_scenario("a"),
            PropertyRecord::scalar("gen-1", "p", 2.0).with_scenario("b"),
        ];
        let mut ctx = ResolverContext::new(&store, 2030);
        ctx.active_scenarios = vec!["b".to_string(), "a".to_string()];
        let (props, diag) = resolve_with(&records, &ctx);
        assert_eq!(props.scalar("p"), Some(2.0));
        assert_eq!(diag.warning_count(), 1);
    }

    #[test]
    fn test_duplicate_base_rows_keep_first_with_warning() {
        let store = MemoryTableStore::new();
        let records = vec![
            PropertyRecord::scalar("gen-1", "rating", 100.0),
            PropertyRecord::scalar("gen-1", "rating", 80.0),
        ];
        let ctx = ResolverContext::new(&store, 2030);
        let (props, diag) = resolve_with(&records, &ctx);
        assert_eq!(props.scalar("rating"), Some(100.0));
        assert!(diag
            .issues
            .iter()
            .any(|i| i.message.contains("keeping the first")));
    }

    #[test]
    fn test_date_windowing() {
        let store = MemoryTableStore::new();
        let records = vec![
            PropertyRecord::scalar("gen-1", "rating", 100.0)
                .with_window(Some(date(2020)), Some(date(2030))),
            PropertyRecord::scalar("gen-1", "rating", 80.0),
        ];
        let ctx = ResolverContext::new(&store, 2025);
        let (props, _) = resolve_with(&records, &ctx);
        assert_eq!(props.scalar("rating"), Some(100.0));

        let ctx = ResolverContext::new(&store, 2035);
        let (props, _) = resolve_with(&records, &ctx);
        assert_eq!(props.scalar("rating"), Some(80.0));
    }

    #[test]
    fn test_multi_band_flagged_not_combined() {
        let store = MemoryTableStore::new();
        let records = vec![
            PropertyRecord::scalar("gen-1", "heat rate", 9.0).with_band(1),
            PropertyRecord::scalar("gen-1", "heat rate", 11.0).with_band(2),
        ];
        let ctx = ResolverContext::new(&store, 2030);
        let (props, diag) = resolve_with(&records, &ctx);
        assert!(props.multi_band.contains("heat rate"));
        assert_eq!(props.scalar("heat rate_1"), Some(9.0));
        assert_eq!(props.scalar("heat rate_2"), Some(11.0));
        assert!(props.get("heat rate").is_none());
        assert_eq!(diag.warning_count(), 1);
    }

    #[test]
    fn test_unit_parsing_and_raw_fallback() {
        let store = MemoryTableStore::new();
        let mut with_unit = PropertyRecord::scalar("gen-1", "fuel price", 3.5);
        with_unit.unit = Some("$/MMBtu".to_string());
        let mut no_unit = PropertyRecord::scalar("gen-1", "units", 2.0);
        no_unit.unit = Some("-".to_string());
        let ctx = ResolverContext::new(&store, 2030);
        let (props, _) = resolve_with(&[with_unit, no_unit], &ctx);
        assert!(matches!(props.get("fuel price"), Some(ResolvedValue::Scalar(_))));
        assert!(matches!(props.get("units"), Some(ResolvedValue::Raw(_))));
    }

    #[test]
    fn test_datafile_reference_with_action() {
        let mut store = MemoryTableStore::new();
        store.insert(
            "profiles.csv",
            df!("name" => &["gen-1"], "value" => &[0.5]).unwrap(),
        );
        let mut record = PropertyRecord::scalar("gen-1", "rating", 100.0);
        record.data_file = Some("profiles.csv".to_string());
        record.action = Some('×');

        let ctx = ResolverContext::new(&store, 2030);
        let (props, _) = resolve_with(&[record], &ctx);
        let series = props.series("rating").unwrap();
        assert_eq!(series.len(), 8760);
        assert!(series.data.iter().all(|v| *v == 50.0));
    }

    #[test]
    fn test_variable_to_datafile_one_level() {
        let mut store = MemoryTableStore::new();
        store.insert(
            "var.csv",
            df!("name" => &["gen-1"], "value" => &[2.0]).unwrap(),
        );
        let mut record = PropertyRecord::scalar("gen-1", "rating", 10.0);
        record.variable_tag = Some("scale-var".to_string());
        record.action = Some('+');

        let mut ctx = ResolverContext::new(&store, 2030);
        ctx.variables.insert(
            "scale-var".to_string(),
            VariableSpec {
                value: None,
                data_file: Some("var.csv".to_string()),
            },
        );
        let (props, _) = resolve_with(&[record], &ctx);
        let series = props.series("rating").unwrap();
        assert!(series.data.iter().all(|v| *v == 12.0));
    }

    #[test]
    fn test_unknown_reference_is_unsupported() {
        let store = MemoryTableStore::new();
        let mut record = PropertyRecord::scalar("gen-1", "rating", 10.0);
        record.value = None;
        record.data_file_tag = Some("missing-tag".to_string());
        let ctx = ResolverContext::new(&store, 2030);
        let config = ModelConfig::default();
        let mut diag = Diagnostics::new();
        let err = resolve_properties(&[record], "gen-1", &ctx, &config, &mut diag).unwrap_err();
        assert!(matches!(err, GctError::Unsupported(_)));
    }

    #[test]
    fn test_timeslice_expansion() {
        let store = MemoryTableStore::new();
        let mut winter = PropertyRecord::scalar("gen-1", "rating factor", 90.0);
        winter.timeslice = Some("M1-3;M10-12".to_string());
        let mut summer = PropertyRecord::scalar("gen-1", "rating factor", 70.0);
        summer.timeslice = Some("M4-9".to_string());

        let ctx = ResolverContext::new(&store, 2030);
        let (props, _) = resolve_with(&[winter, summer], &ctx);
        let series = props.series("rating factor").unwrap();
        assert_eq!(series.data[0], 90.0);
        // July 1.
        assert_eq!(series.data[181 * 24], 70.0);
    }

    #[test]
    fn test_resolver_is_idempotent() {
        let store = MemoryTableStore::new();
        let records = vec![
            PropertyRecord::scalar("gen-1", "a", 1.0),
            PropertyRecord::scalar("gen-1", "b", 2.0).with_band(1),
        ];
        let ctx = ResolverContext::new(&store, 2030);
        let (first, _) = resolve_with(&records, &ctx);
        let (second, _) = resolve_with(&records, &ctx);
        assert_eq!(first, second);
    }
}
