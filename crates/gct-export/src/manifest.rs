//! Time-series data files and their JSON pointer manifest.
//!
//! Series export is columnar: one CSV per (component type, variable)
//! with a DateTime column and one column per component. That layout only
//! works when every series attached to a component type has the same
//! length, so the consistency check runs first and failing it is fatal.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use gct_config::RunConfig;
use gct_core::{GctError, GctResult, SingleTimeSeries, System};

/// One manifest entry pointing a component's variable at its data file.
#[derive(Debug, Clone, Serialize)]
pub struct ManifestEntry {
    pub category: String,
    pub component_name: String,
    pub data_file: String,
    pub normalization_factor: f64,
    pub resolution_seconds: u64,
    pub variable_name: String,
}

/// Every series attached to one component type must share a length.
pub fn check_series_consistency(system: &System) -> GctResult<()> {
    let mut lengths: BTreeMap<&str, BTreeMap<usize, Vec<&str>>> = BTreeMap::new();
    for (component_type, name, series) in system.all_time_series() {
        lengths
            .entry(component_type)
            .or_default()
            .entry(series.len())
            .or_default()
            .push(name);
    }
    let conflicting: Vec<String> = lengths
        .iter()
        .filter(|(_, by_len)| by_len.len() > 1)
        .map(|(ty, by_len)| {
            let detail: Vec<String> = by_len
                .iter()
                .map(|(len, names)| format!("{len} hours ({})", names.join(", ")))
                .collect();
            format!("{ty}: {}", detail.join(" vs "))
        })
        .collect();
    if conflicting.is_empty() {
        Ok(())
    } else {
        Err(GctError::Consistency(format!(
            "mixed series lengths within a component type: {}",
            conflicting.join("; ")
        )))
    }
}

/// Write one CSV per (component type, variable) plus the JSON manifest.
/// Returns the manifest entries in written order.
pub fn write_series(
    system: &System,
    run: &RunConfig,
    out_dir: &Path,
) -> Result<Vec<ManifestEntry>> {
    check_series_consistency(system)?;

    // Group columns per (type, variable) file.
    let mut files: BTreeMap<(String, String), Vec<(String, &SingleTimeSeries)>> =
        BTreeMap::new();
    for (component_type, name, series) in system.all_time_series() {
        files
            .entry((component_type.to_string(), series.variable_name.clone()))
            .or_default()
            .push((name.to_string(), series));
    }

    let mut entries = Vec::new();
    for ((component_type, variable), columns) in &files {
        let file_name = run.time_series_filename(component_type, variable);
        let path = out_dir.join(&file_name);
        write_series_file(&path, columns)
            .with_context(|| format!("writing series file {file_name}"))?;
        for (name, series) in columns {
            entries.push(ManifestEntry {
                category: component_type.clone(),
                component_name: name.clone(),
                data_file: file_name.clone(),
                normalization_factor: 1.0,
                resolution_seconds: series.resolution.as_secs(),
                variable_name: variable.clone(),
            });
        }
    }

    let manifest_path = out_dir.join("timeseries_manifest.json");
    let file = std::fs::File::create(&manifest_path)
        .with_context(|| format!("creating {}", manifest_path.display()))?;
    serde_json::to_writer_pretty(file, &entries).context("writing manifest JSON")?;
    Ok(entries)
}

/// DateTime column plus one column per component. The first column's
/// timestamps drive every row; lengths were checked upstream.
fn write_series_file(path: &Path, columns: &[(String, &SingleTimeSeries)]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("creating CSV writer for {}", path.display()))?;

    let mut header = vec!["DateTime".to_string()];
    header.extend(columns.iter().map(|(name, _)| name.clone()));
    wtr.write_record(&header).context("writing CSV header")?;

    let (_, first) = &columns[0];
    for i in 0..first.len() {
        let timestamp = first
            .timestamp_at(i)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        let mut record = vec![timestamp];
        for (_, series) in columns {
            record.push(
                series
                    .data
                    .get(i)
                    .map(|v| v.to_string())
                    .unwrap_or_default(),
            );
        }
        wtr.write_record(&record).context("writing CSV record")?;
    }
    wtr.flush().context("flushing CSV writer")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gct_core::{ACBus, PowerLoad};

    fn run_config() -> RunConfig {
        RunConfig {
            name: "manifest_test".to_string(),
            study_year: 2030,
            weather_year: None,
            scenario: None,
            active_scenarios: Vec::new(),
            run_folder: "/tmp".into(),
            output_folder: "/tmp".into(),
            time_series_fname: gct_config::DEFAULT_TS_FNAME.to_string(),
        }
    }

    fn system_with_loads(lengths: &[usize]) -> System {
        let mut system = System::new("manifest");
        system.add_component(ACBus::new(1, "bus1")).unwrap();
        for (i, len) in lengths.iter().enumerate() {
            let name = format!("load{i}");
            system
                .add_component(PowerLoad::new(&name, "bus1"))
                .unwrap();
            system
                .add_time_series(
                    "PowerLoad",
                    &name,
                    SingleTimeSeries::hourly_for_year(
                        "max_active_power",
                        2030,
                        vec![1.0; *len],
                    )
                    .unwrap(),
                )
                .unwrap();
        }
        system
    }

    #[test]
    fn mixed_lengths_are_fatal_and_name_the_type() {
        let system = system_with_loads(&[24, 48]);
        let err = check_series_consistency(&system).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("PowerLoad"));
        assert!(message.contains("24"));
        assert!(message.contains("48"));
    }

    #[test]
    fn one_file_per_type_and_variable_with_a_column_per_component() {
        let system = system_with_loads(&[24, 24]);
        let dir = tempfile::tempdir().unwrap();
        let entries = write_series(&system, &run_config(), dir.path()).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.data_file == entries[0].data_file));
        assert_eq!(entries[0].resolution_seconds, 3600);

        let body =
            std::fs::read_to_string(dir.path().join(&entries[0].data_file)).unwrap();
        let header = body.lines().next().unwrap();
        assert_eq!(header, "DateTime,load0,load1");
        assert_eq!(body.lines().count(), 25);

        let manifest =
            std::fs::read_to_string(dir.path().join("timeseries_manifest.json")).unwrap();
        assert!(manifest.contains("max_active_power"));
    }
}
