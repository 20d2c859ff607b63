//! CSV writers for the target schema tables.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};

use gct_config::RunConfig;
use gct_core::{AnyComponent, GeneratorFamily, System};

use crate::projection::{project_component, ExportRow, ExportSchema};

/// Target table -> component selection. Storage-family generators land
/// in their own table; everything else generator-shaped shares one.
const TABLES: &[(&str, &[&str])] = &[
    ("bus", &["ACBus"]),
    ("branch", &["MonitoredLine", "Transformer2W", "DCLine"]),
    ("generator", &["Generator"]),
    ("storage", &["Generator"]),
    ("load", &["PowerLoad"]),
    ("reserve", &["Reserve"]),
];

fn belongs_in(table: &str, component: &AnyComponent) -> bool {
    match component {
        AnyComponent::Generator(g) => {
            let storage = g.family == GeneratorFamily::Storage;
            (table == "storage") == storage
        }
        _ => true,
    }
}

/// Write one CSV per target table into `out_dir`. Returns the row count
/// written per table, in table order.
pub fn write_tables(
    system: &System,
    schema: &ExportSchema,
    run: &RunConfig,
    out_dir: &Path,
) -> Result<Vec<(String, usize)>> {
    let mut written = Vec::new();
    for (table, types) in TABLES {
        let mut rows: Vec<ExportRow> = Vec::new();
        for component_type in *types {
            for component in system.iter_type(component_type) {
                if !belongs_in(table, component) {
                    continue;
                }
                let variables: Vec<String> = system
                    .list_time_series(component_type, component.name())
                    .map(|s| s.variable_name.clone())
                    .collect();
                rows.push(project_component(component, &variables, schema, run)?);
            }
        }
        if rows.is_empty() {
            written.push((table.to_string(), 0));
            continue;
        }
        let path = out_dir.join(format!("{table}.csv"));
        write_rows(&path, &rows)
            .with_context(|| format!("writing table '{table}'"))?;
        written.push((table.to_string(), rows.len()));
    }
    Ok(written)
}

/// Write rows under the union of their keys; absent cells stay empty.
fn write_rows(path: &Path, rows: &[ExportRow]) -> Result<()> {
    let mut columns = BTreeSet::new();
    for row in rows {
        columns.extend(row.keys().cloned());
    }
    let columns: Vec<String> = columns.into_iter().collect();

    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("creating CSV writer for {}", path.display()))?;
    wtr.write_record(&columns).context("writing CSV header")?;
    for row in rows {
        let record: Vec<&str> = columns
            .iter()
            .map(|c| row.get(c).map(String::as_str).unwrap_or(""))
            .collect();
        wtr.write_record(&record).context("writing CSV record")?;
    }
    wtr.flush().context("flushing CSV writer")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gct_core::{ACBus, Generator, PrimeMover, Quantity, Unit};

    fn run_config() -> RunConfig {
        RunConfig {
            name: "tables_test".to_string(),
            study_year: 2030,
            weather_year: None,
            scenario: None,
            active_scenarios: Vec::new(),
            run_folder: "/tmp".into(),
            output_folder: "/tmp".into(),
            time_series_fname: gct_config::DEFAULT_TS_FNAME.to_string(),
        }
    }

    #[test]
    fn storage_generators_split_from_the_rest() {
        let mut system = System::new("split");
        system.add_component(ACBus::new(1, "bus1")).unwrap();
        system
            .add_component(
                Generator::new("gas", "bus1", GeneratorFamily::Thermal, PrimeMover::CC)
                    .with_base_power(Quantity::new(100.0, Unit::Megawatt).unwrap()),
            )
            .unwrap();
        system
            .add_component(
                Generator::new("batt", "bus1", GeneratorFamily::Storage, PrimeMover::BA)
                    .with_base_power(Quantity::new(50.0, Unit::Megawatt).unwrap()),
            )
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let schema = ExportSchema::default();
        let written =
            write_tables(&system, &schema, &run_config(), dir.path()).unwrap();
        let counts: std::collections::BTreeMap<_, _> = written.into_iter().collect();
        assert_eq!(counts["bus"], 1);
        assert_eq!(counts["generator"], 1);
        assert_eq!(counts["storage"], 1);
        assert_eq!(counts["load"], 0);

        let body = std::fs::read_to_string(dir.path().join("generator.csv")).unwrap();
        assert!(body.contains("gas"));
        assert!(!body.contains("batt"));
    }
}
