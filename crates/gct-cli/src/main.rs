use std::fs::{self, File};
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::FmtSubscriber;

use gct_config::{update_config, ModelConfig, RunConfig};
use gct_core::{Diagnostics, GctError, System};
use gct_export::{write_series, write_tables, ExportSchema};
use gct_parsers::{FileSpec, ParserData, RelationalParser, RelationalSource, TabularParser};
use gct_resolve::CsvTableStore;

mod cli;
use cli::{Cli, Commands, InputModel};

fn main() {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let result = match cli.command {
        Commands::Translate {
            input_model,
            run_config,
            model_config,
            export_schema,
            system_out,
            run_folder,
            output,
            study_year,
            weather_year,
            scenario,
        } => {
            let overrides = RunOverrides {
                run_folder,
                output,
                study_year,
                weather_year,
                scenario,
            };
            translate(
                input_model,
                &run_config,
                model_config.as_deref(),
                export_schema.as_deref(),
                system_out.as_deref(),
                overrides,
            )
        }
        Commands::Validate { system } => validate(&system),
        Commands::Export {
            system,
            run_config,
            export_schema,
        } => export_serialized(&system, &run_config, export_schema.as_deref()),
    };

    if let Err(e) = result {
        tracing::error!("{e:#}");
        std::process::exit(1);
    }
}

/// Command-line values that take precedence over the run configuration.
#[derive(Default)]
struct RunOverrides {
    run_folder: Option<std::path::PathBuf>,
    output: Option<std::path::PathBuf>,
    study_year: Option<i32>,
    weather_year: Option<i32>,
    scenario: Option<String>,
}

impl RunOverrides {
    fn apply(self, run: &mut RunConfig) {
        if let Some(folder) = self.run_folder {
            run.run_folder = folder;
        }
        if let Some(output) = self.output {
            run.output_folder = output;
        }
        if let Some(year) = self.study_year {
            run.study_year = year;
        }
        if let Some(year) = self.weather_year {
            run.weather_year = Some(year);
        }
        if let Some(scenario) = self.scenario {
            run.scenario = Some(scenario);
        }
    }
}

fn translate(
    input_model: InputModel,
    run_config: &Path,
    model_config: Option<&Path>,
    export_schema: Option<&Path>,
    system_out: Option<&Path>,
    overrides: RunOverrides,
) -> Result<()> {
    let mut run = RunConfig::from_file(run_config)?;
    overrides.apply(&mut run);
    let config = load_model_config(model_config)?;
    info!(
        "translating '{}' for study year {}",
        run.name, run.study_year
    );

    let (system, diag) = match input_model {
        InputModel::Plexos => {
            let mut diag = Diagnostics::new();
            let source = RelationalSource::load(&run.run_folder, &mut diag)?;
            let store = CsvTableStore::new(&run.run_folder);
            let parser = RelationalParser::new(source, &config, &run, &store);
            let (system, build_diag) = parser.build()?;
            diag.merge(build_diag);
            (system, diag)
        }
        InputModel::Reeds => {
            let mut diag = Diagnostics::new();
            let specs = tabular_file_specs();
            let data = ParserData::load(&run.run_folder, &specs, &mut diag)?;
            let parser = TabularParser::new(data, &config, &run);
            let (system, build_diag) = parser.build()?;
            diag.merge(build_diag);
            (system, diag)
        }
    };

    system.check_references()?;
    report(&diag);

    fs::create_dir_all(&run.output_folder).with_context(|| {
        format!("creating output folder {}", run.output_folder.display())
    })?;

    let schema = load_export_schema(export_schema)?;
    let written = write_tables(&system, &schema, &run, &run.output_folder)?;
    for (table, count) in &written {
        info!("wrote {count} rows to {table}.csv");
    }
    let entries = write_series(&system, &run, &run.output_folder)?;
    info!("wrote {} time-series pointers", entries.len());

    let diag_path = run.output_folder.join("diagnostics.json");
    let diag_file = File::create(&diag_path)
        .with_context(|| format!("creating {}", diag_path.display()))?;
    serde_json::to_writer_pretty(diag_file, &diag).context("writing diagnostics")?;

    if let Some(path) = system_out {
        let file =
            File::create(path).with_context(|| format!("creating {}", path.display()))?;
        system.to_json(file)?;
        info!("serialized system to {}", path.display());
    }
    Ok(())
}

fn validate(path: &Path) -> Result<()> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let system = System::from_json(file)?;
    system.check_references()?;
    info!("{} components, references intact", system.len());
    Ok(())
}

fn export_serialized(
    system_path: &Path,
    run_config: &Path,
    export_schema: Option<&Path>,
) -> Result<()> {
    let run = RunConfig::from_file(run_config)?;
    let file = File::open(system_path)
        .with_context(|| format!("opening {}", system_path.display()))?;
    let system = System::from_json(file)?;

    fs::create_dir_all(&run.output_folder).with_context(|| {
        format!("creating output folder {}", run.output_folder.display())
    })?;
    let schema = load_export_schema(export_schema)?;
    write_tables(&system, &schema, &run, &run.output_folder)?;
    write_series(&system, &run, &run.output_folder)?;
    Ok(())
}

/// Built-in defaults layered under the user's overrides.
fn load_model_config(path: Option<&Path>) -> Result<ModelConfig> {
    let Some(path) = path else {
        return Ok(ModelConfig::default());
    };
    let mut base = serde_json::to_value(ModelConfig::default())
        .context("serializing built-in model defaults")?;
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let overlay: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| GctError::Config(format!("invalid model config {}: {e}", path.display())))?;
    update_config(&mut base, &overlay);
    let config: ModelConfig = serde_json::from_value(base)
        .map_err(|e| GctError::Config(format!("model config {} rejected: {e}", path.display())))?;
    Ok(config)
}

fn load_export_schema(path: Option<&Path>) -> Result<ExportSchema> {
    match path {
        Some(path) => Ok(ExportSchema::from_file(path)?),
        None => {
            warn!("no export schema given, emitting fields under their internal names");
            Ok(ExportSchema::default())
        }
    }
}

fn tabular_file_specs() -> Vec<FileSpec> {
    vec![
        FileSpec::mandatory("hierarchy", "hierarchy.csv"),
        FileSpec::mandatory("capacity", "capacity.csv"),
        FileSpec::optional("fuel_price", "fuel_price.csv"),
        FileSpec::optional("heat_rate", "heat_rate.csv"),
        FileSpec::optional("outages", "outages.csv"),
        FileSpec::optional("storage", "storage.csv"),
        FileSpec::optional("branches", "branches.csv"),
        FileSpec::optional("emissions", "emissions.csv"),
        FileSpec::optional("load", "load.csv"),
        FileSpec::optional("cf", "cf.csv"),
    ]
}

fn report(diag: &Diagnostics) {
    for issue in &diag.issues {
        let entity = issue.entity.as_deref().unwrap_or("-");
        match issue.severity {
            gct_core::Severity::Warning => {
                warn!("[{}] {}: {}", issue.category, entity, issue.message)
            }
            gct_core::Severity::Error => {
                tracing::error!("[{}] {}: {}", issue.category, entity, issue.message)
            }
        }
    }
}
