//! File loading shared by both pipelines.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use polars::prelude::*;

use gct_core::{Diagnostics, GctError, GctResult};

/// Read one CSV into a frame. Column names are lowercased unless
/// `keep_case` is set (some sources carry case-significant tech names in
/// their headers).
pub fn file_handler(path: &Path, keep_case: bool) -> GctResult<DataFrame> {
    let mut file = File::open(path)
        .map_err(|e| GctError::Parse(format!("cannot open {}: {e}", path.display())))?;
    let mut df = CsvReader::new(&mut file)
        .has_header(true)
        .finish()
        .map_err(|e| GctError::Parse(format!("reading {}: {e}", path.display())))?;
    if !keep_case {
        let lowered: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|c| c.trim().to_lowercase())
            .collect();
        df.set_column_names(&lowered.iter().map(String::as_str).collect::<Vec<_>>())
            .map_err(|e| GctError::Parse(format!("renaming columns in {}: {e}", path.display())))?;
    }
    Ok(df)
}

/// Declared input file: mandatory files abort the run when missing,
/// optional files are warned about and skipped.
#[derive(Debug, Clone)]
pub struct FileSpec {
    pub key: String,
    pub relative_path: String,
    pub mandatory: bool,
    pub keep_case: bool,
}

impl FileSpec {
    pub fn mandatory(key: &str, relative_path: &str) -> Self {
        Self {
            key: key.to_string(),
            relative_path: relative_path.to_string(),
            mandatory: true,
            keep_case: false,
        }
    }

    pub fn optional(key: &str, relative_path: &str) -> Self {
        Self {
            key: key.to_string(),
            relative_path: relative_path.to_string(),
            mandatory: false,
            keep_case: false,
        }
    }
}

/// Frames loaded for a run, keyed by the file map's logical names.
#[derive(Debug, Default)]
pub struct ParserData {
    frames: BTreeMap<String, DataFrame>,
}

impl ParserData {
    /// Load every declared file from a run folder.
    pub fn load(
        run_folder: &Path,
        specs: &[FileSpec],
        diag: &mut Diagnostics,
    ) -> GctResult<Self> {
        let mut frames = BTreeMap::new();
        for spec in specs {
            let path: PathBuf = run_folder.join(&spec.relative_path);
            if !path.exists() {
                if spec.mandatory {
                    return Err(GctError::Config(format!(
                        "mandatory input file '{}' missing at {}",
                        spec.key,
                        path.display()
                    )));
                }
                diag.add_warning(
                    "input",
                    format!("optional input file '{}' missing, skipped", spec.key),
                );
                continue;
            }
            frames.insert(spec.key.clone(), file_handler(&path, spec.keep_case)?);
        }
        Ok(Self { frames })
    }

    pub fn insert(&mut self, key: impl Into<String>, df: DataFrame) {
        self.frames.insert(key.into(), df);
    }

    pub fn get(&self, key: &str) -> Option<&DataFrame> {
        self.frames.get(key)
    }

    /// Frame that must be present by this point in the build.
    pub fn require(&self, key: &str) -> GctResult<&DataFrame> {
        self.frames
            .get(key)
            .ok_or_else(|| GctError::Config(format!("required input '{key}' was not loaded")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_mandatory_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut diag = Diagnostics::new();
        let err = ParserData::load(
            dir.path(),
            &[FileSpec::mandatory("hierarchy", "hierarchy.csv")],
            &mut diag,
        )
        .unwrap_err();
        assert!(matches!(err, GctError::Config(_)));
    }

    #[test]
    fn test_missing_optional_file_warns() {
        let dir = tempfile::tempdir().unwrap();
        let mut diag = Diagnostics::new();
        let data = ParserData::load(
            dir.path(),
            &[FileSpec::optional("emissions", "emit.csv")],
            &mut diag,
        )
        .unwrap();
        assert!(data.get("emissions").is_none());
        assert_eq!(diag.warning_count(), 1);
    }

    #[test]
    fn test_loads_and_lowercases() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("h.csv");
        let mut f = File::create(&path).unwrap();
        writeln!(f, "Region,Zone").unwrap();
        writeln!(f, "p1,west").unwrap();
        drop(f);

        let mut diag = Diagnostics::new();
        let data = ParserData::load(
            dir.path(),
            &[FileSpec::mandatory("hierarchy", "h.csv")],
            &mut diag,
        )
        .unwrap();
        let df = data.require("hierarchy").unwrap();
        assert_eq!(df.get_column_names(), &["region", "zone"]);
    }
}
