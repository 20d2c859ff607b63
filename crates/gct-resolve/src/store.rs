//! Table access behind a trait, so datafile indirection works the same
//! over on-disk CSV folders and pre-read frames.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::PathBuf;

use polars::prelude::*;

use gct_core::{GctError, GctResult};

/// Read one tabular file by the path text a datafile object carries.
pub trait TableStore {
    fn read_table(&self, path: &str) -> GctResult<DataFrame>;
}

/// CSV files under a run folder, column names lowercased on read.
pub struct CsvTableStore {
    root: PathBuf,
}

impl CsvTableStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl TableStore for CsvTableStore {
    fn read_table(&self, path: &str) -> GctResult<DataFrame> {
        let full = self.root.join(path.replace('\\', "/"));
        let mut file = File::open(&full)
            .map_err(|e| GctError::Parse(format!("cannot open data file {}: {e}", full.display())))?;
        let mut df = CsvReader::new(&mut file)
            .has_header(true)
            .finish()
            .map_err(|e| GctError::Parse(format!("reading {}: {e}", full.display())))?;
        let lowered: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|c| c.trim().to_lowercase())
            .collect();
        df.set_column_names(&lowered.iter().map(String::as_str).collect::<Vec<_>>())
            .map_err(|e| GctError::Parse(format!("renaming columns in {}: {e}", full.display())))?;
        Ok(df)
    }
}

/// Frames injected by the caller, keyed by path text. Used for tests and
/// for sources whose tables were already read elsewhere.
#[derive(Default)]
pub struct MemoryTableStore {
    tables: BTreeMap<String, DataFrame>,
}

impl MemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, df: DataFrame) {
        self.tables.insert(path.into(), df);
    }
}

impl TableStore for MemoryTableStore {
    fn read_table(&self, path: &str) -> GctResult<DataFrame> {
        self.tables
            .get(path)
            .cloned()
            .ok_or_else(|| GctError::Parse(format!("no table registered for '{path}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_csv_store_lowercases_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        let mut f = File::create(&path).unwrap();
        writeln!(f, "NAME,Value").unwrap();
        writeln!(f, "a,1.5").unwrap();
        drop(f);

        let store = CsvTableStore::new(dir.path());
        let df = store.read_table("data.csv").unwrap();
        assert_eq!(df.get_column_names(), &["name", "value"]);
        assert_eq!(df.height(), 1);
    }

    #[test]
    fn test_memory_store_missing_table() {
        let store = MemoryTableStore::new();
        assert!(store.read_table("nope.csv").is_err());
    }
}
