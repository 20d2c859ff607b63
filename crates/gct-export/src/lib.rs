//! # gct-export: Target Schema Export
//!
//! Projects a built [`gct_core::System`] into a target model's flat
//! tables: per-class CSV files, columnar time-series data files, and a
//! JSON manifest pointing each component's variables at its file. The
//! projection is the inverse of the resolver: typed fields back to
//! target property names under a shared map with per-class overrides,
//! filtered to the properties the target schema accepts.

pub mod manifest;
pub mod projection;
pub mod tables;

pub use manifest::{check_series_consistency, write_series, ManifestEntry};
pub use projection::{project_component, project_type, ExportRow, ExportSchema};
pub use tables::write_tables;
