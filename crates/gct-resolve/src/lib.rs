//! # gct-resolve: Tabular Property Resolver
//!
//! Turns raw relational property rows into final per-object values. The
//! precedence passes are, in order: rows tagged with an active scenario
//! beat base-case rows (first configured scenario wins on conflict), then
//! rows date-windowed around the study year beat unwindowed rows. What
//! remains is chased through datafile/variable indirection (one level),
//! combined with its arithmetic action, and normalized through the unit
//! model.
//!
//! The resolver is deliberately a pure function of its inputs: no caching,
//! no globals, identical rows always resolve to identical values.

pub mod record;
pub mod resolver;
pub mod store;
pub mod value;

pub use record::PropertyRecord;
pub use resolver::{resolve_properties, ResolverContext, VariableSpec};
pub use store::{CsvTableStore, MemoryTableStore, TableStore};
pub use value::{ResolvedProperties, ResolvedValue};
