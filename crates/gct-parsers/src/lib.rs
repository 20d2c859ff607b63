//! # gct-parsers: Source Model Pipelines
//!
//! Two pipelines turn an upstream capacity-expansion or production-cost
//! model into a [`gct_core::System`]:
//!
//! - [`RelationalParser`] reads object/membership/property tuples from a
//!   relational export, resolves properties through scenario and date
//!   precedence, and wires components by membership.
//! - [`TabularParser`] reads a directory of flat CSV tables where the
//!   structure is implied: one bus per region, generators keyed by
//!   (technology, region), directed branch rows merged per corridor.
//!
//! Both collect per-object problems in [`gct_core::Diagnostics`] and
//! reserve hard errors for configuration mistakes.

pub mod frames;
pub mod handler;
pub mod relational;
pub mod tabular;

pub use handler::{file_handler, FileSpec, ParserData};
pub use relational::{MembershipRow, ObjectRow, RelationalParser, RelationalSource};
pub use tabular::TabularParser;
