//! # gct-core: Translation Model Core
//!
//! Fundamental data structures for translating capacity-expansion and
//! production-cost models: a typed component graph, a runtime unit system,
//! fixed-resolution time series, and the diagnostics/error taxonomy shared
//! by every pipeline crate.
//!
//! ## Design Philosophy
//!
//! A translated model is a [`System`]: a flat container of typed components
//! keyed by `(component_type, name)`, with time series attached per
//! `(component, variable_name)` pair. Cross-references between components
//! (generator to bus, load to bus) are stored as **names**, matching how
//! source models address objects; [`System::check_references`] validates
//! them after assembly.
//!
//! Two error channels run through every pipeline:
//! - **Fatal** conditions return [`GctError`] through `Result`.
//! - **Per-object** problems (a device missing required fields, an unmapped
//!   category) are recorded in [`Diagnostics`] and the object is skipped, so
//!   one malformed device never aborts a translation.
//!
//! ## Quick Start
//!
//! ```rust
//! use gct_core::*;
//!
//! let mut system = System::new("toy");
//! system.add_component(ACBus::new(1, "node-1"))?;
//!
//! let gen = Generator::new("gas-1", "node-1", GeneratorFamily::Thermal, PrimeMover::CT)
//!     .with_base_power(Quantity::new(200.0, Unit::Megawatt)?)
//!     .with_fuel(Fuel::NaturalGas);
//! system.add_component(gen)?;
//!
//! let profile = SingleTimeSeries::hourly_for_year("max_active_power", 2030, vec![1.0; 8760])?;
//! system.add_time_series("Generator", "gas-1", profile)?;
//!
//! system.check_references()?;
//! # Ok::<(), GctError>(())
//! ```
//!
//! ## Modules
//!
//! - [`components`] - Typed component model (topology, branches, generators, services)
//! - [`system`] - The keyed System container with JSON round trip
//! - [`units`] - Runtime units and finite quantities
//! - [`timeseries`] - Fixed-resolution series
//! - [`diagnostics`] - Per-object warning/error collection
//! - [`matching`] - Approximate string matching for map lookups

pub mod components;
pub mod diagnostics;
pub mod error;
pub mod matching;
pub mod system;
pub mod timeseries;
pub mod units;

pub use components::{
    ACBus, AnyComponent, Area, BusType, Component, DCLine, Emission, EmissionType, ExtValue, Fuel,
    Generator, GeneratorFamily, LoadZone, MinMax, MonitoredLine, OperatingCost, PowerLoad,
    PrimeMover, Reserve, ReserveDirection, ReserveMap, ReserveType, Transformer2W,
    TransmissionInterface, TransmissionInterfaceMap,
};
pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity};
pub use error::{GctError, GctResult};
pub use system::System;
pub use timeseries::{SingleTimeSeries, HALF_HOURLY, HOURLY};
pub use units::{parse_unit, Quantity, Unit, UnitKind};
