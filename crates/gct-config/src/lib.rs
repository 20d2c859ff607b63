//! # gct-config: Model and Run Configuration
//!
//! Configuration objects parameterizing the resolver and the component
//! builders: per-model property/unit/technology maps ([`ModelConfig`]),
//! JSON layer merging with documented replace-wholesale keys
//! ([`update_config`]), and the per-run knobs ([`RunConfig`]).
//!
//! All configuration is loaded once from JSON and passed by reference;
//! nothing here is global or mutable after load.

pub mod merge;
pub mod model;
pub mod run;

pub use merge::{layer_configs, update_config, REPLACE_KEYS};
pub use model::{ModelConfig, ReserveSpec, TechDescriptor, TechRule};
pub use run::{RunConfig, DEFAULT_TS_FNAME};
