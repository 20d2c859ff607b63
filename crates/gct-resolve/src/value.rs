//! Resolved property values.

use std::collections::{BTreeMap, BTreeSet};

use gct_core::{Quantity, SingleTimeSeries};

/// What a property resolved to: a unit-carrying scalar, a bare scalar when
/// no unit applies, or a full hourly series when the source is
/// time-varying.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedValue {
    Scalar(Quantity),
    Raw(f64),
    Series(SingleTimeSeries),
}

impl ResolvedValue {
    /// Scalar magnitude, if this value is not a series.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            ResolvedValue::Scalar(q) => Some(q.magnitude()),
            ResolvedValue::Raw(v) => Some(*v),
            ResolvedValue::Series(_) => None,
        }
    }

    pub fn as_series(&self) -> Option<&SingleTimeSeries> {
        match self {
            ResolvedValue::Series(ts) => Some(ts),
            _ => None,
        }
    }

    /// Scalar magnitude or the series maximum, the value used when a
    /// nameplate rating is derived from a time-varying property.
    pub fn magnitude_or_max(&self) -> f64 {
        match self {
            ResolvedValue::Scalar(q) => q.magnitude(),
            ResolvedValue::Raw(v) => *v,
            ResolvedValue::Series(ts) => ts.max(),
        }
    }
}

/// Output of resolving one object's property rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedProperties {
    pub values: BTreeMap<String, ResolvedValue>,
    /// Properties that arrived in multiple bands; surfaced for diagnostics,
    /// never combined automatically.
    pub multi_band: BTreeSet<String>,
}

impl ResolvedProperties {
    pub fn get(&self, name: &str) -> Option<&ResolvedValue> {
        self.values.get(name)
    }

    pub fn scalar(&self, name: &str) -> Option<f64> {
        self.values.get(name).and_then(ResolvedValue::as_scalar)
    }

    pub fn series(&self, name: &str) -> Option<&SingleTimeSeries> {
        self.values.get(name).and_then(ResolvedValue::as_series)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
