//! # gct-ts: Time Series Reconciliation
//!
//! Normalizes heterogeneous time-indexed tables into canonical
//! hourly-aligned vectors covering exactly one target year.
//!
//! The pipeline is: detect the table's column [`layout::TableLayout`],
//! reduce rows to canonical calendar fields, deduplicate (first kept, with
//! a warning), place into target-year hour slots, forward-fill gaps (never
//! interpolate), and fix the length for leap years (February 29 duplicates
//! February 28, a fixed convention). Half-hourly sources average pairs into
//! hour buckets; timeslice tags like `"M1-3;M7"` expand via
//! [`patterns::parse_patterns`].

pub mod calendar;
pub mod layout;
pub mod patterns;
pub mod reconcile;

pub use calendar::{hours_in_year, is_leap_year, HOURS_COMMON, HOURS_LEAP};
pub use layout::TableLayout;
pub use patterns::{parse_patterns, PatternKind};
pub use reconcile::{adjust_length, normalize, reconcile, time_slice_handler, NormalRow};
