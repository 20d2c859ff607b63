//! Fixed-resolution time series attached to components.

use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::error::{GctError, GctResult};

pub const HOURLY: Duration = Duration::from_secs(3600);
pub const HALF_HOURLY: Duration = Duration::from_secs(1800);

/// A contiguous series of floats at a single fixed resolution.
///
/// The series is anchored at `initial_timestamp`; sample `i` covers the
/// interval starting at `initial_timestamp + i * resolution`. No timestamps
/// are stored per sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleTimeSeries {
    pub variable_name: String,
    pub initial_timestamp: NaiveDateTime,
    pub resolution: Duration,
    pub data: Vec<f64>,
}

impl SingleTimeSeries {
    /// Create a series, rejecting empty data and zero resolution.
    pub fn new(
        variable_name: impl Into<String>,
        initial_timestamp: NaiveDateTime,
        resolution: Duration,
        data: Vec<f64>,
    ) -> GctResult<Self> {
        let variable_name = variable_name.into();
        if data.is_empty() {
            return Err(GctError::Validation(format!(
                "time series '{variable_name}' has no data"
            )));
        }
        if resolution.is_zero() {
            return Err(GctError::Validation(format!(
                "time series '{variable_name}' has zero resolution"
            )));
        }
        Ok(Self {
            variable_name,
            initial_timestamp,
            resolution,
            data,
        })
    }

    /// Hourly series starting at midnight January 1 of `year`.
    pub fn hourly_for_year(
        variable_name: impl Into<String>,
        year: i32,
        data: Vec<f64>,
    ) -> GctResult<Self> {
        let start = NaiveDate::from_ymd_opt(year, 1, 1)
            .ok_or_else(|| GctError::Validation(format!("invalid year {year}")))?
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| GctError::Validation("invalid midnight timestamp".to_string()))?;
        Self::new(variable_name, start, HOURLY, data)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Timestamp of sample `i`.
    pub fn timestamp_at(&self, i: usize) -> Option<NaiveDateTime> {
        let offset = TimeDelta::from_std(self.resolution.checked_mul(i as u32)?).ok()?;
        self.initial_timestamp.checked_add_signed(offset)
    }

    /// Exclusive end of the covered interval.
    pub fn end_timestamp(&self) -> Option<NaiveDateTime> {
        self.timestamp_at(self.data.len())
    }

    /// Scale every sample in place.
    pub fn scale(&mut self, factor: f64) {
        for v in &mut self.data {
            *v *= factor;
        }
    }

    /// Sum of all samples.
    pub fn total(&self) -> f64 {
        self.data.iter().sum()
    }

    pub fn max(&self) -> f64 {
        self.data.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn mean(&self) -> f64 {
        self.total() / self.data.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hourly_year_anchors_at_midnight() {
        let ts = SingleTimeSeries::hourly_for_year("load", 2030, vec![1.0; 8760]).unwrap();
        assert_eq!(
            ts.initial_timestamp,
            NaiveDate::from_ymd_opt(2030, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
        );
        assert_eq!(ts.len(), 8760);
        assert_eq!(
            ts.end_timestamp().unwrap(),
            NaiveDate::from_ymd_opt(2031, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_empty_data_rejected() {
        let start = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert!(SingleTimeSeries::new("x", start, HOURLY, vec![]).is_err());
    }

    #[test]
    fn test_timestamp_at() {
        let ts = SingleTimeSeries::hourly_for_year("load", 2030, vec![0.0; 48]).unwrap();
        let t25 = ts.timestamp_at(25).unwrap();
        assert_eq!(
            t25,
            NaiveDate::from_ymd_opt(2030, 1, 2).unwrap().and_hms_opt(1, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_scale_and_total() {
        let mut ts = SingleTimeSeries::hourly_for_year("gen", 2030, vec![2.0; 4]).unwrap();
        ts.scale(0.5);
        assert_eq!(ts.total(), 4.0);
        assert_eq!(ts.max(), 1.0);
    }
}
