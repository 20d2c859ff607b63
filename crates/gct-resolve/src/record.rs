//! The raw relational property row consumed by the resolver.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// One property row as queried from a relational source: a value for one
/// object, possibly banded, date-windowed, scenario-tagged, or declared by
/// reference to a datafile/variable object with a combining action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub object_name: String,
    pub property_name: String,
    pub value: Option<f64>,
    pub unit: Option<String>,
    pub band: Option<i64>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub scenario: Option<String>,
    /// Arithmetic action combining the base value with the referenced
    /// value: one of `×ₓ*+-/=`.
    pub action: Option<char>,
    /// Name of a datafile object carrying the referenced file path.
    pub data_file_tag: Option<String>,
    /// Direct file path, when the row carries it inline.
    pub data_file: Option<String>,
    /// Name of a variable object carrying a scalar or another file.
    pub variable_tag: Option<String>,
    /// Timeslice tag text, e.g. `"M1-3"`.
    pub timeslice: Option<String>,
}

impl PropertyRecord {
    pub fn scalar(object_name: &str, property_name: &str, value: f64) -> Self {
        Self {
            object_name: object_name.to_string(),
            property_name: property_name.to_string(),
            value: Some(value),
            ..Self::default()
        }
    }

    pub fn with_scenario(mut self, scenario: &str) -> Self {
        self.scenario = Some(scenario.to_string());
        self
    }

    pub fn with_window(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.date_from = from;
        self.date_to = to;
        self
    }

    pub fn with_band(mut self, band: i64) -> Self {
        self.band = Some(band);
        self
    }

    /// Whether any date window is declared.
    pub fn is_windowed(&self) -> bool {
        self.date_from.is_some() || self.date_to.is_some()
    }

    /// Row eligibility for a study year: the year must fall inside the
    /// window, open-ended on missing bounds.
    pub fn window_contains(&self, study_year: i32) -> bool {
        if let Some(from) = self.date_from {
            if from.year() > study_year {
                return false;
            }
        }
        if let Some(to) = self.date_to {
            if to.year() < study_year {
                return false;
            }
        }
        true
    }

    /// Whether the row declares any indirection.
    pub fn has_reference(&self) -> bool {
        self.data_file_tag.is_some() || self.data_file.is_some() || self.variable_tag.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_window_containment() {
        let r = PropertyRecord::scalar("g", "rating", 1.0)
            .with_window(Some(date(2020, 1, 1)), Some(date(2030, 12, 31)));
        assert!(r.window_contains(2025));
        assert!(r.window_contains(2020));
        assert!(r.window_contains(2030));
        assert!(!r.window_contains(2035));
        assert!(!r.window_contains(2019));
    }

    #[test]
    fn test_open_ended_windows() {
        let from_only =
            PropertyRecord::scalar("g", "rating", 1.0).with_window(Some(date(2028, 1, 1)), None);
        assert!(from_only.window_contains(2100));
        assert!(!from_only.window_contains(2027));

        let unwindowed = PropertyRecord::scalar("g", "rating", 1.0);
        assert!(unwindowed.window_contains(1950));
        assert!(!unwindowed.is_windowed());
    }
}
