//! Recognized tabular layouts and layout detection.
//!
//! Source tables arrive in one of a fixed set of column shapes. Detection
//! finds the layout whose required column set is the largest subset of the
//! columns actually present; an unrecognized shape is a format error the
//! caller must surface, never work around.

/// Trailing wide-column block some layouts carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WideBlock {
    /// Columns "1".."24", one per hour of day.
    Hours,
    /// Columns "1".."12", one per month.
    Months,
}

/// Closed set of recognized column layouts. Variant names spell the key
/// columns: N = name, Y = year, M = month, D = day, P = period, H = hour,
/// V = value; `Ts` prefixes time-varying shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::upper_case_acronyms)]
pub enum TableLayout {
    NV,
    Y,
    PV,
    TsNPV,
    TsNYV,
    TsNDV,
    TsYMDP,
    TsYMDPV,
    TsNYMDV,
    TsNYMDPV,
    TsYM,
    TsMDP,
    TsNMDP,
    TsYMDH,
    TsNYMDH,
    TsNMDH,
    TsNM,
}

impl TableLayout {
    pub const ALL: &'static [TableLayout] = &[
        TableLayout::NV,
        TableLayout::Y,
        TableLayout::PV,
        TableLayout::TsNPV,
        TableLayout::TsNYV,
        TableLayout::TsNDV,
        TableLayout::TsYMDP,
        TableLayout::TsYMDPV,
        TableLayout::TsNYMDV,
        TableLayout::TsNYMDPV,
        TableLayout::TsYM,
        TableLayout::TsMDP,
        TableLayout::TsNMDP,
        TableLayout::TsYMDH,
        TableLayout::TsNYMDH,
        TableLayout::TsNMDH,
        TableLayout::TsNM,
    ];

    /// Named columns this layout requires.
    pub fn required_columns(&self) -> &'static [&'static str] {
        match self {
            TableLayout::NV => &["name", "value"],
            TableLayout::Y => &["year", "value"],
            TableLayout::PV => &["pattern", "value"],
            TableLayout::TsNPV => &["name", "pattern", "value"],
            TableLayout::TsNYV => &["name", "year", "value"],
            TableLayout::TsNDV => &["name", "datetime", "value"],
            TableLayout::TsYMDP => &["year", "month", "day"],
            TableLayout::TsYMDPV => &["year", "month", "day", "period", "value"],
            TableLayout::TsNYMDV => &["name", "year", "month", "day", "value"],
            TableLayout::TsNYMDPV => &["name", "year", "month", "day", "period", "value"],
            TableLayout::TsYM => &["year", "month", "value"],
            TableLayout::TsMDP => &["month", "day"],
            TableLayout::TsNMDP => &["name", "month", "day"],
            TableLayout::TsYMDH => &["year", "month", "day", "hour", "value"],
            TableLayout::TsNYMDH => &["name", "year", "month", "day", "hour", "value"],
            TableLayout::TsNMDH => &["name", "month", "day", "hour", "value"],
            TableLayout::TsNM => &["name", "month", "value"],
        }
    }

    /// Wide block of numbered columns, if the layout has one.
    pub fn wide_block(&self) -> Option<WideBlock> {
        match self {
            TableLayout::TsYMDP | TableLayout::TsMDP | TableLayout::TsNMDP => {
                Some(WideBlock::Hours)
            }
            _ => None,
        }
    }

    /// Columns identifying a row for deduplication.
    pub fn key_columns(&self) -> &'static [&'static str] {
        match self {
            TableLayout::NV => &["name"],
            TableLayout::Y => &["year"],
            TableLayout::PV => &["pattern"],
            TableLayout::TsNPV => &["name", "pattern"],
            TableLayout::TsNYV => &["name", "year"],
            TableLayout::TsNDV => &["name", "datetime"],
            TableLayout::TsYMDP => &["year", "month", "day"],
            TableLayout::TsYMDPV => &["year", "month", "day", "period"],
            TableLayout::TsNYMDV => &["name", "year", "month", "day"],
            TableLayout::TsNYMDPV => &["name", "year", "month", "day", "period"],
            TableLayout::TsYM => &["year", "month"],
            TableLayout::TsMDP => &["month", "day"],
            TableLayout::TsNMDP => &["name", "month", "day"],
            TableLayout::TsYMDH => &["year", "month", "day", "hour"],
            TableLayout::TsNYMDH => &["name", "year", "month", "day", "hour"],
            TableLayout::TsNMDH => &["name", "month", "day", "hour"],
            TableLayout::TsNM => &["name", "month"],
        }
    }

    /// Match weight: named columns plus the wide block when present.
    fn score(&self, columns: &[String]) -> Option<usize> {
        let has = |name: &str| columns.iter().any(|c| c == name);
        if !self.required_columns().iter().all(|c| has(c)) {
            return None;
        }
        let mut score = self.required_columns().len();
        if let Some(block) = self.wide_block() {
            let count = match block {
                WideBlock::Hours => 24,
                WideBlock::Months => 12,
            };
            let complete = (1..=count).all(|i| has(&i.to_string()));
            if !complete {
                return None;
            }
            score += count;
        }
        Some(score)
    }

    /// Detect the layout of a column set by largest-subset match.
    pub fn detect<I, S>(columns: I) -> Option<TableLayout>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let columns: Vec<String> = columns
            .into_iter()
            .map(|c| c.as_ref().trim().to_lowercase())
            .collect();
        Self::ALL
            .iter()
            .filter_map(|layout| layout.score(&columns).map(|s| (*layout, s)))
            .max_by_key(|(_, score)| *score)
            .map(|(layout, _)| layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_simple_shapes() {
        assert_eq!(TableLayout::detect(["name", "value"]), Some(TableLayout::NV));
        assert_eq!(TableLayout::detect(["pattern", "value"]), Some(TableLayout::PV));
        assert_eq!(
            TableLayout::detect(["name", "DateTime", "value"]),
            Some(TableLayout::TsNDV)
        );
    }

    #[test]
    fn test_largest_subset_wins() {
        // Both NV and TsNYV match; the larger column set wins.
        assert_eq!(
            TableLayout::detect(["name", "year", "value"]),
            Some(TableLayout::TsNYV)
        );
        assert_eq!(
            TableLayout::detect(["name", "year", "month", "day", "period", "value"]),
            Some(TableLayout::TsNYMDPV)
        );
    }

    #[test]
    fn test_wide_hour_block() {
        let mut columns: Vec<String> =
            vec!["year".to_string(), "month".to_string(), "day".to_string()];
        columns.extend((1..=24).map(|i| i.to_string()));
        assert_eq!(TableLayout::detect(&columns), Some(TableLayout::TsYMDP));

        // Incomplete block does not match the wide layout.
        let partial: Vec<String> = columns[..10].to_vec();
        assert_ne!(TableLayout::detect(&partial), Some(TableLayout::TsYMDP));
    }

    #[test]
    fn test_unrecognized_columns() {
        assert_eq!(TableLayout::detect(["foo", "bar"]), None);
    }
}
