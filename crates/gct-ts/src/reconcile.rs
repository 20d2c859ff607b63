//! Normalization of raw tables into one hourly vector per name, aligned to
//! a single target year.

use std::collections::BTreeMap;

use anyhow::{anyhow, Context, Result};
use chrono::{NaiveDateTime, Timelike};
use polars::prelude::*;

use gct_core::Diagnostics;

use crate::calendar::{days_in_month, hour_slot, hours_in_year, year_stamps, HOURS_COMMON, HOURS_LEAP};
use crate::layout::{TableLayout, WideBlock};
use crate::patterns::{parse_patterns, stamp_matches};

/// One source row reduced to canonical calendar fields.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalRow {
    pub name: Option<String>,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
    /// Hour of day, 1-based.
    pub hour: Option<u32>,
    pub pattern: Option<String>,
    pub datetime: Option<NaiveDateTime>,
    pub value: f64,
}

impl NormalRow {
    fn empty(value: f64) -> Self {
        Self {
            name: None,
            year: None,
            month: None,
            day: None,
            hour: None,
            pattern: None,
            datetime: None,
            value,
        }
    }

    fn dedup_key(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}|{}",
            self.name.as_deref().unwrap_or(""),
            self.year.map(|v| v.to_string()).unwrap_or_default(),
            self.month.map(|v| v.to_string()).unwrap_or_default(),
            self.day.map(|v| v.to_string()).unwrap_or_default(),
            self.hour.map(|v| v.to_string()).unwrap_or_default(),
            self.pattern.as_deref().unwrap_or(""),
            self.datetime.map(|v| v.to_string()).unwrap_or_default(),
        )
    }
}

fn utf8_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let series = df
        .column(name)?
        .cast(&DataType::Utf8)
        .with_context(|| format!("casting column '{name}' to Utf8"))?;
    Ok(series
        .utf8()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

fn f64_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let series = df
        .column(name)?
        .cast(&DataType::Float64)
        .with_context(|| format!("casting column '{name}' to Float64"))?;
    Ok(series.f64()?.into_iter().collect())
}

fn i64_column(df: &DataFrame, name: &str) -> Result<Vec<Option<i64>>> {
    let series = df
        .column(name)?
        .cast(&DataType::Int64)
        .with_context(|| format!("casting column '{name}' to Int64"))?;
    Ok(series.i64()?.into_iter().collect())
}

/// Reduce a frame of the given layout to canonical rows, expanding wide
/// hour columns and deduplicating under the layout's key columns.
pub fn normalize(df: &DataFrame, layout: TableLayout, diag: &mut Diagnostics) -> Result<Vec<NormalRow>> {
    let mut df = df.clone();
    let lowered: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|c| c.trim().to_lowercase())
        .collect();
    df.set_column_names(&lowered.iter().map(String::as_str).collect::<Vec<_>>())?;

    let height = df.height();
    let has = |name: &str| lowered.iter().any(|c| c == name);

    let names = if has("name") {
        utf8_column(&df, "name")?
    } else {
        vec![None; height]
    };
    let years = if has("year") {
        i64_column(&df, "year")?
    } else {
        vec![None; height]
    };
    let months = if has("month") {
        i64_column(&df, "month")?
    } else {
        vec![None; height]
    };
    let days = if has("day") {
        i64_column(&df, "day")?
    } else {
        vec![None; height]
    };
    let hours = if has("hour") {
        i64_column(&df, "hour")?
    } else if has("period") {
        i64_column(&df, "period")?
    } else {
        vec![None; height]
    };
    let patterns = if has("pattern") {
        utf8_column(&df, "pattern")?
    } else {
        vec![None; height]
    };
    let datetimes = if has("datetime") {
        utf8_column(&df, "datetime")?
            .into_iter()
            .map(|v| v.as_deref().and_then(parse_datetime))
            .collect()
    } else {
        vec![None; height]
    };

    let wide_values: Vec<(u32, Vec<Option<f64>>)> = match layout.wide_block() {
        Some(WideBlock::Hours) => (1..=24u32)
            .map(|h| Ok((h, f64_column(&df, &h.to_string())?)))
            .collect::<Result<_>>()?,
        Some(WideBlock::Months) => (1..=12u32)
            .map(|m| Ok((m, f64_column(&df, &m.to_string())?)))
            .collect::<Result<_>>()?,
        None => Vec::new(),
    };
    let values = if has("value") {
        f64_column(&df, "value")?
    } else {
        vec![None; height]
    };

    let mut rows = Vec::new();
    for i in 0..height {
        let base = NormalRow {
            name: names[i].clone(),
            year: years[i].map(|v| v as i32),
            month: months[i].map(|v| v as u32),
            day: days[i].map(|v| v as u32),
            hour: hours[i].map(|v| v as u32),
            pattern: patterns[i].clone(),
            datetime: datetimes[i],
            value: 0.0,
        };
        if wide_values.is_empty() {
            if let Some(value) = values[i] {
                rows.push(NormalRow { value, ..base });
            }
        } else {
            for (slot, column) in &wide_values {
                if let Some(value) = column[i] {
                    let mut row = NormalRow {
                        value,
                        ..base.clone()
                    };
                    match layout.wide_block() {
                        Some(WideBlock::Hours) => row.hour = Some(*slot),
                        Some(WideBlock::Months) => row.month = Some(*slot),
                        None => {}
                    }
                    rows.push(row);
                }
            }
        }
    }

    dedup_rows(&mut rows, diag);
    Ok(rows)
}

/// Stable sort by key and keep the first occurrence of each duplicate,
/// warning with the dropped count.
fn dedup_rows(rows: &mut Vec<NormalRow>, diag: &mut Diagnostics) {
    let before = rows.len();
    rows.sort_by_key(|r| r.dedup_key());
    rows.dedup_by_key(|r| r.dedup_key());
    let dropped = before - rows.len();
    if dropped > 0 {
        diag.add_warning(
            "timeseries",
            format!("dropped {dropped} duplicate rows, kept first occurrences"),
        );
    }
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    const FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%m/%d/%Y %H:%M",
    ];
    FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(text.trim(), f).ok())
}

/// Reconcile a raw table into one hourly vector per name for the target
/// year. The frame's layout is detected first; an unrecognized column set
/// is a format error.
pub fn reconcile(
    df: &DataFrame,
    target_year: i32,
    diag: &mut Diagnostics,
) -> Result<BTreeMap<String, Vec<f64>>> {
    let layout = TableLayout::detect(df.get_column_names()).ok_or_else(|| {
        anyhow!(
            "unrecognized table layout with columns {:?}",
            df.get_column_names()
        )
    })?;
    let rows = normalize(df, layout, diag)?;
    reconcile_rows(rows, target_year, diag)
}

/// Reconcile already-normalized rows, grouped by name.
pub fn reconcile_rows(
    rows: Vec<NormalRow>,
    target_year: i32,
    diag: &mut Diagnostics,
) -> Result<BTreeMap<String, Vec<f64>>> {
    let mut groups: BTreeMap<String, Vec<NormalRow>> = BTreeMap::new();
    for row in rows {
        let key = row.name.clone().unwrap_or_else(|| "value".to_string());
        groups.entry(key).or_default().push(row);
    }

    let mut out = BTreeMap::new();
    for (name, rows) in groups {
        let hourly = if rows.iter().any(|r| r.pattern.is_some()) {
            hourly_from_patterns(&rows, target_year)?
        } else {
            hourly_from_calendar(&name, &rows, target_year, diag)?
        };
        out.insert(name, hourly);
    }
    Ok(out)
}

/// Expand (pattern, value) records across the hours of `year` matching
/// each pattern; gaps forward-fill.
pub fn time_slice_handler(records: &[(String, f64)], year: i32) -> Result<Vec<f64>> {
    let stamps = year_stamps(year)?;
    let mut slots: Vec<Option<f64>> = vec![None; stamps.len()];
    for (pattern, value) in records {
        let parsed = parse_patterns(pattern)?;
        for (slot, stamp) in slots.iter_mut().zip(stamps.iter()) {
            if stamp_matches(stamp, &parsed) {
                *slot = Some(*value);
            }
        }
    }
    fill_forward(slots).ok_or_else(|| anyhow!("no pattern produced any data"))
}

fn hourly_from_patterns(rows: &[NormalRow], target_year: i32) -> Result<Vec<f64>> {
    let records: Vec<(String, f64)> = rows
        .iter()
        .filter_map(|r| r.pattern.clone().map(|p| (p, r.value)))
        .collect();
    time_slice_handler(&records, target_year)
}

/// Place calendar rows into target-year hour slots, averaging collisions
/// (this is what downsamples 30-minute sources), then forward-fill gaps.
fn hourly_from_calendar(
    name: &str,
    rows: &[NormalRow],
    target_year: i32,
    diag: &mut Diagnostics,
) -> Result<Vec<f64>> {
    let rows = select_year(rows, target_year);
    let hours = hours_in_year(target_year);
    let mut sums = vec![0.0f64; hours];
    let mut counts = vec![0u32; hours];
    let mut skipped = 0usize;

    let mut place = |slot: usize, value: f64| {
        sums[slot] += value;
        counts[slot] += 1;
    };

    for row in &rows {
        let (month, day, hour) = match row.datetime {
            Some(dt) => {
                use chrono::Datelike;
                (Some(dt.month()), Some(dt.day()), Some(dt.hour() + 1))
            }
            None => (row.month, row.day, row.hour),
        };
        match (month, day, hour) {
            (Some(m), Some(d), Some(h)) => match hour_slot(target_year, m, d, h) {
                Ok(slot) => place(slot, row.value),
                Err(_) => skipped += 1,
            },
            (Some(m), Some(d), None) => match hour_slot(target_year, m, d, 1) {
                Ok(start) => {
                    for slot in start..start + 24 {
                        place(slot, row.value);
                    }
                }
                Err(_) => skipped += 1,
            },
            (Some(m), None, None) => {
                let n_days = days_in_month(target_year, m)
                    .map_err(|e| anyhow!("series '{name}': {e}"))?;
                let start = hour_slot(target_year, m, 1, 1)
                    .map_err(|e| anyhow!("series '{name}': {e}"))?;
                for slot in start..start + (n_days as usize) * 24 {
                    place(slot, row.value);
                }
            }
            _ => {
                for slot in 0..hours {
                    place(slot, row.value);
                }
            }
        }
    }

    if skipped > 0 {
        diag.add_warning_with_entity(
            "timeseries",
            format!("{skipped} rows fell outside the {target_year} calendar and were dropped"),
            name,
        );
    }

    let slots: Vec<Option<f64>> = sums
        .iter()
        .zip(counts.iter())
        .map(|(sum, count)| (*count > 0).then(|| sum / *count as f64))
        .collect();
    fill_forward(slots).ok_or_else(|| anyhow!("series '{name}' has no usable rows"))
}

/// Choose which source year's rows apply: the target year when present,
/// otherwise the latest year before it, otherwise the earliest.
fn select_year(rows: &[NormalRow], target_year: i32) -> Vec<NormalRow> {
    let years: Vec<i32> = rows.iter().filter_map(|r| r.year).collect();
    if years.is_empty() {
        return rows.to_vec();
    }
    let chosen = years
        .iter()
        .filter(|y| **y <= target_year)
        .max()
        .copied()
        .unwrap_or_else(|| *years.iter().min().unwrap_or(&target_year));
    rows.iter()
        .filter(|r| r.year.is_none() || r.year == Some(chosen))
        .cloned()
        .collect()
}

/// Forward-fill gaps; leading gaps take the first known value. Returns
/// `None` when every slot is empty.
fn fill_forward(slots: Vec<Option<f64>>) -> Option<Vec<f64>> {
    let first = slots.iter().find_map(|v| *v)?;
    let mut last = first;
    Some(
        slots
            .into_iter()
            .map(|v| {
                if let Some(v) = v {
                    last = v;
                }
                last
            })
            .collect(),
    )
}

/// Adjust a raw hourly/daily/monthly vector to the target year's hour
/// count. Sub-hourly vectors average half-hour pairs; the leap day is
/// synthesized by duplicating February 28 or removed outright.
pub fn adjust_length(values: &[f64], target_year: i32) -> Result<Vec<f64>> {
    let target = hours_in_year(target_year);
    match values.len() {
        n if n == target => Ok(values.to_vec()),
        // Half-hourly: average pairs into hour buckets, then re-adjust.
        17520 | 17568 => {
            let hourly: Vec<f64> = values
                .chunks_exact(2)
                .map(|pair| (pair[0] + pair[1]) / 2.0)
                .collect();
            adjust_length(&hourly, target_year)
        }
        // Common-year hourly into a leap target: duplicate Feb 28.
        HOURS_COMMON => {
            let mut out = Vec::with_capacity(HOURS_LEAP);
            out.extend_from_slice(&values[..1416]);
            out.extend_from_slice(&values[1392..1416]);
            out.extend_from_slice(&values[1416..]);
            Ok(out)
        }
        // Leap-year hourly into a common target: drop Feb 29.
        HOURS_LEAP => {
            let mut out = Vec::with_capacity(HOURS_COMMON);
            out.extend_from_slice(&values[..1416]);
            out.extend_from_slice(&values[1440..]);
            Ok(out)
        }
        // Daily: expand each day across its 24 hours, then re-adjust.
        365 | 366 => {
            let hourly: Vec<f64> = values.iter().flat_map(|v| std::iter::repeat(*v).take(24)).collect();
            adjust_length(&hourly, target_year)
        }
        // Monthly: expand by the target year's month lengths.
        12 => {
            let mut out = Vec::with_capacity(target);
            for (month0, value) in values.iter().enumerate() {
                let n_days = days_in_month(target_year, month0 as u32 + 1)?;
                out.extend(std::iter::repeat(*value).take(n_days as usize * 24));
            }
            Ok(out)
        }
        n => Err(anyhow!(
            "cannot reconcile a {n}-sample series to a {target}-hour year"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leap_day_synthesis() {
        // Distinct value per source hour so positions are checkable.
        let source: Vec<f64> = (0..8760).map(|i| i as f64).collect();
        let out = adjust_length(&source, 2032).unwrap();
        assert_eq!(out.len(), 8784);
        // Feb 29 (1416..1440) equals Feb 28 (1392..1416) of the source.
        assert_eq!(out[1416..1440], source[1392..1416]);
        // The rest is shifted, not altered.
        assert_eq!(out[..1416], source[..1416]);
        assert_eq!(out[1440..], source[1416..]);
    }

    #[test]
    fn test_leap_day_removal() {
        let source: Vec<f64> = (0..8784).map(|i| i as f64).collect();
        let out = adjust_length(&source, 2030).unwrap();
        assert_eq!(out.len(), 8760);
        assert_eq!(out[1392..1416], source[1392..1416]);
        assert_eq!(out[1416], source[1440]);
    }

    #[test]
    fn test_half_hourly_pair_average() {
        let source: Vec<f64> = (0..17520).map(|i| i as f64).collect();
        let out = adjust_length(&source, 2030).unwrap();
        assert_eq!(out.len(), 8760);
        assert_eq!(out[0], 0.5);
        assert_eq!(out[1], 2.5);
    }

    #[test]
    fn test_monthly_expansion() {
        let source = vec![1.0; 12];
        let out = adjust_length(&source, 2030).unwrap();
        assert_eq!(out.len(), 8760);
    }

    #[test]
    fn test_unsupported_length() {
        assert!(adjust_length(&[1.0; 100], 2030).is_err());
    }

    #[test]
    fn test_time_slice_handler_month_patterns() {
        let records = vec![
            ("M1-6".to_string(), 10.0),
            ("M7-12".to_string(), 20.0),
        ];
        let hourly = time_slice_handler(&records, 2030).unwrap();
        assert_eq!(hourly.len(), 8760);
        assert_eq!(hourly[0], 10.0);
        // July 1 hour 1: 181 days in.
        assert_eq!(hourly[181 * 24], 20.0);
        assert_eq!(hourly[8759], 20.0);
    }

    #[test]
    fn test_reconcile_nv_constant() {
        let df = df!(
            "name" => &["gen-a"],
            "value" => &[5.0],
        )
        .unwrap();
        let mut diag = Diagnostics::new();
        let out = reconcile(&df, 2030, &mut diag).unwrap();
        let series = &out["gen-a"];
        assert_eq!(series.len(), 8760);
        assert!(series.iter().all(|v| *v == 5.0));
    }

    #[test]
    fn test_reconcile_forward_fill_never_interpolates() {
        // Two day-level anchors; the gap must hold the previous value.
        let df = df!(
            "name" => &["z", "z"],
            "year" => &[2030i64, 2030],
            "month" => &[1i64, 1],
            "day" => &[1i64, 3],
            "value" => &[1.0, 9.0],
        )
        .unwrap();
        let mut diag = Diagnostics::new();
        let out = reconcile(&df, 2030, &mut diag).unwrap();
        let series = &out["z"];
        // Jan 2 forward-fills from Jan 1.
        assert_eq!(series[30], 1.0);
        assert_eq!(series[2 * 24], 9.0);
    }

    #[test]
    fn test_reconcile_dedup_warns() {
        let df = df!(
            "name" => &["a", "a"],
            "value" => &[4.0, 7.0],
        )
        .unwrap();
        let mut diag = Diagnostics::new();
        let out = reconcile(&df, 2030, &mut diag).unwrap();
        // First occurrence kept, never summed.
        assert_eq!(out["a"][0], 4.0);
        assert_eq!(diag.warning_count(), 1);
    }

    #[test]
    fn test_reconcile_year_selection() {
        let df = df!(
            "name" => &["a", "a", "a"],
            "year" => &[2025i64, 2030, 2040],
            "value" => &[1.0, 2.0, 3.0],
        )
        .unwrap();
        let mut diag = Diagnostics::new();
        // Exact year available.
        assert_eq!(reconcile(&df, 2030, &mut diag).unwrap()["a"][0], 2.0);
        // Between years: latest before the target.
        assert_eq!(reconcile(&df, 2035, &mut diag).unwrap()["a"][0], 2.0);
        // Before all years: earliest.
        assert_eq!(reconcile(&df, 2020, &mut diag).unwrap()["a"][0], 1.0);
    }

    #[test]
    fn test_reconcile_unrecognized_layout_fails() {
        let df = df!("foo" => &[1.0]).unwrap();
        let mut diag = Diagnostics::new();
        assert!(reconcile(&df, 2030, &mut diag).is_err());
    }
}
