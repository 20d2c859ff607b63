//! Frame filters and column extraction shared by both pipelines.

use anyhow::{anyhow, Context, Result};
use polars::prelude::*;

/// Extract a column as strings, casting if needed.
pub fn column_utf8(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
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

pub fn column_f64(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let series = df
        .column(name)?
        .cast(&DataType::Float64)
        .with_context(|| format!("casting column '{name}' to Float64"))?;
    Ok(series.f64()?.into_iter().collect())
}

pub fn column_i64(df: &DataFrame, name: &str) -> Result<Vec<Option<i64>>> {
    let series = df
        .column(name)?
        .cast(&DataType::Int64)
        .with_context(|| format!("casting column '{name}' to Int64"))?;
    Ok(series.i64()?.into_iter().collect())
}

/// Rename columns per a (from, to) map; absent columns are ignored.
pub fn pl_rename(df: &mut DataFrame, column_map: &[(&str, &str)]) -> Result<()> {
    for (from, to) in column_map {
        if df.get_column_names().contains(from) {
            df.rename(from, to)
                .with_context(|| format!("renaming column '{from}' to '{to}'"))?;
        }
    }
    Ok(())
}

/// Keep only rows whose integer `year` column equals `year`.
pub fn pl_filter_by_year(df: &DataFrame, year: i32) -> Result<DataFrame> {
    let mask = df
        .column("year")?
        .cast(&DataType::Int64)
        .context("casting year column")?
        .i64()?
        .equal(year as i64);
    df.filter(&mask).context("filtering by year")
}

/// Left-join on shared key columns, asserting the left row count is
/// preserved (a fan-out means the right side is not unique per key).
pub fn pl_left_multi_join(left: &DataFrame, right: &DataFrame, on: &[&str]) -> Result<DataFrame> {
    let joined = left
        .join(right, on, on, JoinArgs::new(JoinType::Left))
        .context("left join")?;
    if joined.height() != left.height() {
        return Err(anyhow!(
            "left join on {:?} changed row count from {} to {}; right side is not unique per key",
            on,
            left.height(),
            joined.height()
        ));
    }
    Ok(joined)
}

/// Drop duplicate rows under `subset`, keeping the first occurrence.
pub fn pl_remove_duplicates(df: &DataFrame, subset: &[&str]) -> Result<DataFrame> {
    let subset: Vec<String> = subset.iter().map(|s| s.to_string()).collect();
    df.unique_stable(Some(&subset), UniqueKeepStrategy::First, None)
        .context("deduplicating rows")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_by_year() {
        let df = df!(
            "year" => &[2025i64, 2030, 2030],
            "value" => &[1.0, 2.0, 3.0],
        )
        .unwrap();
        let filtered = pl_filter_by_year(&df, 2030).unwrap();
        assert_eq!(filtered.height(), 2);
    }

    #[test]
    fn test_left_join_preserves_rows() {
        let left = df!("tech" => &["a", "b"], "cap" => &[1.0, 2.0]).unwrap();
        let right = df!("tech" => &["a"], "hr" => &[9.0]).unwrap();
        let joined = pl_left_multi_join(&left, &right, &["tech"]).unwrap();
        assert_eq!(joined.height(), 2);

        // Fan-out is rejected.
        let dup = df!("tech" => &["a", "a"], "hr" => &[9.0, 10.0]).unwrap();
        assert!(pl_left_multi_join(&left, &dup, &["tech"]).is_err());
    }

    #[test]
    fn test_remove_duplicates_keeps_first() {
        let df = df!(
            "name" => &["x", "x", "y"],
            "value" => &[1.0, 2.0, 3.0],
        )
        .unwrap();
        let out = pl_remove_duplicates(&df, &["name"]).unwrap();
        assert_eq!(out.height(), 2);
        let values = column_f64(&out, "value").unwrap();
        assert_eq!(values[0], Some(1.0));
    }

    #[test]
    fn test_rename_ignores_missing() {
        let mut df = df!("a" => &[1.0]).unwrap();
        pl_rename(&mut df, &[("a", "b"), ("zz", "yy")]).unwrap();
        assert_eq!(df.get_column_names(), &["b"]);
    }
}
