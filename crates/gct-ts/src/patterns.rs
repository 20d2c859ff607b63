//! Range-pattern parsing for timeslice tags ("M1-3;M7", "H1-6").

use gct_core::{GctError, GctResult};

use crate::calendar::HourStamp;

/// Calendar dimension a pattern token constrains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternKind {
    Month,
    Hour,
    Weekday,
    Day,
}

impl PatternKind {
    fn from_prefix(prefix: char) -> Option<Self> {
        match prefix.to_ascii_uppercase() {
            'M' => Some(PatternKind::Month),
            'H' => Some(PatternKind::Hour),
            'W' => Some(PatternKind::Weekday),
            'D' => Some(PatternKind::Day),
            _ => None,
        }
    }

    fn domain(&self) -> (u32, u32) {
        match self {
            PatternKind::Month => (1, 12),
            PatternKind::Hour => (1, 24),
            PatternKind::Weekday => (1, 7),
            PatternKind::Day => (1, 31),
        }
    }
}

/// Parse a pattern string into (kind, members) tuples.
///
/// Tokens are separated by `;` or `,`; each token is a prefix letter plus a
/// single value or an inclusive range: `M1-3;M7` yields months {1,2,3} and
/// {7}. Values outside the kind's domain raise immediately.
pub fn parse_patterns(pattern: &str) -> GctResult<Vec<(PatternKind, Vec<u32>)>> {
    let mut parsed = Vec::new();
    for token in pattern.split([';', ',']) {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let mut chars = token.chars();
        let prefix = chars
            .next()
            .ok_or_else(|| GctError::Validation("empty pattern token".to_string()))?;
        let kind = PatternKind::from_prefix(prefix).ok_or_else(|| {
            GctError::Validation(format!("unrecognized pattern prefix in '{token}'"))
        })?;
        let body: &str = chars.as_str();
        let (lo, hi) = match body.split_once('-') {
            Some((a, b)) => (parse_bound(a, token)?, parse_bound(b, token)?),
            None => {
                let v = parse_bound(body, token)?;
                (v, v)
            }
        };
        let (min, max) = kind.domain();
        if lo > hi || lo < min || hi > max {
            return Err(GctError::Validation(format!(
                "pattern '{token}' outside domain {min}..={max}"
            )));
        }
        parsed.push((kind, (lo..=hi).collect()));
    }
    if parsed.is_empty() {
        return Err(GctError::Validation(format!(
            "pattern '{pattern}' contains no tokens"
        )));
    }
    Ok(parsed)
}

fn parse_bound(text: &str, token: &str) -> GctResult<u32> {
    text.trim()
        .parse()
        .map_err(|_| GctError::Validation(format!("non-numeric bound in pattern '{token}'")))
}

/// Whether an hour slot matches a parsed pattern: within each kind the
/// members are alternatives, across kinds they are all required.
pub fn stamp_matches(stamp: &HourStamp, parsed: &[(PatternKind, Vec<u32>)]) -> bool {
    let mut seen = [false; 4];
    let mut matched = [false; 4];
    for (kind, members) in parsed {
        let idx = *kind as usize;
        seen[idx] = true;
        let value = match kind {
            PatternKind::Month => stamp.month,
            PatternKind::Hour => stamp.hour,
            PatternKind::Weekday => stamp.weekday,
            PatternKind::Day => stamp.day,
        };
        if members.contains(&value) {
            matched[idx] = true;
        }
    }
    seen.iter()
        .zip(matched.iter())
        .all(|(s, m)| !*s || *m)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_range() {
        let parsed = parse_patterns("M1-3").unwrap();
        assert_eq!(parsed, vec![(PatternKind::Month, vec![1, 2, 3])]);
    }

    #[test]
    fn test_multiple_tokens() {
        let parsed = parse_patterns("H1-6,H18-24").unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0], (PatternKind::Hour, (1..=6).collect::<Vec<_>>()));
        assert_eq!(parsed[1], (PatternKind::Hour, (18..=24).collect::<Vec<_>>()));
    }

    #[test]
    fn test_semicolon_separator() {
        let parsed = parse_patterns("M1-3;M7").unwrap();
        assert_eq!(parsed[1], (PatternKind::Month, vec![7]));
    }

    #[test]
    fn test_out_of_domain_month_raises() {
        assert!(parse_patterns("M13").is_err());
        assert!(parse_patterns("H25").is_err());
        assert!(parse_patterns("W8").is_err());
    }

    #[test]
    fn test_garbage_raises() {
        assert!(parse_patterns("X1-3").is_err());
        assert!(parse_patterns("M1-x").is_err());
        assert!(parse_patterns("").is_err());
    }

    #[test]
    fn test_stamp_matching_intersects_kinds() {
        let parsed = parse_patterns("M6-8;H12").unwrap();
        let noon_july = HourStamp {
            month: 7,
            day: 15,
            hour: 12,
            weekday: 3,
        };
        let noon_jan = HourStamp {
            month: 1,
            day: 15,
            hour: 12,
            weekday: 3,
        };
        let night_july = HourStamp {
            month: 7,
            day: 15,
            hour: 2,
            weekday: 3,
        };
        assert!(stamp_matches(&noon_july, &parsed));
        assert!(!stamp_matches(&noon_jan, &parsed));
        assert!(!stamp_matches(&night_july, &parsed));
    }
}
