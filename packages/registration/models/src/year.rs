//! Membership years and the sentinels used for open interval ends.
//!
//! Historical sources leave either end of a membership interval blank or
//! write it in forms like `"1851.0"`. Blank or unparseable ends are replaced
//! by configurable sentinels and the substitution is recorded on the
//! interval so it stays visible in every output table.

use serde::{Deserialize, Serialize};

/// First year of civil registration in England and Wales.
pub const DEFAULT_OPEN_START_YEAR: i32 = 1837;

/// Stand-in for "still active / end unknown".
pub const DEFAULT_OPEN_END_YEAR: i32 = 9999;

/// Sentinels substituted for missing interval ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearDefaults {
    /// Replaces a missing or unparseable `from_year`.
    pub open_start: i32,
    /// Replaces a missing or unparseable `to_year`.
    pub open_end: i32,
}

impl Default for YearDefaults {
    fn default() -> Self {
        Self {
            open_start: DEFAULT_OPEN_START_YEAR,
            open_end: DEFAULT_OPEN_END_YEAR,
        }
    }
}

/// A closed, inclusive year window such as `[1851, 1990]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearWindow {
    /// First year in the window.
    pub start: i32,
    /// Last year in the window.
    pub end: i32,
}

impl YearWindow {
    /// Creates a window. `start > end` yields an empty window.
    #[must_use]
    pub const fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    /// Whether `year` falls inside the window.
    #[must_use]
    pub const fn contains(&self, year: i32) -> bool {
        self.start <= year && year <= self.end
    }

    /// Clips `[from, to]` to this window. Returns `None` when the clipped
    /// interval is empty or the input interval is inverted.
    #[must_use]
    pub fn clip(&self, from: i32, to: i32) -> Option<(i32, i32)> {
        let start = from.max(self.start);
        let end = to.min(self.end);
        (end >= start).then_some((start, end))
    }
}

/// A membership interval with both ends resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipInterval {
    /// First year of membership (inclusive).
    pub from_year: i32,
    /// Last year of membership (inclusive).
    pub to_year: i32,
    /// `from_year` is the open-start sentinel, not a source value.
    pub from_defaulted: bool,
    /// `to_year` is the open-end sentinel, not a source value.
    pub to_defaulted: bool,
}

impl MembershipInterval {
    /// Resolves optional source years, substituting sentinels for the
    /// missing ends.
    #[must_use]
    pub fn resolve(from_year: Option<i32>, to_year: Option<i32>, defaults: YearDefaults) -> Self {
        Self {
            from_year: from_year.unwrap_or(defaults.open_start),
            to_year: to_year.unwrap_or(defaults.open_end),
            from_defaulted: from_year.is_none(),
            to_defaulted: to_year.is_none(),
        }
    }

    /// Whether the interval covers `year`.
    #[must_use]
    pub const fn overlaps(&self, year: i32) -> bool {
        self.from_year <= year && self.to_year >= year
    }
}

/// Leniently parses a year cell.
///
/// Accepts surrounding whitespace and a trailing `.0` (spreadsheet exports
/// write integer columns as floats). Anything else that is not purely
/// digits yields `None`.
#[must_use]
pub fn parse_year(raw: &str) -> Option<i32> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_suffix(".0").unwrap_or(trimmed);

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_float_years() {
        assert_eq!(parse_year("1851"), Some(1851));
        assert_eq!(parse_year(" 1861.0 "), Some(1861));
    }

    #[test]
    fn rejects_garbage_years() {
        assert_eq!(parse_year(""), None);
        assert_eq!(parse_year("c. 1850"), None);
        assert_eq!(parse_year("1850-1855"), None);
        assert_eq!(parse_year("-1851"), None);
    }

    #[test]
    fn resolves_missing_ends_to_sentinels() {
        let interval = MembershipInterval::resolve(None, None, YearDefaults::default());
        assert_eq!(interval.from_year, 1837);
        assert_eq!(interval.to_year, 9999);
        assert!(interval.from_defaulted);
        assert!(interval.to_defaulted);
    }

    #[test]
    fn resolves_one_sided_interval() {
        let interval = MembershipInterval::resolve(Some(1870), None, YearDefaults::default());
        assert_eq!(interval.from_year, 1870);
        assert!(!interval.from_defaulted);
        assert!(interval.to_defaulted);
        assert!(!interval.overlaps(1851));
        assert!(interval.overlaps(1990));
    }

    #[test]
    fn honours_custom_sentinels() {
        let defaults = YearDefaults {
            open_start: 1800,
            open_end: 2000,
        };
        let interval = MembershipInterval::resolve(None, Some(1860), defaults);
        assert_eq!(interval.from_year, 1800);
        assert!(interval.overlaps(1851));
    }

    #[test]
    fn clips_to_window() {
        let window = YearWindow::new(1851, 1990);
        assert_eq!(window.clip(1800, 1860), Some((1851, 1860)));
        assert_eq!(window.clip(1800, 1830), None);
        assert_eq!(window.clip(1900, 1880), None);
        assert_eq!(window.clip(1837, 9999), Some((1851, 1990)));
    }
}
