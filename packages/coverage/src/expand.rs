//! Interval-to-year expansion.
//!
//! A membership `[from, to]` is clipped to the study window and then
//! repeated once per year in the clipped range. Records that fall wholly
//! outside the window, or whose interval is inverted, emit nothing.

use std::collections::HashMap;
use std::sync::Arc;

use rd_backbone_registration_models::{ConcordanceRow, YearActivityRow, YearWindow};

/// Expands each item into one output per active year inside `window`.
///
/// `span` yields the item's inclusive `(from, to)` interval and `emit` builds
/// the output for one `(item, year)` pair. Output is grouped by item, in
/// input order, years ascending. The result holds exactly
/// `Σ (clipped_end - clipped_start + 1)` rows over kept items.
pub fn expand<T, R>(
    items: &[T],
    window: YearWindow,
    span: impl Fn(&T) -> (i32, i32),
    mut emit: impl FnMut(&T, i32) -> R,
) -> Vec<R> {
    let spans: Vec<(usize, i32, i32)> = items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| {
            let (from, to) = span(item);
            window.clip(from, to).map(|(start, end)| (i, start, end))
        })
        .collect();

    let total: usize = spans
        .iter()
        .map(|&(_, start, end)| usize::try_from(end - start + 1).unwrap_or(0))
        .sum();

    let mut out = Vec::with_capacity(total);
    for (i, start, end) in spans {
        let item = &items[i];
        out.extend((start..=end).map(|year| emit(item, year)));
    }
    out
}

/// Expands the concordance into per-year activity rows.
///
/// Every membership record takes part, matched or not, so unmatched parishes
/// still count towards a district's active rows.
#[must_use]
pub fn activity_rows(concordance: &[ConcordanceRow], window: YearWindow) -> Vec<YearActivityRow> {
    let mut interned: HashMap<&str, Arc<str>> = HashMap::new();

    let labelled: Vec<(Arc<str>, Arc<str>, &ConcordanceRow)> = concordance
        .iter()
        .map(|row| {
            (
                intern(&mut interned, &row.record.district),
                intern(&mut interned, &row.record.place_name),
                row,
            )
        })
        .collect();

    let rows = expand(
        &labelled,
        window,
        |(_, _, row)| (row.interval.from_year, row.interval.to_year),
        |(district, place_name, row), year| YearActivityRow {
            district: district.clone(),
            year,
            place_name: place_name.clone(),
            parish_id: row.matched_parish_id(),
        },
    );

    log::info!(
        "Expanded {} membership records into {} district-year rows over {}-{}",
        concordance.len(),
        rows.len(),
        window.start,
        window.end
    );

    rows
}

fn intern<'a>(interned: &mut HashMap<&'a str, Arc<str>>, s: &'a str) -> Arc<str> {
    interned.entry(s).or_insert_with(|| Arc::from(s)).clone()
}

#[cfg(test)]
mod tests {
    use rd_backbone_registration_models::{
        MatchMethod, MatchResult, MembershipInterval, SourceRecord,
    };

    use super::*;

    const WINDOW: YearWindow = YearWindow::new(1851, 1990);

    fn row(place: &str, from: i32, to: i32, parish: Option<i64>) -> ConcordanceRow {
        ConcordanceRow {
            record: SourceRecord {
                place_name: place.to_string(),
                district: "Dover".to_string(),
                from_year: Some(from),
                to_year: Some(to),
            },
            interval: MembershipInterval {
                from_year: from,
                to_year: to,
                from_defaulted: false,
                to_defaulted: false,
            },
            eligible: true,
            result: Some(
                parish.map_or_else(MatchResult::unmatched, |id| {
                    MatchResult::found(id, MatchMethod::Exact)
                }),
            ),
            matched_parish_name: None,
        }
    }

    #[test]
    fn clips_interval_to_window() {
        let rows = activity_rows(&[row("Buckland", 1800, 1860, Some(3))], WINDOW);

        assert_eq!(rows.len(), 10);
        let years: Vec<i32> = rows.iter().map(|r| r.year).collect();
        assert_eq!(years, (1851..=1860).collect::<Vec<_>>());
        assert!(rows.iter().all(|r| r.parish_id == Some(3)));
        assert!(rows.iter().all(|r| &*r.district == "Dover"));
    }

    #[test]
    fn drops_interval_outside_window() {
        assert!(activity_rows(&[row("Buckland", 1837, 1830, Some(3))], WINDOW).is_empty());
        assert!(activity_rows(&[row("Buckland", 1837, 1850, Some(3))], WINDOW).is_empty());
        assert!(activity_rows(&[row("Buckland", 1995, 2001, Some(3))], WINDOW).is_empty());
    }

    #[test]
    fn drops_inverted_interval() {
        assert!(activity_rows(&[row("Buckland", 1900, 1880, Some(3))], WINDOW).is_empty());
    }

    #[test]
    fn open_end_sentinel_runs_to_window_end() {
        let rows = activity_rows(&[row("Buckland", 1980, 9999, None)], WINDOW);
        assert_eq!(rows.len(), 11);
        assert_eq!(rows.last().map(|r| r.year), Some(1990));
        assert!(rows.iter().all(|r| !r.matched()));
    }

    #[test]
    fn total_rows_equal_sum_of_clipped_durations() {
        let input = [
            row("A", 1800, 1860, Some(1)),
            row("B", 1851, 1851, Some(2)),
            row("C", 1700, 1800, None),
            row("D", 1985, 9999, None),
        ];
        let rows = activity_rows(&input, WINDOW);
        assert_eq!(rows.len(), 10 + 1 + 6);
    }

    #[test]
    fn generic_expand_copies_attributes() {
        let items = [("x", 1850, 1852), ("y", 1990, 1991)];
        let out = expand(
            &items,
            WINDOW,
            |&(_, from, to)| (from, to),
            |&(name, _, _), year| format!("{name}{year}"),
        );
        assert_eq!(out, vec!["x1851", "x1852", "y1990"]);
    }
}
