use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::model::{cell, tokens, RecordTable, Row, Value};

// ---------------------------------------------------------------------------
// Aggregate rows
// ---------------------------------------------------------------------------

/// Totals over the rows of the most recent period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodSummary {
    pub period: Value,
    pub total: f64,
    /// Distinct keys, or measure observations when no key column is given.
    pub count: usize,
    pub average: f64,
}

/// Count and mean of a measure for one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStat {
    pub key: Value,
    /// Non-missing measure values in the group.
    pub count: usize,
    pub mean: f64,
}

/// Occurrences of one value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyCount {
    pub key: Value,
    pub count: usize,
}

// ---------------------------------------------------------------------------
// Latest period
// ---------------------------------------------------------------------------

fn latest_period(table: &RecordTable, period_column: &str) -> Option<f64> {
    table
        .rows
        .iter()
        .filter_map(|r| cell(r, period_column).as_f64())
        .max_by(f64::total_cmp)
}

/// Sum, count and mean of `measure_column` over the rows whose
/// `period_column` equals its maximum.
///
/// Returns `None` when there is no period, no measure column, or no measure
/// value in the latest period.
pub fn latest_period_summary(
    table: &RecordTable,
    period_column: &str,
    measure_column: &str,
    key_column: Option<&str>,
) -> Option<PeriodSummary> {
    if !table.has_column(measure_column) {
        return None;
    }
    let latest = latest_period(table, period_column)?;
    let rows: Vec<&Row> = table
        .rows
        .iter()
        .filter(|r| cell(r, period_column).as_f64() == Some(latest))
        .collect();

    let measures: Vec<f64> = rows
        .iter()
        .filter_map(|r| cell(r, measure_column).as_f64())
        .collect();
    if measures.is_empty() {
        return None;
    }
    let total: f64 = measures.iter().sum();

    let count = match key_column.filter(|k| table.has_column(k)) {
        Some(key) => rows
            .iter()
            .map(|r| cell(r, key))
            .filter(|v| !v.is_null())
            .collect::<BTreeSet<_>>()
            .len(),
        None => measures.len(),
    };

    Some(PeriodSummary {
        period: cell(rows[0], period_column).clone(),
        total,
        count,
        average: total / measures.len() as f64,
    })
}

/// Rows of the latest period, sorted by `measure_column` descending.
pub fn rows_at_latest_period(
    table: &RecordTable,
    period_column: &str,
    measure_column: &str,
) -> RecordTable {
    let Some(latest) = latest_period(table, period_column) else {
        return table.empty_like();
    };
    let mut out = table.retain_rows(|r| cell(r, period_column).as_f64() == Some(latest));
    out.rows.sort_by(|a, b| {
        let (x, y) = (cell(a, measure_column), cell(b, measure_column));
        match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => y.total_cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    });
    out
}

// ---------------------------------------------------------------------------
// Explode
// ---------------------------------------------------------------------------

/// One output row per non-empty token of `column`, other columns copied.
/// Rows with no tokens produce nothing.
pub fn explode(table: &RecordTable, column: &str, delimiter: char) -> RecordTable {
    let mut rows = Vec::new();
    for row in &table.rows {
        for token in tokens(cell(row, column), delimiter) {
            let mut out = row.clone();
            out.insert(column.to_string(), Value::from(token));
            rows.push(out);
        }
    }
    RecordTable::new(table.columns.clone(), rows)
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// Per-key (count, sum) of the non-missing measure values. Rows with a
/// missing key are skipped.
fn accumulate(table: &RecordTable, key_column: &str, measure_column: &str) -> BTreeMap<Value, (usize, f64)> {
    let mut groups: BTreeMap<Value, (usize, f64)> = BTreeMap::new();
    for row in &table.rows {
        let key = cell(row, key_column);
        if key.is_null() {
            continue;
        }
        let entry = groups.entry(key.clone()).or_insert((0, 0.0));
        if let Some(v) = cell(row, measure_column).as_f64() {
            entry.0 += 1;
            entry.1 += v;
        }
    }
    groups
}

fn to_stats(groups: BTreeMap<Value, (usize, f64)>, min_count: usize) -> Vec<GroupStat> {
    groups
        .into_iter()
        .filter(|(_, (count, _))| *count > 0 && *count >= min_count)
        .map(|(key, (count, sum))| GroupStat {
            key,
            count,
            mean: sum / count as f64,
        })
        .collect()
}

/// Mean of `measure_column` per `key_column` group, keeping groups with at
/// least `min_count` observations.
///
/// Sorted by mean descending, then count descending, then key ascending.
pub fn group_mean(
    table: &RecordTable,
    key_column: &str,
    measure_column: &str,
    min_count: usize,
) -> Vec<GroupStat> {
    let mut stats = to_stats(accumulate(table, key_column, measure_column), min_count);
    stats.sort_by(|a, b| {
        b.mean
            .total_cmp(&a.mean)
            .then_with(|| b.count.cmp(&a.count))
            .then_with(|| a.key.cmp(&b.key))
    });
    stats
}

/// The first `k` groups of [`group_mean`].
pub fn top_k(
    table: &RecordTable,
    key_column: &str,
    measure_column: &str,
    min_count: usize,
    k: usize,
) -> Vec<GroupStat> {
    let mut stats = group_mean(table, key_column, measure_column, min_count);
    stats.truncate(k);
    stats
}

/// Mean of `measure_column` per key, ordered by key ascending.
pub fn mean_by_key(table: &RecordTable, key_column: &str, measure_column: &str) -> Vec<GroupStat> {
    to_stats(accumulate(table, key_column, measure_column), 0)
}

/// Occurrences of each non-missing value of `column`, most frequent first.
pub fn value_counts(table: &RecordTable, column: &str) -> Vec<KeyCount> {
    let mut counts: BTreeMap<&Value, usize> = BTreeMap::new();
    for row in &table.rows {
        let v = cell(row, column);
        if !v.is_null() {
            *counts.entry(v).or_insert(0) += 1;
        }
    }
    let mut out: Vec<KeyCount> = counts
        .into_iter()
        .map(|(key, count)| KeyCount {
            key: key.clone(),
            count,
        })
        .collect();
    // Stable sort keeps keys ascending within equal counts.
    out.sort_by(|a, b| b.count.cmp(&a.count));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratings(rows: &[(&str, &str, Option<f64>)]) -> RecordTable {
        RecordTable::from_records(
            &["title", "genres", "rating"],
            rows.iter().map(|(title, genres, rating)| {
                [
                    Value::from(*title),
                    Value::from(*genres),
                    rating.map(Value::Float).unwrap_or(Value::Null),
                ]
            }),
        )
    }

    fn population() -> RecordTable {
        RecordTable::from_records(
            &["Country", "Year", "Population"],
            [
                ["US".into(), Value::Integer(2010), Value::Integer(100)],
                ["US".into(), Value::Integer(2020), Value::Integer(120)],
                ["IN".into(), Value::Integer(2010), Value::Integer(500)],
                ["IN".into(), Value::Integer(2020), Value::Integer(600)],
            ],
        )
    }

    #[test]
    fn latest_period_totals() {
        let s = latest_period_summary(&population(), "Year", "Population", Some("Country")).unwrap();
        assert_eq!(s.period, Value::Integer(2020));
        assert_eq!(s.total, 720.0);
        assert_eq!(s.count, 2);
        assert_eq!(s.average, 360.0);
    }

    #[test]
    fn latest_period_without_data() {
        assert_eq!(latest_period_summary(&RecordTable::default(), "Year", "Population", None), None);
        let no_years = RecordTable::from_records(
            &["Year", "Population"],
            [[Value::Null, Value::Integer(1)]],
        );
        assert_eq!(latest_period_summary(&no_years, "Year", "Population", None), None);
    }

    #[test]
    fn latest_rows_sorted_by_measure() {
        let out = rows_at_latest_period(&population(), "Year", "Population");
        let countries: Vec<_> = out.rows.iter().map(|r| cell(r, "Country").to_string()).collect();
        assert_eq!(countries, ["IN", "US"]);
    }

    #[test]
    fn explode_then_group_mean() {
        let t = ratings(&[("A", "Action|Comedy", Some(4.0)), ("B", "Action", Some(2.0))]);
        let stats = group_mean(&explode(&t, "genres", '|'), "genres", "rating", 1);
        // Higher mean first, whatever the group size.
        assert_eq!(
            stats,
            vec![
                GroupStat { key: "Comedy".into(), count: 1, mean: 4.0 },
                GroupStat { key: "Action".into(), count: 2, mean: 3.0 },
            ]
        );
    }

    #[test]
    fn explode_drops_rows_without_tokens() {
        let t = ratings(&[("A", "", Some(4.0)), ("B", "|", Some(2.0)), ("C", "Drama|", Some(3.0))]);
        let out = explode(&t, "genres", '|');
        assert_eq!(out.len(), 1);
        assert_eq!(cell(&out.rows[0], "title"), &Value::from("C"));
        assert_eq!(cell(&out.rows[0], "rating"), &Value::Float(3.0));
    }

    #[test]
    fn group_mean_order_and_threshold() {
        let t = ratings(&[
            ("A", "", Some(5.0)),
            ("B", "", Some(4.0)),
            ("B", "", Some(4.0)),
            ("C", "", Some(4.0)),
            ("D", "", None),
            ("E", "", Some(1.0)),
            ("E", "", Some(2.0)),
        ]);
        let stats = group_mean(&t, "title", "rating", 0);
        let keys: Vec<_> = stats.iter().map(|s| s.key.to_string()).collect();
        assert_eq!(keys, ["A", "B", "C", "E"]);
        for pair in stats.windows(2) {
            assert!(
                pair[0].mean > pair[1].mean
                    || (pair[0].mean == pair[1].mean && pair[0].count >= pair[1].count)
            );
        }

        let at_least_two = group_mean(&t, "title", "rating", 2);
        assert_eq!(at_least_two.len(), 2);
        assert_eq!(at_least_two[0].key, Value::from("B"));
    }

    #[test]
    fn top_k_is_prefix() {
        let t = ratings(&[("A", "", Some(5.0)), ("B", "", Some(3.0)), ("C", "", Some(4.0))]);
        let all = group_mean(&t, "title", "rating", 1);
        let top = top_k(&t, "title", "rating", 1, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[..], all[..2]);
        assert_eq!(top_k(&t, "title", "rating", 1, 10), all);
    }

    #[test]
    fn empty_inputs_aggregate_to_nothing() {
        let t = RecordTable::default();
        assert!(group_mean(&t, "genres", "rating", 0).is_empty());
        assert!(top_k(&t, "genres", "rating", 0, 5).is_empty());
        assert!(explode(&t, "genres", '|').is_empty());
        assert!(value_counts(&t, "genres").is_empty());
    }

    #[test]
    fn counts_and_key_means() {
        let t = ratings(&[("A", "x", Some(1.0)), ("B", "y", Some(2.0)), ("C", "y", Some(4.0))]);
        let counts = value_counts(&t, "genres");
        assert_eq!(counts[0], KeyCount { key: "y".into(), count: 2 });
        let means = mean_by_key(&t, "genres", "rating");
        assert_eq!(means[0].key, Value::from("x"));
        assert_eq!(means[1].mean, 3.0);
    }

    #[test]
    fn groups_without_observations_are_dropped_even_at_zero_minimum() {
        let t = ratings(&[
            ("A", "x", Some(3.0)),
            ("B", "y", None),
            ("B", "y", None),
        ]);
        let stats = group_mean(&t, "title", "rating", 0);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].key, Value::from("A"));

        let means = mean_by_key(&t, "genres", "rating");
        assert_eq!(means.iter().map(|s| s.key.to_string()).collect::<Vec<_>>(), ["x"]);
    }
}
