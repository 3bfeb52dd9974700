use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Value – a single cell in a record table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value.
///
/// Integers and floats compare by numeric value, so `Integer(2015)` and
/// `Float(2015.0)` are the same key when grouping or filtering.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Null,
}

impl Value {
    /// Interpret a raw cell as text; an empty cell is missing.
    pub fn from_cell(raw: &str) -> Self {
        if raw.is_empty() {
            Value::Null
        } else {
            Value::String(raw.to_string())
        }
    }

    /// Coerce a raw cell to a number. Anything unparsable (or non-finite)
    /// becomes `Null` rather than an error.
    pub fn parse_numeric(raw: &str) -> Self {
        let s = raw.trim();
        if s.is_empty() {
            return Value::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return Value::Integer(i);
        }
        match s.parse::<f64>() {
            Ok(f) if f.is_finite() => Value::Float(f),
            _ => Value::Null,
        }
    }

    /// Numeric view of the value, `None` for text and missing cells.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Integer(_) | Value::Float(_) => 1,
            Value::String(_) => 2,
        }
    }
}

// -- Manual Eq/Ord/Hash so Value can key BTreeMap / BTreeSet / HashMap --

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        let (ra, rb) = (self.rank(), other.rank());
        if ra != rb {
            return ra.cmp(&rb);
        }
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Float(x), Value::Float(y)) => cmp_floats(*x, *y),
            (Value::Integer(i), Value::Float(f)) => cmp_int_float(*i, *f),
            (Value::Float(f), Value::Integer(i)) => cmp_int_float(*i, *f).reverse(),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

/// Floats by value with `-0.0 == 0.0`; every NaN sorts after all numbers.
fn cmp_floats(x: f64, y: f64) -> Ordering {
    match (x.is_nan(), y.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
    }
}

/// Exact comparison of an integer with a float, without rounding the
/// integer through `f64`.
fn cmp_int_float(i: i64, f: f64) -> Ordering {
    // 2^63 as f64; i64 covers [-2^63, 2^63).
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if f.is_nan() || f >= LIMIT {
        return Ordering::Less;
    }
    if f < -LIMIT {
        return Ordering::Greater;
    }
    let whole = f.trunc();
    match i.cmp(&(whole as i64)) {
        Ordering::Equal => cmp_floats(whole, f),
        unequal => unequal,
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Value::String(s) => s.hash(state),
            Value::Integer(_) | Value::Float(_) => {
                let v = self.as_f64().unwrap_or_default();
                if v.is_nan() {
                    u64::MAX.hash(state);
                } else {
                    // Normalise -0.0 so it hashes like 0.0.
                    (v + 0.0).to_bits().hash(state);
                }
            }
            Value::Null => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Null => write!(f, "<null>"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

/// Split a multi-valued cell into its non-empty, trimmed tokens.
pub fn tokens(value: &Value, delimiter: char) -> impl Iterator<Item = &str> {
    value
        .as_str()
        .unwrap_or("")
        .split(delimiter)
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

// ---------------------------------------------------------------------------
// Row / RecordTable
// ---------------------------------------------------------------------------

/// One record: column name → value. A column missing from the map reads as `Null`.
pub type Row = BTreeMap<String, Value>;

static NULL: Value = Value::Null;

/// Look up a cell, treating an absent column as missing.
pub fn cell<'a>(row: &'a Row, column: &str) -> &'a Value {
    row.get(column).unwrap_or(&NULL)
}

/// An ordered sequence of rows with a dynamic column list.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecordTable {
    /// Column names in source order.
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl RecordTable {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        RecordTable { columns, rows }
    }

    /// Build a table from literal rows, mostly useful for fixtures.
    pub fn from_records<I, R>(columns: &[&str], records: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = Value>,
    {
        let columns: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        let rows = records
            .into_iter()
            .map(|rec| columns.iter().cloned().zip(rec).collect())
            .collect();
        RecordTable { columns, rows }
    }

    /// Same columns, no rows.
    pub fn empty_like(&self) -> Self {
        RecordTable {
            columns: self.columns.clone(),
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// The first of `columns` that the table lacks, if any.
    pub fn missing_column<'a>(&self, columns: &[&'a str]) -> Option<&'a str> {
        columns.iter().copied().find(|c| !self.has_column(c))
    }

    /// Keep the rows matching `keep`, preserving order.
    pub fn retain_rows<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&Row) -> bool,
    {
        RecordTable {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    /// Sorted set of the distinct non-missing values in a column.
    pub fn unique_values(&self, column: &str) -> BTreeSet<Value> {
        self.rows
            .iter()
            .map(|r| cell(r, column))
            .filter(|v| !v.is_null())
            .cloned()
            .collect()
    }

    /// Min and max of the numeric values in a column.
    pub fn numeric_range(&self, column: &str) -> Option<(f64, f64)> {
        self.rows
            .iter()
            .filter_map(|r| cell(r, column).as_f64())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// First `n` rows.
    pub fn head(&self, n: usize) -> Vec<Row> {
        self.rows.iter().take(n).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_coercion_never_fails() {
        assert_eq!(Value::parse_numeric("2015"), Value::Integer(2015));
        assert_eq!(Value::parse_numeric(" 3.5 "), Value::Float(3.5));
        assert!(Value::parse_numeric("n/a").is_null());
        assert!(Value::parse_numeric("NaN").is_null());
        assert!(Value::parse_numeric("").is_null());
    }

    #[test]
    fn integer_and_float_keys_coincide() {
        let set: BTreeSet<Value> = [Value::Integer(2015), Value::Float(2015.0)].into();
        assert_eq!(set.len(), 1);
        assert!(Value::Integer(3) < Value::Float(3.5));
        assert!(Value::Null < Value::Integer(0));
        assert!(Value::Float(1e9) < Value::from("a"));
    }

    #[test]
    fn large_integers_compare_exactly_with_floats() {
        let two_53 = 1i64 << 53;
        let above = Value::Integer(two_53 + 1);
        let exact = Value::Integer(two_53);
        let float = Value::Float(two_53 as f64);

        assert_eq!(exact, float);
        assert_ne!(above, float);
        assert!(float < above);

        let set: BTreeSet<Value> = [above.clone(), float, exact].into();
        assert_eq!(set.into_iter().collect::<Vec<_>>(), [Value::Integer(two_53), above]);

        assert!(Value::Integer(5) < Value::Float(5.5));
        assert!(Value::Integer(-5) > Value::Float(-5.5));
        assert_eq!(Value::Float(-0.0), Value::Integer(0));
        assert_eq!(Value::Float(-0.0), Value::Float(0.0));
        assert!(Value::Integer(i64::MAX) < Value::Float(1e19));
    }

    #[test]
    fn tokens_skip_empty_entries() {
        let v = Value::from("Action||Comedy| ");
        assert_eq!(tokens(&v, '|').collect::<Vec<_>>(), ["Action", "Comedy"]);
        assert_eq!(tokens(&Value::Null, '|').count(), 0);
    }

    #[test]
    fn range_and_unique_ignore_missing() {
        let t = RecordTable::from_records(
            &["Year"],
            [[Value::Integer(2010)], [Value::Null], [Value::Integer(2020)]],
        );
        assert_eq!(t.numeric_range("Year"), Some((2010.0, 2020.0)));
        assert_eq!(t.unique_values("Year").len(), 2);
        assert_eq!(t.numeric_range("Country"), None);
        assert_eq!(t.missing_column(&["Year", "Country"]), Some("Country"));
    }
}
