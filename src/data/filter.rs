use std::collections::BTreeSet;

use log::debug;

use super::model::{cell, tokens, RecordTable, Row, Value};
use crate::config::{DashboardConfig, DatasetKind};

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

/// A test applied to one column's value.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Value is one of the set. An empty set means "no filter".
    OneOf(BTreeSet<Value>),
    /// Numeric value within `[min, max]`. Missing values never pass.
    Between { min: f64, max: f64 },
    /// Any token of a delimited multi-value cell is in the set. An empty set
    /// means "no filter".
    AnyToken {
        values: BTreeSet<String>,
        delimiter: char,
    },
}

impl Predicate {
    /// Whether the predicate constrains anything at all.
    pub fn is_active(&self) -> bool {
        match self {
            Predicate::OneOf(set) => !set.is_empty(),
            Predicate::AnyToken { values, .. } => !values.is_empty(),
            Predicate::Between { .. } => true,
        }
    }

    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Predicate::OneOf(set) => set.is_empty() || set.contains(value),
            Predicate::Between { min, max } => match value.as_f64() {
                Some(v) => *min <= v && v <= *max,
                None => false,
            },
            Predicate::AnyToken { values, delimiter } => {
                values.is_empty() || tokens(value, *delimiter).any(|t| values.contains(t))
            }
        }
    }
}

/// A predicate bound to a column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnFilter {
    pub column: String,
    pub predicate: Predicate,
}

// ---------------------------------------------------------------------------
// Selection – the active filters, combined with AND
// ---------------------------------------------------------------------------

/// The set of filters derived from the user's controls.
///
/// Filters on columns the table does not have are ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    filters: Vec<ColumnFilter>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn one_of<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let set = values.into_iter().map(Into::into).collect();
        self.with(column, Predicate::OneOf(set))
    }

    pub fn between(self, column: &str, min: f64, max: f64) -> Self {
        self.with(column, Predicate::Between { min, max })
    }

    pub fn any_token<I, S>(self, column: &str, values: I, delimiter: char) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.with(column, Predicate::AnyToken { values, delimiter })
    }

    /// Add a filter, replacing any existing filter on the same column.
    pub fn with(mut self, column: &str, predicate: Predicate) -> Self {
        self.set(column, predicate);
        self
    }

    pub fn set(&mut self, column: &str, predicate: Predicate) {
        match self.filters.iter_mut().find(|f| f.column == column) {
            Some(existing) => existing.predicate = predicate,
            None => self.filters.push(ColumnFilter {
                column: column.to_string(),
                predicate,
            }),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Predicate> {
        self.filters
            .iter()
            .find(|f| f.column == column)
            .map(|f| &f.predicate)
    }

    pub fn get_mut(&mut self, column: &str) -> Option<&mut Predicate> {
        self.filters
            .iter_mut()
            .find(|f| f.column == column)
            .map(|f| &mut f.predicate)
    }

    /// Conjunction of two selections. Both filters are kept even when they
    /// name the same column.
    pub fn and(mut self, other: Selection) -> Self {
        self.filters.extend(other.filters);
        self
    }

    pub fn filters(&self) -> &[ColumnFilter] {
        &self.filters
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// Indices of rows that pass every active filter whose column the table has.
pub fn filtered_indices(table: &RecordTable, selection: &Selection) -> Vec<usize> {
    let active: Vec<&ColumnFilter> = selection
        .filters()
        .iter()
        .filter(|f| f.predicate.is_active() && table.has_column(&f.column))
        .collect();

    table
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| active.iter().all(|f| f.predicate.matches(cell(row, &f.column))))
        .map(|(i, _)| i)
        .collect()
}

/// The rows of `table` that pass `selection`, in their original order.
pub fn filter(table: &RecordTable, selection: &Selection) -> RecordTable {
    let rows: Vec<Row> = filtered_indices(table, selection)
        .into_iter()
        .map(|i| table.rows[i].clone())
        .collect();
    debug!("filter kept {} of {} rows", rows.len(), table.len());
    RecordTable::new(table.columns.clone(), rows)
}

/// Drop rows whose `column` value is missing. A table without the column is
/// returned unchanged.
pub fn drop_missing(table: &RecordTable, column: &str) -> RecordTable {
    if !table.has_column(column) {
        return table.clone();
    }
    table.retain_rows(|row| !cell(row, column).is_null())
}

/// Distinct tokens of a multi-valued column, sorted.
pub fn token_pool(table: &RecordTable, column: &str, delimiter: char) -> BTreeSet<String> {
    table
        .rows
        .iter()
        .flat_map(|row| tokens(cell(row, column), delimiter))
        .map(str::to_string)
        .collect()
}

// ---------------------------------------------------------------------------
// Default controls
// ---------------------------------------------------------------------------

/// The selection the dashboards start from after a load.
///
/// Population: the first few countries and the full year range.
/// Ratings: full age range, every gender, the first few occupations, the full
/// release-year range, no genre filter.
pub fn init_selection(table: &RecordTable, config: &DashboardConfig) -> Selection {
    let mut selection = Selection::new();
    let first_n = |column: &str, n: usize| -> BTreeSet<Value> {
        table.unique_values(column).into_iter().take(n).collect()
    };

    match config.kind {
        DatasetKind::Population => {
            if table.has_column("Country") {
                let countries = first_n("Country", config.default_country_count);
                selection.set("Country", Predicate::OneOf(countries));
            }
            if let Some((min, max)) = table.numeric_range("Year") {
                selection.set("Year", Predicate::Between { min, max });
            }
        }
        DatasetKind::Ratings => {
            if let Some((min, max)) = table.numeric_range("age") {
                if min < max {
                    selection.set("age", Predicate::Between { min, max });
                }
            }
            if table.has_column("gender") {
                selection.set("gender", Predicate::OneOf(table.unique_values("gender")));
            }
            if table.has_column("occupation") {
                let occupations = first_n("occupation", config.default_occupation_count);
                selection.set("occupation", Predicate::OneOf(occupations));
            }
            if let Some((min, max)) = table.numeric_range("year") {
                selection.set("year", Predicate::Between { min, max });
            }
            if table.has_column("genres") {
                selection.set(
                    "genres",
                    Predicate::AnyToken {
                        values: BTreeSet::new(),
                        delimiter: config.genre_delimiter,
                    },
                );
            }
        }
    }
    selection
}

#[cfg(test)]
mod tests {
    use super::*;

    fn population() -> RecordTable {
        RecordTable::from_records(
            &["Country", "Year", "Population"],
            [
                ["US".into(), Value::Integer(2010), Value::Integer(100)],
                ["US".into(), Value::Integer(2015), Value::Null],
                ["IN".into(), Value::Integer(2020), Value::Integer(600)],
                ["BR".into(), Value::Null, Value::Integer(50)],
            ],
        )
    }

    #[test]
    fn empty_set_is_identity() {
        let t = population();
        let s = Selection::new().one_of::<_, &str>("Country", []);
        assert_eq!(filter(&t, &s), t);
        let s = Selection::new().any_token::<_, &str>("Country", [], '|');
        assert_eq!(filter(&t, &s), t);
    }

    #[test]
    fn range_is_inclusive_and_excludes_missing() {
        let t = population();
        let out = filter(&t, &Selection::new().between("Year", 2010.0, 2015.0));
        assert_eq!(out.len(), 2);
        let out = filter(&t, &Selection::new().between("Year", f64::MIN, f64::MAX));
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn year_range_keeps_only_inner_year() {
        let t = population();
        let out = filter(&t, &Selection::new().between("Year", 2012.0, 2018.0));
        assert_eq!(out.len(), 1);
        assert_eq!(cell(&out.rows[0], "Year"), &Value::Integer(2015));
    }

    #[test]
    fn selections_compose() {
        let t = population();
        let s1 = Selection::new().one_of("Country", ["US", "IN"]);
        let s2 = Selection::new().between("Year", 2012.0, 2030.0);
        let both = filter(&t, &s1.clone().and(s2.clone()));
        let chained = filter(&filter(&t, &s1), &s2);
        assert_eq!(both, chained);
        assert_eq!(both.len(), 2);
    }

    #[test]
    fn absent_columns_are_ignored() {
        let t = population();
        let s = Selection::new().one_of("gender", ["F"]);
        assert_eq!(filter(&t, &s).len(), t.len());
    }

    #[test]
    fn any_token_matches_multi_valued_cells() {
        let t = RecordTable::from_records(
            &["genres"],
            [[Value::from("Action|Comedy")], [Value::from("Drama")], [Value::from("")]],
        );
        let s = Selection::new().any_token("genres", ["Comedy", "Horror"], '|');
        let out = filter(&t, &s);
        assert_eq!(out.len(), 1);
        assert_eq!(cell(&out.rows[0], "genres"), &Value::from("Action|Comedy"));
    }

    #[test]
    fn empty_table_filters_to_empty() {
        let t = RecordTable::default();
        let s = Selection::new().between("Year", 0.0, 1.0);
        assert!(filter(&t, &s).is_empty());
        assert!(drop_missing(&t, "Population").is_empty());
    }

    #[test]
    fn drop_missing_removes_null_measures() {
        let out = drop_missing(&population(), "Population");
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn default_population_selection() {
        let config = DashboardConfig::default();
        let s = init_selection(&population(), &config);
        assert_eq!(s.get("Year"), Some(&Predicate::Between { min: 2010.0, max: 2020.0 }));
        match s.get("Country") {
            Some(Predicate::OneOf(set)) => assert_eq!(set.len(), 3),
            other => panic!("unexpected {other:?}"),
        }
    }
}
