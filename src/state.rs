use std::collections::BTreeSet;
use std::sync::Arc;

use log::debug;

use crate::config::{DashboardConfig, DatasetKind};
use crate::data::filter::{drop_missing, filter, init_selection, token_pool, Predicate, Selection};
use crate::data::loader::Loaded;
use crate::data::model::{RecordTable, Value};
use crate::error::Notice;
use crate::report::{population_report, ratings_report, Report};

// ---------------------------------------------------------------------------
// Dashboard state
// ---------------------------------------------------------------------------

/// One session's dashboard state, independent of rendering.
pub struct DashboardState {
    pub config: DashboardConfig,

    /// Loaded table (empty until something is loaded).
    pub table: Arc<RecordTable>,

    /// Active filter controls.
    pub selection: Selection,

    /// Rows passing the current selection with a present measure (cached).
    pub filtered: RecordTable,

    /// Distinct genres across the whole table, for the genre controls.
    pub genre_pool: BTreeSet<String>,

    /// Genres picked for the rating-by-genre breakdown.
    pub focus_genres: Vec<String>,

    /// Messages from the last load.
    pub load_notices: Vec<Notice>,
}

impl DashboardState {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            config,
            table: Arc::new(RecordTable::default()),
            selection: Selection::new(),
            filtered: RecordTable::default(),
            genre_pool: BTreeSet::new(),
            focus_genres: Vec::new(),
            load_notices: Vec::new(),
        }
    }

    /// Ingest a newly loaded table and reset the controls to their defaults.
    pub fn set_table(&mut self, loaded: Loaded) {
        self.selection = init_selection(&loaded.table, &self.config);
        self.genre_pool = token_pool(&loaded.table, "genres", self.config.genre_delimiter);
        self.focus_genres = if self.config.focus_genres.is_empty() {
            self.genre_pool.iter().take(4).cloned().collect()
        } else {
            self.config.focus_genres.clone()
        };
        self.table = loaded.table;
        self.load_notices = loaded.notices;
        self.refilter();
    }

    /// Recompute `filtered` after a control change.
    pub fn refilter(&mut self) {
        let kept = filter(&self.table, &self.selection);
        self.filtered = drop_missing(&kept, &self.config.measure_column);
        debug!(
            "{} of {} rows pass the current selection",
            self.filtered.len(),
            self.table.len()
        );
    }

    /// Toggle a single value in a column's membership filter.
    pub fn toggle_filter_value(&mut self, column: &str, value: &Value) {
        let toggled = match self.selection.get_mut(column) {
            Some(Predicate::OneOf(selected)) => {
                if !selected.remove(value) {
                    selected.insert(value.clone());
                }
                true
            }
            _ => false,
        };
        if !toggled {
            self.selection
                .set(column, Predicate::OneOf(BTreeSet::from([value.clone()])));
        }
        self.refilter();
    }

    /// Select every value present in a column.
    pub fn select_all(&mut self, column: &str) {
        if self.table.has_column(column) {
            let all = self.table.unique_values(column);
            self.selection.set(column, Predicate::OneOf(all));
            self.refilter();
        }
    }

    /// Clear a column's membership filter. An empty set filters nothing.
    pub fn select_none(&mut self, column: &str) {
        self.selection.set(column, Predicate::OneOf(BTreeSet::new()));
        self.refilter();
    }

    /// Set an inclusive numeric range on a column.
    pub fn set_range(&mut self, column: &str, min: f64, max: f64) {
        self.selection.set(column, Predicate::Between { min, max });
        self.refilter();
    }

    /// Restrict to rows having any of the given genres.
    pub fn set_genres<I, S>(&mut self, genres: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selection.set(
            "genres",
            Predicate::AnyToken {
                values: genres.into_iter().map(Into::into).collect(),
                delimiter: self.config.genre_delimiter,
            },
        );
        self.refilter();
    }

    /// Build the report for the current selection. Load notices come first.
    pub fn report(&self) -> Report {
        match self.config.kind {
            DatasetKind::Population => {
                let mut r = population_report(&self.filtered, &self.config);
                r.notices.splice(0..0, self.load_notices.iter().cloned());
                Report::Population(r)
            }
            DatasetKind::Ratings => {
                let mut r = ratings_report(&self.filtered, &self.config, &self.focus_genres);
                r.notices.splice(0..0, self.load_notices.iter().cloned());
                Report::Ratings(r)
            }
        }
    }
}
