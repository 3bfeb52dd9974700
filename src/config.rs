use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::DashboardError;

/// Which dashboard a table feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    /// `Country`, `Year`, `Population`
    Population,
    /// `title`, `genres`, `rating`, `age`, `gender`, `occupation`, `year`
    Ratings,
}

/// Columns coerced to numbers at load time, whichever dataset is loaded.
pub const NUMERIC_COLUMNS: &[&str] = &["Year", "Population", "rating", "age", "year", "rating_year"];

/// Resolved settings for one dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardConfig {
    pub kind: DatasetKind,
    /// Bundled sample files, tried in order relative to the loader's base directory.
    pub sample_candidates: Vec<PathBuf>,
    /// Use the embedded population table when no sample file exists.
    pub embedded_fallback: bool,
    pub numeric_columns: Vec<String>,
    /// Columns whose empty cells load as `""` instead of missing.
    pub fill_empty_columns: Vec<String>,
    pub genre_delimiter: char,
    /// Rows missing this column's value are dropped after filtering.
    pub measure_column: String,
    /// How many countries the default selection keeps.
    pub default_country_count: usize,
    /// How many occupations the default selection keeps.
    pub default_occupation_count: usize,
    /// Minimum ratings per genre for the genre ranking.
    pub min_genre_count: usize,
    /// Minimum rating counts for the best-movie tables.
    pub top_movie_thresholds: Vec<usize>,
    pub top_movie_limit: usize,
    /// Genres for the rating-by-genre breakdown. Empty means the first four
    /// genres in the data.
    pub focus_genres: Vec<String>,
    pub preview_rows: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self::for_kind(DatasetKind::Population)
    }
}

impl DashboardConfig {
    pub fn for_kind(kind: DatasetKind) -> Self {
        let (sample_candidates, embedded_fallback, measure_column) = match kind {
            DatasetKind::Population => (
                vec![PathBuf::from("data/sample_population.csv")],
                true,
                "Population",
            ),
            DatasetKind::Ratings => (
                [
                    "movie_ratings.csv",
                    "data/movie_ratings.csv",
                    "movie_ratings_EC.csv",
                    "data/movie_ratings_EC.csv",
                ]
                .iter()
                .map(PathBuf::from)
                .collect(),
                false,
                "rating",
            ),
        };
        DashboardConfig {
            kind,
            sample_candidates,
            embedded_fallback,
            numeric_columns: NUMERIC_COLUMNS.iter().map(|c| c.to_string()).collect(),
            fill_empty_columns: vec!["genres".to_string()],
            genre_delimiter: '|',
            measure_column: measure_column.to_string(),
            default_country_count: 5,
            default_occupation_count: 10,
            min_genre_count: 50,
            top_movie_thresholds: vec![50, 150],
            top_movie_limit: 20,
            focus_genres: Vec::new(),
            preview_rows: 100,
        }
    }

    /// Parse a TOML override file. `kind` picks the defaults; every other
    /// field present in the file replaces the default.
    pub fn from_toml_str(text: &str) -> Result<Self, DashboardError> {
        Self::resolve(Some(ConfigFile::from_toml_str(text)?), None)
    }

    pub fn load(path: &Path) -> Result<Self, DashboardError> {
        Self::resolve(Some(ConfigFile::load(path)?), None)
    }

    /// Combine an optional override file with a dataset kind asked for
    /// elsewhere (e.g. on the command line).
    ///
    /// The file's `kind` wins when only it is given, the requested kind when
    /// only that is, and population when neither is. Both present and
    /// different is a [`DashboardError::KindConflict`].
    pub fn resolve(
        file: Option<ConfigFile>,
        requested: Option<DatasetKind>,
    ) -> Result<Self, DashboardError> {
        let file = file.unwrap_or_default();
        if let (Some(requested), Some(configured)) = (requested, file.kind) {
            if requested != configured {
                return Err(DashboardError::KindConflict {
                    requested,
                    configured,
                });
            }
        }
        let mut config = Self::for_kind(file.kind.or(requested).unwrap_or(DatasetKind::Population));
        config.merge(file);
        Ok(config)
    }

    pub fn merge(&mut self, other: ConfigFile) {
        if let Some(kind) = other.kind {
            self.kind = kind;
        }
        if let Some(v) = other.sample_candidates {
            self.sample_candidates = v;
        }
        if let Some(v) = other.embedded_fallback {
            self.embedded_fallback = v;
        }
        if let Some(v) = other.numeric_columns {
            self.numeric_columns = v;
        }
        if let Some(v) = other.fill_empty_columns {
            self.fill_empty_columns = v;
        }
        if let Some(v) = other.genre_delimiter {
            self.genre_delimiter = v;
        }
        if let Some(v) = other.measure_column {
            self.measure_column = v;
        }
        if let Some(v) = other.default_country_count {
            self.default_country_count = v;
        }
        if let Some(v) = other.default_occupation_count {
            self.default_occupation_count = v;
        }
        if let Some(v) = other.min_genre_count {
            self.min_genre_count = v;
        }
        if let Some(v) = other.top_movie_thresholds {
            self.top_movie_thresholds = v;
        }
        if let Some(v) = other.top_movie_limit {
            self.top_movie_limit = v;
        }
        if let Some(v) = other.focus_genres {
            self.focus_genres = v;
        }
        if let Some(v) = other.preview_rows {
            self.preview_rows = v;
        }
    }

    /// Render the effective settings as TOML, in the format `load` accepts.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn is_numeric(&self, column: &str) -> bool {
        self.numeric_columns.iter().any(|c| c == column)
    }
}

/// On-disk form of [`DashboardConfig`]: every field optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub kind: Option<DatasetKind>,
    pub sample_candidates: Option<Vec<PathBuf>>,
    pub embedded_fallback: Option<bool>,
    pub numeric_columns: Option<Vec<String>>,
    pub fill_empty_columns: Option<Vec<String>>,
    pub genre_delimiter: Option<char>,
    pub measure_column: Option<String>,
    pub default_country_count: Option<usize>,
    pub default_occupation_count: Option<usize>,
    pub min_genre_count: Option<usize>,
    pub top_movie_thresholds: Option<Vec<usize>>,
    pub top_movie_limit: Option<usize>,
    pub focus_genres: Option<Vec<String>>,
    pub preview_rows: Option<usize>,
}

impl ConfigFile {
    pub fn from_toml_str(text: &str) -> Result<Self, DashboardError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, DashboardError> {
        let text = std::fs::read_to_string(path).map_err(|source| DashboardError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_selects_defaults() {
        let pop = DashboardConfig::default();
        assert_eq!(pop.measure_column, "Population");
        assert!(pop.embedded_fallback);

        let ratings = DashboardConfig::for_kind(DatasetKind::Ratings);
        assert_eq!(ratings.measure_column, "rating");
        assert!(!ratings.embedded_fallback);
        assert_eq!(ratings.sample_candidates.len(), 4);
        assert!(ratings.is_numeric("age"));
    }

    #[test]
    fn toml_overrides_only_given_fields() {
        let config = DashboardConfig::from_toml_str(
            r#"
            kind = "ratings"
            min_genre_count = 10
            top_movie_thresholds = [5]
            "#,
        )
        .unwrap();
        assert_eq!(config.kind, DatasetKind::Ratings);
        assert_eq!(config.min_genre_count, 10);
        assert_eq!(config.top_movie_thresholds, vec![5]);
        assert_eq!(config.top_movie_limit, 20);
        assert_eq!(config.measure_column, "rating");
    }

    #[test]
    fn requested_kind_fills_in_when_file_has_none() {
        let file = ConfigFile::from_toml_str("min_genre_count = 10").unwrap();
        let config = DashboardConfig::resolve(Some(file), Some(DatasetKind::Ratings)).unwrap();
        assert_eq!(config.kind, DatasetKind::Ratings);
        assert_eq!(config.measure_column, "rating");
        assert_eq!(config.min_genre_count, 10);
        assert_eq!(config.sample_candidates.len(), 4);

        let config = DashboardConfig::resolve(None, None).unwrap();
        assert_eq!(config, DashboardConfig::default());
    }

    #[test]
    fn agreeing_kinds_resolve_and_differing_kinds_conflict() {
        let file = ConfigFile::from_toml_str("kind = \"ratings\"").unwrap();
        let config = DashboardConfig::resolve(Some(file.clone()), Some(DatasetKind::Ratings)).unwrap();
        assert_eq!(config.kind, DatasetKind::Ratings);

        let err = DashboardConfig::resolve(Some(file), Some(DatasetKind::Population)).unwrap_err();
        assert!(matches!(
            err,
            DashboardError::KindConflict {
                requested: DatasetKind::Population,
                configured: DatasetKind::Ratings,
            }
        ));
    }

    #[test]
    fn rendered_config_loads_back() {
        let config = DashboardConfig::for_kind(DatasetKind::Ratings);
        let text = config.to_toml().unwrap();
        assert_eq!(DashboardConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = DashboardConfig::from_toml_str("colour = \"red\"").unwrap_err();
        assert!(matches!(err, DashboardError::Config(_)));
    }
}
