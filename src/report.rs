use log::debug;
use serde::Serialize;

use crate::config::DashboardConfig;
use crate::data::aggregate::{
    explode, group_mean, latest_period_summary, mean_by_key, rows_at_latest_period, top_k,
    value_counts, GroupStat, KeyCount, PeriodSummary,
};
use crate::data::filter::{drop_missing, filter, Selection};
use crate::data::model::{cell, RecordTable, Row};
use crate::error::{DashboardError, Notice};

// ---------------------------------------------------------------------------
// Reports – everything a presenter needs, as flat serialisable rows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "dataset", rename_all = "lowercase")]
pub enum Report {
    Population(PopulationReport),
    Ratings(RatingsReport),
}

impl Report {
    pub fn notices(&self) -> &[Notice] {
        match self {
            Report::Population(r) => &r.notices,
            Report::Ratings(r) => &r.notices,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PopulationReport {
    /// KPIs for the latest year.
    pub latest: Option<PeriodSummary>,
    /// `Country`, `Year`, `Population` rows ordered by country then year.
    pub series: Vec<Row>,
    /// Latest-year rows, largest population first.
    pub latest_by_country: Vec<Row>,
    pub preview: Vec<Row>,
    pub notices: Vec<Notice>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopMovies {
    pub min_count: usize,
    pub movies: Vec<GroupStat>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RatingsReport {
    pub genre_counts: Vec<KeyCount>,
    pub min_genre_count: usize,
    pub genre_stats: Vec<GroupStat>,
    pub year_means: Vec<GroupStat>,
    pub top_movies: Vec<TopMovies>,
    pub focus_genres: Vec<String>,
    /// Rating per focus genre, over rows with both age and rating present.
    pub focus_genre_stats: Vec<GroupStat>,
    /// Rating volume against mean per genre, busiest genre first.
    pub genre_volume: Vec<GroupStat>,
    pub notices: Vec<Notice>,
}

const NO_DATA: &str = "No data after filters; adjust selections.";

/// Record an info notice and return false when `table` lacks any of `columns`.
fn require(table: &RecordTable, columns: &[&str], section: &str, notices: &mut Vec<Notice>) -> bool {
    match table.missing_column(columns) {
        Some(missing) => {
            let err = DashboardError::MissingColumn(missing.to_string());
            debug!("skipping {section}: {err}");
            notices.push(Notice::info(format!("{section} unavailable: {err}")));
            false
        }
        None => true,
    }
}

// ---------------------------------------------------------------------------
// Population
// ---------------------------------------------------------------------------

pub fn population_report(filtered: &RecordTable, config: &DashboardConfig) -> PopulationReport {
    let mut report = PopulationReport::default();
    if filtered.is_empty() {
        report.notices.push(Notice::info(NO_DATA));
        return report;
    }
    let measure = config.measure_column.as_str();

    if require(filtered, &["Year", measure], "Latest-year summary", &mut report.notices) {
        report.latest = latest_period_summary(filtered, "Year", measure, Some("Country"));
    }

    if require(filtered, &["Country", "Year", measure], "Population over time", &mut report.notices) {
        let mut series: Vec<Row> = filtered
            .rows
            .iter()
            .map(|r| {
                ["Country", "Year", measure]
                    .iter()
                    .map(|c| (c.to_string(), cell(r, c).clone()))
                    .collect()
            })
            .collect();
        series.sort_by(|a, b| {
            cell(a, "Country")
                .cmp(cell(b, "Country"))
                .then_with(|| cell(a, "Year").cmp(cell(b, "Year")))
        });
        report.series = series;

        report.latest_by_country = rows_at_latest_period(filtered, "Year", measure).rows;
    }

    report.preview = filtered.head(config.preview_rows);
    report
}

// ---------------------------------------------------------------------------
// Ratings
// ---------------------------------------------------------------------------

pub fn ratings_report(
    filtered: &RecordTable,
    config: &DashboardConfig,
    focus_genres: &[String],
) -> RatingsReport {
    let mut report = RatingsReport {
        min_genre_count: config.min_genre_count,
        focus_genres: focus_genres.to_vec(),
        ..RatingsReport::default()
    };
    if filtered.is_empty() {
        report.notices.push(Notice::info(NO_DATA));
        return report;
    }
    let delim = config.genre_delimiter;
    let measure = config.measure_column.as_str();
    let notices = &mut report.notices;

    let exploded = filtered
        .has_column("genres")
        .then(|| explode(filtered, "genres", delim));

    if let Some(genres) = exploded.as_ref() {
        report.genre_counts = value_counts(genres, "genres");
    } else {
        require(filtered, &["genres"], "Genre breakdown", notices);
    }

    if require(filtered, &["genres", measure], "Genre ratings", notices) {
        if let Some(genres) = exploded.as_ref() {
            report.genre_stats = group_mean(genres, "genres", measure, config.min_genre_count);

            let mut volume = mean_by_key(genres, "genres", measure);
            volume.sort_by(|a, b| b.count.cmp(&a.count));
            report.genre_volume = volume;
        }
    }

    if require(filtered, &["year", measure], "Mean rating by release year", notices) {
        report.year_means = mean_by_key(filtered, "year", measure);
    }

    if require(filtered, &["title", measure], "Best-rated movies", notices) {
        report.top_movies = config
            .top_movie_thresholds
            .iter()
            .map(|&min_count| TopMovies {
                min_count,
                movies: top_k(filtered, "title", measure, min_count, config.top_movie_limit),
            })
            .collect();
    }

    if require(filtered, &["genres", measure, "age"], "Rating by genre", notices) {
        if focus_genres.is_empty() {
            notices.push(Notice::info("Select at least one genre."));
        } else if let Some(genres) = exploded.as_ref() {
            let picked = filter(genres, &Selection::new().one_of("genres", focus_genres.iter().cloned()));
            let complete = drop_missing(&drop_missing(&picked, "age"), measure);
            report.focus_genre_stats = mean_by_key(&complete, "genres", measure);
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatasetKind;
    use crate::data::model::Value;
    use crate::error::NoticeLevel;

    fn ratings_table() -> RecordTable {
        RecordTable::from_records(
            &["title", "genres", "rating", "age", "year"],
            [
                ["Heat".into(), "Action|Crime".into(), Value::Float(4.0), Value::Integer(30), Value::Integer(1995)],
                ["Heat".into(), "Action|Crime".into(), Value::Float(5.0), Value::Null, Value::Integer(1995)],
                ["Babe".into(), "Comedy".into(), Value::Float(3.0), Value::Integer(12), Value::Integer(1995)],
                ["Fargo".into(), "".into(), Value::Float(5.0), Value::Integer(40), Value::Integer(1996)],
            ],
        )
    }

    #[test]
    fn ratings_sections() {
        let mut config = DashboardConfig::for_kind(DatasetKind::Ratings);
        config.min_genre_count = 2;
        config.top_movie_thresholds = vec![1, 2];
        let focus = vec!["Action".to_string(), "Comedy".to_string()];
        let r = ratings_report(&ratings_table(), &config, &focus);

        assert_eq!(r.genre_counts[0], KeyCount { key: "Action".into(), count: 2 });
        assert_eq!(r.genre_counts.len(), 3);
        assert_eq!(r.genre_stats.len(), 2);
        assert_eq!(r.genre_stats[0].mean, 4.5);

        assert_eq!(r.year_means.len(), 2);
        assert_eq!(r.year_means[0].key, Value::Integer(1995));
        assert_eq!(r.year_means[0].mean, 4.0);

        assert_eq!(r.top_movies[0].movies[0].key, Value::from("Fargo"));
        assert_eq!(r.top_movies[1].movies.len(), 1);
        assert_eq!(r.top_movies[1].movies[0].key, Value::from("Heat"));

        // The Heat row without an age is left out.
        assert_eq!(r.focus_genre_stats.len(), 2);
        assert_eq!(r.focus_genre_stats[0].count, 1);
        assert_eq!(r.genre_volume[0].count, 2);
        assert!(r.notices.is_empty());
    }

    #[test]
    fn missing_columns_become_notices() {
        let t = RecordTable::from_records(&["title", "rating"], [["Heat".into(), Value::Float(4.0)]]);
        let config = DashboardConfig::for_kind(DatasetKind::Ratings);
        let r = ratings_report(&t, &config, &[]);
        assert!(r.genre_counts.is_empty());
        assert_eq!(r.top_movies.len(), 2);
        assert!(r.notices.iter().all(|n| n.level == NoticeLevel::Info));
        assert!(r.notices.iter().any(|n| n.message.contains("`genres`")));
        assert!(r.notices.iter().any(|n| n.message.contains("`year`")));
    }

    #[test]
    fn empty_table_reports_no_data() {
        let r = population_report(&RecordTable::default(), &DashboardConfig::default());
        assert!(r.latest.is_none());
        assert_eq!(r.notices, vec![Notice::info(NO_DATA)]);
    }

    #[test]
    fn population_sections() {
        let t = RecordTable::from_records(
            &["Country", "Year", "Population"],
            [
                ["US".into(), Value::Integer(2020), Value::Integer(120)],
                ["IN".into(), Value::Integer(2010), Value::Integer(500)],
                ["IN".into(), Value::Integer(2020), Value::Integer(600)],
            ],
        );
        let r = population_report(&t, &DashboardConfig::default());
        let latest = r.latest.unwrap();
        assert_eq!(latest.total, 720.0);
        assert_eq!(cell(&r.series[0], "Country"), &Value::from("IN"));
        assert_eq!(cell(&r.series[0], "Year"), &Value::Integer(2010));
        assert_eq!(r.latest_by_country.len(), 2);
        assert_eq!(cell(&r.latest_by_country[0], "Country"), &Value::from("IN"));
        assert_eq!(r.preview.len(), 3);
    }
}
