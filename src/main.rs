use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{error, info, warn};

use rusty_dashboard::config::{ConfigFile, DashboardConfig, DatasetKind};
use rusty_dashboard::data::filter::Predicate;
use rusty_dashboard::data::loader::{Loader, Upload};
use rusty_dashboard::data::model::Value;
use rusty_dashboard::error::NoticeLevel;
use rusty_dashboard::state::DashboardState;

/// Load a CSV, apply filters and print the dashboard report as JSON.
#[derive(Debug, Parser)]
#[command(name = "rusty-dashboard", version)]
struct Args {
    /// CSV file to load instead of the bundled sample
    input: Option<PathBuf>,

    /// Which dashboard to build; must agree with the config file's `kind` when it has one
    #[arg(long, value_enum)]
    dataset: Option<DatasetKind>,

    /// TOML file overriding the default settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory the bundled sample paths are relative to
    #[arg(long, default_value = ".")]
    base_dir: PathBuf,

    /// Keep rows whose column is one of the values: COLUMN=A,B,C
    #[arg(long = "include", value_parser = parse_include)]
    includes: Vec<(String, Vec<String>)>,

    /// Keep rows whose numeric column lies in an inclusive range: COLUMN=LO..HI
    #[arg(long = "range", value_parser = parse_range)]
    ranges: Vec<(String, f64, f64)>,

    /// Keep ratings whose genres include any of these (repeatable)
    #[arg(long = "genre")]
    genres: Vec<String>,

    /// Genres for the rating-by-genre breakdown (repeatable)
    #[arg(long = "focus-genre")]
    focus_genres: Vec<String>,

    /// Minimum ratings per genre for the genre ranking
    #[arg(long)]
    min_genre_count: Option<usize>,

    /// Print the effective settings as TOML and exit
    #[arg(long)]
    print_config: bool,

    /// Single-line JSON output
    #[arg(long)]
    compact: bool,
}

fn parse_include(s: &str) -> Result<(String, Vec<String>), String> {
    let (column, values) = s
        .split_once('=')
        .ok_or_else(|| format!("expected COLUMN=A,B,C, got '{s}'"))?;
    let values = values
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();
    Ok((column.trim().to_string(), values))
}

fn parse_range(s: &str) -> Result<(String, f64, f64), String> {
    let (column, range) = s
        .split_once('=')
        .ok_or_else(|| format!("expected COLUMN=LO..HI, got '{s}'"))?;
    let (lo, hi) = range
        .split_once("..")
        .ok_or_else(|| format!("expected LO..HI, got '{range}'"))?;
    let lo: f64 = lo.trim().parse().map_err(|e| format!("bad lower bound '{lo}': {e}"))?;
    let hi: f64 = hi.trim().parse().map_err(|e| format!("bad upper bound '{hi}': {e}"))?;
    Ok((column.trim().to_string(), lo, hi))
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let file = args
        .config
        .as_deref()
        .map(|path| {
            ConfigFile::load(path).with_context(|| format!("loading config {}", path.display()))
        })
        .transpose()?;
    let mut config = DashboardConfig::resolve(file, args.dataset)?;
    if let Some(n) = args.min_genre_count {
        config.min_genre_count = n;
    }
    if !args.focus_genres.is_empty() {
        config.focus_genres = args.focus_genres.clone();
    }

    if args.print_config {
        print!("{}", config.to_toml().context("rendering config")?);
        return Ok(());
    }

    let upload = args
        .input
        .as_deref()
        .map(Upload::from_path)
        .transpose()
        .context("reading input file")?;

    let loader = Loader::new(config.clone()).with_base_dir(&args.base_dir);
    let loaded = loader.load(upload.as_ref());
    info!("data source: {}", loaded.origin);

    let mut state = DashboardState::new(config);
    state.set_table(loaded);

    for (column, values) in &args.includes {
        let numeric = state.config.is_numeric(column);
        let values = values
            .iter()
            .map(|v| {
                if numeric {
                    Value::parse_numeric(v)
                } else {
                    Value::from(v.as_str())
                }
            })
            .collect();
        state.selection.set(column, Predicate::OneOf(values));
    }
    for (column, lo, hi) in &args.ranges {
        if lo > hi {
            bail!("range for {column} is empty: {lo} > {hi}");
        }
        state.selection.set(column, Predicate::Between { min: *lo, max: *hi });
    }
    if !args.genres.is_empty() {
        state.set_genres(args.genres.iter().cloned());
    }
    state.refilter();

    let report = state.report();
    for notice in report.notices() {
        match notice.level {
            NoticeLevel::Info => info!("{}", notice.message),
            NoticeLevel::Warning => warn!("{}", notice.message),
            NoticeLevel::Error => error!("{}", notice.message),
        }
    }

    let json = if args.compact {
        serde_json::to_string(&report)
    } else {
        serde_json::to_string_pretty(&report)
    }
    .context("serialising report")?;
    println!("{json}");
    Ok(())
}
