//! Load, filter and aggregate CSV data for the population and movie-ratings
//! dashboards.
//!
//! ```no_run
//! use rusty_dashboard::config::DashboardConfig;
//! use rusty_dashboard::data::loader::Loader;
//! use rusty_dashboard::state::DashboardState;
//!
//! let config = DashboardConfig::default();
//! let loader = Loader::new(config.clone());
//! let mut state = DashboardState::new(config);
//! state.set_table(loader.load(None));
//! state.set_range("Year", 2012.0, 2020.0);
//! let report = state.report();
//! println!("{}", serde_json::to_string_pretty(&report).unwrap());
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod report;
pub mod state;
