use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::config::DatasetKind;

/// Everything that can go wrong between reading a source and building a report.
///
/// Loaders and reports never return these: they turn them into [`Notice`]s
/// and carry on with an empty (or fallback) table. Only config loading
/// returns them to the caller.
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("no data file found ({} candidate path(s) tried)", .tried.len())]
    MissingSource { tried: Vec<PathBuf> },

    #[error("failed to parse {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: csv::Error,
    },

    #[error("{origin}: record {record} has {found} fields but the header has {expected}")]
    RaggedRow {
        origin: String,
        record: u64,
        expected: usize,
        found: usize,
    },

    #[error("{origin}: no header row")]
    NoHeader { origin: String },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("missing column `{0}`")]
    MissingColumn(String),

    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("requested the {requested:?} dashboard but the config file is for {configured:?}")]
    KindConflict {
        requested: DatasetKind,
        configured: DatasetKind,
    },
}

// ---------------------------------------------------------------------------
// Notice – a user-visible message attached to a load or a report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}
