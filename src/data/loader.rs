use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, error, info, warn};

use super::model::{RecordTable, Row, Value};
use crate::config::DashboardConfig;
use crate::error::{DashboardError, Notice};

/// Population table used when no sample file can be found.
pub const EMBEDDED_POPULATION_CSV: &str = "\
Country,Year,Population
United States,2010,309011475
United States,2015,320738994
United States,2020,331501080
India,2010,1240613620
India,2015,1310152403
India,2020,1396387127
China,2010,1337705000
China,2015,1379860000
China,2020,1411100000
Brazil,2010,196353492
Brazil,2015,205188205
Brazil,2020,213196304
Nigeria,2010,158503203
Nigeria,2015,183995785
Nigeria,2020,208327405
";

// ---------------------------------------------------------------------------
// Sources and load results
// ---------------------------------------------------------------------------

/// A file handed in by the user, already read into memory.
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn from_path(path: &Path) -> Result<Self, DashboardError> {
        let bytes = std::fs::read(path).map_err(|source| DashboardError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Upload {
            name: path.display().to_string(),
            bytes,
        })
    }
}

/// Where a loaded table came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Upload(String),
    Bundled(PathBuf),
    Embedded,
    /// No source could be read; the table is empty.
    Unavailable,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Upload(name) => write!(f, "upload '{name}'"),
            Origin::Bundled(path) => write!(f, "{}", path.display()),
            Origin::Embedded => write!(f, "embedded sample"),
            Origin::Unavailable => write!(f, "no source"),
        }
    }
}

/// Result of a load: always a table (possibly empty) plus anything the user
/// should be told about.
#[derive(Debug, Clone)]
pub struct Loaded {
    pub table: Arc<RecordTable>,
    pub origin: Origin,
    pub notices: Vec<Notice>,
}

impl Loaded {
    fn unavailable(notices: Vec<Notice>) -> Self {
        Loaded {
            table: Arc::new(RecordTable::default()),
            origin: Origin::Unavailable,
            notices,
        }
    }
}

// ---------------------------------------------------------------------------
// Memo cache
// ---------------------------------------------------------------------------

/// Identity of a source's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceKey {
    digest: u64,
    len: usize,
}

impl SourceKey {
    pub fn of(bytes: &[u8]) -> Self {
        let mut hasher = DefaultHasher::new();
        bytes.hash(&mut hasher);
        SourceKey {
            digest: hasher.finish(),
            len: bytes.len(),
        }
    }
}

/// Parsed tables keyed by source content. Each key is written once, under the lock.
#[derive(Debug, Default)]
pub struct LoadCache {
    entries: Mutex<HashMap<SourceKey, Loaded>>,
}

impl LoadCache {
    pub fn get_or_insert_with<F>(&self, key: SourceKey, parse: F) -> Loaded
    where
        F: FnOnce() -> Loaded,
    {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(hit) = entries.get(&key) {
            debug!("load cache hit ({} bytes)", key.len);
            return hit.clone();
        }
        let loaded = parse();
        entries.insert(key, loaded.clone());
        loaded
    }
}

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

/// Resolves a source, parses it and memoises the result.
#[derive(Debug)]
pub struct Loader {
    config: DashboardConfig,
    base_dir: PathBuf,
    cache: LoadCache,
}

impl Loader {
    pub fn new(config: DashboardConfig) -> Self {
        Loader {
            config,
            base_dir: PathBuf::from("."),
            cache: LoadCache::default(),
        }
    }

    /// Resolve bundled sample paths against `base_dir` instead of the working directory.
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    /// Load the uploaded file if there is one, else the first bundled sample
    /// that exists, else the embedded sample (when enabled).
    pub fn load(&self, upload: Option<&Upload>) -> Loaded {
        match upload {
            Some(up) => self.load_bytes(Origin::Upload(up.name.clone()), &up.bytes),
            None => self.load_bundled(),
        }
    }

    fn load_bundled(&self) -> Loaded {
        let mut notices = Vec::new();
        let mut tried = Vec::new();

        for candidate in &self.config.sample_candidates {
            let path = self.base_dir.join(candidate);
            tried.push(path.clone());
            if !path.is_file() {
                continue;
            }
            match std::fs::read(&path) {
                Ok(bytes) => {
                    let mut loaded = self.load_bytes(Origin::Bundled(path), &bytes);
                    notices.append(&mut loaded.notices);
                    loaded.notices = notices;
                    return loaded;
                }
                Err(source) => {
                    let err = DashboardError::Io { path, source };
                    warn!("{err}");
                    notices.push(Notice::warning(err.to_string()));
                }
            }
        }

        let missing = DashboardError::MissingSource { tried };
        if self.config.embedded_fallback {
            warn!("{missing}; using the embedded sample");
            notices.push(Notice::warning(format!("{missing}; showing the embedded sample")));
            let mut loaded = self.load_bytes(Origin::Embedded, EMBEDDED_POPULATION_CSV.as_bytes());
            notices.append(&mut loaded.notices);
            loaded.notices = notices;
            loaded
        } else {
            error!("{missing}");
            notices.push(Notice::error(missing.to_string()));
            Loaded::unavailable(notices)
        }
    }

    fn load_bytes(&self, origin: Origin, bytes: &[u8]) -> Loaded {
        let key = SourceKey::of(bytes);
        let mut loaded = self.cache.get_or_insert_with(key, || {
            match parse_csv(bytes, &origin.to_string(), &self.config) {
                Ok(table) => {
                    info!(
                        "loaded {} rows × {} columns from {origin}",
                        table.len(),
                        table.columns.len()
                    );
                    Loaded {
                        table: Arc::new(table),
                        origin: origin.clone(),
                        notices: Vec::new(),
                    }
                }
                Err(err) => {
                    error!("{err}");
                    Loaded {
                        table: Arc::new(RecordTable::default()),
                        origin: origin.clone(),
                        notices: vec![Notice::error(err.to_string())],
                    }
                }
            }
        });
        loaded.origin = origin;
        loaded
    }
}

// ---------------------------------------------------------------------------
// CSV parsing
// ---------------------------------------------------------------------------

/// Parse CSV bytes into a table.
///
/// * Header names are trimmed; duplicates get a `.1`, `.2`, … suffix.
/// * Numeric columns from the config are coerced, unparsable cells become `Null`.
/// * Fill-empty columns keep empty cells as `""`; other empty cells are `Null`.
/// * Short records are padded with `Null`; long records are an error.
pub fn parse_csv(
    bytes: &[u8],
    origin: &str,
    config: &DashboardConfig,
) -> Result<RecordTable, DashboardError> {
    let parse_err = |source| DashboardError::Parse {
        origin: origin.to_string(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let raw_headers = reader.headers().map_err(parse_err)?.clone();
    if raw_headers.is_empty() {
        return Err(DashboardError::NoHeader {
            origin: origin.to_string(),
        });
    }
    let columns = dedupe_headers(raw_headers.iter().map(str::trim));

    let kinds: Vec<CellKind> = columns
        .iter()
        .map(|c| {
            if config.is_numeric(c) {
                CellKind::Numeric
            } else if config.fill_empty_columns.iter().any(|f| f == c) {
                CellKind::FilledText
            } else {
                CellKind::Text
            }
        })
        .collect();

    let mut rows = Vec::new();
    for (record_no, result) in reader.records().enumerate() {
        let record = result.map_err(parse_err)?;
        if record.len() > columns.len() {
            return Err(DashboardError::RaggedRow {
                origin: origin.to_string(),
                record: record_no as u64 + 1,
                expected: columns.len(),
                found: record.len(),
            });
        }

        let row: Row = columns
            .iter()
            .zip(&kinds)
            .enumerate()
            .map(|(idx, (col, kind))| {
                let raw = record.get(idx);
                let value = match (kind, raw) {
                    (CellKind::Numeric, Some(raw)) => Value::parse_numeric(raw),
                    (CellKind::FilledText, raw) => Value::String(raw.unwrap_or("").to_string()),
                    (CellKind::Text, Some(raw)) => Value::from_cell(raw),
                    (_, None) => Value::Null,
                };
                (col.clone(), value)
            })
            .collect();
        rows.push(row);
    }

    Ok(RecordTable::new(columns, rows))
}

#[derive(Debug, Clone, Copy)]
enum CellKind {
    Numeric,
    Text,
    FilledText,
}

fn dedupe_headers<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<String> = Vec::new();
    for name in names {
        let mut candidate = name.to_string();
        while out.contains(&candidate) {
            let n = seen.entry(name.to_string()).or_insert(0);
            *n += 1;
            candidate = format!("{name}.{n}");
        }
        out.push(candidate);
    }
    out
}
