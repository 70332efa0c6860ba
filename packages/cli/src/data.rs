//! Data directory loading.
//!
//! Layout under the data directory:
//! - `verbs.jsonl`, `templates.json`, `exceptions.json`: the catalog
//! - `curricula/<path>.json`: one curriculum config per track
//!
//! Progress files (path state, cards, mistake counts) are passed explicitly;
//! a missing progress file reads as empty progress.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use katsuyo_algo::curriculum::{CurriculumConfig, PathState, PathType};
use katsuyo_algo::{Card, Catalog, CatalogError};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub const VERBS_FILE: &str = "verbs.jsonl";
pub const TEMPLATES_FILE: &str = "templates.json";
pub const EXCEPTIONS_FILE: &str = "exceptions.json";
pub const CURRICULA_DIR: &str = "curricula";

#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid json in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("catalog in {dir}: {source}")]
    Catalog {
        dir: PathBuf,
        #[source]
        source: CatalogError,
    },
    #[error("no curriculum for {path_type} track at {path}")]
    MissingCurriculum { path_type: PathType, path: PathBuf },
}

fn read(path: &Path) -> Result<String, DataError> {
    fs::read_to_string(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Read a JSON file, or `None` when it does not exist
fn read_json_opt<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, DataError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(DataError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| DataError::Json {
            path: path.to_path_buf(),
            source,
        })
}

pub fn load_catalog(data_dir: &Path) -> Result<Catalog, DataError> {
    let verbs = read(&data_dir.join(VERBS_FILE))?;
    let templates = read(&data_dir.join(TEMPLATES_FILE))?;
    let exceptions = read(&data_dir.join(EXCEPTIONS_FILE))?;
    let catalog = Catalog::from_sources(&verbs, &templates, &exceptions).map_err(|source| DataError::Catalog {
        dir: data_dir.to_path_buf(),
        source,
    })?;
    tracing::info!(
        verbs = catalog.verbs().len(),
        templates = catalog.templates().len(),
        dir = %data_dir.display(),
        "catalog loaded"
    );
    Ok(catalog)
}

pub fn curriculum_path(data_dir: &Path, path_type: PathType) -> PathBuf {
    data_dir.join(CURRICULA_DIR).join(format!("{}.json", path_type.as_str()))
}

pub fn load_curriculum(data_dir: &Path, path_type: PathType) -> Result<CurriculumConfig, DataError> {
    let path = curriculum_path(data_dir, path_type);
    read_json_opt(&path)?.ok_or(DataError::MissingCurriculum { path_type, path })
}

/// Path state from `path`, or a fresh state starting `now`
pub fn load_path_state(path: Option<&Path>, now: DateTime<Utc>) -> Result<PathState, DataError> {
    match path {
        Some(path) => Ok(read_json_opt(path)?.unwrap_or_else(|| PathState::new(now))),
        None => Ok(PathState::new(now)),
    }
}

/// Cards stored as a JSON array, keyed by card id on load
pub fn load_cards(path: Option<&Path>) -> Result<HashMap<String, Card>, DataError> {
    let cards: Vec<Card> = match path {
        Some(path) => read_json_opt(path)?.unwrap_or_default(),
        None => Vec::new(),
    };
    Ok(cards
        .into_iter()
        .map(|card| (card.card_id.clone(), card))
        .collect())
}

pub fn load_mistake_counts(path: Option<&Path>) -> Result<HashMap<String, u32>, DataError> {
    match path {
        Some(path) => Ok(read_json_opt(path)?.unwrap_or_default()),
        None => Ok(HashMap::new()),
    }
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), DataError> {
    let raw = serde_json::to_string_pretty(value).map_err(|source| DataError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, raw).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Cards written back sorted by id so files diff cleanly
pub fn write_cards(path: &Path, cards: &HashMap<String, Card>) -> Result<(), DataError> {
    let mut list: Vec<&Card> = cards.values().collect();
    list.sort_by(|a, b| a.card_id.cmp(&b.card_id));
    write_json(path, &list)
}
