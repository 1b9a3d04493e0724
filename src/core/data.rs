//! Shared RON loading used by every definition registry.

use bevy::prelude::*;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

use super::error::DataLoadError;

/// Parse a single RON document, tagging errors with `path`.
pub fn parse_ron<T: DeserializeOwned>(path: &str, contents: &str) -> Result<T, DataLoadError> {
    ron::from_str::<T>(contents).map_err(|e| DataLoadError::ParseError {
        path: path.to_string(),
        details: e.to_string(),
    })
}

/// Load a single RON file.
pub fn load_ron_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, DataLoadError> {
    let path = path.as_ref();
    let label = path.display().to_string();

    if !path.exists() {
        return Err(DataLoadError::FileNotFound(label));
    }

    let contents = fs::read_to_string(path).map_err(|e| DataLoadError::ReadError {
        path: label.clone(),
        details: e.to_string(),
    })?;
    parse_ron(&label, &contents)
}

/// Load every `.ron` file in `dir`, keyed by file stem and sorted by name.
///
/// Files that fail to read or parse are logged and skipped so one bad
/// definition doesn't take the rest of the registry down with it.
pub fn load_ron_dir<T: DeserializeOwned>(
    dir: impl AsRef<Path>,
) -> Result<Vec<(String, T)>, DataLoadError> {
    let dir = dir.as_ref();

    if !dir.exists() {
        return Err(DataLoadError::DirectoryNotFound(dir.display().to_string()));
    }

    let entries = fs::read_dir(dir).map_err(|e| DataLoadError::ReadError {
        path: dir.display().to_string(),
        details: e.to_string(),
    })?;

    let mut paths: Vec<_> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "ron"))
        .collect();
    paths.sort();

    let mut loaded = Vec::with_capacity(paths.len());
    for path in paths {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string();
        let label = path.display().to_string();

        let result = fs::read_to_string(&path)
            .map_err(|e| DataLoadError::ReadError {
                path: label.clone(),
                details: e.to_string(),
            })
            .and_then(|contents| parse_ron::<T>(&label, &contents));

        match result {
            Ok(definition) => loaded.push((stem, definition)),
            Err(e) => error!("{}", e),
        }
    }

    Ok(loaded)
}
