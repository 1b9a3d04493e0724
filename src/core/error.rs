//! Error types for data loading.

use thiserror::Error;

/// Errors that can occur when loading definition files from `assets/data`.
#[derive(Debug, Error)]
pub enum DataLoadError {
    /// Directory could not be found.
    #[error("Directory not found: {0}")]
    DirectoryNotFound(String),

    /// File could not be found.
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// File could not be read.
    #[error("Failed to read file '{path}': {details}")]
    ReadError { path: String, details: String },

    /// RON parsing failed.
    #[error("Parse error in '{path}': {details}")]
    ParseError { path: String, details: String },

    /// Two files define the same name.
    #[error("Duplicate definition '{name}' in '{path}'")]
    DuplicateEntry { name: String, path: String },

    /// An aspect tree is not a single-rooted graph.
    #[error("Invalid aspect tree '{tree}': {reason}")]
    InvalidAspectTree { tree: String, reason: String },
}
