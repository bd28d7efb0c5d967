//! Error types for the tagnotes application.
//!
//! Store mutations never surface persistence failures; these errors come from
//! constructors, configuration, the key-value layer and the command line.

use std::{io, path::PathBuf};

use thiserror::Error;

/// The main error type for the tagnotes application.
#[derive(Error, Debug)]
pub enum NotesError {
    /// Errors related to file I/O operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Errors related to serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Note was not found when performing an operation.
    #[error("Note not found: {id}")]
    NoteNotFound { id: String },

    /// Custom tag was not found when performing an operation.
    #[error("Tag not found: {id}")]
    TagNotFound { id: String },

    /// An id prefix matched more than one record.
    #[error("Identifier prefix '{prefix}' matches {matches} records")]
    AmbiguousId { prefix: String, matches: usize },

    /// Rejected user input (empty content, empty tag name, bad color...).
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// A custom tag name collides with a built-in or existing tag.
    #[error("Tag name already in use: {name}")]
    TagNameCollision { name: String },

    /// Key not usable by the key-value store.
    #[error("Invalid storage key: {key}")]
    InvalidKey { key: String },

    /// Errors related to configuration.
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Directory creation or access failed.
    #[error("Failed to create or access directory: {path}")]
    DirectoryError { path: PathBuf },

    /// Background work could not be started or joined.
    #[error("Runtime error: {message}")]
    Runtime { message: String },

    #[error("{message}")]
    EditorError { message: String },
}
