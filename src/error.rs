use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::domain::Orientation;

#[derive(Debug, Error, Diagnostic)]
pub enum TallyError {
    #[error("unknown prediction method: {0}")]
    InvalidKey(String),

    #[error("invalid stereochemical orientation: {0}")]
    InvalidOrientation(String),

    #[error("invalid monomer role: {0}")]
    InvalidRole(String),

    #[error("entity {name} is not registered for orientation {orientation}")]
    UnknownEntity {
        name: String,
        orientation: Orientation,
    },

    #[error("smCOG family {0} is outside the tracked range")]
    DomainOutOfRange(u32),

    #[error("input root does not exist or is not a directory: {0}")]
    MissingRoot(PathBuf),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("no input root given (pass it on the command line or set input_root in the config)")]
    MissingInput,

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to read annotations in {path}: {message}")]
    Annotation { path: PathBuf, message: String },

    #[error("failed to parse GenBank file {path}: {message}")]
    GenBank { path: PathBuf, message: String },

    #[error("failed to write CSV output: {0}")]
    Csv(String),

    #[error(
        "cluster {cluster} projects {found} columns where the header has {expected}; \
         column {column} does not line up"
    )]
    #[diagnostic(help("every cluster in a run must be seeded from the same name registry"))]
    ColumnMismatch {
        cluster: String,
        expected: usize,
        found: usize,
        column: usize,
    },
}
