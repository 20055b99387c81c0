use std::{io, path::Path, sync::Arc};
use thiserror::Error;

/// Problems with the `csv_path` of a table.
#[derive(Error, Debug, Clone)]
pub enum PathError {
    #[error("Missing or invalid path specified")]
    Missing,

    #[error("Path ({value}) is invalid")]
    Invalid { value: String },

    #[error("Path ({path}) not found")]
    NotFound { path: String },

    #[error("Path ({path}) not readable")]
    Unreadable {
        path: String,
        #[source]
        source: Arc<io::Error>,
    },
}

impl PathError {
    /// Classify a failed read of `path`.
    pub fn from_io(path: &Path, err: io::Error) -> Self {
        let path = path.display().to_string();
        match err.kind() {
            io::ErrorKind::NotFound => PathError::NotFound { path },
            _ => PathError::Unreadable {
                path,
                source: Arc::new(err),
            },
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum CsvDictError {
    #[error(transparent)]
    Path(#[from] PathError),

    #[error("table {table} has no header line")]
    MissingHeader { table: String },

    #[error("load task failed: {0}")]
    Task(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CsvDictError>;
