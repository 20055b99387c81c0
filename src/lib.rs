//! Load a delimited text file into an in-memory dictionary keyed by one or
//! more columns, and look records up by key.

pub mod config;
pub mod error;
pub mod loader;
pub mod table;
pub mod tokenize;

pub use config::{TableConfig, TableSpec};
pub use error::{CsvDictError, PathError, Result};
pub use loader::{load_table, CsvDict, LoadState};
pub use table::{Record, Selection, Table, Value};
