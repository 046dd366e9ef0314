//! A cache of downloaded data sources.

use std::path::PathBuf;

/// The cache. Remote sources are stored gzip compressed in a data directory and indexed in a
/// small sqlite database.
#[derive(Debug)]
pub struct Cache {
    root: PathBuf,                 // The root directory.
    db_conn: rusqlite::Connection, // An sqlite connection.
}

/// One cached source.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq)]
pub struct CacheEntry {
    pub url: String,
    pub file_name: String,
    pub fetched: chrono::NaiveDateTime,
    pub size: i64,
}

mod add_data;
mod clean;
mod query;
mod root;

pub use root::default_root;
