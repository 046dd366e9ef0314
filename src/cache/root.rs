use std::path::{Path, PathBuf};

use super::Cache;

use crate::errors::MetatabErr;

/// The default location of the cache, `$METAPACK_CACHE` or `${HOME}/.metapack`.
pub fn default_root() -> Option<PathBuf> {
    std::env::var_os("METAPACK_CACHE")
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|hd| hd.join(".metapack")))
}

impl Cache {
    const DATA_DIR: &'static str = "data";
    const PACKAGE_DIR: &'static str = "packages";
    const DB_FILE: &'static str = "index.db";

    /// Initialize a new cache.
    pub fn create(root: &dyn AsRef<Path>) -> Result<Self, MetatabErr> {
        let data_root = root.as_ref().join(Cache::DATA_DIR);
        let db_file = root.as_ref().join(Cache::DB_FILE);
        let root = root.as_ref().to_path_buf();

        std::fs::create_dir_all(&data_root)?; // The folder to store the downloaded files.

        let db_conn = rusqlite::Connection::open_with_flags(
            db_file,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE | rusqlite::OpenFlags::SQLITE_OPEN_CREATE,
        )?;

        db_conn.execute_batch(include_str!("root/create_index.sql"))?;

        Ok(Cache { root, db_conn })
    }

    /// Open an existing cache.
    pub fn connect(root: &dyn AsRef<Path>) -> Result<Self, MetatabErr> {
        let db_file = root.as_ref().join(Cache::DB_FILE);
        let root = root.as_ref().to_path_buf();

        let db_conn = rusqlite::Connection::open_with_flags(
            db_file,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE,
        )?;

        Self::validate_db_structure(&db_conn)?;

        Ok(Cache { root, db_conn })
    }

    /// Open the cache at `root`, creating it first if it is not there.
    pub fn open_or_create(root: &dyn AsRef<Path>) -> Result<Self, MetatabErr> {
        match Self::connect(root) {
            Ok(cache) => Ok(cache),
            Err(_) => Self::create(root),
        }
    }

    /// Retrieve a path to the root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the directory the downloaded files are stored in.
    pub(crate) fn data_root(&self) -> PathBuf {
        self.root.join(Cache::DATA_DIR)
    }

    /// Scratch directory where packages are built before they are uploaded.
    pub fn package_root(&self) -> PathBuf {
        self.root.join(Cache::PACKAGE_DIR)
    }

    /// Validate the database structure is correct.
    fn validate_db_structure(db_conn: &rusqlite::Connection) -> Result<(), MetatabErr> {
        let mut stmt =
            db_conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")?;

        let names: Result<Vec<String>, _> = stmt
            .query_map(rusqlite::NO_PARAMS, |row| row.get::<_, String>(0))?
            .collect();

        if names? != ["sources"] {
            return Err(MetatabErr::InvalidSchema);
        }

        Ok(())
    }
}
