use std::fs::File;

use flate2::read::GzDecoder;

use super::{Cache, CacheEntry};

use crate::errors::MetatabErr;

impl Cache {
    /// Check to see if a source is present in the cache.
    pub fn exists(&self, url: &str) -> Result<bool, MetatabErr> {
        let num_records: i32 = self.db_conn.query_row(
            "SELECT COUNT(*) FROM sources WHERE url = ?1",
            &[&url],
            |row| row.get(0),
        )?;

        Ok(num_records == 1)
    }

    pub(super) fn file_name(&self, url: &str) -> Result<String, MetatabErr> {
        let file_name: Result<String, _> = self.db_conn.query_row(
            "SELECT file_name FROM sources WHERE url = ?1",
            &[&url],
            |row| row.get(0),
        );

        match file_name {
            Ok(fname) => Ok(fname),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(MetatabErr::NotInIndex),
            Err(x) => Err(MetatabErr::Database(x)),
        }
    }

    /// Open the cached data for reading.
    pub fn open(&self, url: &str) -> Result<GzDecoder<File>, MetatabErr> {
        let file_name = self.file_name(url)?;
        let file = File::open(self.data_root().join(file_name))?;

        Ok(GzDecoder::new(file))
    }

    /// List everything in the cache, most recently fetched first.
    pub fn entries(&self) -> Result<Vec<CacheEntry>, MetatabErr> {
        let mut stmt = self.db_conn.prepare(
            "
                SELECT url, file_name, fetched, size
                FROM sources
                ORDER BY fetched DESC
            ",
        )?;

        let vals: Result<Vec<CacheEntry>, MetatabErr> = stmt
            .query_map(rusqlite::NO_PARAMS, |row| {
                Ok(CacheEntry {
                    url: row.get(0)?,
                    file_name: row.get(1)?,
                    fetched: row.get(2)?,
                    size: row.get(3)?,
                })
            })?
            .map(|res| res.map_err(MetatabErr::Database))
            .collect();

        vals
    }
}
