//! Bring the cache index and the data directory back into agreement.

use std::collections::HashSet;

use log::info;

use super::Cache;

use crate::errors::MetatabErr;

impl Cache {
    /// Remove index rows whose file is gone and delete files that are not in the index.
    pub fn clean(&self) -> Result<(), MetatabErr> {
        info!("Building set of files from the index.");
        let index_vals = self.get_all_files_from_index()?;

        info!("Building set of files from the file system.");
        let file_system_vals = self.get_all_files_in_data_dir()?;

        info!("Comparing sets for files in index but not in the cache.");
        let mut files_in_index_but_not_on_file_system = index_vals.difference(&file_system_vals);
        self.remove_missing_files_from_index(&mut files_in_index_but_not_on_file_system)?;

        info!("Comparing sets for files in cache but not in the index.");
        for extra_file in file_system_vals.difference(&index_vals) {
            info!("Removing {} from the cache.", extra_file);
            std::fs::remove_file(self.data_root().join(extra_file))?;
        }

        self.db_conn.execute("VACUUM", rusqlite::NO_PARAMS)?;

        Ok(())
    }

    #[inline]
    fn get_all_files_from_index(&self) -> Result<HashSet<String>, MetatabErr> {
        let mut all_files_stmt = self.db_conn.prepare("SELECT file_name FROM sources")?;

        let index_vals: Result<HashSet<String>, MetatabErr> = all_files_stmt
            .query_map(rusqlite::NO_PARAMS, |row| row.get::<_, String>(0))?
            .map(|res| res.map_err(MetatabErr::Database))
            .collect();

        index_vals
    }

    #[inline]
    fn get_all_files_in_data_dir(&self) -> Result<HashSet<String>, MetatabErr> {
        Ok(std::fs::read_dir(&self.data_root())?
            .filter_map(Result::ok)
            .map(|de| de.path())
            .filter(|p| p.is_file())
            .filter_map(|p| p.file_name().map(ToOwned::to_owned))
            .map(|p| p.to_string_lossy().to_string())
            .collect())
    }

    #[inline]
    fn remove_missing_files_from_index(
        &self,
        files_in_index_but_not_on_file_system: &mut dyn Iterator<Item = &String>,
    ) -> Result<(), MetatabErr> {
        let mut del_stmt = self
            .db_conn
            .prepare("DELETE FROM sources WHERE file_name = ?1")?;

        self.db_conn
            .execute("BEGIN TRANSACTION", rusqlite::NO_PARAMS)?;

        for missing_file in files_in_index_but_not_on_file_system {
            del_stmt.execute(&[missing_file])?;
            info!("Removing {} from index.", missing_file);
        }

        self.db_conn
            .execute("COMMIT TRANSACTION", rusqlite::NO_PARAMS)?;

        Ok(())
    }
}

#[cfg(test)]
mod unit {
    use crate::cache::{unit::*, Cache};

    #[test]
    fn test_clean() {
        let TestCache { tmp: _tmp, cache } =
            create_test_cache().expect("Failed to create test cache.");

        cache.add("http://example.com/kept.csv", b"a").unwrap();
        cache.add("http://example.com/lost.csv", b"b").unwrap();

        // File vanishes behind the index's back.
        let lost = cache
            .data_root()
            .join(Cache::compressed_file_name("http://example.com/lost.csv"));
        std::fs::remove_file(&lost).unwrap();

        // Stray file nobody indexed.
        let stray = cache.data_root().join("stray.gz");
        std::fs::write(&stray, b"junk").unwrap();

        cache.clean().expect("Error cleaning.");

        assert!(cache.exists("http://example.com/kept.csv").unwrap());
        assert!(!cache.exists("http://example.com/lost.csv").unwrap());
        assert!(!stray.exists());
    }
}
