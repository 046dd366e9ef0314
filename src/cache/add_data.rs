use std::io::Write;

use log::{debug, info};
use sha2::{Digest, Sha256};

use super::Cache;

use crate::{errors::MetatabErr, util::slugify};

impl Cache {
    const MAX_SLUG_LEN: usize = 64;

    /// Add the data downloaded from `url` to the cache, replacing anything already stored for it.
    pub fn add(&self, url: &str, data: &[u8]) -> Result<(), MetatabErr> {
        let file_name = Self::compressed_file_name(url);
        let file = std::fs::File::create(self.data_root().join(&file_name))?;
        let mut encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        encoder.write_all(data)?;
        encoder.finish()?;

        let fetched = chrono::Utc::now().naive_utc();
        let size = data.len() as i64;

        self.db_conn.execute(
            "INSERT OR REPLACE INTO sources (url, file_name, fetched, size)
                  VALUES (?1, ?2, ?3, ?4)",
            &[
                &url as &dyn rusqlite::types::ToSql,
                &file_name as &dyn rusqlite::types::ToSql,
                &fetched as &dyn rusqlite::types::ToSql,
                &size as &dyn rusqlite::types::ToSql,
            ],
        )?;

        debug!("cached {} as {} ({} bytes)", url, file_name, size);

        Ok(())
    }

    /// Make sure the data for `url` is in the cache, downloading it if needed.
    pub fn fetch(&self, url: &str) -> Result<(), MetatabErr> {
        if self.exists(url)? {
            debug!("cache hit for {}", url);
            return Ok(());
        }

        info!("Downloading {}", url);
        let response = reqwest::blocking::get(url)?.error_for_status()?;
        let data = response.bytes()?;

        self.add(url, &data)
    }

    /// Remove a source from the cache.
    pub fn remove(&self, url: &str) -> Result<(), MetatabErr> {
        let file_name = self.file_name(url)?;

        std::fs::remove_file(self.data_root().join(file_name)).map_err(MetatabErr::IO)?;

        self.db_conn
            .execute("DELETE FROM sources WHERE url = ?1", &[&url])?;

        Ok(())
    }

    // The tail of the slug keeps the name readable, the digest of the whole url keeps it unique.
    pub(super) fn compressed_file_name(url: &str) -> String {
        let slug = slugify(url);
        let start = slug
            .char_indices()
            .rev()
            .nth(Self::MAX_SLUG_LEN - 1)
            .map(|(idx, _)| idx)
            .unwrap_or(0);

        let digest: String = Sha256::digest(url.as_bytes())
            .iter()
            .map(|byte| format!("{:02x}", byte))
            .collect();

        format!("{}-{}.gz", &slug[start..], digest)
    }
}

#[cfg(test)]
mod unit {
    use super::*;

    #[test]
    fn test_compressed_file_name() {
        let name = Cache::compressed_file_name("http://example.com/files/rates.csv");
        assert!(name.starts_with("httpexample.comfilesrates.csv-"));
        assert!(name.ends_with(".gz"));
        assert_eq!(name.len(), "httpexample.comfilesrates.csv-".len() + 64 + 3);

        let long_url = format!("http://example.com/{}.csv", "x".repeat(500));
        let name = Cache::compressed_file_name(&long_url);
        assert_eq!(name.len(), Cache::MAX_SLUG_LEN + 1 + 64 + 3);
        assert!(name.starts_with("xxx"));
    }

    #[test]
    fn test_compressed_file_names_differ() {
        // Same slug.
        assert_ne!(
            Cache::compressed_file_name("http://example.com/a/b.csv"),
            Cache::compressed_file_name("http://example.com/ab.csv")
        );

        // Same tail.
        let tail = "y".repeat(200);
        assert_ne!(
            Cache::compressed_file_name(&format!("http://one.example.com/{}", tail)),
            Cache::compressed_file_name(&format!("http://two.example.com/{}", tail))
        );
    }
}
