//! Filesystem packages, a directory with `metadata.csv` and `data/<table>.csv`.

use std::{
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
};

use super::{Package, PackageFormat, PackageSource, PackageTable, METADATA_FILE};

use crate::{cache::Cache, errors::MetatabErr};

/// Writes a package as a directory tree.
#[derive(Debug)]
pub struct FileSystemPackage {
    source: PackageSource,
}

impl FileSystemPackage {
    const DATA_DIR: &'static str = "data";

    /// Create a writer for the prepared package.
    pub fn new(source: PackageSource) -> Self {
        FileSystemPackage { source }
    }

    fn data_path(table: &PackageTable) -> String {
        format!("{}/{}.csv", Self::DATA_DIR, table.stem)
    }

    /// All files in a written package, relative to the package directory.
    pub fn files(&self) -> Vec<String> {
        let mut files: Vec<String> = self.source.tables().iter().map(Self::data_path).collect();
        files.push(METADATA_FILE.to_owned());
        files
    }
}

impl Package for FileSystemPackage {
    fn format(&self) -> PackageFormat {
        PackageFormat::Filesystem
    }

    fn source(&self) -> &PackageSource {
        &self.source
    }

    fn write(&self, dest: &Path, cache: &Cache) -> Result<PathBuf, MetatabErr> {
        let package_dir = dest.join(self.save_path());
        if package_dir.exists() {
            std::fs::remove_dir_all(&package_dir)?;
        }
        std::fs::create_dir_all(package_dir.join(Self::DATA_DIR))?;

        for table in self.source.tables() {
            let file = File::create(package_dir.join(Self::data_path(table)))?;
            let mut writer = csv::WriterBuilder::new()
                .flexible(true)
                .from_writer(BufWriter::new(file));

            for row in table.rows(cache)? {
                writer.write_record(&row?)?;
            }
            writer.flush()?;
        }

        self.source
            .metadata(Self::data_path)
            .write_csv(&package_dir.join(METADATA_FILE))?;

        Ok(package_dir)
    }
}

#[cfg(test)]
mod unit {
    use super::*;
    use crate::{cache::unit::*, doc::MetatabDoc, package::unit::test_source};

    #[test]
    fn test_fs_package() {
        let TestCache { tmp, cache } = create_test_cache().unwrap();

        let package = FileSystemPackage::new(test_source());
        let dir = package
            .write(tmp.path(), &cache)
            .expect("Error writing package.");

        assert_eq!(dir, tmp.path().join("example.com-rates-2017"));
        assert_eq!(
            package.files(),
            vec!["data/rates.csv", "data/cities.csv", "metadata.csv"]
        );
        for file in package.files() {
            assert!(dir.join(file).is_file());
        }

        let doc = MetatabDoc::load(&dir.join("metadata.csv")).unwrap();
        assert_eq!(doc.find("root.datafile")[0].value(), "data/rates.csv");

        let rates = std::fs::read_to_string(dir.join("data/rates.csv")).unwrap();
        assert!(rates.starts_with("year,rate,note\n2015,1.25,\n"));
    }

    #[test]
    fn test_fs_package_rewrite_removes_stale_files() {
        let TestCache { tmp, cache } = create_test_cache().unwrap();

        let package = FileSystemPackage::new(test_source());
        let dir = package.write(tmp.path(), &cache).unwrap();
        std::fs::write(dir.join("data/stale.csv"), "old").unwrap();

        package.write(tmp.path(), &cache).unwrap();
        assert!(!dir.join("data/stale.csv").exists());
    }
}
