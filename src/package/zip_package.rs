//! Zip packages: `<name>/<table>.csv` entries plus `<name>/metadata.csv`.

use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};

use log::debug;
use zip::{write::FileOptions, CompressionMethod, ZipWriter};

use super::{Package, PackageFormat, PackageSource, METADATA_FILE};

use crate::{cache::Cache, errors::MetatabErr};

/// Writes a package as a single zip archive.
#[derive(Debug)]
pub struct ZipPackage {
    source: PackageSource,
}

impl ZipPackage {
    /// Create a writer for the prepared package.
    pub fn new(source: PackageSource) -> Self {
        ZipPackage { source }
    }

    /// Where the archive goes: a missing `dest` is created as a directory, inside a directory the
    /// archive is named after the package, anything else is taken as the archive path itself.
    pub fn archive_path(&self, dest: &Path) -> Result<PathBuf, MetatabErr> {
        if !dest.exists() {
            std::fs::create_dir_all(dest)?;
        }

        if dest.is_dir() {
            Ok(dest.join(self.save_path()))
        } else {
            Ok(dest.to_path_buf())
        }
    }

    fn write_entry<W>(
        zip: &mut ZipWriter<W>,
        name: String,
        rows: impl Iterator<Item = Result<Vec<String>, MetatabErr>>,
    ) -> Result<(), MetatabErr>
    where
        W: Write + std::io::Seek,
    {
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        debug!("writing zip entry {}", name);
        zip.start_file(name, options)?;

        let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(zip);
        for row in rows {
            writer.write_record(&row?)?;
        }
        writer.flush()?;

        Ok(())
    }
}

impl Package for ZipPackage {
    fn format(&self) -> PackageFormat {
        PackageFormat::Zip
    }

    fn source(&self) -> &PackageSource {
        &self.source
    }

    fn write(&self, dest: &Path, cache: &Cache) -> Result<PathBuf, MetatabErr> {
        let path = self.archive_path(dest)?;
        let name = self.source.name();

        let mut zip = ZipWriter::new(File::create(&path)?);

        for table in self.source.tables() {
            let entry = format!("{}/{}.csv", name, table.stem);
            Self::write_entry(&mut zip, entry, table.rows(cache)?)?;
        }

        let metadata = self.source.metadata(|t| format!("{}.csv", t.stem));
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        zip.start_file(format!("{}/{}", name, METADATA_FILE), options)?;
        zip.write_all(&metadata.to_csv_bytes()?)?;

        zip.finish()?;

        Ok(path)
    }
}
