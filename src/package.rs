//! Build distributable packages from a Metatab document.
//!
//! Every package format goes through the same preparation: the document must name the package,
//! every data file is matched to a table schema, and a fresh metadata document describing the
//! packaged data is generated. The formats only differ in where the rows and metadata end up.

use std::path::{Path, PathBuf};

use log::{info, warn};
use strum_macros::{EnumIter, EnumString, IntoStaticStr};

use crate::{
    cache::Cache,
    doc::{MetatabDoc, Term},
    errors::MetatabErr,
    rowgen::{Encoding, RowGenerator},
    util::{slugify, SourceRef},
};

mod excel_package;
mod fs_package;
mod zip_package;

pub use excel_package::ExcelPackage;
pub use fs_package::FileSystemPackage;
pub use zip_package::ZipPackage;

/// File name of the metadata document inside a package.
pub const METADATA_FILE: &str = "metadata.csv";

/// The kinds of package that can be built.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, EnumString, EnumIter, IntoStaticStr)]
pub enum PackageFormat {
    /// One workbook, a worksheet per table.
    #[strum(to_string = "excel", serialize = "xlsx")]
    Excel,
    /// A zip archive of CSV files.
    #[strum(to_string = "zip")]
    Zip,
    /// A directory of CSV files.
    #[strum(to_string = "fs", serialize = "filesystem")]
    Filesystem,
}

impl PackageFormat {
    /// Short label for messages.
    pub fn label(self) -> &'static str {
        match self {
            PackageFormat::Excel => "Excel",
            PackageFormat::Zip => "ZIP",
            PackageFormat::Filesystem => "FS",
        }
    }

    /// Name of the output for a package, relative to the destination directory.
    pub fn save_path(self, package_name: &str) -> String {
        match self {
            PackageFormat::Excel => format!("{}.xlsx", package_name),
            PackageFormat::Zip => format!("{}.zip", package_name),
            PackageFormat::Filesystem => package_name.to_owned(),
        }
    }

    /// Wrap prepared package contents in a writer for this format.
    pub fn package(self, source: PackageSource) -> Box<dyn Package> {
        match self {
            PackageFormat::Excel => Box::new(ExcelPackage::new(source)),
            PackageFormat::Zip => Box::new(ZipPackage::new(source)),
            PackageFormat::Filesystem => Box::new(FileSystemPackage::new(source)),
        }
    }
}

/// A package writer.
pub trait Package {
    /// The format this writer produces.
    fn format(&self) -> PackageFormat;

    /// The prepared contents.
    fn source(&self) -> &PackageSource;

    /// Name of the output, relative to the destination directory.
    fn save_path(&self) -> String {
        self.format().save_path(self.source().name())
    }

    /// Write the package into the `dest` directory, returns the path of the output.
    fn write(&self, dest: &Path, cache: &Cache) -> Result<PathBuf, MetatabErr>;
}

/// The column schema of a table.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnSchema {
    pub name: String,
    pub datatype: Option<String>,
    pub description: Option<String>,
}

/// One data file headed for a package.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq)]
pub struct PackageTable {
    pub name: String,
    pub description: Option<String>,
    /// File name (without extension) of the data inside the package.
    pub stem: String,
    pub columns: Vec<ColumnSchema>,
    pub source: SourceRef,
    /// Number of source rows to drop before the data starts.
    pub start_line: usize,
    pub encoding: Encoding,
}

impl PackageTable {
    /// The header row followed by the source rows.
    pub fn rows(
        &self,
        cache: &Cache,
    ) -> Result<impl Iterator<Item = Result<Vec<String>, MetatabErr>>, MetatabErr> {
        let header: Vec<String> = self.columns.iter().map(|c| c.name.clone()).collect();
        let generator = RowGenerator::new(&self.source, cache, self.encoding)?;

        Ok(std::iter::once(Ok(header)).chain(generator.rows().skip(self.start_line)))
    }
}

/// The package name of a document, the slug of `Root.Name`.
pub fn package_name(doc: &MetatabDoc) -> Result<String, MetatabErr> {
    doc.find_first_value("root.name")
        .map(slugify)
        .ok_or(MetatabErr::MissingPackageName)
}

/// Everything needed to write a package, independent of the format.
#[derive(Clone, Debug)]
pub struct PackageSource {
    name: String,
    root: Vec<Term>,
    tables: Vec<PackageTable>,
}

impl PackageSource {
    /// Resolve the package name, table schemas and data files of a document.
    ///
    /// Relative data file references are resolved against `base_dir`.
    pub fn prepare(doc: &MetatabDoc, base_dir: &Path) -> Result<Self, MetatabErr> {
        let name = package_name(doc)?;

        let schemas: Vec<(&str, Vec<ColumnSchema>)> = doc
            .section("schema")
            .map(|s| s.terms())
            .unwrap_or(&[])
            .iter()
            .filter(|t| t.is("table"))
            .map(|t| (t.value(), table_columns(t)))
            .collect();

        if schemas.is_empty() {
            return Err(MetatabErr::NoTableSchemas);
        }

        let datafiles = doc
            .section("resources")
            .map(|s| s.terms())
            .unwrap_or(&[])
            .iter()
            .filter(|t| t.is("datafile"));

        let mut tables: Vec<PackageTable> = vec![];
        for datafile in datafiles {
            let source = SourceRef::parse(datafile.value(), base_dir)?;
            let table_name = datafile
                .get_value("name")
                .map(ToOwned::to_owned)
                .unwrap_or_else(|| source.name());
            let schema_name = datafile.get_value("schema").unwrap_or(table_name.as_str());

            info!("Processing {}", table_name);

            let columns = match schemas.iter().find(|(name, _)| *name == schema_name) {
                Some((_, columns)) => columns.clone(),
                None => {
                    warn!(
                        "Didn't get schema for table '{}', skipping",
                        table_name
                    );
                    continue;
                }
            };

            let start_line = match datafile.get_value("startline") {
                Some(val) => val.parse::<usize>().map_err(|_| {
                    MetatabErr::GeneralError(format!("invalid startline for {}: {}", table_name, val))
                })?,
                None => 1,
            };

            let encoding = match datafile.get_value("encoding") {
                Some(enc) => Encoding::from_name(enc)?,
                None => Encoding::default(),
            };

            let mut stem = source.name();
            if tables.iter().any(|t| t.stem == stem) {
                stem = format!("{}-{}", stem, slugify(&table_name));
            }

            tables.push(PackageTable {
                description: datafile.get_value("description").map(ToOwned::to_owned),
                name: table_name,
                stem,
                columns,
                source,
                start_line,
                encoding,
            });
        }

        Ok(PackageSource {
            name,
            root: doc.root().terms().to_vec(),
            tables,
        })
    }

    /// The package name, as a slug.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The data files that made it into the package.
    pub fn tables(&self) -> &[PackageTable] {
        &self.tables
    }

    /// The metadata document for the package, `location` gives where each table's data lives.
    pub fn metadata<F>(&self, location: F) -> MetatabDoc
    where
        F: Fn(&PackageTable) -> String,
    {
        let mut doc = MetatabDoc::new();

        for term in &self.root {
            doc.root_mut().add_term(term.clone());
        }

        let resources = doc.get_or_new_section("Resources", &["Name", "Description"]);
        for table in &self.tables {
            let datafile = resources.new_term("Datafile", &location(table));
            datafile.new_child("Name", &table.name);
            if let Some(ref description) = table.description {
                datafile.new_child("Description", description);
            }
        }

        let schema = doc.get_or_new_section("Schema", &["DataType", "AltName", "Description"]);
        for table in &self.tables {
            let table_term = schema.new_term("Table", &table.name);
            for column in &table.columns {
                let column_term = table_term.new_child("Column", &column.name);
                if let Some(ref datatype) = column.datatype {
                    column_term.new_child("DataType", datatype);
                }
                if let Some(ref description) = column.description {
                    column_term.new_child("Description", description);
                }
            }
        }

        doc
    }
}

fn table_columns(table: &Term) -> Vec<ColumnSchema> {
    table
        .children_named("column")
        .map(|c| ColumnSchema {
            name: c.value().to_owned(),
            datatype: c.get_value("datatype").map(ToOwned::to_owned),
            description: c.get_value("description").map(ToOwned::to_owned),
        })
        .collect()
}

/// Build a package of the given format in `dest`.
///
/// Returns the output path and whether it was written. With `skip_if_exists` an output that is
/// already there is left alone.
pub fn make_package(
    format: PackageFormat,
    doc: &MetatabDoc,
    base_dir: &Path,
    dest: &Path,
    cache: &Cache,
    skip_if_exists: bool,
) -> Result<(PathBuf, bool), MetatabErr> {
    let package = format.package(PackageSource::prepare(doc, base_dir)?);
    let path = dest.join(package.save_path());

    if skip_if_exists && path.exists() {
        info!("{} package {} exists, skipping", format.label(), path.display());
        return Ok((path, false));
    }

    let path = package.write(dest, cache)?;
    info!("Wrote {} package to {}", format.label(), path.display());

    Ok((path, true))
}
