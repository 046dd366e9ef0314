//! Excel packages, a `meta` worksheet with the metadata and a worksheet per table.

use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Workbook, Worksheet};

use super::{Package, PackageFormat, PackageSource, PackageTable};

use crate::{cache::Cache, errors::MetatabErr};

/// Writes a package as one Excel workbook.
#[derive(Debug)]
pub struct ExcelPackage {
    source: PackageSource,
}

impl ExcelPackage {
    const META_SHEET: &'static str = "meta";
    const MAX_SHEET_NAME: usize = 31;

    /// Create a writer for the prepared package.
    pub fn new(source: PackageSource) -> Self {
        ExcelPackage { source }
    }

    /// Worksheet name for a table. Excel limits names to 31 characters and forbids a few.
    pub fn sheet_name(table: &PackageTable) -> String {
        table
            .name
            .chars()
            .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
            .take(Self::MAX_SHEET_NAME)
            .collect()
    }

    fn write_rows<I>(sheet: &mut Worksheet, rows: I) -> Result<(), MetatabErr>
    where
        I: IntoIterator<Item = Result<Vec<String>, MetatabErr>>,
    {
        for (row_num, row) in rows.into_iter().enumerate() {
            let row_num = row_num as u32;
            for (col_num, cell) in row?.iter().enumerate() {
                if !cell.is_empty() {
                    sheet.write_string(row_num, col_num as u16, cell)?;
                }
            }
        }

        Ok(())
    }
}

impl Package for ExcelPackage {
    fn format(&self) -> PackageFormat {
        PackageFormat::Excel
    }

    fn source(&self) -> &PackageSource {
        &self.source
    }

    fn write(&self, dest: &Path, cache: &Cache) -> Result<PathBuf, MetatabErr> {
        std::fs::create_dir_all(dest)?;
        let path = dest.join(self.save_path());

        let mut workbook = Workbook::new();

        let metadata = self.source.metadata(Self::sheet_name);
        let meta_sheet = workbook.add_worksheet();
        meta_sheet.set_name(Self::META_SHEET)?;
        Self::write_rows(meta_sheet, metadata.rows().into_iter().map(Ok))?;

        for table in self.source.tables() {
            let sheet = workbook.add_worksheet();
            sheet.set_name(Self::sheet_name(table))?;
            Self::write_rows(sheet, table.rows(cache)?)?;
        }

        workbook.save(&path)?;

        Ok(path)
    }
}

#[cfg(test)]
mod unit {
    use super::*;
    use crate::{cache::unit::*, package::unit::test_source};

    #[test]
    fn test_sheet_name() {
        let mut table = test_source().tables()[0].clone();

        table.name = "a/b:c".to_owned();
        assert_eq!(ExcelPackage::sheet_name(&table), "abc");

        table.name = "x".repeat(40);
        assert_eq!(ExcelPackage::sheet_name(&table).len(), 31);
    }

    #[test]
    fn test_excel_package() {
        let TestCache { tmp, cache } = create_test_cache().unwrap();

        let package = ExcelPackage::new(test_source());
        let path = package
            .write(tmp.path(), &cache)
            .expect("Error writing package.");

        assert_eq!(path, tmp.path().join("example.com-rates-2017.xlsx"));
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }
}
