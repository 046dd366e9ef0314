use std::{io::Write, path::Path};

use super::{MetatabDoc, Section, Term};

use crate::errors::MetatabErr;

impl MetatabDoc {
    /// Lay the document out as CSV rows.
    ///
    /// Children named by the section arguments go in the argument columns of their term's row, the
    /// rest get rows of their own right after it.
    pub fn rows(&self) -> Vec<Vec<String>> {
        let mut rows = vec![];

        for section in &self.sections {
            if !section.is_root() {
                let mut header = vec!["Section".to_owned(), section.name.clone()];
                header.extend(section.args.iter().cloned());
                rows.push(header);
            }

            for term in &section.terms {
                let label = if term.parent == "root" {
                    term.record.clone()
                } else {
                    format!("{}.{}", term.parent, term.record)
                };
                term_rows(section, term, label, &mut rows);
            }
        }

        rows
    }

    /// Write the document as CSV.
    pub fn write_to<W: Write>(&self, writer: W) -> Result<(), MetatabErr> {
        let mut csv_writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(writer);

        for row in self.rows() {
            csv_writer.write_record(&row)?;
        }
        csv_writer.flush()?;

        Ok(())
    }

    /// The document as CSV bytes.
    pub fn to_csv_bytes(&self) -> Result<Vec<u8>, MetatabErr> {
        let mut buffer = vec![];
        self.write_to(&mut buffer)?;
        Ok(buffer)
    }

    /// Write the document to a CSV file, replacing whatever is there.
    pub fn write_csv(&self, path: &dyn AsRef<Path>) -> Result<(), MetatabErr> {
        let file = std::fs::File::create(path.as_ref())?;
        self.write_to(std::io::BufWriter::new(file))
    }
}

fn term_rows(section: &Section, term: &Term, label: String, rows: &mut Vec<Vec<String>>) {
    let mut row = vec![label, term.value.clone()];
    let mut used = vec![false; term.children.len()];

    for arg in &section.args {
        let cell = term
            .children
            .iter()
            .enumerate()
            .find(|(i, c)| !used[*i] && c.is(arg) && c.children.is_empty());

        match cell {
            Some((i, child)) => {
                used[i] = true;
                row.push(child.value.clone());
            }
            None => row.push(String::new()),
        }
    }

    while row.last().map(String::is_empty).unwrap_or(false) && row.len() > 2 {
        row.pop();
    }
    rows.push(row);

    for (child, _) in term.children.iter().zip(used).filter(|(_, used)| !used) {
        let label = if child.is("column") && term.is("table") {
            child.record.clone()
        } else {
            format!("{}.{}", term.record, child.record)
        };
        term_rows(section, child, label, rows);
    }
}
