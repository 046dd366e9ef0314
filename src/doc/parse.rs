use std::io::Read;

use super::{MetatabDoc, Section, Term};

use crate::errors::MetatabErr;

// Terms that are children of the most recent term of another type even when the row does not
// name a parent.
const IMPLICIT_PARENTS: &[(&str, &str)] = &[("column", "table")];

// Location of the term most recently added from a row. (top level index, child index)
type TermPath = (usize, Option<usize>);

impl MetatabDoc {
    /// Parse a document from CSV data.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, MetatabErr> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut doc = MetatabDoc::new();
        let mut last: Option<TermPath> = None;

        for record in csv_reader.records() {
            let record = record?;
            let cells: Vec<&str> = record.iter().map(str::trim).collect();

            let term_name = match cells.first() {
                Some(name) if !name.is_empty() && !name.starts_with('#') => *name,
                _ => continue,
            };
            let value = cells.get(1).copied().unwrap_or("");

            if term_name.eq_ignore_ascii_case("section") {
                let args: Vec<&str> = cells
                    .iter()
                    .skip(2)
                    .copied()
                    .filter(|a| !a.is_empty())
                    .collect();
                doc.sections.push(Section::new(value, &args));
                last = None;
                continue;
            }

            let section = doc
                .sections
                .last_mut()
                .ok_or(MetatabErr::LogicError("document without a root section"))?;

            // The argument cells become children of the new term.
            let arg_names = section.args.clone();
            let args: Vec<(&str, &str)> = arg_names
                .iter()
                .map(String::as_str)
                .zip(cells.iter().skip(2).copied())
                .filter(|(_, cell)| !cell.is_empty())
                .collect();

            last = Some(add_row_term(section, last, term_name, value, &args));
        }

        Ok(doc)
    }
}

fn add_args(term: &mut Term, args: &[(&str, &str)]) {
    for (arg, cell) in args {
        term.new_child(arg, cell);
    }
}

fn add_row_term(
    section: &mut Section,
    last: Option<TermPath>,
    term_name: &str,
    value: &str,
    args: &[(&str, &str)],
) -> TermPath {
    let (parent, record) = match term_name.find('.') {
        Some(idx) => (
            Some(term_name[..idx].to_lowercase()),
            term_name[idx + 1..].to_owned(),
        ),
        None => (None, term_name.to_owned()),
    };

    let parent = match parent {
        Some(parent) => Some(parent),
        None => {
            let lc_record = record.to_lowercase();
            IMPLICIT_PARENTS
                .iter()
                .find(|(child, _)| *child == lc_record)
                .map(|(_, parent)| (*parent).to_owned())
        }
    };

    let top_count = section.terms.len();
    match parent.as_deref() {
        None | Some("root") => {}
        // ".Record" attaches to whatever the previous row defined.
        Some("") => {
            if let Some(path) = last {
                return push_child(section, path, &record, value, args);
            }
        }
        Some(parent) => {
            if let Some((top, Some(child))) = last {
                if section.terms[top].children[child].is(parent) {
                    return push_child(section, (top, Some(child)), &record, value, args);
                }
            }

            if top_count > 0 && section.terms[top_count - 1].is(parent) {
                return push_child(section, (top_count - 1, None), &record, value, args);
            }
        }
    }

    let parent = match parent.as_deref() {
        None | Some("") => "root",
        Some(parent) => parent,
    };
    let mut term = Term::new(parent, &record, value);
    add_args(&mut term, args);
    section.terms.push(term);

    (section.terms.len() - 1, None)
}

// Children of children are stored, but the returned path can only point two levels deep, so a
// grandchild row points back at its parent. Its arguments are added here.
fn push_child(
    section: &mut Section,
    path: TermPath,
    record: &str,
    value: &str,
    args: &[(&str, &str)],
) -> TermPath {
    match path {
        (top, None) => {
            let term = &mut section.terms[top];
            add_args(term.new_child(record, value), args);
            (top, Some(term.children.len() - 1))
        }
        (top, Some(child)) => {
            add_args(section.terms[top].children[child].new_child(record, value), args);
            (top, Some(child))
        }
    }
}

#[cfg(test)]
mod unit {
    use super::*;

    fn parse(text: &str) -> MetatabDoc {
        MetatabDoc::from_reader(text.as_bytes()).expect("Parse error.")
    }

    #[test]
    fn test_comments_and_blanks_skipped() {
        let doc = parse("# a comment\n,orphan value\nName,pkg\n");

        assert_eq!(doc.root().terms().len(), 1);
        assert_eq!(doc.find_first_value("root.name"), Some("pkg"));
    }

    #[test]
    fn test_dot_prefix_attaches_to_previous_term() {
        let doc = parse(concat!(
            "Section,Schema,DataType\n",
            "Table,t1\n",
            ".Description,first table\n",
            "Column,a,int\n",
            ".Description,column a\n",
            "Table.Note,on the table\n",
        ));

        let table = doc.table("t1").unwrap();
        assert_eq!(table.get_value("description"), Some("first table"));
        assert_eq!(table.get_value("note"), Some("on the table"));

        let column = table.child("column").unwrap();
        assert_eq!(column.get_value("datatype"), Some("int"));
        assert_eq!(column.get_value("description"), Some("column a"));
    }

    #[test]
    fn test_args_on_grandchild_row() {
        let doc = parse(concat!(
            "Section,Schema,DataType\n",
            "Table,t1\n",
            "Column,a,int\n",
            ".Note,hello,str\n",
            "Column,b,text\n",
        ));

        let table = doc.table("t1").unwrap();
        let columns: Vec<&Term> = table.children_named("column").collect();
        assert_eq!(columns.len(), 2);

        let a = columns[0];
        let records: Vec<(&str, &str)> = a
            .children()
            .iter()
            .map(|c| (c.record(), c.value()))
            .collect();
        assert_eq!(records, vec![("DataType", "int"), ("Note", "hello")]);

        let note = a.child("note").unwrap();
        assert_eq!(note.get_value("datatype"), Some("str"));

        assert_eq!(columns[1].get_value("datatype"), Some("text"));
    }

    #[test]
    fn test_explicit_parent_without_match_is_top_level() {
        let doc = parse("Distribution,http://example.com/a.zip\nContact.Email,a@b.c\n");

        let email = doc.find_first("contact.email").unwrap();
        assert_eq!(email.parent(), "contact");
        assert_eq!(doc.root().terms().len(), 2);
    }

    #[test]
    fn test_column_without_table() {
        let doc = parse("Column,lonely\n");

        assert_eq!(doc.root().terms()[0].parent(), "table");
        assert_eq!(doc.find("table.column").len(), 1);
    }
}
