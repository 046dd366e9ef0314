//! An in memory Metatab document.
//!
//! A document is a list of sections, each section holds top level terms, and each term may hold
//! child terms. Names compare case insensitively, a fully qualified name is `parent.record`.

use std::path::Path;

mod parse;
mod write;

/// The name of the implicit first section.
pub const ROOT_SECTION: &str = "Root";

/// A parsed Metatab document.
#[derive(Clone, Debug, PartialEq)]
pub struct MetatabDoc {
    sections: Vec<Section>,
}

/// A named group of terms. The `args` name the extra columns of each row in this section.
#[derive(Clone, Debug, PartialEq)]
pub struct Section {
    name: String,
    args: Vec<String>,
    terms: Vec<Term>,
}

/// A single metadata statement.
#[derive(Clone, Debug, PartialEq)]
pub struct Term {
    parent: String, // Lower case record term of the parent, "root" for top level terms.
    record: String, // As written in the source.
    value: String,
    children: Vec<Term>,
}

// Split a possibly qualified term name into lower case (parent, record).
fn split_name(name: &str) -> (Option<String>, String) {
    let name = name.trim().to_lowercase();
    match name.find('.') {
        Some(idx) => (Some(name[..idx].to_owned()), name[idx + 1..].to_owned()),
        None => (None, name),
    }
}

impl Default for MetatabDoc {
    fn default() -> Self {
        MetatabDoc {
            sections: vec![Section::new(ROOT_SECTION, &[])],
        }
    }
}

impl MetatabDoc {
    /// Create an empty document with only the `Root` section.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a document from a CSV file.
    pub fn load(path: &dyn AsRef<Path>) -> Result<Self, crate::MetatabErr> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_reader(file)
    }

    /// All the sections, in document order.
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Find a section by name.
    pub fn section(&self, name: &str) -> Option<&Section> {
        let name = name.to_lowercase();
        self.sections.iter().find(|s| s.name.to_lowercase() == name)
    }

    /// Find a section by name for modification.
    pub fn section_mut(&mut self, name: &str) -> Option<&mut Section> {
        let name = name.to_lowercase();
        self.sections
            .iter_mut()
            .find(|s| s.name.to_lowercase() == name)
    }

    /// The `Root` section, which always exists.
    pub fn root(&self) -> &Section {
        &self.sections[0]
    }

    /// The `Root` section for modification.
    pub fn root_mut(&mut self) -> &mut Section {
        &mut self.sections[0]
    }

    /// Get a section, adding it to the end of the document if it does not exist.
    pub fn get_or_new_section(&mut self, name: &str, args: &[&str]) -> &mut Section {
        let lc_name = name.to_lowercase();
        let idx = match self
            .sections
            .iter()
            .position(|s| s.name.to_lowercase() == lc_name)
        {
            Some(idx) => idx,
            None => {
                self.sections.push(Section::new(name, args));
                self.sections.len() - 1
            }
        };

        &mut self.sections[idx]
    }

    /// Find all terms matching `name`.
    ///
    /// A qualified name like `root.datafile` or `table.column` must match the parent too, a bare
    /// name like `datafile` matches any parent. Matching terms are not searched for children.
    pub fn find(&self, name: &str) -> Vec<&Term> {
        let (parent, record) = split_name(name);
        let mut found = vec![];

        for section in &self.sections {
            collect(&section.terms, parent.as_deref(), &record, &mut found);
        }

        found
    }

    /// Like `find`, but the terms can be modified.
    pub fn find_mut(&mut self, name: &str) -> Vec<&mut Term> {
        let (parent, record) = split_name(name);
        let mut found = vec![];

        for section in self.sections.iter_mut() {
            collect_mut(&mut section.terms, parent.as_deref(), &record, &mut found);
        }

        found
    }

    /// The first term matching `name`.
    pub fn find_first(&self, name: &str) -> Option<&Term> {
        self.find(name).into_iter().next()
    }

    /// The value of the first term matching `name`, if it is not empty.
    pub fn find_first_value(&self, name: &str) -> Option<&str> {
        self.find_first(name)
            .map(|t| t.value())
            .filter(|v| !v.is_empty())
    }

    /// Check for a term with this name and value.
    pub fn contains(&self, name: &str, value: &str) -> bool {
        self.find(name).iter().any(|t| t.value == value)
    }

    /// The `Table` term in the `Schema` section with the given name.
    pub fn table(&self, table_name: &str) -> Option<&Term> {
        self.section("schema")
            .and_then(|s| s.terms.iter().find(|t| t.is("table") && t.value == table_name))
    }

    /// The `Table` term in the `Schema` section with the given name, for modification.
    pub fn table_mut(&mut self, table_name: &str) -> Option<&mut Term> {
        self.section_mut("schema").and_then(|s| {
            s.terms
                .iter_mut()
                .find(|t| t.is("table") && t.value == table_name)
        })
    }
}

fn collect<'a>(terms: &'a [Term], parent: Option<&str>, record: &str, out: &mut Vec<&'a Term>) {
    for term in terms {
        if term.matches(parent, record) {
            out.push(term);
        } else {
            collect(&term.children, parent, record, out);
        }
    }
}

fn collect_mut<'a>(
    terms: &'a mut [Term],
    parent: Option<&str>,
    record: &str,
    out: &mut Vec<&'a mut Term>,
) {
    for term in terms.iter_mut() {
        if term.matches(parent, record) {
            out.push(term);
        } else {
            collect_mut(&mut term.children, parent, record, out);
        }
    }
}

impl Section {
    /// Create a new, empty section.
    pub fn new(name: &str, args: &[&str]) -> Self {
        Section {
            name: name.to_owned(),
            args: args.iter().map(|&a| a.to_owned()).collect(),
            terms: vec![],
        }
    }

    /// The name of the section as written.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The argument column names.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// The top level terms in this section.
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    /// Top level terms for modification.
    pub fn terms_mut(&mut self) -> &mut [Term] {
        &mut self.terms
    }

    /// Append a top level term.
    pub fn add_term(&mut self, term: Term) -> &mut Term {
        self.terms.push(term);
        let idx = self.terms.len() - 1;
        &mut self.terms[idx]
    }

    /// Append a new top level term.
    pub fn new_term(&mut self, record: &str, value: &str) -> &mut Term {
        self.add_term(Term::new("root", record, value))
    }

    /// Get the first term with this record name and set its value, or add a new one.
    pub fn get_or_new_term(&mut self, record: &str, value: &str) -> &mut Term {
        let lc = record.to_lowercase();
        match self.terms.iter().position(|t| t.is(&lc)) {
            Some(idx) => {
                self.terms[idx].value = value.to_owned();
                &mut self.terms[idx]
            }
            None => self.new_term(record, value),
        }
    }

    pub(crate) fn is_root(&self) -> bool {
        self.name.eq_ignore_ascii_case(ROOT_SECTION)
    }
}

impl Term {
    /// Create a term.
    pub fn new(parent: &str, record: &str, value: &str) -> Self {
        Term {
            parent: parent.trim().to_lowercase(),
            record: record.trim().to_owned(),
            value: value.to_owned(),
            children: vec![],
        }
    }

    /// The record name as written, e.g. `Datafile`.
    pub fn record(&self) -> &str {
        &self.record
    }

    /// The lower case parent name, `root` for top level terms.
    pub fn parent(&self) -> &str {
        &self.parent
    }

    /// Fully qualified, lower case name.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.parent, self.record.to_lowercase())
    }

    /// The value of the term.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Replace the value.
    pub fn set_value(&mut self, value: &str) {
        self.value = value.to_owned();
    }

    /// Child terms.
    pub fn children(&self) -> &[Term] {
        &self.children
    }

    /// Check the record name, case insensitive.
    pub fn is(&self, record: &str) -> bool {
        self.record.eq_ignore_ascii_case(record)
    }

    fn matches(&self, parent: Option<&str>, record: &str) -> bool {
        self.record.to_lowercase() == record && parent.map(|p| p == self.parent).unwrap_or(true)
    }

    /// The first child with this record name.
    pub fn child(&self, record: &str) -> Option<&Term> {
        self.children.iter().find(|c| c.is(record))
    }

    /// All children with this record name.
    pub fn children_named<'a>(&'a self, record: &'a str) -> impl Iterator<Item = &'a Term> + 'a {
        self.children.iter().filter(move |c| c.is(record))
    }

    /// All children with this record name, for modification.
    pub fn children_named_mut<'a>(
        &'a mut self,
        record: &'a str,
    ) -> impl Iterator<Item = &'a mut Term> + 'a {
        self.children.iter_mut().filter(move |c| c.is(record))
    }

    /// The value of the first child with this record name, if it is not empty.
    pub fn get_value(&self, record: &str) -> Option<&str> {
        self.child(record)
            .map(|c| c.value.as_str())
            .filter(|v| !v.is_empty())
    }

    /// Append a child term.
    pub fn new_child(&mut self, record: &str, value: &str) -> &mut Term {
        let child = Term::new(&self.record, record, value);
        self.children.push(child);
        let idx = self.children.len() - 1;
        &mut self.children[idx]
    }

    /// Set the value of the first child with this record name, adding it if needed.
    pub fn get_or_new_child(&mut self, record: &str, value: &str) -> &mut Term {
        match self.children.iter().position(|c| c.is(record)) {
            Some(idx) => {
                self.children[idx].value = value.to_owned();
                &mut self.children[idx]
            }
            None => self.new_child(record, value),
        }
    }

    /// The name the term's own value goes by in `as_dict`.
    pub fn value_name(&self) -> &'static str {
        match self.record.to_lowercase().as_str() {
            "datafile" => "url",
            "table" | "column" => "name",
            _ => "value",
        }
    }

    /// The term as (lower case key, value) pairs: the value under its value name, then the
    /// children. Only the first child of a given name is included.
    pub fn as_dict(&self) -> Vec<(String, String)> {
        let mut dict: Vec<(String, String)> =
            vec![(self.value_name().to_owned(), self.value.clone())];

        for child in &self.children {
            let key = child.record.to_lowercase();
            if !dict.iter().any(|(k, _)| *k == key) {
                dict.push((key, child.value.clone()));
            }
        }

        dict
    }
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
