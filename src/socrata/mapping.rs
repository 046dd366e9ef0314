//! Translate Metatab terms into Socrata view metadata.

use serde_json::{json, Map, Value};

use super::{Column, NewDataset};
use crate::doc::{MetatabDoc, Term};

/// Project Open Data v1.1 fields accepted into the `Common Core` custom fields.
const COMMON_CORE_FIELDS: [&str; 21] = [
    "Publisher",
    "Contact Name",
    "Contact Email",
    "Bureau Code",
    "Program Code",
    "Public Access Level",
    "Access Level Comment",
    "Geographic Coverage",
    "Temporal Applicability",
    "Theme",
    "Described By",
    "Described By Type",
    "Is Quality Data",
    "Update Frequency",
    "Language",
    "Primary It Investment Uii",
    "System of Records",
    "Homepage",
    "Issued",
    "References",
    "License",
];

/// Socrata column type for a Metatab datatype.
pub fn map_type(datatype: &str) -> &'static str {
    match datatype {
        "int" | "float" => "number",
        _ => "text",
    }
}

// "contact_name" and "contact Name" both become "Contact Name".
fn title_case(record: &str) -> String {
    record
        .split(|c: char| c == '_' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Add the Project Open Data fields from the `Common_Core` section to `metadata`.
pub fn project_open_data(doc: &MetatabDoc, mut metadata: Value) -> Value {
    let mut common_core = Map::new();

    let terms = doc.section("common_core").map(|s| s.terms()).unwrap_or(&[]);
    for term in terms.iter().filter(|t| !t.value().is_empty()) {
        let title = title_case(term.record());
        if let Some(field) = COMMON_CORE_FIELDS
            .iter()
            .find(|f| f.eq_ignore_ascii_case(&title))
        {
            common_core.insert((*field).to_owned(), json!(term.value()));
        }
    }

    metadata["custom_fields"] = json!({ "Common Core": common_core });
    metadata
}

fn column_description(column: &Term) -> String {
    let mut description = String::new();
    if let Some(valuetype) = column.get_value("valuetype") {
        description.push_str(valuetype);
        description.push_str(" - ");
    }
    description.push_str(column.get_value("description").unwrap_or(""));
    description
}

/// The Socrata columns for a schema table, optionally with the field names stored by an
/// earlier publish.
pub fn get_columns(doc: &MetatabDoc, schema: &str, with_fieldnames: bool) -> Vec<Column> {
    let table = match doc.table(schema) {
        Some(table) => table,
        None => return vec![],
    };

    table
        .children_named("column")
        .map(|column| Column {
            id: None,
            field_name: if with_fieldnames {
                Some(column.get_value("column_id").unwrap_or("").to_owned())
            } else {
                None
            },
            name: column.value().to_owned(),
            data_type_name: map_type(column.get_value("datatype").unwrap_or("")).to_owned(),
            description: column_description(column),
        })
        .collect()
}

/// Root.Tags split on commas.
pub(crate) fn tags(doc: &MetatabDoc) -> Vec<String> {
    doc.find_first_value("root.tags")
        .map(|tags| {
            tags.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

/// The schema table a datafile refers to, its `schema` or else its `name`.
pub(crate) fn schema_name(datafile: &Term) -> &str {
    datafile
        .get_value("schema")
        .or_else(|| datafile.get_value("name"))
        .unwrap_or("")
}

/// The asset to create for one datafile.
pub fn get_metadata(doc: &MetatabDoc, datafile: &Term) -> NewDataset {
    let name = datafile
        .get_value("title")
        .or_else(|| datafile.get_value("name"))
        .unwrap_or_else(|| datafile.value());

    NewDataset {
        name: name.to_owned(),
        description: doc.find_first_value("root.description").unwrap_or("").to_owned(),
        tags: tags(doc),
        category: doc.find_first_value("root.category").unwrap_or("").to_owned(),
        columns: get_columns(doc, schema_name(datafile), false),
        attribution_link: Some(datafile.value().to_owned()),
        metadata: project_open_data(doc, json!({})),
    }
}

/// Store the field names Socrata assigned as `column_id` children of the table's columns.
pub fn set_column_fieldnames(doc: &mut MetatabDoc, schema: &str, columns: &[Column]) {
    let table = match doc.table_mut(schema) {
        Some(table) => table,
        None => return,
    };

    for (term, column) in table.children_named_mut("column").zip(columns) {
        if let Some(field_name) = &column.field_name {
            term.get_or_new_child("column_id", field_name);
        }
    }
}

/// The top level fields of `new` that are missing from or different in `old`.
pub fn diff(old: &Value, new: &Value) -> Map<String, Value> {
    let empty = Map::new();
    let old = old.as_object().unwrap_or(&empty);

    new.as_object()
        .map(|new| {
            new.iter()
                .filter(|(k, v)| old.get(*k) != Some(*v))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        })
        .unwrap_or_default()
}

/// The new columns that match an old column by field name, carrying the old column id.
pub fn diff_cols(old: &[Value], new: &[Value]) -> Vec<Value> {
    let mut columns = vec![];

    for n in new {
        for o in old.iter().filter(|o| o["fieldName"] == n["fieldName"]) {
            let mut column = n.clone();
            column["id"] = o["id"].clone();
            columns.push(column);
        }
    }

    columns
}
