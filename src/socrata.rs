//! Publish the datasets described by a Metatab document to a Socrata instance.
//!
//! Each data file becomes a metadata only Socrata asset carrying the column schema. When a
//! document has more than one data file a parent asset links them together. Ids handed back by
//! Socrata are written into the document so a later run can sync instead of create.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::MetatabErr;

mod client;
mod mapping;
mod publish;

pub use client::SocrataClient;
pub use mapping::{
    diff, diff_cols, get_columns, get_metadata, map_type, project_open_data,
    set_column_fieldnames,
};
pub use publish::{
    create_or_update_parent, create_or_update_resources, publish, publish_to_socrata, ssync,
    validate_four_by_four,
};

/// The calls made against a Socrata instance.
pub trait SocrataApi {
    /// Host name of the instance, e.g. `data.example.gov`.
    fn domain(&self) -> &str;

    /// Create a new asset, returns the view Socrata stored.
    fn create(&self, view: &Value) -> Result<Value, MetatabErr>;

    /// The current view metadata of an asset.
    fn get_metadata(&self, dataset_id: &str) -> Result<Value, MetatabErr>;

    /// Update the view metadata of an asset with the given fields.
    fn update_metadata(&self, dataset_id: &str, metadata: &Value) -> Result<Value, MetatabErr>;

    /// Fetch the first row of an asset's data. An unknown id is `DatasetNotFound`.
    fn get(&self, dataset_id: &str) -> Result<Value, MetatabErr>;
}

/// A column of a Socrata asset.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_name: Option<String>,
    pub name: String,
    #[serde(default)]
    pub data_type_name: String,
    #[serde(default)]
    pub description: String,
}

/// Everything needed to create the asset for one data file.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDataset {
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category: String,
    pub columns: Vec<Column>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribution_link: Option<String>,
    pub metadata: Value,
}

/// A published data file, as linked from the parent asset.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq)]
pub struct Child {
    pub columns: Vec<Column>,
    pub dataset_id: String,
    pub api: String,
    pub source: String,
    pub link: String,
    pub title: String,
}

impl Child {
    /// Build the links for an asset on `domain`.
    pub fn new(domain: &str, dataset_id: &str, title: &str, link: &str, columns: Vec<Column>) -> Self {
        Child {
            columns,
            dataset_id: dataset_id.to_owned(),
            api: format!("https://{}/resource/{}.json", domain, dataset_id),
            source: format!("https://{}/d/{}", domain, dataset_id),
            link: link.to_owned(),
            title: title.to_owned(),
        }
    }
}
