//! Create or update Socrata assets for a document.

use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};

use super::{
    mapping::{
        diff, diff_cols, get_columns, get_metadata, project_open_data, schema_name,
        set_column_fieldnames, tags,
    },
    Child, Column, NewDataset, SocrataApi,
};
use crate::{doc::MetatabDoc, errors::MetatabErr};

static FOUR_BY_FOUR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]{4}-[a-z0-9]{4}$").expect("static regex"));

/// Check that `dataset_id` is a well formed id of an existing asset.
pub fn validate_four_by_four(dataset_id: &str, client: &dyn SocrataApi) -> Result<(), MetatabErr> {
    if !FOUR_BY_FOUR.is_match(dataset_id) {
        return Err(MetatabErr::InvalidDatasetId(dataset_id.to_owned()));
    }

    client.get(dataset_id).map(|_| ())
}

/// Create a metadata only asset for one datafile.
pub fn publish(dataset: &NewDataset, client: &dyn SocrataApi) -> Result<Child, MetatabErr> {
    info!("Publishing {}", dataset.name);

    let view = json!({
        "name": dataset.name,
        "description": dataset.description,
        "columns": dataset.columns,
        "tags": dataset.tags,
        "category": dataset.category,
        "metadata": dataset.metadata,
    });

    let created = client.create(&view)?;

    let dataset_id = created["id"]
        .as_str()
        .ok_or_else(|| MetatabErr::GeneralError("Socrata response has no id".to_owned()))?;

    let columns: Vec<Column> = match created.get("columns") {
        Some(columns) => serde_json::from_value(columns.clone())?,
        None => vec![],
    };

    let child = Child::new(
        client.domain(),
        dataset_id,
        &dataset.name,
        dataset.attribution_link.as_deref().unwrap_or(""),
        columns,
    );

    info!("{} published to {}", child.title, child.source);

    Ok(child)
}

/// Send the fields of `new` that differ from what the asset currently holds.
pub fn ssync(new: &Value, dataset_id: &str, client: &dyn SocrataApi) -> Result<Value, MetatabErr> {
    validate_four_by_four(dataset_id, client)?;

    let old = client.get_metadata(dataset_id)?;
    let mut changes = diff(&old, new);

    if let (Some(old_cols), Some(new_cols)) = (old["columns"].as_array(), new["columns"].as_array()) {
        changes.insert("columns".to_owned(), json!(diff_cols(old_cols, new_cols)));
    }

    client.update_metadata(dataset_id, &Value::Object(changes))
}

/// Create an asset for each datafile, or with `update` sync the assets named by their
/// `dataset_id` children. New ids and field names are stored in the document.
pub fn create_or_update_resources(
    doc: &mut MetatabDoc,
    client: &dyn SocrataApi,
    update: bool,
) -> Result<Vec<Child>, MetatabErr> {
    let datafiles: Vec<_> = doc.find("root.datafile").into_iter().cloned().collect();

    if update {
        info!("Updating {} datasets", datafiles.len());
    } else {
        info!("Creating {} new datasets", datafiles.len());
    }

    let mut children = Vec::with_capacity(datafiles.len());

    for (i, datafile) in datafiles.iter().enumerate() {
        let mut dataset = get_metadata(doc, datafile);
        let schema = schema_name(datafile);

        if update {
            let dataset_id = datafile
                .get_value("dataset_id")
                .ok_or_else(|| MetatabErr::TermNotFound(format!("dataset_id of {}", datafile.value())))?;

            dataset.columns = get_columns(doc, schema, true);
            ssync(&serde_json::to_value(&dataset)?, dataset_id, client)?;

            children.push(Child::new(
                client.domain(),
                dataset_id,
                &dataset.name,
                datafile.value(),
                dataset.columns,
            ));
        } else {
            let child = publish(&dataset, client)?;

            if let Some(term) = doc.find_mut("root.datafile").into_iter().nth(i) {
                term.get_or_new_child("dataset_id", &child.dataset_id);
            }
            set_column_fieldnames(doc, schema, &child.columns);

            children.push(child);
        }
    }

    info!("{} datasets {}", children.len(), if update { "updated" } else { "created" });

    Ok(children)
}

/// Create or update the `href` asset linking the documentation and the child assets.
/// Returns the parent asset's url.
pub fn create_or_update_parent(
    doc: &mut MetatabDoc,
    client: &dyn SocrataApi,
    children: &[Child],
    update: bool,
) -> Result<String, MetatabErr> {
    let name = doc.find_first_value("root.title").unwrap_or("").to_owned();
    let package_name = doc
        .find_first_value("root.name")
        .ok_or(MetatabErr::MissingPackageName)?
        .to_owned();
    let format = doc.find_first_value("root.format").unwrap_or("csv").to_owned();

    let mut access_points = vec![];
    let home = json!({ "URL": format!("http://{}", package_name.replace('-', "/")) });

    if let Some(documentation) = doc.find_first_value("root.documentation") {
        access_points.push(json!({
            "urls": home.clone(),
            "describedBy": documentation,
            "describedByType": "url",
        }));
    }

    for child in children {
        let mut urls = json!({ "API": child.api, "URL": child.source });
        urls[format.as_str()] = json!(child.link);
        access_points.push(json!({ "urls": urls, "title": child.title }));
    }

    let metadata = project_open_data(
        doc,
        json!({
            "renderTypeConfig": { "visible": { "href": "true" } },
            "accessPoints": home,
            "availableDisplayTypes": ["href"],
            "jsonQuery": {},
            "additionalAccessPoints": access_points,
        }),
    );

    let view = json!({
        "name": name,
        "description": doc.find_first_value("root.description").unwrap_or(""),
        "tags": tags(doc),
        "category": doc.find_first_value("root.category").unwrap_or(""),
        "attribution": package_name,
        "metadata": metadata,
    });

    if update {
        let parent_id = doc
            .find_first_value("root.parent")
            .ok_or_else(|| MetatabErr::TermNotFound("Root.Parent".to_owned()))?
            .to_owned();

        ssync(&view, &parent_id, client)?;

        let url = format!("https://{}/d/{}", client.domain(), parent_id);
        info!("Parent dataset {} updated at {}", name, url);
        Ok(url)
    } else {
        let mut view = view;
        view["displayType"] = json!("href");
        view["displayFormat"] = json!({});
        view["query"] = json!({});

        let created = client.create(&view)?;
        let parent_id = created["id"]
            .as_str()
            .ok_or_else(|| MetatabErr::GeneralError("Socrata response has no id".to_owned()))?;

        doc.root_mut().get_or_new_term("Parent", parent_id);

        let url = format!("https://{}/d/{}", client.domain(), parent_id);
        info!("Parent dataset {} created at {}", name, url);
        Ok(url)
    }
}

/// Publish the whole document. With no datafiles only the parent is published, a single
/// datafile needs no parent, more than one get a parent linking them.
///
/// Returns the urls of the published assets.
pub fn publish_to_socrata(
    doc: &mut MetatabDoc,
    client: &dyn SocrataApi,
    sync: bool,
) -> Result<Vec<String>, MetatabErr> {
    let n_datafiles = doc.find("root.datafile").len();

    let urls = match n_datafiles {
        0 => vec![create_or_update_parent(doc, client, &[], sync)?],
        1 => create_or_update_resources(doc, client, sync)?
            .into_iter()
            .map(|c| c.source)
            .collect(),
        _ => {
            let children = create_or_update_resources(doc, client, sync)?;
            let mut urls: Vec<String> = children.iter().map(|c| c.source.clone()).collect();
            urls.push(create_or_update_parent(doc, client, &children, sync)?);
            urls
        }
    };

    Ok(urls)
}

#[cfg(test)]
mod unit {
    use super::*;
    use crate::{doc::MetatabDoc, package::unit::test_doc, socrata::unit::MockSocrata};

    #[test]
    fn test_validate_four_by_four() {
        let client = MockSocrata::default();
        client
            .existing
            .borrow_mut()
            .insert("abcd-1234".to_owned(), json!({}));

        assert!(validate_four_by_four("abcd-1234", &client).is_ok());
        assert!(matches!(
            validate_four_by_four("ABCD-1234", &client),
            Err(MetatabErr::InvalidDatasetId(_))
        ));
        assert!(matches!(
            validate_four_by_four("abcd-12345", &client),
            Err(MetatabErr::InvalidDatasetId(_))
        ));
        assert!(matches!(
            validate_four_by_four("zzzz-0000", &client),
            Err(MetatabErr::DatasetNotFound(_))
        ));
    }

    #[test]
    fn test_publish() {
        let client = MockSocrata::default();
        let doc = test_doc();
        let dataset = get_metadata(&doc, doc.find("root.datafile")[0]);

        let child = publish(&dataset, &client).unwrap();

        assert_eq!(child.dataset_id, "new0-0000");
        assert_eq!(child.source, "https://data.example.gov/d/new0-0000");
        assert_eq!(child.link, "rates.csv");
        assert_eq!(child.columns.len(), 3);
        assert_eq!(child.columns[1].field_name.as_deref(), Some("rate"));

        let sent = &client.created.borrow()[0];
        assert_eq!(sent["name"], json!("Interest rates by year"));
        assert!(sent.get("attributionLink").is_none());
    }

    #[test]
    fn test_ssync_sends_only_changes() {
        let client = MockSocrata::default();
        client.existing.borrow_mut().insert(
            "abcd-1234".to_owned(),
            json!({
                "name": "Old",
                "category": "Finance",
                "columns": [{"id": 5, "fieldName": "year", "name": "year"}]
            }),
        );

        let new = json!({
            "name": "New",
            "category": "Finance",
            "columns": [{"fieldName": "year", "name": "Year"}]
        });
        ssync(&new, "abcd-1234", &client).unwrap();

        let updated = client.updated.borrow();
        assert_eq!(updated[0].0, "abcd-1234");
        assert_eq!(
            updated[0].1,
            json!({
                "name": "New",
                "columns": [{"id": 5, "fieldName": "year", "name": "Year"}]
            })
        );
    }

    #[test]
    fn test_ssync_rejects_bad_id() {
        let client = MockSocrata::default();
        assert!(ssync(&json!({}), "not-an-id", &client).is_err());
        assert!(client.updated.borrow().is_empty());
    }

    #[test]
    fn test_publish_to_socrata_creates_children_and_parent() {
        let client = MockSocrata::default();
        let mut doc = test_doc();

        let urls = publish_to_socrata(&mut doc, &client, false).unwrap();

        assert_eq!(
            urls,
            vec![
                "https://data.example.gov/d/new0-0000",
                "https://data.example.gov/d/new1-0001",
                "https://data.example.gov/d/new2-0002",
            ]
        );

        let datafiles = doc.find("root.datafile");
        assert_eq!(datafiles[0].get_value("dataset_id"), Some("new0-0000"));
        assert_eq!(datafiles[1].get_value("dataset_id"), Some("new1-0001"));
        assert_eq!(doc.find_first_value("root.parent"), Some("new2-0002"));

        let columns = get_columns(&doc, "cities", true);
        assert_eq!(columns[0].field_name.as_deref(), Some("city"));

        let created = client.created.borrow();
        let parent = &created[2];
        assert_eq!(parent["displayType"], json!("href"));
        assert_eq!(parent["attribution"], json!("example.com-rates-2017"));
        assert_eq!(
            parent["metadata"]["accessPoints"]["URL"],
            json!("http://example.com/rates/2017")
        );

        let access_points = parent["metadata"]["additionalAccessPoints"].as_array().unwrap();
        assert_eq!(access_points.len(), 3);
        assert_eq!(
            access_points[0]["describedBy"],
            json!("http://example.com/docs/rates.html")
        );
        assert_eq!(access_points[1]["title"], json!("Interest rates by year"));
        assert_eq!(access_points[2]["urls"]["csv"], json!("cities.tsv"));
    }

    #[test]
    fn test_publish_to_socrata_sync() {
        let client = MockSocrata::default();
        let mut doc = test_doc();

        publish_to_socrata(&mut doc, &client, false).unwrap();
        doc.root_mut().get_or_new_term("Description", "Changed");

        let urls = publish_to_socrata(&mut doc, &client, true).unwrap();

        assert_eq!(urls.len(), 3);
        assert_eq!(client.created.borrow().len(), 3);

        let updated = client.updated.borrow();
        assert_eq!(updated.len(), 3);
        assert_eq!(updated[0].0, "new0-0000");
        assert_eq!(updated[0].1["description"], json!("Changed"));
        assert_eq!(updated[2].0, "new2-0002");
    }

    #[test]
    fn test_sync_parent_attribution() {
        let client = MockSocrata::default();
        let mut doc = test_doc();

        publish_to_socrata(&mut doc, &client, false).unwrap();
        doc.root_mut().get_or_new_term("Name", "example.com-rates-2018");

        publish_to_socrata(&mut doc, &client, true).unwrap();

        let updated = client.updated.borrow();
        let (parent_id, parent) = &updated[2];
        assert_eq!(parent_id, "new2-0002");
        assert_eq!(parent["attribution"], json!("example.com-rates-2018"));
    }

    #[test]
    fn test_publish_single_datafile_has_no_parent() {
        let client = MockSocrata::default();
        let mut single = MetatabDoc::new();
        single.root_mut().new_term("Name", "example.com-one");
        single.root_mut().new_term("Datafile", "one.csv");

        let urls = publish_to_socrata(&mut single, &client, false).unwrap();

        assert_eq!(urls, vec!["https://data.example.gov/d/new0-0000"]);
        assert!(single.find_first_value("root.parent").is_none());
        assert_eq!(client.created.borrow().len(), 1);
    }

    #[test]
    fn test_publish_without_datafiles_is_parent_only() {
        let client = MockSocrata::default();
        let mut doc = MetatabDoc::new();
        doc.root_mut().new_term("Name", "example.com-empty");
        doc.root_mut().new_term("Title", "Empty");

        let urls = publish_to_socrata(&mut doc, &client, false).unwrap();

        assert_eq!(urls, vec!["https://data.example.gov/d/new0-0000"]);
        assert_eq!(doc.find_first_value("root.parent"), Some("new0-0000"));

        let parent = &client.created.borrow()[0];
        assert_eq!(parent["metadata"]["additionalAccessPoints"], json!([]));
    }
}
