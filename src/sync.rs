//! Build packages of a Metatab document and store them in a bucket.

use std::path::Path;

use log::{error, info, warn};

use crate::{
    cache::Cache,
    doc::MetatabDoc,
    errors::MetatabErr,
    package::{
        make_package, package_name, FileSystemPackage, PackageFormat, PackageSource, METADATA_FILE,
    },
    storage::Bucket,
    util::slugify,
};

/// The `Root` terms joined to make a package name, in order.
const NAME_PARTS: [&str; 7] = [
    "root.origin",
    "root.dataset",
    "root.time",
    "root.space",
    "root.grain",
    "root.variant",
    "root.version",
];

/// Rebuild `Root.Name` from the origin, dataset, time, space, grain, variant and version terms.
///
/// Without a `Root.Dataset` the name is left alone, or with `fail_on_missing` that is an error.
/// Returns whether the name changed.
pub fn update_name(
    doc: &mut MetatabDoc,
    fail_on_missing: bool,
    report_unchanged: bool,
) -> Result<bool, MetatabErr> {
    if doc.find_first_value("root.dataset").is_none() {
        if fail_on_missing {
            return Err(MetatabErr::MissingDatasetName);
        }
        warn!("No Root.Dataset, so can't update the name");
        return Ok(false);
    }

    let parts: Vec<&str> = NAME_PARTS
        .iter()
        .filter_map(|name| doc.find_first_value(name))
        .collect();
    let new_name = slugify(&parts.join("-"));

    let old_name = doc.find_first_value("root.name").unwrap_or("").to_owned();
    if old_name == new_name {
        if report_unchanged {
            info!("Name did not change: {}", new_name);
        }
        return Ok(false);
    }

    doc.root_mut().get_or_new_term("Name", &new_name);
    info!("Changed name from '{}' to '{}'", old_name, new_name);

    Ok(true)
}

fn distribution_url(
    doc: &MetatabDoc,
    bucket: &dyn Bucket,
    format: PackageFormat,
) -> Result<String, MetatabErr> {
    let save_path = format.save_path(&package_name(doc)?);

    Ok(match format {
        PackageFormat::Filesystem => bucket.access_url(&format!("{}/{}", save_path, METADATA_FILE)),
        _ => bucket.access_url(&save_path),
    })
}

/// Add a `Root.Distribution` term for every requested package format that does not have one.
///
/// Returns whether any term was added.
pub fn update_distributions(
    doc: &mut MetatabDoc,
    bucket: &dyn Bucket,
    formats: &[PackageFormat],
) -> Result<bool, MetatabErr> {
    let mut updated = false;

    for &format in formats {
        let url = distribution_url(doc, bucket, format)?;

        if !doc.contains("root.distribution", &url) {
            doc.root_mut().new_term("Distribution", &url);
            println!("Added {} distribution to metadata", format.label());
            updated = true;
        }
    }

    Ok(updated)
}

fn create_package(
    format: PackageFormat,
    doc: &MetatabDoc,
    doc_dir: &Path,
    cache: &Cache,
    bucket: &dyn Bucket,
    skip_if_exists: bool,
) -> Result<Vec<String>, MetatabErr> {
    let package_root = cache.package_root();
    let (path, _created) = make_package(format, doc, doc_dir, &package_root, cache, skip_if_exists)?;

    match format {
        PackageFormat::Filesystem => {
            let package = FileSystemPackage::new(PackageSource::prepare(doc, doc_dir)?);
            bucket.write_all(&path, &package_name(doc)?, &package.files())
        }
        _ => {
            let key = path
                .file_name()
                .and_then(|name| name.to_str())
                .ok_or(MetatabErr::LogicError("package path has no file name"))?;
            Ok(vec![bucket.write(&path, key)?])
        }
    }
}

/// Build each requested package under the cache's package directory and copy it to `bucket`.
///
/// `doc_dir` is where relative data file references are resolved. A package that fails is
/// reported and the others are still built. Returns the urls written.
pub fn create_packages(
    doc: &MetatabDoc,
    doc_dir: &Path,
    cache: &Cache,
    bucket: &dyn Bucket,
    formats: &[PackageFormat],
    skip_if_exists: bool,
) -> Vec<String> {
    let mut urls = vec![];

    for &format in formats {
        match create_package(format, doc, doc_dir, cache, bucket, skip_if_exists) {
            Ok(written) => urls.extend(written),
            Err(err) => error!("Failed to generate {} package: {}", format.label(), err),
        }
    }

    urls
}

/// A description of the version and cache.
pub fn metatab_info(cache: &Cache) -> Result<String, MetatabErr> {
    let entries = cache.entries()?;

    Ok(format!(
        "Version  : {}\nCache    : {}\nSources  : {}",
        env!("CARGO_PKG_VERSION"),
        cache.root().display(),
        entries.len()
    ))
}

#[cfg(test)]
mod unit {
    use super::*;
    use crate::{cache::unit::*, package::unit::test_doc, storage::LocalBucket};

    use tempdir::TempDir;

    #[test]
    fn test_update_name() {
        let mut doc = test_doc();
        doc.root_mut().get_or_new_term("Name", "old-name");
        doc.root_mut().new_term("Version", "1");

        assert!(update_name(&mut doc, true, false).unwrap());
        assert_eq!(
            doc.find_first_value("root.name"),
            Some("example.com-rates-2017-1")
        );

        assert!(!update_name(&mut doc, true, true).unwrap());
    }

    #[test]
    fn test_update_name_without_dataset() {
        let mut doc = MetatabDoc::new();
        doc.root_mut().new_term("Name", "keep-me");

        assert!(!update_name(&mut doc, false, false).unwrap());
        assert_eq!(doc.find_first_value("root.name"), Some("keep-me"));

        assert!(matches!(
            update_name(&mut doc, true, false),
            Err(MetatabErr::MissingDatasetName)
        ));
    }

    #[test]
    fn test_update_distributions() {
        let tmp = TempDir::new("metatab-dist").unwrap();
        let bucket = LocalBucket::new(tmp.path().to_str().unwrap()).unwrap();
        let mut doc = test_doc();

        let formats = [PackageFormat::Zip, PackageFormat::Filesystem];
        assert!(update_distributions(&mut doc, &bucket, &formats).unwrap());

        let dists: Vec<&str> = doc
            .find("root.distribution")
            .into_iter()
            .map(|t| t.value())
            .collect();
        assert_eq!(
            dists,
            vec![
                bucket.access_url("example.com-rates-2017.zip"),
                bucket.access_url("example.com-rates-2017/metadata.csv"),
            ]
        );

        assert!(!update_distributions(&mut doc, &bucket, &formats).unwrap());
        assert_eq!(doc.find("root.distribution").len(), 2);
    }

    #[test]
    fn test_create_packages() {
        let TestCache { tmp, cache } = create_test_cache().unwrap();
        let bucket_dir = TempDir::new("metatab-bucket").unwrap();
        let bucket = LocalBucket::new(bucket_dir.path().to_str().unwrap()).unwrap();

        let urls = create_packages(
            &test_doc(),
            Path::new("test_data"),
            &cache,
            &bucket,
            &[PackageFormat::Zip, PackageFormat::Filesystem],
            false,
        );

        assert_eq!(urls.len(), 4);
        assert_eq!(urls[0], bucket.access_url("example.com-rates-2017.zip"));
        assert!(bucket_dir.path().join("example.com-rates-2017.zip").is_file());
        assert!(bucket_dir
            .path()
            .join("example.com-rates-2017/data/cities.csv")
            .is_file());
        assert!(tmp.path().join("packages/example.com-rates-2017.zip").is_file());
    }

    #[test]
    fn test_create_packages_reports_failures() {
        let TestCache { tmp: _tmp, cache } = create_test_cache().unwrap();
        let bucket_dir = TempDir::new("metatab-bucket").unwrap();
        let bucket = LocalBucket::new(bucket_dir.path().to_str().unwrap()).unwrap();

        let urls = create_packages(
            &MetatabDoc::new(),
            Path::new("test_data"),
            &cache,
            &bucket,
            &[PackageFormat::Zip],
            false,
        );

        assert!(urls.is_empty());
    }

    #[test]
    fn test_metatab_info() {
        let TestCache { tmp, cache } = create_test_cache().unwrap();

        let info = metatab_info(&cache).unwrap();
        assert!(info.contains(env!("CARGO_PKG_VERSION")));
        assert!(info.contains(&tmp.path().display().to_string()));
        assert!(info.ends_with("Sources  : 0"));
    }
}
