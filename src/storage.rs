//! Object storage destinations for finished packages.

use std::path::{Path, PathBuf};

use aws_sdk_s3::{error::DisplayErrorContext, primitives::ByteStream, types::ObjectCannedAcl};
use log::info;
use once_cell::sync::OnceCell;
use reqwest::Url;

use crate::errors::MetatabErr;

/// Somewhere packages can be stored and later downloaded from.
pub trait Bucket {
    /// The public url `key` will be reachable at.
    fn access_url(&self, key: &str) -> String;

    /// Copy the local file to `key`, returns the access url.
    fn write(&self, local: &Path, key: &str) -> Result<String, MetatabErr>;

    /// Copy the listed files from `local_dir` to keys under `prefix`, returns the access urls.
    fn write_all(
        &self,
        local_dir: &Path,
        prefix: &str,
        files: &[String],
    ) -> Result<Vec<String>, MetatabErr> {
        files
            .iter()
            .map(|file| self.write(&local_dir.join(file), &format!("{}/{}", prefix, file)))
            .collect()
    }
}

/// Pick the bucket for a url, `s3://bucket/prefix` or a local directory.
pub fn open_bucket(url: &str) -> Result<Box<dyn Bucket>, MetatabErr> {
    if url.starts_with("s3://") {
        Ok(Box::new(S3Bucket::new(url)?))
    } else if url.starts_with("file://") || !url.contains("://") {
        Ok(Box::new(LocalBucket::new(url)?))
    } else {
        Err(MetatabErr::BadUrl(
            url.to_owned(),
            "expected an s3:// or file:// url".to_owned(),
        ))
    }
}

fn content_type(key: &str) -> &'static str {
    match Path::new(key).extension().and_then(|ext| ext.to_str()) {
        Some("csv") => "text/csv",
        Some("zip") => "application/zip",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}

fn join_key(prefix: &str, key: &str) -> String {
    let prefix = prefix.trim_matches('/');
    let key = key.trim_start_matches('/');
    if prefix.is_empty() {
        key.to_owned()
    } else {
        format!("{}/{}", prefix, key)
    }
}

/// An S3 bucket and key prefix. Uploads are public-read.
pub struct S3Bucket {
    bucket: String,
    prefix: String,
    runtime: tokio::runtime::Runtime,
    client: OnceCell<aws_sdk_s3::Client>,
}

impl S3Bucket {
    const ACCESS_HOST: &'static str = "https://s3.amazonaws.com";

    /// Parse `s3://bucket/prefix`.
    pub fn new(url: &str) -> Result<Self, MetatabErr> {
        let parsed =
            Url::parse(url).map_err(|err| MetatabErr::BadUrl(url.to_owned(), err.to_string()))?;

        let bucket = match parsed.host_str() {
            Some(host) if parsed.scheme() == "s3" => host.to_owned(),
            _ => {
                return Err(MetatabErr::BadUrl(
                    url.to_owned(),
                    "expected s3://bucket/prefix".to_owned(),
                ))
            }
        };

        Ok(S3Bucket {
            bucket,
            prefix: parsed.path().trim_matches('/').to_owned(),
            runtime: tokio::runtime::Runtime::new()?,
            client: OnceCell::new(),
        })
    }

    /// The bucket name.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// The key prefix, without leading or trailing slashes.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn client(&self) -> &aws_sdk_s3::Client {
        self.client.get_or_init(|| {
            let config = self
                .runtime
                .block_on(aws_config::load_defaults(aws_config::BehaviorVersion::latest()));
            aws_sdk_s3::Client::new(&config)
        })
    }
}

impl Bucket for S3Bucket {
    fn access_url(&self, key: &str) -> String {
        format!(
            "{}/{}/{}",
            Self::ACCESS_HOST,
            self.bucket,
            join_key(&self.prefix, key)
        )
    }

    fn write(&self, local: &Path, key: &str) -> Result<String, MetatabErr> {
        let full_key = join_key(&self.prefix, key);
        let client = self.client();

        self.runtime.block_on(async {
            let body = ByteStream::from_path(local)
                .await
                .map_err(|err| MetatabErr::Storage(err.to_string()))?;

            client
                .put_object()
                .bucket(&self.bucket)
                .key(&full_key)
                .body(body)
                .acl(ObjectCannedAcl::PublicRead)
                .content_type(content_type(key))
                .send()
                .await
                .map_err(|err| MetatabErr::Storage(DisplayErrorContext(&err).to_string()))?;

            Ok::<(), MetatabErr>(())
        })?;

        info!("Uploaded {} to s3://{}/{}", local.display(), self.bucket, full_key);

        Ok(self.access_url(key))
    }
}

/// A directory on the local file system standing in for a bucket.
#[derive(Debug)]
pub struct LocalBucket {
    root: PathBuf,
}

impl LocalBucket {
    /// A `file://` url or a plain path. Relative paths are taken from the working directory.
    pub fn new(url: &str) -> Result<Self, MetatabErr> {
        let root = if url.starts_with("file://") {
            Url::parse(url)
                .ok()
                .and_then(|u| u.to_file_path().ok())
                .ok_or_else(|| MetatabErr::BadUrl(url.to_owned(), "not a file path".to_owned()))?
        } else {
            PathBuf::from(url)
        };

        let root = if root.is_absolute() {
            root
        } else {
            std::env::current_dir()?.join(root)
        };

        Ok(LocalBucket { root })
    }

    /// The directory files are copied into.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Bucket for LocalBucket {
    fn access_url(&self, key: &str) -> String {
        format!("file://{}", self.root.join(key).display())
    }

    fn write(&self, local: &Path, key: &str) -> Result<String, MetatabErr> {
        let target = self.root.join(key);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(local, &target)?;

        info!("Copied {} to {}", local.display(), target.display());

        Ok(self.access_url(key))
    }
}

#[cfg(test)]
mod unit {
    use super::*;

    use tempdir::TempDir;

    #[test]
    fn test_s3_access_url() {
        let bucket = S3Bucket::new("s3://library.metatab.org/packages/").unwrap();

        assert_eq!(bucket.bucket(), "library.metatab.org");
        assert_eq!(bucket.prefix(), "packages");
        assert_eq!(
            bucket.access_url("pkg.zip"),
            "https://s3.amazonaws.com/library.metatab.org/packages/pkg.zip"
        );

        let bare = S3Bucket::new("s3://bucket").unwrap();
        assert_eq!(
            bare.access_url("pkg/metadata.csv"),
            "https://s3.amazonaws.com/bucket/pkg/metadata.csv"
        );
    }

    #[test]
    fn test_open_bucket() {
        assert!(open_bucket("s3://bucket/prefix").is_ok());
        assert!(open_bucket("file:///tmp/bucket").is_ok());
        assert!(open_bucket("relative/dir").is_ok());
        assert!(matches!(
            open_bucket("ftp://example.com/x"),
            Err(MetatabErr::BadUrl(_, _))
        ));
    }

    #[test]
    fn test_local_bucket_relative_path() {
        let bucket = LocalBucket::new("out").unwrap();

        assert!(bucket.root().is_absolute());
        assert_eq!(bucket.root(), std::env::current_dir().unwrap().join("out"));

        let url = bucket.access_url("pkg.zip");
        assert!(url.starts_with("file:///"));
        assert!(url.ends_with("/out/pkg.zip"));
    }

    #[test]
    fn test_content_type() {
        assert_eq!(content_type("a/b.csv"), "text/csv");
        assert_eq!(content_type("pkg.zip"), "application/zip");
        assert_eq!(content_type("noext"), "application/octet-stream");
    }

    #[test]
    fn test_local_bucket_write() {
        let src = TempDir::new("metatab-bucket-src").unwrap();
        let dst = TempDir::new("metatab-bucket-dst").unwrap();

        std::fs::create_dir_all(src.path().join("data")).unwrap();
        std::fs::write(src.path().join("data/a.csv"), "a\n").unwrap();
        std::fs::write(src.path().join("metadata.csv"), "Name,pkg\n").unwrap();

        let bucket = LocalBucket::new(dst.path().to_str().unwrap()).unwrap();
        let urls = bucket
            .write_all(
                src.path(),
                "pkg",
                &["data/a.csv".to_owned(), "metadata.csv".to_owned()],
            )
            .unwrap();

        assert_eq!(urls.len(), 2);
        assert_eq!(urls[1], bucket.access_url("pkg/metadata.csv"));
        assert!(dst.path().join("pkg/data/a.csv").is_file());
    }
}
