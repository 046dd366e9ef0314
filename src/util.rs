//! Slugs and data source references.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;

use crate::errors::MetatabErr;

static NOT_SLUG_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s\-.]").expect("static regex"));
static SLUG_SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[-\s]+").expect("static regex"));

/// Make a string safe for use as a file name or url path component.
///
/// Non-ASCII characters are dropped, as is anything that is not a word character, whitespace,
/// `-` or `.`. The result is lower case with runs of whitespace and `-` collapsed to one `-`.
pub fn slugify(value: &str) -> String {
    let ascii: String = value.chars().filter(char::is_ascii).collect();
    let cleaned = NOT_SLUG_CHARS.replace_all(&ascii, "");
    let cleaned = cleaned.trim().to_lowercase();

    SLUG_SEPARATORS.replace_all(&cleaned, "-").into_owned()
}

/// Where the rows of a data file come from.
#[derive(Clone, Debug, PartialEq)]
pub enum SourceRef {
    /// A file on the local file system.
    Local(PathBuf),
    /// Anything that has to be downloaded.
    Remote(Url),
}

impl SourceRef {
    /// Interpret a reference from a `Datafile` term.
    ///
    /// References without a scheme are paths, relative ones are resolved against `base_dir`
    /// (normally the directory of the metadata file).
    pub fn parse(reference: &str, base_dir: &Path) -> Result<Self, MetatabErr> {
        if !reference.contains("://") {
            let path = Path::new(reference);
            let path = if path.is_absolute() {
                path.to_path_buf()
            } else {
                base_dir.join(path)
            };
            return Ok(SourceRef::Local(path));
        }

        let url = Url::parse(reference)
            .map_err(|err| MetatabErr::BadUrl(reference.to_owned(), err.to_string()))?;

        if url.scheme() == "file" {
            url.to_file_path()
                .map(SourceRef::Local)
                .map_err(|_| MetatabErr::BadUrl(reference.to_owned(), "not a file path".into()))
        } else {
            Ok(SourceRef::Remote(url))
        }
    }

    /// The path component, local or remote.
    pub fn path(&self) -> String {
        match self {
            SourceRef::Local(path) => path.to_string_lossy().to_string(),
            SourceRef::Remote(url) => url.path().to_owned(),
        }
    }

    /// The file name without directories, a `.gz` suffix or the extension.
    pub fn name(&self) -> String {
        let path = self.path();
        let file_name = path.rsplit('/').next().unwrap_or("");
        let file_name = file_name.strip_suffix(".gz").unwrap_or(file_name);

        match file_name.rfind('.') {
            Some(idx) if idx > 0 => file_name[..idx].to_owned(),
            _ => file_name.to_owned(),
        }
    }

    /// The lower case extension, ignoring a `.gz` suffix.
    pub fn extension(&self) -> Option<String> {
        let path = self.path();
        let path = path.strip_suffix(".gz").unwrap_or(&path);

        Path::new(path)
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
    }

    /// Whether the data is gzip compressed.
    pub fn is_gzipped(&self) -> bool {
        self.path().ends_with(".gz")
    }

    /// The reference as a url string.
    pub fn as_url(&self) -> String {
        match self {
            SourceRef::Local(path) => format!("file://{}", path.to_string_lossy()),
            SourceRef::Remote(url) => url.to_string(),
        }
    }
}
