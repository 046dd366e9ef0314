//! Module for errors.
use std::{error::Error, fmt::Display};

/// Error from the metatab-sync interface.
#[derive(Debug)]
pub enum MetatabErr {
    // Inherited errors from std
    /// Error forwarded from std
    IO(::std::io::Error),

    // Other forwarded errors
    /// Error reading or writing CSV
    Csv(::csv::Error),
    /// Error writing a zip archive
    Zip(::zip::result::ZipError),
    /// Error writing an Excel workbook
    Xlsx(::rust_xlsxwriter::XlsxError),
    /// Error from the http client
    Http(::reqwest::Error),
    /// Error (de)serializing json
    Json(::serde_json::Error),
    /// Database error in the cache index
    Database(::rusqlite::Error),
    /// Error forwarded from the strum crate
    StrumError(strum::ParseError),
    /// Malformed url, with the parser's message
    BadUrl(String, String),
    /// Error forwarded from the object store
    Storage(String),
    /// General error with any cause information erased and replaced by a string
    GeneralError(String),

    // My own errors from this crate
    /// The Root.Name term is missing.
    MissingPackageName,
    /// The document does not define any table schemas.
    NoTableSchemas,
    /// A configuration value was not supplied by flag or environment.
    MissingConfig(&'static str),
    /// The Root.Dataset term needed to build a name is missing.
    MissingDatasetName,
    /// Malformed Socrata dataset id.
    InvalidDatasetId(String),
    /// The dataset id is well formed, but the server does not know it.
    DatasetNotFound(String),
    /// A required term was not found in the document.
    TermNotFound(String),
    /// Text encoding name not supported.
    UnknownEncoding(String),
    /// Source is not in the cache index.
    NotInIndex,
    /// The cache index structure is wrong.
    InvalidSchema,
    /// There was an internal logic error.
    LogicError(&'static str),
}

impl Display for MetatabErr {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        use crate::errors::MetatabErr::*;

        match self {
            IO(err) => write!(f, "std lib io error: {}", err),

            Csv(err) => write!(f, "csv error: {}", err),
            Zip(err) => write!(f, "zip archive error: {}", err),
            Xlsx(err) => write!(f, "excel workbook error: {}", err),
            Http(err) => write!(f, "http error: {}", err),
            Json(err) => write!(f, "json error: {}", err),
            Database(err) => write!(f, "cache database error: {}", err),
            StrumError(err) => write!(f, "error forwarded from strum crate: {}", err),
            BadUrl(url, msg) => write!(f, "bad url {}: {}", url, msg),
            Storage(msg) => write!(f, "object storage error: {}", msg),
            GeneralError(msg) => write!(f, "general error forwarded: {}", msg),

            MissingPackageName => write!(
                f,
                "input metadata must define a package name in the Root.Name term"
            ),
            NoTableSchemas => write!(f, "can't create package without table schemas"),
            MissingConfig(msg) => write!(f, "missing configuration: {}", msg),
            MissingDatasetName => write!(f, "no Root.Dataset term to build a name from"),
            InvalidDatasetId(id) => write!(f, "dataset id: {} not valid", id),
            DatasetNotFound(id) => write!(f, "dataset {} does not exist", id),
            TermNotFound(term) => write!(f, "term not found: {}", term),
            UnknownEncoding(enc) => write!(f, "unknown text encoding: {}", enc),
            NotInIndex => write!(f, "no match in the cache index"),
            InvalidSchema => write!(f, "invalid cache index format"),
            LogicError(msg) => write!(f, "internal logic error: {}", msg),
        }
    }
}

impl Error for MetatabErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        use crate::errors::MetatabErr::*;

        match self {
            IO(err) => Some(err),
            Csv(err) => Some(err),
            Zip(err) => Some(err),
            Xlsx(err) => Some(err),
            Http(err) => Some(err),
            Json(err) => Some(err),
            Database(err) => Some(err),
            _ => None,
        }
    }
}

impl From<::std::io::Error> for MetatabErr {
    fn from(err: ::std::io::Error) -> MetatabErr {
        MetatabErr::IO(err)
    }
}

impl From<::csv::Error> for MetatabErr {
    fn from(err: ::csv::Error) -> MetatabErr {
        MetatabErr::Csv(err)
    }
}

impl From<::zip::result::ZipError> for MetatabErr {
    fn from(err: ::zip::result::ZipError) -> MetatabErr {
        MetatabErr::Zip(err)
    }
}

impl From<::rust_xlsxwriter::XlsxError> for MetatabErr {
    fn from(err: ::rust_xlsxwriter::XlsxError) -> MetatabErr {
        MetatabErr::Xlsx(err)
    }
}

impl From<::reqwest::Error> for MetatabErr {
    fn from(err: ::reqwest::Error) -> MetatabErr {
        MetatabErr::Http(err)
    }
}

impl From<::serde_json::Error> for MetatabErr {
    fn from(err: ::serde_json::Error) -> MetatabErr {
        MetatabErr::Json(err)
    }
}

impl From<::rusqlite::Error> for MetatabErr {
    fn from(err: ::rusqlite::Error) -> MetatabErr {
        MetatabErr::Database(err)
    }
}

impl From<strum::ParseError> for MetatabErr {
    fn from(err: strum::ParseError) -> MetatabErr {
        MetatabErr::StrumError(err)
    }
}

impl From<Box<dyn Error>> for MetatabErr {
    fn from(err: Box<dyn Error>) -> MetatabErr {
        MetatabErr::GeneralError(err.to_string())
    }
}
