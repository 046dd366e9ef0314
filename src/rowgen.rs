//! Read the rows of a data source.

use std::{fs::File, io::Read, str::FromStr};

use flate2::read::GzDecoder;
use strum_macros::EnumString;

use crate::{cache::Cache, errors::MetatabErr, util::SourceRef};

/// Text encodings understood when decoding source files.
#[derive(Clone, Copy, PartialEq, Eq, Debug, EnumString)]
pub enum Encoding {
    /// ISO-8859-1, every byte is one character.
    #[strum(
        to_string = "latin1",
        serialize = "latin-1",
        serialize = "iso-8859-1",
        serialize = "iso8859-1",
        serialize = "cp1252"
    )]
    Latin1,
    /// UTF-8, invalid sequences are replaced.
    #[strum(to_string = "utf-8", serialize = "utf8", serialize = "ascii")]
    Utf8,
}

impl Default for Encoding {
    fn default() -> Self {
        Encoding::Latin1
    }
}

impl Encoding {
    /// Look up an encoding by name, case insensitive.
    pub fn from_name(name: &str) -> Result<Self, MetatabErr> {
        Encoding::from_str(&name.trim().to_lowercase())
            .map_err(|_| MetatabErr::UnknownEncoding(name.to_owned()))
    }

    fn decode(self, bytes: &[u8]) -> String {
        match self {
            Encoding::Latin1 => bytes.iter().map(|&b| char::from(b)).collect(),
            Encoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
        }
    }
}

/// Generates rows from a data source.
pub struct RowGenerator {
    reader: Box<dyn Read>,
    delimiter: u8,
    encoding: Encoding,
}

impl RowGenerator {
    /// Open a source. Remote sources are downloaded into the cache first.
    pub fn new(source: &SourceRef, cache: &Cache, encoding: Encoding) -> Result<Self, MetatabErr> {
        let reader: Box<dyn Read> = match source {
            SourceRef::Local(path) => {
                let file = File::open(path)?;
                if source.is_gzipped() {
                    Box::new(GzDecoder::new(file))
                } else {
                    Box::new(file)
                }
            }
            SourceRef::Remote(url) => {
                let url = url.as_str();
                cache.fetch(url)?;
                let cached = cache.open(url)?;
                if source.is_gzipped() {
                    Box::new(GzDecoder::new(cached))
                } else {
                    Box::new(cached)
                }
            }
        };

        let delimiter = match source.extension().as_deref() {
            Some("tsv") | Some("tab") => b'\t',
            _ => b',',
        };

        Ok(RowGenerator {
            reader,
            delimiter,
            encoding,
        })
    }

    /// Iterate over the rows, lazily.
    pub fn rows(self) -> impl Iterator<Item = Result<Vec<String>, MetatabErr>> {
        let encoding = self.encoding;

        csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(self.delimiter)
            .from_reader(self.reader)
            .into_byte_records()
            .map(move |record| {
                record
                    .map(|rec| rec.iter().map(|field| encoding.decode(field)).collect())
                    .map_err(MetatabErr::from)
            })
    }
}

#[cfg(test)]
mod unit {
    use super::*;
    use crate::cache::unit::*;

    use std::{io::Write, path::Path};

    fn read_all(reference: &str, encoding: Encoding, cache: &Cache) -> Vec<Vec<String>> {
        let source = SourceRef::parse(reference, Path::new("test_data")).unwrap();
        RowGenerator::new(&source, cache, encoding)
            .unwrap()
            .rows()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn test_encoding_names() {
        assert_eq!(Encoding::from_name("LATIN1").unwrap(), Encoding::Latin1);
        assert_eq!(Encoding::from_name("iso-8859-1").unwrap(), Encoding::Latin1);
        assert_eq!(Encoding::from_name("UTF-8").unwrap(), Encoding::Utf8);
        assert!(matches!(
            Encoding::from_name("ebcdic"),
            Err(MetatabErr::UnknownEncoding(_))
        ));
    }

    #[test]
    fn test_csv_rows() {
        let TestCache { tmp: _tmp, cache } = create_test_cache().unwrap();

        let rows = read_all("rates.csv", Encoding::Utf8, &cache);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0], vec!["year", "rate", "note"]);
        assert_eq!(rows[2], vec!["2016", "1.5", "raised, twice"]);
    }

    #[test]
    fn test_tsv_latin1_rows() {
        let TestCache { tmp: _tmp, cache } = create_test_cache().unwrap();

        let rows = read_all("cities.tsv", Encoding::Latin1, &cache);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1], vec!["# estimates"]);
        assert_eq!(rows[2], vec!["Montréal", "1704694"]);
    }

    #[test]
    fn test_gzipped_rows() {
        let TestCache { tmp, cache } = create_test_cache().unwrap();

        let path = tmp.path().join("small.csv.gz");
        let mut encoder = flate2::write::GzEncoder::new(
            File::create(&path).unwrap(),
            flate2::Compression::default(),
        );
        encoder.write_all(b"a,b\n1,2,3\n").unwrap();
        encoder.finish().unwrap();

        let rows = read_all(path.to_str().unwrap(), Encoding::Utf8, &cache);
        assert_eq!(rows, vec![vec!["a", "b"], vec!["1", "2", "3"]]);
    }

    #[test]
    fn test_cached_remote_rows() {
        let TestCache { tmp: _tmp, cache } = create_test_cache().unwrap();

        // Already in the cache, so nothing is downloaded.
        let url = "http://example.com/remote.csv";
        cache.add(url, b"x,y\n").unwrap();

        let rows = read_all(url, Encoding::Utf8, &cache);
        assert_eq!(rows, vec![vec!["x", "y"]]);
    }
}
