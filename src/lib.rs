#![deny(missing_docs)]
//! Package Metatab described data and publish it.
//!
//! A Metatab document is read into a [`MetatabDoc`], its data files are streamed through a
//! [`Cache`] of downloaded sources into ZIP, Excel or filesystem packages, and the packages are
//! copied to a [`Bucket`]. Separately the document's data dictionary can be published to a
//! Socrata instance.

//
// Public API
//
pub use crate::cache::{default_root, Cache, CacheEntry};
pub use crate::cmd_line::{flag_or_env, CommonCmdLineArgs};
pub use crate::doc::{MetatabDoc, Section, Term};
pub use crate::errors::MetatabErr;
pub use crate::package::{make_package, Package, PackageFormat, PackageSource};
pub use crate::rowgen::{Encoding, RowGenerator};
pub use crate::socrata::{publish_to_socrata, SocrataApi, SocrataClient};
pub use crate::storage::{open_bucket, Bucket, LocalBucket, S3Bucket};
pub use crate::sync::{create_packages, metatab_info, update_distributions, update_name};
pub use crate::util::{slugify, SourceRef};

//
// Implementation only
//
mod cache;
mod cmd_line;
mod doc;
mod errors;
pub mod package;
mod rowgen;
pub mod socrata;
mod storage;
mod sync;
mod util;
