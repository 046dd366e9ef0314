//! Metatab package sync.
//!
//! Builds Excel, ZIP and filesystem packages from a Metatab file and copies them to S3.

use clap::{Arg, ArgMatches};
use failure::{Error, Fail};
use metatab_sync::{
    create_packages, metatab_info, open_bucket, update_distributions, update_name,
    CommonCmdLineArgs, PackageFormat,
};
use strum::IntoEnumIterator;

fn main() {
    if let Err(ref e) = run() {
        println!("error: {}", e);

        let mut fail: &dyn Fail = e.as_fail();

        while let Some(cause) = fail.cause() {
            println!("caused by: {}", cause);

            if let Some(backtrace) = cause.backtrace() {
                println!("backtrace: {}\n\n\n", backtrace);
            }

            fail = cause;
        }

        ::std::process::exit(1);
    }
}

fn run() -> Result<(), Error> {
    let app = CommonCmdLineArgs::new_app(
        "metasync",
        "Create packages and store them in s3 buckets.",
    )
    .arg(
        Arg::with_name("info")
            .short("i")
            .long("info")
            .help("Show configuration information."),
    )
    .arg(
        Arg::with_name("s3")
            .short("s")
            .long("s3")
            .takes_value(true)
            .required_unless("info")
            .help("URL to S3 where packages will be stored.")
            .long_help(concat!(
                "URL to S3 where packages will be stored, e.g. s3://bucket/prefix. A file:// ",
                "URL or a plain path copies the packages into a local directory instead."
            )),
    )
    .arg(
        Arg::with_name("excel")
            .short("e")
            .long("excel")
            .help("Create an excel package from a metatab file and copy it to S3."),
    )
    .arg(
        Arg::with_name("zip")
            .short("z")
            .long("zip")
            .help("Create a zip package from a metatab file and copy it to S3."),
    )
    .arg(
        Arg::with_name("fs")
            .short("f")
            .long("fs")
            .help("Create a Filesystem package. Unlike -e and -z, only writes the package to S3."),
    );

    let (common_args, matches) = CommonCmdLineArgs::matches(app)?;
    let _logger = common_args.init_logger()?;

    let cache = common_args.open_cache()?;

    if matches.is_present("info") {
        println!("{}", metatab_info(&cache)?);
        return Ok(());
    }

    let formats = requested_formats(&matches);
    let bucket = open_bucket(matches.value_of("s3").unwrap_or_default())?;

    let mut doc = common_args.load_doc()?;

    if !formats.is_empty() {
        update_name(&mut doc, false, false)?;
    }

    let dist_updated = update_distributions(&mut doc, bucket.as_ref(), &formats)?;
    doc.write_csv(&common_args.metatabfile())?;

    let urls = create_packages(
        &doc,
        common_args.doc_dir(),
        &cache,
        bucket.as_ref(),
        &formats,
        !dist_updated,
    );

    for url in urls {
        println!("Wrote {}", url);
    }

    Ok(())
}

// The flags are named after the formats.
fn requested_formats(matches: &ArgMatches) -> Vec<PackageFormat> {
    PackageFormat::iter()
        .filter(|&format| matches.is_present(<&'static str>::from(format)))
        .collect()
}
