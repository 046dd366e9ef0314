//! Metatab to Socrata.
//!
//! Publishes the data dictionary of a Metatab file as Socrata assets, or syncs assets published
//! earlier, and writes the asset ids back into the file.

use clap::Arg;
use failure::{Error, Fail};
use metatab_sync::{
    flag_or_env, metatab_info, publish_to_socrata, CommonCmdLineArgs, SocrataClient,
};

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
    let app = CommonCmdLineArgs::new_app("metacrata", "Socrata management of Metatab packages.")
        .arg(
            Arg::with_name("info")
                .short("i")
                .long("info")
                .help("Show configuration information."),
        )
        .arg(
            Arg::with_name("socrata")
                .short("s")
                .long("socrata")
                .takes_value(true)
                .help("URL for Socrata instance, or set SOCRATA_URL."),
        )
        .arg(
            Arg::with_name("api")
                .short("a")
                .long("api")
                .takes_value(true)
                .help("Socrata API key, or set SODA_APP_TOKEN."),
        )
        .arg(
            Arg::with_name("username")
                .short("u")
                .long("username")
                .takes_value(true)
                .help("Socrata username, or set SODA_USERNAME."),
        )
        .arg(
            Arg::with_name("password")
                .short("p")
                .long("password")
                .takes_value(true)
                .help("Socrata password, or set SODA_PASSWORD."),
        )
        .arg(
            Arg::with_name("sync")
                .long("sync")
                .help("Sync the metatab file to the assets it was published to."),
        );

    let (common_args, matches) = CommonCmdLineArgs::matches(app)?;
    let _logger = common_args.init_logger()?;

    if matches.is_present("info") {
        let cache = common_args.open_cache()?;
        println!("{}", metatab_info(&cache)?);
        return Ok(());
    }

    let app_token = flag_or_env(&matches, "api", "SODA_APP_TOKEN")?;
    let socrata_url = flag_or_env(&matches, "socrata", "SOCRATA_URL")?;
    let username = flag_or_env(&matches, "username", "SODA_USERNAME")?;
    let password = flag_or_env(&matches, "password", "SODA_PASSWORD")?;

    let client = SocrataClient::new(&socrata_url, &app_token, &username, &password)?;

    let mut doc = common_args.load_doc()?;

    let urls = publish_to_socrata(&mut doc, &client, matches.is_present("sync"))?;

    doc.write_csv(&common_args.metatabfile())?;

    for url in urls {
        println!("{}", url);
    }

    Ok(())
}
