//! Command line options that are used across applications.

use std::path::{Path, PathBuf};

use clap::{crate_version, App, Arg, ArgMatches};
use flexi_logger::{Logger, LoggerHandle};

use crate::{
    cache::{default_root, Cache},
    doc::MetatabDoc,
    errors::MetatabErr,
};

/// Struct to package up command line arguments.
#[derive(Clone, Debug)]
pub struct CommonCmdLineArgs {
    // Path to the metadata file
    metatabfile: PathBuf,
    // Path to the root of the download cache
    cache_root: PathBuf,
    // Log at debug level
    verbose: bool,
}

impl<'a, 'b> CommonCmdLineArgs {
    const DEFAULT_METATAB_FILE: &'static str = "metadata.csv";

    /// Create a new set of args.
    pub fn new_app(app_name: &'static str, about: &'static str) -> App<'a, 'b> {
        App::new(app_name)
            .about(about)
            .version(crate_version!())
            .arg(
                Arg::with_name("metatabfile")
                    .index(1)
                    .default_value(Self::DEFAULT_METATAB_FILE)
                    .help("Path to a Metatab file."),
            )
            .arg(
                Arg::with_name("cache")
                    .long("cache")
                    .takes_value(true)
                    .help("Path to the download cache.")
                    .long_help(
                        "Path to the download cache. Defaults to '$METAPACK_CACHE' or \
                         '${HOME}/.metapack/'",
                    ),
            )
            .arg(
                Arg::with_name("verbose")
                    .short("v")
                    .long("verbose")
                    .help("Log debugging output."),
            )
            .after_help("Log output can also be controlled with the RUST_LOG environment variable.")
    }

    /// Process an `App` to get the parsed values out of it and the matches object so an application
    /// can continue with further argument parsing.
    pub fn matches(app: App<'a, 'b>) -> Result<(Self, ArgMatches<'a>), MetatabErr> {
        let matches = app.get_matches();
        let cmd_line_opts = Self::from_matches(&matches)?;

        Ok((cmd_line_opts, matches))
    }

    fn from_matches(matches: &ArgMatches) -> Result<Self, MetatabErr> {
        let metatabfile = matches
            .value_of("metatabfile")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(Self::DEFAULT_METATAB_FILE));

        let cache_root = matches
            .value_of("cache")
            .map(PathBuf::from)
            .or_else(default_root)
            .ok_or(MetatabErr::MissingConfig(
                "no --cache given and no home directory for the default",
            ))?;

        Ok(CommonCmdLineArgs {
            metatabfile,
            cache_root,
            verbose: matches.is_present("verbose"),
        })
    }

    /// Get the path to the metadata file.
    pub fn metatabfile(&self) -> &Path {
        &self.metatabfile
    }

    /// The directory relative data file references are resolved against.
    pub fn doc_dir(&self) -> &Path {
        match self.metatabfile.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }

    /// Get the root of the download cache.
    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    /// Load the metadata file.
    pub fn load_doc(&self) -> Result<MetatabDoc, MetatabErr> {
        MetatabDoc::load(&self.metatabfile)
    }

    /// Open the download cache, creating it if needed.
    pub fn open_cache(&self) -> Result<Cache, MetatabErr> {
        Cache::open_or_create(&self.cache_root)
    }

    /// Start logging to stderr. `RUST_LOG` wins over the default level.
    ///
    /// Keep the handle alive for as long as the program logs.
    pub fn init_logger(&self) -> Result<LoggerHandle, MetatabErr> {
        let level = if self.verbose { "debug" } else { "info" };

        Logger::try_with_env_or_str(level)
            .and_then(|logger| logger.log_to_stderr().start())
            .map_err(|err| MetatabErr::GeneralError(format!("failed to start logger: {}", err)))
    }
}

/// The value of a command line flag, or failing that an environment variable.
pub fn flag_or_env(
    matches: &ArgMatches,
    flag: &str,
    env_var: &'static str,
) -> Result<String, MetatabErr> {
    matches
        .value_of(flag)
        .map(ToOwned::to_owned)
        .or_else(|| std::env::var(env_var).ok())
        .filter(|val| !val.is_empty())
        .ok_or(MetatabErr::MissingConfig(env_var))
}

#[cfg(test)]
mod unit {
    use super::*;

    fn test_app() -> App<'static, 'static> {
        CommonCmdLineArgs::new_app("test", "testing").arg(
            Arg::with_name("socrata")
                .short("s")
                .long("socrata")
                .takes_value(true),
        )
    }

    #[test]
    fn test_defaults() {
        let matches = test_app().get_matches_from(vec!["test", "--cache", "/tmp/cache"]);
        let args = CommonCmdLineArgs::from_matches(&matches).unwrap();

        assert_eq!(args.metatabfile(), Path::new("metadata.csv"));
        assert_eq!(args.doc_dir(), Path::new("."));
        assert_eq!(args.cache_root(), Path::new("/tmp/cache"));
        assert!(!args.verbose);
    }

    #[test]
    fn test_metatabfile_and_dir() {
        let matches = test_app().get_matches_from(vec!["test", "-v", "pkgs/rates/metadata.csv"]);
        let args = CommonCmdLineArgs::from_matches(&matches).unwrap();

        assert_eq!(args.metatabfile(), Path::new("pkgs/rates/metadata.csv"));
        assert_eq!(args.doc_dir(), Path::new("pkgs/rates"));
        assert!(args.verbose);
    }

    #[test]
    fn test_flag_or_env() {
        let matches = test_app().get_matches_from(vec!["test", "-s", "data.example.gov"]);
        assert_eq!(
            flag_or_env(&matches, "socrata", "METATAB_TEST_UNSET_VAR").unwrap(),
            "data.example.gov"
        );

        let matches = test_app().get_matches_from(vec!["test"]);
        assert!(matches!(
            flag_or_env(&matches, "socrata", "METATAB_TEST_UNSET_VAR"),
            Err(MetatabErr::MissingConfig("METATAB_TEST_UNSET_VAR"))
        ));

        std::env::set_var("METATAB_TEST_SET_VAR", "from-env");
        assert_eq!(
            flag_or_env(&matches, "socrata", "METATAB_TEST_SET_VAR").unwrap(),
            "from-env"
        );
    }
}
