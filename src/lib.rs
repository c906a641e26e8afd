//! MobSF analysis session client.
//!
//! Drives the life of an uploaded application package on a MobSF service: upload, static
//! scan, reports and suppressions through [`StaticAnalyzer`], and dynamic analysis with Frida
//! instrumentation through [`DynamicAnalyzer`]. Every session is keyed by the [`Hash`] the
//! upload returned.
//!
//! ```no_run
//! # async fn run() -> mobsf_client::Result<()> {
//! use mobsf_client::{Client, Config};
//!
//! let client = Client::new(&Config::new("http://127.0.0.1:8000", "api-key"))?;
//! let analyzer = client.static_analyzer();
//! let upload = analyzer.upload(std::fs::read("diva.apk").unwrap(), "diva.apk").await?;
//! let _ = analyzer.scan(upload.hash(), false).await?;
//! let scorecard = analyzer.scorecard(upload.hash()).await?;
//! println!("security score: {}", scorecard.security_score());
//! # Ok(())
//! # }
//! ```

#![forbid(
    anonymous_parameters,
    unsafe_code,
    overflowing_literals,
    unconditional_recursion,
    while_true,
    unused_allocation,
    unused_comparisons,
    unused_parens,
    trivial_casts,
    trivial_numeric_casts,
    non_shorthand_field_patterns
)]
#![deny(unused_extern_crates, unused_import_braces)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    unused_qualifications,
    unused_results,
    variant_size_differences
)]

#[macro_use]
mod wire;

mod client;
mod config;
mod error;
mod hash;
mod response;
mod transport;
mod utils;

/// Command Line Interface
pub mod cli;
pub mod dynamic_analysis;
pub mod static_analysis;

#[cfg(test)]
mod mock;

use clap::ArgMatches;
use colored::Colorize;
use env_logger::Builder;
use log::{Level, LevelFilter};
use std::{env, io::Write, path::PathBuf};

pub use crate::{
    client::Client,
    config::{Config, API_KEY_ENV, SERVER_ENV},
    dynamic_analysis::DynamicAnalyzer,
    error::{Kind, Result},
    hash::Hash,
    static_analysis::StaticAnalyzer,
    transport::{Payload, Transport},
    utils::{print_error, print_json, print_warning},
};

/// Initialize the config with the config files, the environment and command line options.
///
/// The local file (`config.toml`) is used if it exists. On UNIX, if it does not exist but the
/// global one does (`/etc/mobsf-client/config.toml`), the latter is used. Otherwise the
/// default configuration is used.
pub fn initialize_config(cli: &ArgMatches<'_>) -> std::result::Result<Config, failure::Error> {
    let config_path = PathBuf::from("config.toml");
    let global_config_path = PathBuf::from("/etc/mobsf-client/config.toml");

    let mut config = if config_path.exists() {
        Config::from_file(&config_path)?
    } else if cfg!(target_family = "unix") && global_config_path.exists() {
        Config::from_file(&global_config_path)?
    } else {
        Config::default()
    };

    config.decorate_with_env();
    config.decorate_with_cli(cli)?;
    // Options given after a subcommand land in the matches of that subcommand.
    let mut matches = cli;
    while let (_, Some(sub)) = matches.subcommand() {
        config.decorate_with_cli(sub)?;
        matches = sub;
    }

    Ok(config)
}

/// Initializes the logger.
///
/// Warnings and errors are prefixed and colored. The `RUST_LOG` environment variable
/// overrides the level chosen with `is_verbose`.
pub fn initialize_logger(is_verbose: bool) {
    let log_level = if is_verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut builder = Builder::new();
    let _ = builder.format(|buf, record| match record.level() {
        Level::Warn => writeln!(
            buf,
            "{}{}",
            "Warning: ".bold().yellow(),
            record.args().to_string().yellow()
        ),
        Level::Error => writeln!(
            buf,
            "{}{}",
            "Error: ".bold().red(),
            record.args().to_string().red()
        ),
        Level::Debug => writeln!(
            buf,
            "{}{}",
            "Debug: ".bold(),
            record.args().to_string().bold()
        ),
        Level::Info => writeln!(buf, "{}", record.args()),
        Level::Trace => writeln!(buf, "{}: {}", record.level(), record.args()),
    });

    if let Ok(env_log) = env::var("RUST_LOG") {
        let _ = builder.parse_filters(&env_log);
    } else {
        let _ = builder.filter(Some("mobsf_client"), log_level);
    }

    if let Err(e) = builder.try_init() {
        print_warning(format!("could not initialize the logger: {}", e));
    }
}
