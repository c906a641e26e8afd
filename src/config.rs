//! Configuration module.
//!
//! Handles and configures the initial settings and variables needed to reach the analysis
//! service. The configuration is loaded from a TOML file, then decorated with the environment
//! and the command line options.

use crate::error::Kind;
use clap::ArgMatches;
use failure::{Error, ResultExt};
use serde_derive::Deserialize;
use std::{env, fmt, fs, path::Path, time::Duration};
use url::Url;

/// Environment variable overriding the server address.
pub const SERVER_ENV: &str = "MOBSF_API_URL";
/// Environment variable overriding the API key.
pub const API_KEY_ENV: &str = "MOBSF_API_KEY";

/// Default server address.
const DEFAULT_SERVER: &str = "http://127.0.0.1:8000";
/// Default authentication header.
const DEFAULT_AUTH_HEADER: &str = "X-Mobsf-Api-Key";
/// Default request timeout, in seconds.
const DEFAULT_TIMEOUT: u64 = 60;

/// Client configuration.
#[derive(Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Base address of the analysis service.
    server: String,
    /// API key sent with every request.
    api_key: String,
    /// Header carrying the API key.
    auth_header: String,
    /// Request timeout in seconds. `0` disables it.
    timeout: u64,
    /// Boolean to represent `--verbose` mode.
    verbose: bool,
    /// Boolean to represent `--quiet` mode.
    quiet: bool,
}

impl Config {
    /// Creates a configuration for the given server and key, with default settings.
    pub fn new<S: Into<String>, K: Into<String>>(server: S, api_key: K) -> Self {
        Self {
            server: server.into(),
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Loads a configuration from the given TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let toml = fs::read_to_string(path.as_ref()).context(format!(
            "could not read the configuration file `{}`",
            path.as_ref().display()
        ))?;
        Self::from_toml(&toml)
    }

    /// Parses a configuration from a TOML string.
    pub fn from_toml(toml: &str) -> Result<Self, Error> {
        let config = toml::from_str(toml).context("invalid configuration")?;
        Ok(config)
    }

    /// Overrides the server address and the API key with the environment, if set.
    pub fn decorate_with_env(&mut self) {
        if let Ok(server) = env::var(SERVER_ENV) {
            self.server = server;
        }
        if let Ok(api_key) = env::var(API_KEY_ENV) {
            self.api_key = api_key;
        }
    }

    /// Modifies the options from the CLI.
    pub fn decorate_with_cli(&mut self, cli: &ArgMatches<'_>) -> Result<(), Error> {
        if let Some(server) = cli.value_of("server") {
            self.server = server.to_owned();
        }
        if let Some(api_key) = cli.value_of("api-key") {
            self.api_key = api_key.to_owned();
        }
        if let Some(timeout) = cli.value_of("timeout") {
            self.timeout = timeout
                .parse::<u64>()
                .context(format!("the timeout must be a number of seconds, got `{}`", timeout))?;
        }

        self.verbose = self.verbose || cli.is_present("verbose");
        self.quiet = self.quiet || cli.is_present("quiet");
        if self.verbose {
            self.quiet = false;
        }

        Ok(())
    }

    /// Checks if the configuration can be used to reach the service.
    pub fn check(&self) -> bool {
        self.errors().is_empty()
    }

    /// Returns the problems found in the configuration.
    pub fn errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if let Err(e) = self.server_url() {
            errors.push(e.message().to_owned());
        }
        if self.api_key.trim().is_empty() {
            errors.push(format!(
                "no API key was configured, set `api_key` in the configuration file or the `{}` \
                 environment variable",
                API_KEY_ENV
            ));
        }
        if self.auth_header.trim().is_empty() {
            errors.push(String::from("the authentication header name can not be empty"));
        }
        errors
    }

    /// Gets the server address as configured.
    pub fn server(&self) -> &str {
        &self.server
    }

    /// Parses the server address.
    pub fn server_url(&self) -> Result<Url, Kind> {
        let url = Url::parse(&self.server).map_err(|e| {
            Kind::config(format!("invalid server address `{}`: {}", self.server, e))
        })?;
        if url.cannot_be_a_base() || !(url.scheme() == "http" || url.scheme() == "https") {
            return Err(Kind::config(format!(
                "the server address `{}` must be an HTTP or HTTPS URL",
                self.server
            )));
        }
        Ok(url)
    }

    /// Gets the API key.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Gets the name of the header carrying the API key.
    pub fn auth_header(&self) -> &str {
        &self.auth_header
    }

    /// Sets the name of the header carrying the API key.
    pub fn set_auth_header<S: Into<String>>(&mut self, header: S) {
        self.auth_header = header.into();
    }

    /// Gets the request timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        if self.timeout == 0 {
            None
        } else {
            Some(Duration::from_secs(self.timeout))
        }
    }

    /// Sets the request timeout. `None` disables it.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout.map_or(0, |t| t.as_secs().max(1));
    }

    /// Returns true if the application is running in `--verbose` mode, false otherwise.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Returns true if the application is running in `--quiet` mode, false otherwise.
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: String::from(DEFAULT_SERVER),
            api_key: String::new(),
            auth_header: String::from(DEFAULT_AUTH_HEADER),
            timeout: DEFAULT_TIMEOUT,
            verbose: false,
            quiet: false,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("server", &self.server)
            .field(
                "api_key",
                &if self.api_key.is_empty() {
                    "<unset>"
                } else {
                    "<redacted>"
                },
            )
            .field("auth_header", &self.auth_header)
            .field("timeout", &self.timeout)
            .field("verbose", &self.verbose)
            .field("quiet", &self.quiet)
            .finish()
    }
}
