//! Command-line flags and the configuration built from them.
//!
//! Every flag has a `COFFINJOE_*` environment variable fallback. Credentials
//! and the date have no default: a release must never carry working secrets.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use coffinjoe_core::{Credentials, DEFAULT_HOST};

use crate::transport::TransportConfig;

#[derive(Debug, Parser)]
#[command(
    name = "coffinjoe",
    version,
    about = "API client to consume the death certificates registered with TJ-SC"
)]
pub struct Cli {
    /// TJ-SC username
    #[arg(short, long, env = "COFFINJOE_USERNAME")]
    pub username: String,

    /// TJ-SC password
    #[arg(short, long, env = "COFFINJOE_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Specific date of request (YYYY-MM-DD)
    #[arg(short, long, env = "COFFINJOE_DATE")]
    pub date: String,

    /// Output file stem; `.json` and `.xml` are appended
    #[arg(short, long, env = "COFFINJOE_OUTPUT", default_value = "certificates")]
    pub output: PathBuf,

    /// Request timeout in seconds
    #[arg(
        short,
        long,
        env = "COFFINJOE_TIMEOUT",
        default_value_t = 20,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout: u64,

    /// CertidaoService endpoint
    #[arg(long, env = "COFFINJOE_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, env = "COFFINJOE_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// Everything one invocation needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub credentials: Credentials,
    pub date: String,
    pub output: PathBuf,
    pub transport: TransportConfig,
    pub log_level: String,
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        Self {
            host: cli.host,
            credentials: Credentials::new(cli.username, cli.password),
            date: cli.date,
            output: cli.output,
            transport: TransportConfig {
                timeout: Duration::from_secs(cli.timeout),
                ..TransportConfig::default()
            },
            log_level: cli.log_level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("coffinjoe").chain(args.iter().copied()))
    }

    #[test]
    fn command_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn short_flags_and_defaults() {
        let cli = parse(&["-u", "convenio_cge", "-p", "myp1y2MOds", "-d", "2018-06-04"]).unwrap();
        let config = Config::from(cli);
        assert_eq!(config.credentials.username(), "convenio_cge");
        assert_eq!(config.date, "2018-06-04");
        assert_eq!(config.output, PathBuf::from("certificates"));
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.transport.timeout, Duration::from_secs(20));
        assert_eq!(config.transport.pool_max_idle, 50);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn long_flags() {
        let cli = parse(&[
            "--username",
            "u",
            "--password",
            "p",
            "--date",
            "2020-02-29",
            "--output",
            "out/obitos",
            "--timeout",
            "5",
            "--host",
            "http://127.0.0.1:3000/selo/CertidaoService",
        ])
        .unwrap();
        let config = Config::from(cli);
        assert_eq!(config.output, PathBuf::from("out/obitos"));
        assert_eq!(config.transport.timeout, Duration::from_secs(5));
        assert_eq!(config.host, "http://127.0.0.1:3000/selo/CertidaoService");
    }

    #[test]
    fn zero_timeout_is_rejected() {
        assert!(parse(&["-u", "u", "-p", "p", "-d", "2018-06-04", "-t", "0"]).is_err());
    }

    #[test]
    fn date_is_not_validated() {
        let cli = parse(&["-u", "u", "-p", "p", "-d", "ontem"]).unwrap();
        assert_eq!(cli.date, "ontem");
    }
}
