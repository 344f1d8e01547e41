//! Command-line and environment configuration

use clap::Parser;
use pulldeck_core::{Config, EngineConfig, SessionConfig};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

pub const DEFAULT_PASSWORD: &str = "password";

/// PullDeck - resumable download server
#[derive(Parser, Debug, Clone)]
#[command(name = "pulldeck")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Port to listen on
    #[arg(
        long,
        env = "PULLDECK_PORT",
        default_value_t = 8080,
        value_parser = clap::value_parser!(u16).range(1024..)
    )]
    pub port: u16,

    /// Address to bind
    #[arg(long, env = "PULLDECK_BIND", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind: IpAddr,

    /// Shared password for the control API
    #[arg(long, env = "PULLDECK_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Session lifetime in minutes
    #[arg(long, env = "PULLDECK_SESSION_MINUTES", default_value_t = 30)]
    pub session_minutes: u64,

    /// Maximum number of transfers streaming at once
    #[arg(long, env = "PULLDECK_MAX_CONCURRENT")]
    pub max_concurrent: Option<usize>,

    /// Fail a transfer after this many seconds without data
    #[arg(long, env = "PULLDECK_STALL_TIMEOUT")]
    pub stall_timeout: Option<u64>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    /// Configured password, or the default when none was given
    pub fn password(&self) -> (&str, bool) {
        match &self.password {
            Some(password) => (password, false),
            None => (DEFAULT_PASSWORD, true),
        }
    }

    pub fn config(&self) -> Config {
        Config {
            engine: EngineConfig {
                max_concurrent: self.max_concurrent.filter(|n| *n > 0),
                stall_timeout: self
                    .stall_timeout
                    .filter(|secs| *secs > 0)
                    .map(Duration::from_secs),
                ..EngineConfig::default()
            },
            session: SessionConfig {
                validity: Duration::from_secs(self.session_minutes.saturating_mul(60)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["pulldeck"]).unwrap();
        assert_eq!(cli.port, 8080);
        assert_eq!(cli.addr().to_string(), "0.0.0.0:8080");
        assert_eq!(cli.password(), (DEFAULT_PASSWORD, true));

        let config = cli.config();
        assert_eq!(config.engine.max_concurrent, None);
        assert_eq!(config.engine.stall_timeout, None);
        assert_eq!(config.session.validity, Duration::from_secs(30 * 60));
    }

    #[test]
    fn flags_populate_config() {
        let cli = Cli::try_parse_from([
            "pulldeck",
            "--port",
            "9000",
            "--bind",
            "127.0.0.1",
            "--password",
            "hunter2",
            "--session-minutes",
            "5",
            "--max-concurrent",
            "3",
            "--stall-timeout",
            "20",
        ])
        .unwrap();

        assert_eq!(cli.addr().to_string(), "127.0.0.1:9000");
        assert_eq!(cli.password(), ("hunter2", false));

        let config = cli.config();
        assert_eq!(config.engine.max_concurrent, Some(3));
        assert_eq!(config.engine.stall_timeout, Some(Duration::from_secs(20)));
        assert_eq!(config.session.validity, Duration::from_secs(300));
    }

    #[test]
    fn rejects_privileged_port() {
        assert!(Cli::try_parse_from(["pulldeck", "--port", "80"]).is_err());
        assert!(Cli::try_parse_from(["pulldeck", "--port", "70000"]).is_err());
    }
}
