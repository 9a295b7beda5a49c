//! Process configuration
//!
//! Two sources populate the same `Config`: command-line flags (the default)
//! or environment variables (`--config env`). Exactly one source is used
//! per run. Defaults match what earlier deployments relied on, including
//! the store key names.

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use envconfig::Envconfig;

use crate::error::{DistributorError, Result};
use crate::probe::ProbeConfig;

/// Which configuration source to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ConfigSource {
    /// Command-line flags
    Args,
    /// Environment variables
    Env,
}

/// Command-line flags.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "distributor",
    about = "work-to-worker distribution daemon",
    version
)]
pub struct Args {
    /// Which type of config to use
    #[arg(long = "config", value_enum, default_value = "args")]
    pub source: ConfigSource,

    /// Logs level
    #[arg(long = "log", default_value = "info")]
    pub log_level: String,

    /// Interval between reconciliation ticks, in milliseconds
    #[arg(long = "poll-interval-ms", default_value_t = 1000)]
    pub poll_interval_ms: u64,

    /// Per-probe deadline, in milliseconds
    #[arg(long = "ping-timeout-ms", default_value_t = 1000)]
    pub ping_timeout_ms: u64,

    /// Redis URL; use rediss:// and URL credentials for TLS and auth
    #[arg(long = "redis-url", default_value = "redis://127.0.0.1:6379")]
    pub redis_url: String,

    /// Comma-separated store keys holding the per-namespace worker lists
    #[arg(long = "workers-keys", default_value = "sys-robots-list,sys-parsers-list")]
    pub workers_keys: String,

    /// Store key holding the work-unit list
    #[arg(long = "units-key", default_value = "sys-channels")]
    pub units_key: String,

    /// Store key holding the matching-table hash
    #[arg(long = "table-key", default_value = "sys-matching-table")]
    pub table_key: String,

    /// Prometheus metrics port
    #[arg(long = "metrics-port", default_value_t = 9090)]
    pub metrics_port: u16,

    /// Probe keep-alive ping interval, in seconds
    #[arg(long = "ka-interval-secs", default_value_t = 10)]
    pub ka_interval_secs: u64,

    /// Probe keep-alive ping timeout, in seconds
    #[arg(long = "ka-timeout-secs", default_value_t = 20)]
    pub ka_timeout_secs: u64,

    /// Send keep-alive pings on idle probe connections
    #[arg(long = "ka-while-idle", default_value_t = false)]
    pub ka_while_idle: bool,
}

/// Environment variables, same knobs as the flags.
#[derive(Debug, Envconfig)]
pub struct EnvSettings {
    #[envconfig(from = "LOG", default = "info")]
    pub log_level: String,

    #[envconfig(from = "POLL_INTERVAL_MS", default = "1000")]
    pub poll_interval_ms: u64,

    #[envconfig(from = "PING_TIMEOUT_MS", default = "1000")]
    pub ping_timeout_ms: u64,

    #[envconfig(from = "REDIS_URL", default = "redis://127.0.0.1:6379")]
    pub redis_url: String,

    #[envconfig(from = "WORKERS_KEYS", default = "sys-robots-list,sys-parsers-list")]
    pub workers_keys: String,

    #[envconfig(from = "UNITS_KEY", default = "sys-channels")]
    pub units_key: String,

    #[envconfig(from = "TABLE_KEY", default = "sys-matching-table")]
    pub table_key: String,

    #[envconfig(from = "METRICS_PORT", default = "9090")]
    pub metrics_port: u16,

    #[envconfig(from = "KA_INTERVAL_SECS", default = "10")]
    pub ka_interval_secs: u64,

    #[envconfig(from = "KA_TIMEOUT_SECS", default = "20")]
    pub ka_timeout_secs: u64,

    #[envconfig(from = "KA_WHILE_IDLE", default = "false")]
    pub ka_while_idle: bool,
}

/// Resolved configuration, independent of its source.
#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub poll_interval_ms: u64,
    pub ping_timeout_ms: u64,
    pub redis_url: String,
    pub workers_keys: String,
    pub units_key: String,
    pub table_key: String,
    pub metrics_port: u16,
    pub ka_interval_secs: u64,
    pub ka_timeout_secs: u64,
    pub ka_while_idle: bool,
}

impl Config {
    /// Parse the command line, switching to environment variables when
    /// `--config env` is given. Errors here are fatal; the loop never
    /// starts on a bad configuration.
    pub fn load() -> Result<Self> {
        let args = Args::parse();
        match args.source {
            ConfigSource::Args => Ok(args.into()),
            ConfigSource::Env => EnvSettings::init_from_env()
                .map(Into::into)
                .map_err(|e| DistributorError::InvalidConfig {
                    reason: e.to_string(),
                }),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout_ms)
    }

    /// One control-loop namespace per workers-key entry.
    pub fn namespaces(&self) -> Vec<String> {
        self.workers_keys
            .split(',')
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn probe_config(&self) -> ProbeConfig {
        ProbeConfig {
            keepalive_interval: Duration::from_secs(self.ka_interval_secs),
            keepalive_timeout: Duration::from_secs(self.ka_timeout_secs),
            keepalive_while_idle: self.ka_while_idle,
        }
    }

    pub fn metrics_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.metrics_port))
    }
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            log_level: args.log_level,
            poll_interval_ms: args.poll_interval_ms,
            ping_timeout_ms: args.ping_timeout_ms,
            redis_url: args.redis_url,
            workers_keys: args.workers_keys,
            units_key: args.units_key,
            table_key: args.table_key,
            metrics_port: args.metrics_port,
            ka_interval_secs: args.ka_interval_secs,
            ka_timeout_secs: args.ka_timeout_secs,
            ka_while_idle: args.ka_while_idle,
        }
    }
}

impl From<EnvSettings> for Config {
    fn from(env: EnvSettings) -> Self {
        Self {
            log_level: env.log_level,
            poll_interval_ms: env.poll_interval_ms,
            ping_timeout_ms: env.ping_timeout_ms,
            redis_url: env.redis_url,
            workers_keys: env.workers_keys,
            units_key: env.units_key,
            table_key: env.table_key,
            metrics_port: env.metrics_port,
            ka_interval_secs: env.ka_interval_secs,
            ka_timeout_secs: env.ka_timeout_secs,
            ka_while_idle: env.ka_while_idle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_defaults() {
        let config: Config = Args::try_parse_from(["distributor"]).unwrap().into();

        assert_eq!(config.poll_interval(), Duration::from_millis(1000));
        assert_eq!(config.table_key, "sys-matching-table");
        assert_eq!(config.units_key, "sys-channels");
        assert_eq!(
            config.namespaces(),
            vec!["sys-robots-list".to_string(), "sys-parsers-list".to_string()]
        );
    }

    #[test]
    fn test_flag_overrides() {
        let config: Config = Args::try_parse_from([
            "distributor",
            "--workers-keys",
            "crawlers, indexers,",
            "--ping-timeout-ms",
            "250",
        ])
        .unwrap()
        .into();

        assert_eq!(config.ping_timeout(), Duration::from_millis(250));
        assert_eq!(
            config.namespaces(),
            vec!["crawlers".to_string(), "indexers".to_string()]
        );
    }
}
