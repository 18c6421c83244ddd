use std::{env, fmt::Display, str::FromStr, time::Duration};

use gm_common::{
    helpers::{parse_setting, ParsedSetting},
    Secret,
};
use gophermart_engine::{sqlite::db::SQLITE_DB_URL, PollerConfig};
use log::*;

use crate::cli::Arguments;

const DEFAULT_GM_HOST: &str = "127.0.0.1";
const DEFAULT_GM_PORT: u16 = 8000;
const DEFAULT_ACCRUAL_ADDRESS: &str = "http://127.0.0.1:8080";
const DEFAULT_ACCRUAL_TIMEOUT_SECS: u64 = 10;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 25;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// The connection string for the settlement store. May carry credentials, so it is never logged.
    pub database_url: Secret<String>,
    pub db_max_connections: u32,
    /// Base URL of the accrual system.
    pub accrual_address: String,
    /// Per-request timeout for calls to the accrual system.
    pub accrual_timeout: Duration,
    pub poller: PollerConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_GM_HOST.to_string(),
            port: DEFAULT_GM_PORT,
            database_url: Secret::from(SQLITE_DB_URL),
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            accrual_address: DEFAULT_ACCRUAL_ADDRESS.to_string(),
            accrual_timeout: Duration::from_secs(DEFAULT_ACCRUAL_TIMEOUT_SECS),
            poller: PollerConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let defaults = Self::default();
        let (host, port) = match env::var("RUN_ADDRESS").ok() {
            Some(addr) => parse_run_address(&addr).unwrap_or_else(|e| {
                error!("🪛️ {e} Using the default, {DEFAULT_GM_HOST}:{DEFAULT_GM_PORT}, instead.");
                (defaults.host.clone(), defaults.port)
            }),
            None => (defaults.host.clone(), defaults.port),
        };
        let database_url = env::var("DATABASE_URI").map(Secret::new).unwrap_or_else(|_| {
            warn!("🪛️ DATABASE_URI is not set. Using the default database at {SQLITE_DB_URL}.");
            defaults.database_url.clone()
        });
        let accrual_address = env::var("ACCRUAL_SYSTEM_ADDRESS").unwrap_or_else(|_| {
            warn!("🪛️ ACCRUAL_SYSTEM_ADDRESS is not set. Using the default, {DEFAULT_ACCRUAL_ADDRESS}.");
            defaults.accrual_address.clone()
        });
        let db_max_connections = env_setting("GM_DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS);
        let accrual_timeout = Duration::from_secs(env_setting("GM_ACCRUAL_TIMEOUT_SECS", DEFAULT_ACCRUAL_TIMEOUT_SECS));
        let poller = poller_config_from_env(defaults.poller);
        Self { host, port, database_url, db_max_connections, accrual_address, accrual_timeout, poller }
    }

    /// Applies the values given on the command line. These take precedence over the environment.
    pub fn with_overrides(mut self, args: &Arguments) -> Self {
        if let Some(addr) = &args.run_address {
            match parse_run_address(addr) {
                Ok((host, port)) => {
                    self.host = host;
                    self.port = port;
                },
                Err(e) => error!("🪛️ Ignoring the -a flag. {e}"),
            }
        }
        if let Some(url) = &args.database_uri {
            self.database_url = Secret::new(url.clone());
        }
        if let Some(addr) = &args.accrual_address {
            self.accrual_address = addr.clone();
        }
        if let Some(workers) = args.workers {
            // An explicit queue capacity survives a change in worker count
            let capacity = self.poller.queue_capacity;
            let explicit_capacity = capacity != 2 * self.poller.workers;
            self.poller = self.poller.with_workers(workers);
            if explicit_capacity {
                self.poller = self.poller.with_queue_capacity(capacity);
            }
        }
        self
    }
}

fn poller_config_from_env(defaults: PollerConfig) -> PollerConfig {
    let workers = env_setting("GM_POLL_WORKERS", defaults.workers);
    let mut config = defaults.with_workers(workers);
    if env::var("GM_POLL_QUEUE_CAPACITY").is_ok() {
        let capacity = env_setting("GM_POLL_QUEUE_CAPACITY", config.queue_capacity);
        config = config.with_queue_capacity(capacity);
    }
    let fallback = env_setting("GM_RATE_LIMIT_FALLBACK_SECS", config.rate_limit_fallback.as_secs());
    let retry_ms = env_setting("GM_POLL_RETRY_INTERVAL_MS", config.retry_interval.as_millis() as u64);
    config.with_rate_limit_fallback(Duration::from_secs(fallback)).with_retry_interval(Duration::from_millis(retry_ms))
}

/// Reads a typed setting from the environment, logging and falling back to `default` when the value is malformed.
fn env_setting<T>(name: &str, default: T) -> T
where
    T: FromStr + Display + Clone,
    T::Err: Display,
{
    match parse_setting(env::var(name).ok(), default.clone()) {
        ParsedSetting::Missing(v) => {
            debug!("🪛️ {name} is not set. Using the default, {v}.");
            v
        },
        ParsedSetting::Parsed(v) => v,
        ParsedSetting::Invalid(v, e) => {
            error!("🪛️ The value for {name} is invalid. {e} Using the default, {v}, instead.");
            v
        },
    }
}

/// Splits a `host:port` address. The host may be empty, in which case the default host is used.
pub fn parse_run_address(addr: &str) -> Result<(String, u16), String> {
    let addr = addr.trim();
    let (host, port) =
        addr.rsplit_once(':').ok_or_else(|| format!("{addr} is not a valid run address. Expected host:port."))?;
    let port = port.parse::<u16>().map_err(|e| format!("{port} is not a valid port in {addr}. {e}."))?;
    let host = if host.is_empty() { DEFAULT_GM_HOST } else { host };
    Ok((host.to_string(), port))
}
