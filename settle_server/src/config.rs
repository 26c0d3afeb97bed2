use std::{env, time::Duration};

use log::*;
use settle_common::{
    helpers::{env_parse, env_seconds},
    Secret,
};
use settle_engine::{HubConfig, MonitorConfig};

const DEFAULT_SETTLE_HOST: &str = "127.0.0.1";
const DEFAULT_SETTLE_PORT: u16 = 8470;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/settle.db";
const DEFAULT_RELAY_URL: &str = "http://127.0.0.1:8480";
const DEFAULT_RECONCILE_INTERVAL: Duration = Duration::from_secs(30);
const DEFAULT_CHAIN_QUERY_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_WS_QUEUE_SIZE: usize = 64;
const DEFAULT_EVENT_BUFFER: usize = 256;

/// The header the chain relay puts its base64 HMAC-SHA256 body signature in.
pub const RELAY_HMAC_HEADER: &str = "X-Settle-Hmac-SHA256";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Base URL of the chain relay. Bill totals are read from `{relay_url}/bills/{id}/total_paid`.
    pub relay_url: String,
    /// The secret the relay signs webhook bodies with. When empty, signatures are not checked at all.
    pub relay_hmac_secret: Secret<String>,
    /// The time between reconciliation sweeps.
    pub reconcile_interval: Duration,
    /// How long a single chain total query may take before the bill is skipped for this sweep.
    pub chain_query_timeout: Duration,
    /// The number of outbound messages buffered per WebSocket connection. Connections that fall this far behind are
    /// dropped.
    pub ws_queue_size: usize,
    /// The number of raw payment logs buffered between the relay webhook and the payment monitor.
    pub event_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SETTLE_HOST.to_string(),
            port: DEFAULT_SETTLE_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            relay_url: DEFAULT_RELAY_URL.to_string(),
            relay_hmac_secret: Secret::default(),
            reconcile_interval: DEFAULT_RECONCILE_INTERVAL,
            chain_query_timeout: DEFAULT_CHAIN_QUERY_TIMEOUT,
            ws_queue_size: DEFAULT_WS_QUEUE_SIZE,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("SETTLE_HOST").ok().unwrap_or_else(|| DEFAULT_SETTLE_HOST.into());
        let port = env::var("SETTLE_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for SETTLE_PORT. {e} Using the default, {DEFAULT_SETTLE_PORT}, \
                         instead."
                    );
                    DEFAULT_SETTLE_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_SETTLE_PORT);
        let database_url = env::var("SETTLE_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ SETTLE_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.into()
        });
        let relay_url = env::var("SETTLE_RELAY_URL")
            .map(|s| s.trim_end_matches('/').to_string())
            .ok()
            .unwrap_or_else(|| DEFAULT_RELAY_URL.into());
        let relay_hmac_secret = Secret::new(env::var("SETTLE_RELAY_HMAC_SECRET").ok().unwrap_or_default());
        if !relay_hmac_secret.is_set() {
            warn!(
                "🪛️ SETTLE_RELAY_HMAC_SECRET is not set. Relay webhooks will NOT be authenticated. Do not run like \
                 this in production."
            );
        }
        let reconcile_interval = duration_or_default("SETTLE_RECONCILE_INTERVAL", DEFAULT_RECONCILE_INTERVAL);
        let chain_query_timeout = duration_or_default("SETTLE_CHAIN_QUERY_TIMEOUT", DEFAULT_CHAIN_QUERY_TIMEOUT);
        let ws_queue_size = size_or_default("SETTLE_WS_QUEUE_SIZE", DEFAULT_WS_QUEUE_SIZE);
        let event_buffer = size_or_default("SETTLE_EVENT_BUFFER", DEFAULT_EVENT_BUFFER);
        Self {
            host,
            port,
            database_url,
            relay_url,
            relay_hmac_secret,
            reconcile_interval,
            chain_query_timeout,
            ws_queue_size,
            event_buffer,
        }
    }

    pub fn hmac_checks_enabled(&self) -> bool {
        self.relay_hmac_secret.is_set()
    }

    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            reconcile_interval: self.reconcile_interval,
            query_timeout: self.chain_query_timeout,
            ..MonitorConfig::default()
        }
    }

    pub fn hub_config(&self) -> HubConfig {
        HubConfig { outbound_queue_size: self.ws_queue_size, ..HubConfig::default() }
    }
}

fn duration_or_default(name: &str, default: Duration) -> Duration {
    if env::var(name).is_err() {
        return default;
    }
    env_seconds(name).unwrap_or_else(|e| {
        error!("🪛️ {e}. Using the default of {}s instead.", default.as_secs());
        default
    })
}

fn size_or_default(name: &str, default: usize) -> usize {
    if env::var(name).is_err() {
        return default;
    }
    match env_parse::<usize>(name) {
        Ok(0) => {
            error!("🪛️ {name} must be greater than zero. Using the default of {default} instead.");
            default
        },
        Ok(n) => n,
        Err(e) => {
            error!("🪛️ {e}. Using the default of {default} instead.");
            default
        },
    }
}
