//! Bridge configuration from environment variables

use anyhow::{anyhow, Context, Result};
use std::time::Duration;
use url::Url;

const DEFAULT_REGISTRY_URL: &str = "http://traccar:8082";
const DEFAULT_ROUTE_KEYWORD: &str = "yb";
const DEFAULT_FEED_URL: &str = "https://yb.tl";
const DEFAULT_INTERVAL_SECS: u64 = 60;

/// Osmand protocol port on the ingestion server
const INGEST_PORT: u16 = 5055;

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the device registry (Traccar API)
    pub registry_url: String,

    /// Registry basic-auth credentials
    pub registry_user: String,
    pub registry_password: String,

    /// Device attribute keyword marking a tracked vehicle
    pub route_keyword: String,

    /// How often to refresh routes from the registry
    pub registry_interval: Duration,

    /// How often each race feed is fetched
    pub feed_interval: Duration,

    /// Osmand ingestion endpoint fixes are posted to
    pub ingest_url: String,

    /// Base URL of the upstream position feed
    pub feed_url: String,
}

impl Config {
    /// Build the configuration from environment variables, falling back
    /// to defaults. `INGEST_URL` defaults to the registry host on the
    /// Osmand port.
    pub fn from_env() -> Result<Self> {
        let registry_url = env_or("REGISTRY_URL", DEFAULT_REGISTRY_URL);
        let ingest_url = match std::env::var("INGEST_URL") {
            Ok(url) => url,
            Err(_) => derive_ingest_url(&registry_url)?,
        };

        Ok(Self {
            registry_user: env_or("REGISTRY_USER", ""),
            registry_password: env_or("REGISTRY_PASSWORD", ""),
            route_keyword: env_or("ROUTE_KEYWORD", DEFAULT_ROUTE_KEYWORD),
            registry_interval: interval_from_env("REGISTRY_INTERVAL")?,
            feed_interval: interval_from_env("FEED_INTERVAL")?,
            feed_url: env_or("FEED_URL", DEFAULT_FEED_URL),
            registry_url,
            ingest_url,
        })
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn interval_from_env(name: &str) -> Result<Duration> {
    let secs = match std::env::var(name) {
        Ok(value) => value
            .parse::<u64>()
            .with_context(|| format!("{name} must be a whole number of seconds"))?,
        Err(_) => DEFAULT_INTERVAL_SECS,
    };
    Ok(Duration::from_secs(secs))
}

/// Rewrite the registry URL to the Osmand ingestion endpoint: plain http,
/// same host, port 5055, no path.
pub fn derive_ingest_url(registry_url: &str) -> Result<String> {
    let mut url = Url::parse(registry_url)
        .with_context(|| format!("invalid registry URL: {registry_url}"))?;
    url.set_scheme("http")
        .map_err(|_| anyhow!("cannot rewrite scheme of {registry_url}"))?;
    url.set_port(Some(INGEST_PORT))
        .map_err(|_| anyhow!("cannot set port on {registry_url}"))?;
    url.set_path("");
    Ok(url.to_string().trim_end_matches('/').to_string())
}
