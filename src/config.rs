// Service configuration read from the environment

use std::path::PathBuf;
use std::time::Duration;

use crate::pricing::{PricingError, PricingResult};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_SNAPSHOT: &str = "pricing-snapshot.json";
const DEFAULT_CACHE_TTL_SECS: u64 = 60;

/// Runtime settings for the pricing service
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// JSON snapshot the in-memory catalog is loaded from
    pub snapshot_path: PathBuf,
    /// TTL of the cached category tree and pricing options
    pub cache_ttl: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            snapshot_path: PathBuf::from(DEFAULT_SNAPSHOT),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
        }
    }
}

impl AppConfig {
    /// Read HOST, PORT, PRICING_SNAPSHOT and REFERENCE_CACHE_TTL_SECS
    pub fn from_env() -> PricingResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> PricingResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| PricingError::InvalidConfiguration(format!("PORT must be a port number, got '{}'", raw)))?,
            None => defaults.port,
        };

        let cache_ttl = match lookup("REFERENCE_CACHE_TTL_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map(Duration::from_secs).map_err(|_| {
                PricingError::InvalidConfiguration(format!(
                    "REFERENCE_CACHE_TTL_SECS must be a number of seconds, got '{}'",
                    raw
                ))
            })?,
            None => defaults.cache_ttl,
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port,
            snapshot_path: lookup("PRICING_SNAPSHOT").map(PathBuf::from).unwrap_or(defaults.snapshot_path),
            cache_ttl,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
