use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Runtime configuration, sourced from the environment with defaults aimed at
/// local development.
#[derive(Debug, Clone)]
pub struct Config {
    pub listener: Listener,
    pub providers: Vec<ProviderConfig>,
    pub provider_timeout: Duration,
    pub cache_ttl: Duration,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listener {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub name: String,
    pub base_url: Url,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub rate: u32,
    pub window: Duration,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),

    #[error("invalid url in {0}: {1}")]
    InvalidUrl(&'static str, String),
}

const DEFAULT_PROVIDERS: &[(&str, &str, &str)] = &[
    ("provider1", "PROVIDER1_URL", "http://localhost:9001"),
    ("provider2", "PROVIDER2_URL", "http://localhost:9002"),
    ("provider3", "PROVIDER3_URL", "http://localhost:9003"),
];

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup("HOST")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "0.0.0.0".to_string());

        let mut providers = Vec::with_capacity(DEFAULT_PROVIDERS.len());
        for &(name, var, default) in DEFAULT_PROVIDERS {
            let raw = lookup(var)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string());
            let base_url = Url::parse(&raw)
                .map_err(|e| ConfigError::InvalidUrl(var, format!("{raw}: {e}")))?;
            providers.push(ProviderConfig {
                name: name.to_string(),
                base_url,
            });
        }

        Ok(Config {
            listener: Listener {
                host,
                port: parse_value(&lookup, "PORT", 8080u16)?,
            },
            providers,
            provider_timeout: Duration::from_millis(parse_value(
                &lookup,
                "PROVIDER_TIMEOUT_MS",
                2_000u64,
            )?),
            cache_ttl: Duration::from_secs(parse_value(&lookup, "CACHE_TTL_SECS", 30u64)?),
            rate_limit: RateLimitConfig {
                rate: parse_value(&lookup, "RATE_LIMIT", 10u32)?,
                window: Duration::from_secs(parse_value(&lookup, "RATE_WINDOW_SECS", 60u64)?),
            },
        })
    }
}

fn parse_value<T>(
    lookup: impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key).filter(|v| !v.is_empty()) {
        Some(raw) => raw
            .parse()
            .map_err(|e| ConfigError::InvalidValue(key, format!("{raw}: {e}"))),
        None => Ok(default),
    }
}
