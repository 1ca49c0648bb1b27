//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::time::Duration;

use campus_live::HubConfig;
use campus_shared::constants::{
    DEFAULT_EVENT_BUFFER, DEFAULT_HTTP_PORT, DEFAULT_STATS_INTERVAL_SECS, DEFAULT_TYPING_TTL_SECS,
};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// Human-readable name for this instance.
    /// Env: `INSTANCE_NAME`
    /// Default: `"Campus Live"`
    pub instance_name: String,

    /// Period of the system stats refresher.
    /// Env: `STATS_INTERVAL_SECS`
    /// Default: `5`
    pub stats_interval: Duration,

    /// Whether the stats refresher runs at all.
    /// Env: `SIMULATE_STATS` (true/false)
    /// Default: `true`
    pub simulate_stats: bool,

    /// How long a typing signal counts as "typing".
    /// Env: `TYPING_TTL_SECS`
    /// Default: `3`
    pub typing_ttl: Duration,

    /// Capacity of the async event mirror.
    /// Env: `EVENT_BUFFER`
    /// Default: `256`
    pub event_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            instance_name: campus_shared::constants::APP_NAME.to_string(),
            stats_interval: Duration::from_secs(DEFAULT_STATS_INTERVAL_SECS),
            simulate_stats: true,
            typing_ttl: Duration::from_secs(DEFAULT_TYPING_TTL_SECS),
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Some(name) = lookup("INSTANCE_NAME") {
            if !name.trim().is_empty() {
                config.instance_name = name;
            }
        }

        if let Some(val) = lookup("STATS_INTERVAL_SECS") {
            match parse_positive_secs(&val) {
                Some(interval) => config.stats_interval = interval,
                None => tracing::warn!(value = %val, "Invalid STATS_INTERVAL_SECS, using default"),
            }
        }

        if let Some(val) = lookup("SIMULATE_STATS") {
            config.simulate_stats = val != "false" && val != "0";
        }

        if let Some(val) = lookup("TYPING_TTL_SECS") {
            match parse_positive_secs(&val) {
                Some(ttl) => config.typing_ttl = ttl,
                None => tracing::warn!(value = %val, "Invalid TYPING_TTL_SECS, using default"),
            }
        }

        if let Some(val) = lookup("EVENT_BUFFER") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.event_buffer = n,
                _ => tracing::warn!(value = %val, "Invalid EVENT_BUFFER, using default"),
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }

    /// Settings handed to the hub.
    pub fn hub_config(&self) -> HubConfig {
        HubConfig {
            typing_ttl: self.typing_ttl,
            event_buffer: self.event_buffer,
        }
    }
}

fn parse_positive_secs(val: &str) -> Option<Duration> {
    match val.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8080).into());
        assert_eq!(config.stats_interval, Duration::from_secs(5));
        assert_eq!(config.typing_ttl, Duration::from_secs(3));
        assert!(config.simulate_stats);
    }

    #[test]
    fn test_overrides_from_lookup() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("HTTP_ADDR", "127.0.0.1:9000"),
            ("INSTANCE_NAME", "Robotics Society"),
            ("STATS_INTERVAL_SECS", "10"),
            ("SIMULATE_STATS", "false"),
            ("TYPING_TTL_SECS", "5"),
            ("EVENT_BUFFER", "64"),
        ]));

        assert_eq!(config.http_addr, ([127, 0, 0, 1], 9000).into());
        assert_eq!(config.instance_name, "Robotics Society");
        assert_eq!(config.stats_interval, Duration::from_secs(10));
        assert!(!config.simulate_stats);
        assert_eq!(config.hub_config().typing_ttl, Duration::from_secs(5));
        assert_eq!(config.hub_config().event_buffer, 64);
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("HTTP_ADDR", "not-an-addr"),
            ("STATS_INTERVAL_SECS", "0"),
            ("TYPING_TTL_SECS", "soon"),
            ("EVENT_BUFFER", "-1"),
        ]));

        assert_eq!(config.http_addr, ServerConfig::default().http_addr);
        assert_eq!(config.stats_interval, Duration::from_secs(5));
        assert_eq!(config.typing_ttl, Duration::from_secs(3));
        assert_eq!(config.event_buffer, 256);
    }
}
