//! Daemon configuration loaded from the environment.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

use crate::analytics::AnalyticsConfig;
use crate::history::HistoryConfig;
use crate::storage::StorageConfig;

/// Top-level configuration for the daemon
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub history: HistoryConfig,
    pub analytics: AnalyticsConfig,
    pub bind_addr: IpAddr,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            history: HistoryConfig::default(),
            analytics: AnalyticsConfig::default(),
            bind_addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 5000,
        }
    }
}

impl AppConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source; invalid values keep their default
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let storage_path = match lookup("STORAGE_PATH") {
            Some(path) if !path.trim().is_empty() => path,
            _ => defaults.storage.path.clone(),
        };
        let cache_size: u64 =
            parse_var(&lookup, "STORAGE_CACHE_BYTES", defaults.storage.cache_size);
        let flush_interval_ms: u64 = parse_var(
            &lookup,
            "STORAGE_FLUSH_INTERVAL_MS",
            defaults.storage.flush_interval_ms,
        );
        let storage = StorageConfig::new(storage_path)
            .with_cache_size(cache_size)
            .with_flush_interval_ms(flush_interval_ms);

        let max_versions =
            parse_var(&lookup, "MAX_VERSIONS_PER_DOC", defaults.history.max_versions_per_doc);
        let max_versions = if max_versions == 0 {
            warn!("MAX_VERSIONS_PER_DOC must be at least 1, using default");
            defaults.history.max_versions_per_doc
        } else {
            max_versions
        };

        let retention_days: u64 = parse_var(&lookup, "TRASH_RETENTION_DAYS", 30);
        let snapshot_debounce_ms: u64 = parse_var(&lookup, "SNAPSHOT_DEBOUNCE_MS", 2000);
        let sweep_secs: u64 = parse_var(&lookup, "TRASH_SWEEP_INTERVAL_SECS", 3600);

        let history = defaults
            .history
            .clone()
            .with_max_versions(max_versions)
            .with_trash_retention_days(retention_days)
            .with_snapshot_debounce(Duration::from_millis(snapshot_debounce_ms))
            // tokio intervals panic on a zero period
            .with_trash_sweep_interval(Duration::from_secs(sweep_secs.max(1)));

        let analytics_debounce_ms: u64 = parse_var(&lookup, "ANALYTICS_DEBOUNCE_MS", 5000);
        let analytics = defaults
            .analytics
            .clone()
            .with_debounce(Duration::from_millis(analytics_debounce_ms));

        Self {
            storage,
            history,
            analytics,
            bind_addr: parse_var(&lookup, "BIND_ADDR", defaults.bind_addr),
            port: parse_var(&lookup, "PORT", defaults.port),
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!("Ignoring invalid {}={:?}, using default", name, raw);
                default
            }
        },
        None => default,
    }
}
