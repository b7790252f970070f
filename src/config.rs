//! Configuration Module
//!
//! Handles loading and managing cache and server configuration from
//! environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

// == Capacity Policy ==
/// What tenant creation does when eviction cannot bring the cache back
/// under its tenant-count or memory bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CapacityPolicy {
    /// Create the tenant anyway and log a warning
    #[default]
    Overcommit,
    /// Refuse to create the tenant with `CacheError::CapacityExceeded`
    Strict,
}

impl FromStr for CapacityPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "overcommit" => Ok(Self::Overcommit),
            "strict" => Ok(Self::Strict),
            other => Err(format!("unknown capacity policy '{}'", other)),
        }
    }
}

// == Cache Config ==
/// Limits and TTLs applied by the cache manager and its per-tenant stores.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of tenants held at once
    pub max_tenants: usize,
    /// Upper bound on the summed entry count of all tenants (memory proxy)
    pub max_estimated_entries: usize,
    /// Session ceiling per tenant before the oldest 20% are evicted
    pub max_sessions_per_tenant: usize,
    /// Staleness window for the content store
    pub content_ttl: Duration,
    /// Staleness window for fingerprints, visits and belief records
    pub user_state_ttl: Duration,
    /// Lifetime of a session record
    pub session_ttl: Duration,
    /// Staleness window for rendered HTML fragments
    pub html_ttl: Duration,
    /// TTL for bins of the hour that is still in progress
    pub current_hour_bin_ttl: Duration,
    /// TTL for bins of hours that have fully elapsed
    pub closed_hour_bin_ttl: Duration,
    /// TTL for computed aggregates (lead metrics, dashboard)
    pub aggregate_ttl: Duration,
    /// Hours of hourly bins kept by the sweep
    pub analytics_retention_hours: u32,
    /// Behaviour when eviction cannot restore capacity
    pub capacity_policy: CapacityPolicy,
}

impl CacheConfig {
    /// Loads cache limits from environment variables, falling back to defaults.
    ///
    /// # Environment Variables
    /// - `MAX_TENANTS` (default: 100)
    /// - `MAX_ESTIMATED_ENTRIES` (default: 1000000)
    /// - `MAX_SESSIONS_PER_TENANT` (default: 10000)
    /// - `CONTENT_TTL`, `USER_STATE_TTL`, `SESSION_TTL`, `HTML_TTL` in seconds
    /// - `CURRENT_HOUR_BIN_TTL`, `CLOSED_HOUR_BIN_TTL`, `AGGREGATE_TTL` in seconds
    /// - `ANALYTICS_RETENTION_HOURS` (default: 672)
    /// - `CAPACITY_POLICY` - `overcommit` or `strict` (default: overcommit)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_tenants: env_or("MAX_TENANTS", defaults.max_tenants),
            max_estimated_entries: env_or("MAX_ESTIMATED_ENTRIES", defaults.max_estimated_entries),
            max_sessions_per_tenant: env_or(
                "MAX_SESSIONS_PER_TENANT",
                defaults.max_sessions_per_tenant,
            ),
            content_ttl: env_secs_or("CONTENT_TTL", defaults.content_ttl),
            user_state_ttl: env_secs_or("USER_STATE_TTL", defaults.user_state_ttl),
            session_ttl: env_secs_or("SESSION_TTL", defaults.session_ttl),
            html_ttl: env_secs_or("HTML_TTL", defaults.html_ttl),
            current_hour_bin_ttl: env_secs_or("CURRENT_HOUR_BIN_TTL", defaults.current_hour_bin_ttl),
            closed_hour_bin_ttl: env_secs_or("CLOSED_HOUR_BIN_TTL", defaults.closed_hour_bin_ttl),
            aggregate_ttl: env_secs_or("AGGREGATE_TTL", defaults.aggregate_ttl),
            analytics_retention_hours: env_or(
                "ANALYTICS_RETENTION_HOURS",
                defaults.analytics_retention_hours,
            ),
            capacity_policy: env_or("CAPACITY_POLICY", defaults.capacity_policy),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_tenants: 100,
            max_estimated_entries: 1_000_000,
            max_sessions_per_tenant: 10_000,
            content_ttl: Duration::from_secs(24 * 3600),
            user_state_ttl: Duration::from_secs(2 * 3600),
            session_ttl: Duration::from_secs(24 * 3600),
            html_ttl: Duration::from_secs(3600),
            current_hour_bin_ttl: Duration::from_secs(15 * 60),
            closed_hour_bin_ttl: Duration::from_secs(30 * 24 * 3600),
            aggregate_ttl: Duration::from_secs(5 * 60),
            analytics_retention_hours: 28 * 24,
            capacity_policy: CapacityPolicy::Overcommit,
        }
    }
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port for the admin API
    pub server_port: u16,
    /// Interval in seconds between expiry sweeps
    pub sweep_interval: u64,
    /// Interval in seconds between connection cleanup hook runs
    pub connection_cleanup_interval: u64,
    /// Cache limits and TTLs
    pub cache: CacheConfig,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `SWEEP_INTERVAL` - Expiry sweep frequency in seconds (default: 300)
    /// - `CONNECTION_CLEANUP_INTERVAL` - Cleanup hook frequency in seconds (default: 60)
    /// - see [`CacheConfig::from_env`] for cache limits
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: env_or("SERVER_PORT", defaults.server_port),
            sweep_interval: env_or("SWEEP_INTERVAL", defaults.sweep_interval),
            connection_cleanup_interval: env_or(
                "CONNECTION_CLEANUP_INTERVAL",
                defaults.connection_cleanup_interval,
            ),
            cache: CacheConfig::from_env(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            sweep_interval: 300,
            connection_cleanup_interval: 60,
            cache: CacheConfig::default(),
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_secs_or(name: &str, default: Duration) -> Duration {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}
