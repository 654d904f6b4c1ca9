//! # Runtime Configuration Module
//!
//! Tunables for the router's diagnostics, loaded from environment variables
//! or a TOML document.
//!
//! ## Environment Variables
//!
//! ### `BRRTW_SLOW_MATCH_US`
//!
//! Route matches slower than this many microseconds are logged at `warn`
//! instead of `info`. Accepts decimal (`1000`) or hexadecimal (`0x3e8`).
//!
//! Default: `1000`
//!
//! ### `BRRTW_LOG_ROUTE_TABLE`
//!
//! Whether [`Router::log_routes`](crate::router::Router::log_routes) emits
//! the route table. Accepts `true`/`false`, `1`/`0`, `yes`/`no`, `on`/`off`.
//!
//! Default: `true`
//!
//! ## TOML
//!
//! ```toml
//! slow_match_threshold_us = 250
//! log_route_table = false
//! ```
//!
//! Missing keys take their defaults.
//!
//! ## Usage
//!
//! ```rust
//! use brrtwire::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_toml_str("slow_match_threshold_us = 0x10").unwrap();
//! assert_eq!(config.slow_match_threshold_us, 16);
//! assert!(config.log_route_table);
//!
//! let from_env = RuntimeConfig::from_env();
//! println!("slow match threshold: {}us", from_env.slow_match_threshold_us);
//! ```

use std::env;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

pub const DEFAULT_SLOW_MATCH_US: u64 = 1000;

/// Runtime configuration for the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Matches slower than this (microseconds) are logged as slow.
    pub slow_match_threshold_us: u64,
    /// Emit the route table when `log_routes` / `dump_routes` is called.
    pub log_route_table: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            slow_match_threshold_us: DEFAULT_SLOW_MATCH_US,
            log_route_table: true,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables. Unset or unparsable
    /// values fall back to their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let slow_match_threshold_us = env::var("BRRTW_SLOW_MATCH_US")
            .ok()
            .and_then(|val| parse_u64(&val))
            .unwrap_or(defaults.slow_match_threshold_us);
        let log_route_table = env::var("BRRTW_LOG_ROUTE_TABLE")
            .ok()
            .and_then(|val| parse_bool(&val))
            .unwrap_or(defaults.log_route_table);
        RuntimeConfig {
            slow_match_threshold_us,
            log_route_table,
        }
    }

    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).context("Failed to parse runtime config")
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read runtime config {}", path.display()))?;
        Self::from_toml_str(&source)
            .with_context(|| format!("Invalid runtime config {}", path.display()))
    }
}

/// Decimal, or hexadecimal with a `0x` prefix.
pub(crate) fn parse_u64(val: &str) -> Option<u64> {
    let val = val.trim();
    match val.strip_prefix("0x").or_else(|| val.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => val.parse().ok(),
    }
}

pub(crate) fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
