//! # Runtime Configuration Module
//!
//! Environment-driven settings read once at startup.
//!
//! ## Environment Variables
//!
//! ### `SOL_ADDR`
//!
//! Listen address used when [`App::start`](crate::App::start) is called
//! without one. A leading `:` (as in `:8080`) binds all interfaces.
//!
//! Default: `:23719`
//!
//! ### `SOL_STACK_SIZE`
//!
//! Stack size of the coroutine serving each connection. Accepts decimal
//! (`32768`) or hexadecimal (`0x8000`).
//!
//! Default: `0x8000` (32 KB)
//!
//! ## Usage
//!
//! ```rust
//! use sol::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! println!("listening on {} with {} byte stacks", config.addr, config.stack_size);
//! ```

use std::env;

/// Listen address when neither an argument nor `SOL_ADDR` provides one.
pub const DEFAULT_ADDR: &str = ":23719";

/// Coroutine stack size when `SOL_STACK_SIZE` is unset or invalid.
pub const DEFAULT_STACK_SIZE: usize = 0x8000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Listen address, `host:port` or `:port`
    pub addr: String,
    /// Coroutine stack size in bytes
    pub stack_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let addr = env::var("SOL_ADDR")
            .ok()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let stack_size = env::var("SOL_STACK_SIZE")
            .ok()
            .and_then(|v| parse_stack_size(&v))
            .unwrap_or(DEFAULT_STACK_SIZE);
        Self { addr, stack_size }
    }
}

/// Parse a decimal or `0x`-prefixed hexadecimal size. Zero is rejected.
#[must_use]
pub fn parse_stack_size(raw: &str) -> Option<usize> {
    let raw = raw.trim();
    let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => raw.parse().ok(),
    };
    parsed.filter(|&n| n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stack_size() {
        assert_eq!(parse_stack_size("0x8000"), Some(0x8000));
        assert_eq!(parse_stack_size("0X10"), Some(16));
        assert_eq!(parse_stack_size(" 16384 "), Some(16384));
        assert_eq!(parse_stack_size("0"), None);
        assert_eq!(parse_stack_size("big"), None);
        assert_eq!(parse_stack_size("0xZZ"), None);
    }

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.addr, ":23719");
        assert_eq!(config.stack_size, 0x8000);
    }
}
