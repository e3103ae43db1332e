// system-tests/src/config.rs
// ============================================================================
// Module: System Test Configuration
// Description: Environment-backed configuration for system tests.
// Purpose: Centralize env parsing with strict UTF-8 validation.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Environment values are parsed with strict UTF-8 enforcement to avoid silent
//! misconfiguration. Invalid UTF-8 fails closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

// ============================================================================
// SECTION: Environment Constants
// ============================================================================

/// Environment variable that widens the delivery wait window, in seconds.
pub const WAIT_SECS_ENV: &str = "WEBHOOK_RELAY_SYSTEM_TEST_WAIT_SEC";

/// Default wait window for webhook deliveries and queue settling.
const DEFAULT_DELIVERY_WAIT: Duration = Duration::from_secs(5);

// ============================================================================
// SECTION: Config Types
// ============================================================================

/// Typed system test configuration derived from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemTestConfig {
    /// How long suites wait for a webhook delivery before failing.
    pub delivery_wait: Duration,
}

impl SystemTestConfig {
    /// Loads configuration from environment variables.
    ///
    /// The wait override acts as a minimum so slow hosts can widen the
    /// window without ever shortening it below the default.
    ///
    /// # Errors
    ///
    /// Returns an error when an environment value is not valid UTF-8 or is
    /// not a positive integer number of seconds.
    pub fn load() -> Result<Self, String> {
        let delivery_wait = match read_env_strict(WAIT_SECS_ENV)? {
            Some(raw) => DEFAULT_DELIVERY_WAIT.max(parse_wait_seconds(&raw)?),
            None => DEFAULT_DELIVERY_WAIT,
        };
        Ok(Self {
            delivery_wait,
        })
    }
}

impl Default for SystemTestConfig {
    fn default() -> Self {
        Self {
            delivery_wait: DEFAULT_DELIVERY_WAIT,
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads an environment variable and enforces UTF-8 validity.
///
/// # Errors
///
/// Returns an error when the environment variable contains invalid UTF-8.
pub fn read_env_strict(name: &str) -> Result<Option<String>, String> {
    std::env::var_os(name).map_or(Ok(None), |raw| {
        raw.into_string().map(Some).map_err(|_| format!("{name} must be valid UTF-8"))
    })
}

/// Parses a positive wait value from an environment variable string.
fn parse_wait_seconds(raw: &str) -> Result<Duration, String> {
    let trimmed = raw.trim();
    let secs: u64 = trimmed
        .parse()
        .map_err(|_| format!("{WAIT_SECS_ENV} must be a positive integer number of seconds"))?;
    if secs == 0 {
        return Err(format!("{WAIT_SECS_ENV} must be greater than zero"));
    }
    Ok(Duration::from_secs(secs))
}
