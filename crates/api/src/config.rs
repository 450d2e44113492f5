use std::{env, time::Duration};

use tracing::warn;

pub const TIMEOUT_ENV: &str = "MPX_HTTP_TIMEOUT_SECS";
pub const CONNECT_TIMEOUT_ENV: &str = "MPX_HTTP_CONNECT_TIMEOUT_SECS";

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Settings for [`crate::HttpTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            user_agent: format!("mpx/{}; {}", env!("CARGO_PKG_VERSION"), env::consts::OS),
        }
    }
}

impl TransportConfig {
    /// Defaults overridden by `MPX_HTTP_TIMEOUT_SECS` and
    /// `MPX_HTTP_CONNECT_TIMEOUT_SECS`. Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            timeout: seconds_from_env(TIMEOUT_ENV).unwrap_or(defaults.timeout),
            connect_timeout: seconds_from_env(CONNECT_TIMEOUT_ENV).unwrap_or(defaults.connect_timeout),
            user_agent: defaults.user_agent,
        }
    }
}

fn seconds_from_env(name: &str) -> Option<Duration> {
    let raw = env::var(name).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => {
            warn!(variable = name, value = %raw, "ignoring invalid timeout override");
            None
        }
        Ok(seconds) => Some(Duration::from_secs(seconds)),
    }
}
