//! Environment configuration and logging bootstrap.
//!
//! The bridge is loaded as a Python extension, so there is no `main` to set
//! up logging. Instead the module reads its settings from the environment
//! when it is imported.

use std::env;

use tracing_subscriber::EnvFilter;

/// Filter directives for the bridge's `tracing` output (e.g. `jscore=trace`)
pub const LOG_ENV: &str = "JSCORE_LOG";

/// Set to `0` or `false` to disable ANSI colours in log output
pub const LOG_ANSI_ENV: &str = "JSCORE_LOG_ANSI";

/// Settings read at import time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// `EnvFilter` directives. Logging stays off when unset.
    pub log_filter: Option<String>,

    /// Colourise log output.
    /// Default: true
    pub log_ansi: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            log_filter: None,
            log_ansi: true,
        }
    }
}

impl BridgeConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_vars(env::var(LOG_ENV).ok(), env::var(LOG_ANSI_ENV).ok())
    }

    fn from_vars(filter: Option<String>, ansi: Option<String>) -> Self {
        let log_filter = filter
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty());
        let log_ansi = match ansi.as_deref().map(str::trim) {
            Some(v) => !(v == "0" || v.eq_ignore_ascii_case("false")),
            None => true,
        };
        Self {
            log_filter,
            log_ansi,
        }
    }
}

/// Install a `fmt` subscriber when a filter is configured.
///
/// Returns `true` if this call installed the global subscriber. An embedding
/// application that already installed one keeps it.
pub fn init_logging(config: &BridgeConfig) -> bool {
    let Some(filter) = config.log_filter.as_deref() else {
        return false;
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_ansi(config.log_ansi)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::from_vars(None, None);
        assert_eq!(config, BridgeConfig::default());
        assert!(config.log_ansi);
        assert!(config.log_filter.is_none());
    }

    #[test]
    fn test_filter_is_trimmed() {
        let config = BridgeConfig::from_vars(Some("  jscore=trace ".into()), None);
        assert_eq!(config.log_filter.as_deref(), Some("jscore=trace"));
    }

    #[test]
    fn test_blank_filter_disables_logging() {
        let config = BridgeConfig::from_vars(Some("   ".into()), None);
        assert!(config.log_filter.is_none());
        assert!(!init_logging(&config));
    }

    #[test]
    fn test_ansi_switch() {
        assert!(!BridgeConfig::from_vars(None, Some("0".into())).log_ansi);
        assert!(!BridgeConfig::from_vars(None, Some("FALSE".into())).log_ansi);
        assert!(BridgeConfig::from_vars(None, Some("1".into())).log_ansi);
    }
}
