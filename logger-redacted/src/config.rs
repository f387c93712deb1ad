// Logger configuration
use serde::{Deserialize, Serialize};

/// Default filter when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str =
    "labdesk=info,api_client=info,lab_api=info,workflow_engine=info,data_provider=info,reqwest=info";

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable, for terminals during development
    Pretty,
    /// One JSON object per line, for production collectors
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerConfig {
    pub redaction_enabled: bool,
    pub log_level: String,
    pub format: LogFormat,
}

impl LoggerConfig {
    /// Build the configuration from `LABDESK_*` environment variables.
    ///
    /// `LABDESK_ENV=production` switches to JSON output; `verbose` lowers the
    /// default filter to debug.
    pub fn from_env(verbose: bool) -> Self {
        let is_production = std::env::var("LABDESK_ENV")
            .map(|env| env.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let redaction_enabled = std::env::var("LABDESK_LOG_REDACTION")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(true);

        let log_level = std::env::var("LABDESK_LOG_LEVEL").unwrap_or_else(|_| {
            if verbose {
                DEFAULT_LOG_FILTER.replace("=info", "=debug")
            } else {
                DEFAULT_LOG_FILTER.to_string()
            }
        });

        Self {
            redaction_enabled,
            log_level,
            format: if is_production { LogFormat::Json } else { LogFormat::Pretty },
        }
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            redaction_enabled: true,
            log_level: DEFAULT_LOG_FILTER.to_string(),
            format: LogFormat::Pretty,
        }
    }
}
