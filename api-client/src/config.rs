use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for the lab backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL every endpoint path is appended to
    pub api_base_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl ClientConfig {
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            ..Self::default()
        }
    }

    /// Load defaults, then `labdesk.toml` (optional), then `LABDESK_*`
    /// environment variables (a `.env` file is honoured).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Config`] when a source cannot be parsed or the
    /// resulting base URL is not a valid absolute URL.
    pub fn load() -> ApiResult<Self> {
        let _ = dotenvy::dotenv();

        let settings = config::Config::builder()
            .set_default("api_base_url", DEFAULT_BASE_URL)?
            .set_default("timeout_secs", i64::try_from(DEFAULT_TIMEOUT_SECS).unwrap_or(30))?
            .set_default("user_agent", default_user_agent())?
            .add_source(config::File::with_name("labdesk").required(false))
            .add_source(config::Environment::with_prefix("LABDESK").try_parsing(true))
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns [`ApiError::Config`] for a malformed base URL or a zero timeout.
    pub fn validate(&self) -> ApiResult<()> {
        let url = reqwest::Url::parse(&self.api_base_url)
            .map_err(|e| ApiError::Config(format!("Invalid api_base_url '{}': {e}", self.api_base_url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ApiError::Config(format!(
                "api_base_url must use http or https, got '{}'",
                url.scheme()
            )));
        }
        if self.timeout_secs == 0 {
            return Err(ApiError::Config("timeout_secs must be greater than zero".to_string()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: default_user_agent(),
        }
    }
}

fn default_user_agent() -> String {
    format!("labdesk/{}", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.base_url(), "http://localhost:8080/api");
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let config = ClientConfig::new("https://lab.example.com/api/");
        assert_eq!(config.base_url(), "https://lab.example.com/api");
    }

    #[test]
    fn test_rejects_relative_url() {
        assert!(matches!(ClientConfig::new("/api").validate(), Err(ApiError::Config(_))));
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        assert!(ClientConfig::new("ftp://lab.example.com").validate().is_err());
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let config = ClientConfig {
            timeout_secs: 0,
            ..ClientConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
