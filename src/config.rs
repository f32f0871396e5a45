//! Client configuration.
//!
//! All transport behaviour is controlled through [`ClientConfig`], built via
//! its [`ClientConfigBuilder`]. The credential is resolved exactly once, when
//! a [`crate::DwsClient`] is constructed: an explicit key wins, otherwise the
//! [`API_KEY_ENV`] environment variable is consulted. The environment is never
//! re-read after that.

use crate::error::DwsError;
use std::fmt;
use std::time::Duration;

/// Environment variable consulted when no API key is configured explicitly.
pub const API_KEY_ENV: &str = "NUTRIENT_API_KEY";

/// Default service root.
pub const DEFAULT_BASE_URL: &str = "https://api.pspdfkit.com";

/// Configuration for a [`crate::DwsClient`].
///
/// # Example
/// ```rust
/// use nutrient_dws::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .api_key("pdf_live_...")
///     .timeout_secs(120)
///     .max_retries(5)
///     .build()
///     .unwrap();
/// assert_eq!(config.timeout_secs, 120);
/// ```
#[derive(Clone)]
pub struct ClientConfig {
    /// API key sent as a bearer credential. If None, falls back to
    /// [`API_KEY_ENV`] at client construction.
    pub api_key: Option<String>,

    /// Service root, without a trailing slash. Default: [`DEFAULT_BASE_URL`].
    pub base_url: String,

    /// Per-attempt request timeout in seconds. Default: 300.
    ///
    /// Applied to each attempt separately; a request that is retried three
    /// times may take up to four timeouts plus backoff in total.
    pub timeout_secs: u64,

    /// Additional attempts after the first on transient failures. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 1000.
    ///
    /// 1 s → 2 s → 4 s with the defaults.
    pub retry_backoff_ms: u64,

    /// Upper bound for a single backoff delay in milliseconds. Default: 120 000.
    pub max_backoff_ms: u64,

    /// `User-Agent` header value.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 300,
            max_retries: 3,
            retry_backoff_ms: 1000,
            max_backoff_ms: 120_000,
            user_agent: format!("nutrient-dws-rust/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("max_backoff_ms", &self.max_backoff_ms)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl ClientConfig {
    /// Create a new builder for `ClientConfig`.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self::default(),
        }
    }

    /// The per-attempt timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Resolve the credential: explicit key, else [`API_KEY_ENV`].
    ///
    /// Empty strings count as absent on both paths.
    pub(crate) fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty()))
    }

    /// Join `endpoint` onto the base URL.
    pub(crate) fn url_for(&self, endpoint: &str) -> String {
        let endpoint = endpoint.trim_start_matches('/');
        format!("{}/{}", self.base_url.trim_end_matches('/'), endpoint)
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn max_backoff_ms(mut self, ms: u64) -> Self {
        self.config.max_backoff_ms = ms;
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ClientConfig, DwsError> {
        let c = &self.config;
        if !(c.base_url.starts_with("http://") || c.base_url.starts_with("https://")) {
            return Err(DwsError::InvalidConfig(format!(
                "base URL must start with http:// or https://, got '{}'",
                c.base_url
            )));
        }
        if c.timeout_secs == 0 {
            return Err(DwsError::InvalidConfig("Timeout must be ≥ 1s".into()));
        }
        if c.user_agent.is_empty() {
            return Err(DwsError::InvalidConfig("User agent must not be empty".into()));
        }
        Ok(self.config)
    }
}
