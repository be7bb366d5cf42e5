//! Web Push delivery configuration.

use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;

use crate::vapid::{DEFAULT_TOKEN_TTL, VapidAuthenticator, VapidKeys};
use crate::{PushError, Result};

/// Prefix shared by every environment variable read here.
pub const ENV_PREFIX: &str = "COURTSIDE";

/// Default message TTL: 24 hours.
pub const DEFAULT_TTL: u32 = 86400;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Default cap on in-flight requests per delivery.
pub const DEFAULT_MAX_CONCURRENCY: usize = 16;

/// Web Push configuration.
#[derive(Clone)]
pub struct WebPushConfig {
    /// VAPID private key (base64url raw scalar).
    pub vapid_private_key: String,
    /// VAPID public key (base64url uncompressed point). Derived when absent.
    pub vapid_public_key: Option<String>,
    /// Contact URI (`mailto:` or `https:`).
    pub subject: String,
    /// Default TTL in seconds.
    pub default_ttl: u32,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Maximum concurrent requests.
    pub max_concurrency: usize,
    /// Lifetime of signed VAPID tokens.
    pub token_ttl: Duration,
    /// User-Agent sent to push services.
    pub user_agent: String,
}

impl WebPushConfig {
    /// Create a new Web Push configuration.
    pub fn new(private_key: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            vapid_private_key: private_key.into(),
            vapid_public_key: None,
            subject: subject.into(),
            default_ttl: DEFAULT_TTL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            token_ttl: DEFAULT_TOKEN_TTL,
            user_agent: format!("courtside-push/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Set the public key.
    pub fn public_key(mut self, key: impl Into<String>) -> Self {
        self.vapid_public_key = Some(key.into());
        self
    }

    /// Set the default TTL.
    pub fn ttl(mut self, ttl: u32) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Set the per-request timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the concurrency cap.
    pub fn max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max;
        self
    }

    /// Set the VAPID token lifetime.
    pub fn token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// Set the User-Agent.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Load from `COURTSIDE_*` environment variables.
    ///
    /// `COURTSIDE_VAPID_PRIVATE_KEY` and `COURTSIDE_VAPID_SUBJECT` are
    /// required. `COURTSIDE_VAPID_PUBLIC_KEY`, `COURTSIDE_PUSH_TTL`,
    /// `COURTSIDE_PUSH_TIMEOUT_SECS` and `COURTSIDE_PUSH_CONCURRENCY` are
    /// optional.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(&format!("{}_{}", ENV_PREFIX, name)).filter(|v| !v.trim().is_empty())
        };
        let required = |name: &str| {
            var(name).ok_or_else(|| {
                PushError::Config(format!("{}_{} is not set", ENV_PREFIX, name))
            })
        };

        let mut config = Self::new(required("VAPID_PRIVATE_KEY")?, required("VAPID_SUBJECT")?);

        if let Some(key) = var("VAPID_PUBLIC_KEY") {
            config = config.public_key(key);
        }
        if let Some(ttl) = var("PUSH_TTL") {
            config = config.ttl(parse_number("PUSH_TTL", &ttl)?);
        }
        if let Some(secs) = var("PUSH_TIMEOUT_SECS") {
            config = config.request_timeout(Duration::from_secs(parse_number(
                "PUSH_TIMEOUT_SECS",
                &secs,
            )?));
        }
        if let Some(max) = var("PUSH_CONCURRENCY") {
            config = config.max_concurrency(parse_number("PUSH_CONCURRENCY", &max)?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document.
    ///
    /// ```toml
    /// vapid_private_key = "..."
    /// subject = "mailto:ops@example.com"
    /// request_timeout_secs = 10
    /// ```
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content)?;
        let config = file.into_config();
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Check settings that can be checked without decoding keys.
    pub fn validate(&self) -> Result<()> {
        if self.vapid_private_key.trim().is_empty() {
            return Err(PushError::Config("VAPID private key is empty".to_string()));
        }
        if !self.subject.starts_with("mailto:") && !self.subject.starts_with("https:") {
            return Err(PushError::Config(format!(
                "VAPID subject must be a mailto: or https: URI, got '{}'",
                self.subject
            )));
        }
        if self.max_concurrency == 0 {
            return Err(PushError::Config(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(PushError::Config(
                "request_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Decode the configured key pair.
    pub fn keys(&self) -> Result<VapidKeys> {
        VapidKeys::from_base64url(&self.vapid_private_key, self.vapid_public_key.as_deref())
    }

    /// Build the authenticator for these settings.
    pub fn authenticator(&self) -> Result<VapidAuthenticator> {
        self.validate()?;
        Ok(VapidAuthenticator::new(self.keys()?, self.subject.as_str()).token_ttl(self.token_ttl))
    }
}

impl std::fmt::Debug for WebPushConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebPushConfig")
            .field("vapid_private_key", &"<redacted>")
            .field("vapid_public_key", &self.vapid_public_key)
            .field("subject", &self.subject)
            .field("default_ttl", &self.default_ttl)
            .field("request_timeout", &self.request_timeout)
            .field("max_concurrency", &self.max_concurrency)
            .field("token_ttl", &self.token_ttl)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    vapid_private_key: String,
    vapid_public_key: Option<String>,
    subject: String,
    ttl: Option<u32>,
    request_timeout_secs: Option<u64>,
    max_concurrency: Option<usize>,
    token_ttl_secs: Option<u64>,
    user_agent: Option<String>,
}

impl ConfigFile {
    fn into_config(self) -> WebPushConfig {
        let mut config = WebPushConfig::new(self.vapid_private_key, self.subject);
        config.vapid_public_key = self.vapid_public_key;
        if let Some(ttl) = self.ttl {
            config.default_ttl = ttl;
        }
        if let Some(secs) = self.request_timeout_secs {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(max) = self.max_concurrency {
            config.max_concurrency = max;
        }
        if let Some(secs) = self.token_ttl_secs {
            config.token_ttl = Duration::from_secs(secs);
        }
        if let Some(user_agent) = self.user_agent {
            config.user_agent = user_agent;
        }
        config
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        PushError::Config(format!(
            "{}_{} must be a non-negative integer, got '{}'",
            ENV_PREFIX, name, value
        ))
    })
}
