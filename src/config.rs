//! Client configuration: credentials, region, and timeouts.
//!
//! [`Config::new`] is the programmatic entry point. [`Config::from_env`]
//! reads the same values from the process environment after loading a
//! `.env` file if one exists.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use dotenv::dotenv;
use tracing::{debug, error};

use crate::constants::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_REFRESH_MARGIN, DEFAULT_REQUEST_TIMEOUT};
use crate::error::{EzvizError, Result};
use crate::region::Region;

/// Application key/secret pair issued by the open platform console.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Application key (`appKey`).
    pub app_key: String,
    /// Application secret (`appSecret`).
    pub app_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("app_key", &self.app_key)
            .field("app_secret", &"<redacted>")
            .finish()
    }
}

/// Everything needed to build a [`crate::auth::TokenProvider`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Application credentials.
    pub credentials: Credentials,
    /// Regional deployment to talk to.
    pub region: Region,
    /// Overall timeout for a single HTTP request.
    pub request_timeout: Duration,
    /// TCP + TLS connect timeout.
    pub connect_timeout: Duration,
    /// How long before expiry a token is considered stale.
    pub refresh_margin: Duration,
}

impl Config {
    /// Builds a configuration with default timeouts.
    ///
    /// Fails with [`EzvizError::Config`] when either credential is empty or
    /// the region code is not one of the eight supported regions.
    pub fn new(app_key: &str, app_secret: &str, region: &str) -> Result<Self> {
        if app_key.trim().is_empty() {
            return Err(EzvizError::Config("app key must not be empty".to_string()));
        }
        if app_secret.trim().is_empty() {
            return Err(EzvizError::Config(
                "app secret must not be empty".to_string(),
            ));
        }
        Ok(Config {
            credentials: Credentials {
                app_key: app_key.to_string(),
                app_secret: app_secret.to_string(),
            },
            region: region.parse()?,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            refresh_margin: DEFAULT_REFRESH_MARGIN,
        })
    }

    /// Loads configuration from the environment.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `APP_KEY` (or `EZVIZ_APP_KEY`) | required |
    /// | `APP_SECRET` (or `EZVIZ_APP_SECRET`) | required |
    /// | `EZVIZ_REGION` | `cn` |
    /// | `EZVIZ_REQUEST_TIMEOUT_SECS` | 30 |
    /// | `EZVIZ_CONNECT_TIMEOUT_SECS` | 10 |
    /// | `EZVIZ_TOKEN_REFRESH_MARGIN_SECS` | 60 |
    pub fn from_env() -> Result<Self> {
        match dotenv() {
            Ok(path) => debug!("loaded environment from {}", path.display()),
            Err(e) => debug!("no .env file loaded: {e}"),
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`Config::from_env`] but reads variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let app_key = lookup("APP_KEY")
            .or_else(|| lookup("EZVIZ_APP_KEY"))
            .ok_or_else(|| EzvizError::Config("APP_KEY is not set".to_string()))?;
        let app_secret = lookup("APP_SECRET")
            .or_else(|| lookup("EZVIZ_APP_SECRET"))
            .ok_or_else(|| EzvizError::Config("APP_SECRET is not set".to_string()))?;
        let region = lookup("EZVIZ_REGION").unwrap_or_else(|| Region::default().to_string());

        let mut config = Config::new(&app_key, &app_secret, &region)?;
        config.request_timeout = secs_or_default(
            &lookup,
            "EZVIZ_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT,
        );
        config.connect_timeout = secs_or_default(
            &lookup,
            "EZVIZ_CONNECT_TIMEOUT_SECS",
            DEFAULT_CONNECT_TIMEOUT,
        );
        config.refresh_margin = secs_or_default(
            &lookup,
            "EZVIZ_TOKEN_REFRESH_MARGIN_SECS",
            DEFAULT_REFRESH_MARGIN,
        );
        Ok(config)
    }

    /// Overrides the request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Overrides the token refresh margin.
    #[must_use]
    pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
        self.refresh_margin = margin;
        self
    }
}

fn secs_or_default<F>(lookup: &F, name: &str, default: Duration) -> Duration
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) => match u64::from_str(raw.trim()) {
            Ok(secs) => Duration::from_secs(secs),
            Err(_) => {
                error!("Failed to parse {}: {}, using default", name, raw);
                default
            }
        },
        None => default,
    }
}
