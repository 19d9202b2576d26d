//! Access-token acquisition for the open platform.
//!
//! Tokens come from `POST /api/lapp/token/get` with the application
//! key/secret as form fields. The response carries the token, its absolute
//! expiry in epoch milliseconds, and for overseas regions the `areaDomain`
//! that must be used as the API host.
//!
//! `TokenProvider` caches the token. Consumers call [`TokenProvider::valid_token`],
//! which refreshes when no token is held or the held one is inside the
//! refresh margin.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{Config, Credentials};
use crate::constants::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_REFRESH_MARGIN, DEFAULT_REQUEST_TIMEOUT, SUCCESS_CODE,
    USER_AGENT,
};
use crate::envelope::{ResponseFormat, extract_code_and_message, remark_for};
use crate::error::{EzvizError, Result};
use crate::region::Region;

/// Remarks for codes the token endpoint is documented to return.
const TOKEN_REMARKS: &[(&str, &str)] = &[
    ("10001", "parameter empty or malformed"),
    ("10005", "appKey is frozen"),
    ("10017", "check that the appKey is correct"),
    ("10030", "appKey and appSecret do not match"),
    ("49999", "token endpoint failure"),
];

/// Lifetime assumed for tokens injected with [`TokenProvider::with_token`].
const INJECTED_TOKEN_LIFETIME: Duration = Duration::from_secs(7 * 24 * 3600);

/// Form body sent to the token endpoint.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest<'a> {
    app_key: &'a str,
    app_secret: &'a str,
}

/// The `data` block of a successful token response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessToken {
    /// Opaque token attached to every API call.
    pub access_token: String,
    /// Absolute expiry, epoch milliseconds.
    pub expire_time: i64,
    /// Regional API host, only returned outside mainland China.
    #[serde(default)]
    pub area_domain: Option<String>,
}

impl AccessToken {
    /// Expiry as a UTC timestamp, if `expire_time` is in range.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.expire_time)
    }

    /// `true` once `now_ms` has reached `expire_time - margin`.
    pub fn is_stale_at(&self, now_ms: i64, margin: Duration) -> bool {
        let margin_ms = i64::try_from(margin.as_millis()).unwrap_or(i64::MAX);
        now_ms >= self.expire_time.saturating_sub(margin_ms)
    }
}

pub(crate) fn build_http_client(
    request_timeout: Duration,
    connect_timeout: Duration,
) -> Result<Client> {
    Ok(Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(connect_timeout)
        .timeout(request_timeout)
        .build()?)
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Owns the credentials and the cached access token.
///
/// Invariants:
/// - `token` is `None` until the first successful refresh (or injection).
/// - `token()` returns `Some` only while the token is outside the refresh margin.
/// - A failed refresh leaves the previously cached token untouched.
pub struct TokenProvider {
    http: Client,
    credentials: Credentials,
    region: Region,
    token_url: String,
    refresh_margin: Duration,
    request_timeout: Duration,
    connect_timeout: Duration,
    token: Option<AccessToken>,
}

impl TokenProvider {
    /// Creates a provider for `config`. No network traffic happens here.
    pub fn new(config: &Config) -> Result<Self> {
        Ok(TokenProvider {
            http: build_http_client(config.request_timeout, config.connect_timeout)?,
            credentials: config.credentials.clone(),
            region: config.region,
            token_url: config.region.token_url(),
            refresh_margin: config.refresh_margin,
            request_timeout: config.request_timeout,
            connect_timeout: config.connect_timeout,
            token: None,
        })
    }

    /// Creates a provider holding a pre-set token valid for seven days.
    /// Used by tests to skip the token endpoint entirely.
    pub fn with_token(token: &str) -> Self {
        TokenProvider {
            http: Client::new(),
            credentials: Credentials {
                app_key: String::new(),
                app_secret: String::new(),
            },
            region: Region::Cn,
            token_url: Region::Cn.token_url(),
            refresh_margin: DEFAULT_REFRESH_MARGIN,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            token: Some(AccessToken {
                access_token: token.to_string(),
                expire_time: now_ms()
                    + i64::try_from(INJECTED_TOKEN_LIFETIME.as_millis()).unwrap_or(i64::MAX),
                area_domain: None,
            }),
        }
    }

    /// Points token requests at `url` instead of the region endpoint.
    #[must_use]
    pub fn with_token_url(mut self, url: &str) -> Self {
        self.token_url = url.to_string();
        self
    }

    /// Seeds the cache with `token`.
    #[must_use]
    pub fn with_cached_token(mut self, token: AccessToken) -> Self {
        self.token = Some(token);
        self
    }

    /// Overrides the region used for region-restricted endpoints and the
    /// default API base. The token URL is left as is.
    #[must_use]
    pub fn with_region(mut self, region: Region) -> Self {
        self.region = region;
        self
    }

    /// Rebuilds the HTTP client with a new request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.http = build_http_client(timeout, self.connect_timeout)?;
        self.request_timeout = timeout;
        Ok(self)
    }

    /// Region this provider authenticates against.
    pub fn region(&self) -> Region {
        self.region
    }

    /// Application key, needed by endpoints that echo it back.
    pub fn app_key(&self) -> &str {
        &self.credentials.app_key
    }

    /// Regional API host returned with the current token, if any.
    pub fn area_domain(&self) -> Option<&str> {
        self.token.as_ref().and_then(|t| t.area_domain.as_deref())
    }

    /// Expiry of the cached token, if any.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.token.as_ref().and_then(AccessToken::expires_at)
    }

    /// HTTP client configured with this provider's timeouts.
    pub(crate) fn http_client(&self) -> Client {
        self.http.clone()
    }

    /// Fetches a new token and caches it. Exactly one HTTP attempt.
    pub async fn refresh_token(&mut self) -> Result<()> {
        info!(region = %self.region, "requesting access token");
        let body = TokenRequest {
            app_key: &self.credentials.app_key,
            app_secret: &self.credentials.app_secret,
        };

        let response = self
            .http
            .post(&self.token_url)
            .form(&body)
            .send()
            .await
            .map_err(transport_failure)?;
        let status = response.status();
        let text = response.text().await.map_err(transport_failure)?;

        let value: Value = match serde_json::from_str(&text) {
            Ok(v) => v,
            Err(e) if status.is_success() => {
                return Err(EzvizError::Auth {
                    code: status.as_u16().to_string(),
                    message: "token response was not valid JSON".to_string(),
                    remark: String::new(),
                    source: Some(Box::new(e)),
                });
            }
            Err(_) => {
                warn!(%status, "token endpoint returned an HTTP error");
                return Err(EzvizError::Auth {
                    code: status.as_u16().to_string(),
                    message: text,
                    remark: "token endpoint returned an HTTP error".to_string(),
                    source: None,
                });
            }
        };

        let (code, message) = extract_code_and_message(&value, ResponseFormat::Code);
        let code = code.unwrap_or_default();
        if code != SUCCESS_CODE {
            warn!(code = %code, "access token request rejected: {message}");
            return Err(EzvizError::Auth {
                remark: remark_for(&code, TOKEN_REMARKS).to_string(),
                code,
                message,
                source: None,
            });
        }
        if !status.is_success() {
            return Err(EzvizError::Auth {
                code: status.as_u16().to_string(),
                message: text,
                remark: "token endpoint returned an HTTP error".to_string(),
                source: None,
            });
        }

        let data = value.get("data").cloned().unwrap_or(Value::Null);
        let token: AccessToken = serde_json::from_value(data).map_err(|e| EzvizError::Auth {
            code: code.clone(),
            message: message.clone(),
            remark: "token response carried no usable data".to_string(),
            source: Some(Box::new(e)),
        })?;

        debug!(
            expires_at = ?token.expires_at(),
            area_domain = ?token.area_domain,
            "access token acquired"
        );
        self.token = Some(token);
        Ok(())
    }

    /// Drops the cached token so the next [`valid_token`](Self::valid_token)
    /// refreshes.
    pub fn invalidate(&mut self) {
        self.token = None;
    }

    /// `true` if a token is held but is inside the refresh margin.
    /// `false` if no token is cached.
    fn is_expired(&self) -> bool {
        match &self.token {
            Some(token) => token.is_stale_at(now_ms(), self.refresh_margin),
            None => false,
        }
    }

    /// Cached token, or `None` if absent or stale.
    pub fn token(&self) -> Option<&str> {
        if self.is_expired() {
            return None;
        }
        self.token.as_ref().map(|t| t.access_token.as_str())
    }

    /// Returns a non-stale token, refreshing first when needed.
    pub async fn valid_token(&mut self) -> Result<String> {
        if self.token().is_none() {
            debug!("no usable access token cached; refreshing");
            self.refresh_token().await?;
        }
        self.token()
            .map(str::to_owned)
            .ok_or_else(|| EzvizError::Auth {
                code: SUCCESS_CODE.to_string(),
                message: "token endpoint returned a token inside the refresh margin".to_string(),
                remark: "lower the refresh margin".to_string(),
                source: None,
            })
    }
}

fn transport_failure(e: reqwest::Error) -> EzvizError {
    warn!("token request failed: {e}");
    EzvizError::Auth {
        code: "network".to_string(),
        message: e.to_string(),
        remark: "token endpoint unreachable".to_string(),
        source: Some(Box::new(e)),
    }
}
