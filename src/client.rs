//! Authenticated HTTP client for the open platform.
//!
//! `EzvizClient` wraps a `reqwest::Client` and a `TokenProvider` behind a
//! `Mutex`. Endpoint modules (`devices`, `ptz`, `upgrade`) build their
//! parameters and hand them to [`EzvizClient::call`] (form or query fields)
//! or [`EzvizClient::call_with_headers`] (header fields, optional JSON body),
//! which attach the token, pick the base URL, and map the envelope.
//!
//! Token lifecycle:
//! - Lazy acquisition: the first call that finds no usable token refreshes.
//!   [`EzvizClient::connect`] does this eagerly so bad credentials fail at
//!   construction.
//! - The mutex is held across check-and-refresh, so concurrent callers
//!   trigger at most one refresh.
//! - One-shot retry: an envelope carrying code `10002` (token expired or
//!   revoked server-side) invalidates the cache, refreshes once and resends
//!   exactly once. A second `10002` is surfaced as an `Api` error.
//!
//! Base URL: a fixed override if one was given, else the `areaDomain`
//! returned with the token, else the region host.

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::auth::TokenProvider;
use crate::config::Config;
use crate::constants::TOKEN_EXPIRED_CODE;
use crate::envelope::{CallSite, check_response, extract_code_and_message};
use crate::error::{EzvizError, Result};
use crate::region::Region;

/// How an endpoint expects the access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenPlacement {
    /// `accessToken` form field (POST) or query parameter (GET).
    Param,
    /// `accessToken` HTTP header.
    Header,
}

/// Authenticated client for the open platform REST API.
pub struct EzvizClient {
    http: Client,
    base_url: Option<String>,
    region: Region,
    app_key: String,
    auth: Mutex<TokenProvider>,
}

impl EzvizClient {
    /// Wraps `auth` without contacting the token endpoint.
    pub fn new(auth: TokenProvider) -> Self {
        EzvizClient {
            http: auth.http_client(),
            base_url: None,
            region: auth.region(),
            app_key: auth.app_key().to_string(),
            auth: Mutex::new(auth),
        }
    }

    /// Like [`new`](Self::new) but every request goes to `base_url`.
    /// Used by tests to point at a mock server.
    pub fn with_base_url(auth: TokenProvider, base_url: &str) -> Self {
        let mut client = Self::new(auth);
        client.base_url = Some(with_trailing_slash(base_url));
        client
    }

    /// Wraps `auth` and acquires the first token immediately.
    ///
    /// # Errors
    ///
    /// - `EzvizError::Auth`: credentials rejected or token endpoint unreachable.
    pub async fn connect(auth: TokenProvider) -> Result<Self> {
        let client = Self::new(auth);
        client.access_token().await?;
        Ok(client)
    }

    /// Builds a provider from `config` and [`connect`](Self::connect)s.
    pub async fn from_config(config: &Config) -> Result<Self> {
        Self::connect(TokenProvider::new(config)?).await
    }

    /// Region this client is bound to.
    pub fn region(&self) -> Region {
        self.region
    }

    /// Application key the client authenticates with.
    pub fn app_key(&self) -> &str {
        &self.app_key
    }

    /// Returns a valid access token, refreshing if none is cached or the
    /// cached one is stale.
    pub async fn access_token(&self) -> Result<String> {
        self.auth.lock().await.valid_token().await
    }

    /// Token and base URL for the next request, refreshing when needed.
    async fn authorize(&self) -> Result<(String, String)> {
        let mut auth = self.auth.lock().await;
        let token = auth.valid_token().await?;
        Ok((token, self.resolve_base_url(&auth)))
    }

    /// Drops the cached token and acquires a fresh one.
    async fn force_refresh(&self) -> Result<(String, String)> {
        let mut auth = self.auth.lock().await;
        auth.invalidate();
        let token = auth.valid_token().await?;
        Ok((token, self.resolve_base_url(&auth)))
    }

    fn resolve_base_url(&self, auth: &TokenProvider) -> String {
        match (&self.base_url, auth.area_domain()) {
            (Some(fixed), _) => fixed.clone(),
            (None, Some(domain)) => with_trailing_slash(domain),
            (None, None) => self.region.base_url(),
        }
    }

    /// Fails with `RegionRestricted` unless the client is bound to `required`.
    pub(crate) fn require_region(&self, required: Region, api_name: &str) -> Result<()> {
        if self.region == required {
            return Ok(());
        }
        Err(EzvizError::RegionRestricted {
            api_name: api_name.to_string(),
            required,
            actual: self.region,
        })
    }

    /// Sends an authenticated request and maps the envelope.
    ///
    /// `path` is relative to the base URL (no leading slash). `params` are
    /// form-encoded for non-GET methods and query-encoded for GET.
    pub(crate) async fn call(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
        placement: TokenPlacement,
        site: &CallSite<'_>,
    ) -> Result<Value> {
        self.execute(&method, path, site, |url, token| {
            let mut pairs: Vec<(&str, &str)> =
                params.iter().map(|(k, v)| (*k, v.as_str())).collect();
            let mut req = self.http.request(method.clone(), url);
            match placement {
                TokenPlacement::Param => pairs.push(("accessToken", token)),
                TokenPlacement::Header => req = req.header("accessToken", token),
            }
            if method == Method::GET {
                req.query(&pairs)
            } else {
                req.form(&pairs)
            }
        })
        .await
    }

    /// Shorthand for a form POST with the token as a form field.
    pub(crate) async fn post_form(
        &self,
        path: &str,
        params: &[(&str, String)],
        site: &CallSite<'_>,
    ) -> Result<Value> {
        self.call(Method::POST, path, params, TokenPlacement::Param, site)
            .await
    }

    /// Sends a request whose fields travel as HTTP headers next to the
    /// `accessToken` header, with an optional JSON body.
    pub(crate) async fn call_with_headers(
        &self,
        method: Method,
        path: &str,
        headers: &[(&str, String)],
        json: Option<&Value>,
        site: &CallSite<'_>,
    ) -> Result<Value> {
        self.execute(&method, path, site, |url, token| {
            let mut req = self
                .http
                .request(method.clone(), url)
                .header("accessToken", token);
            for (name, value) in headers {
                req = req.header(*name, value.as_str());
            }
            match json {
                Some(body) => req.json(body),
                None => req,
            }
        })
        .await
    }

    /// Authorizes, sends the request built by `build` and maps the envelope,
    /// resending once after a `10002`.
    async fn execute<F>(
        &self,
        method: &Method,
        path: &str,
        site: &CallSite<'_>,
        build: F,
    ) -> Result<Value>
    where
        F: Fn(&str, &str) -> RequestBuilder,
    {
        let (token, base) = self.authorize().await?;
        let url = format!("{base}{path}");
        debug!(%method, %url, "dispatching request");
        let (status, body) = send(build(&url, &token)).await?;

        if envelope_code(&body, site) == Some(TOKEN_EXPIRED_CODE.to_string()) {
            warn!(api = site.api_name, "access token rejected by server; refreshing once");
            let (token, base) = self.force_refresh().await?;
            let url = format!("{base}{path}");
            let (status, body) = send(build(&url, &token)).await?;
            return check_response(status, &body, site);
        }

        check_response(status, &body, site)
    }
}

async fn send(req: RequestBuilder) -> Result<(StatusCode, String)> {
    let resp = req.send().await?;
    let status = resp.status();
    let body = resp.text().await?;
    Ok((status, body))
}

/// Rejects empty or whitespace-only required parameters.
pub(crate) fn require(name: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(EzvizError::MissingParameter(name));
    }
    Ok(())
}

fn envelope_code(body: &str, site: &CallSite<'_>) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    extract_code_and_message(&value, site.format).0
}

fn with_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::ResponseFormat;

    #[test]
    fn trailing_slash_is_normalised() {
        assert_eq!(with_trailing_slash("https://a.example"), "https://a.example/");
        assert_eq!(with_trailing_slash("https://a.example/"), "https://a.example/");
    }

    #[test]
    fn require_rejects_blank_values() {
        assert!(require("deviceSerial", "427734888").is_ok());
        assert!(matches!(
            require("deviceSerial", "  "),
            Err(EzvizError::MissingParameter("deviceSerial"))
        ));
    }

    #[test]
    fn base_url_defaults_to_region_host() {
        let client = EzvizClient::new(TokenProvider::with_token("t").with_region(Region::Sg));
        let auth = client.auth.try_lock().unwrap();
        assert_eq!(client.resolve_base_url(&auth), "https://isgpopen.ezvizlife.com/");
    }

    #[test]
    fn base_url_prefers_area_domain() {
        let tp = TokenProvider::with_token("t").with_cached_token(crate::auth::AccessToken {
            access_token: "t".to_string(),
            expire_time: i64::MAX,
            area_domain: Some("https://iusopen.ezvizlife.com".to_string()),
        });
        let client = EzvizClient::new(tp.with_region(Region::Us));
        let auth = client.auth.try_lock().unwrap();
        assert_eq!(client.resolve_base_url(&auth), "https://iusopen.ezvizlife.com/");
    }

    #[test]
    fn fixed_base_url_wins() {
        let client =
            EzvizClient::with_base_url(TokenProvider::with_token("t"), "http://127.0.0.1:9");
        let auth = client.auth.try_lock().unwrap();
        assert_eq!(client.resolve_base_url(&auth), "http://127.0.0.1:9/");
    }

    #[test]
    fn region_restriction_is_enforced() {
        let client = EzvizClient::new(TokenProvider::with_token("t").with_region(Region::Eu));
        let err = client.require_region(Region::Cn, "search_device_info").unwrap_err();
        assert!(matches!(err, EzvizError::RegionRestricted { actual: Region::Eu, .. }));
        assert!(EzvizClient::new(TokenProvider::with_token("t"))
            .require_region(Region::Cn, "search_device_info")
            .is_ok());
    }

    #[test]
    fn envelope_code_reads_requested_format() {
        let site = CallSite::new("x", "").format(ResponseFormat::Meta);
        assert_eq!(
            envelope_code(r#"{"meta":{"code":10002}}"#, &site).as_deref(),
            Some("10002")
        );
        assert!(envelope_code("not json", &site).is_none());
    }
}
