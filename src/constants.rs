//! Platform status codes, default timeouts, and other fixed values.

use std::time::Duration;

/// Envelope code the platform uses for success.
pub const SUCCESS_CODE: &str = "200";
/// Envelope code returned when the access token is expired or invalid.
pub const TOKEN_EXPIRED_CODE: &str = "10002";
/// Default safety margin subtracted from the token expiry.
pub const DEFAULT_REFRESH_MARGIN: Duration = Duration::from_secs(60);
/// Default overall request timeout (connect + send + body).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Default TCP + TLS connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// User agent sent on every request.
pub const USER_AGENT: &str = concat!("ezviz-openapi/", env!("CARGO_PKG_VERSION"));

/// Remote codes meaning the device lacks the requested capability.
pub const DEVICE_NOT_SUPPORTED_CODES: [&str; 9] = [
    "2030", "20015", "20019", "60000", "60020", "60047", "60050", "60051", "60053",
];
