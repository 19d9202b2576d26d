//! Typed error hierarchy for the ezviz-openapi crate.
//!
//! Every failure a caller can observe maps to one `EzvizError` variant:
//!
//! - `Auth` covers the token endpoint (`api/lapp/token/get`): a non-"200"
//!   envelope, an unusable HTTP response, or a transport failure while
//!   refreshing.
//! - `Api` covers every other endpoint that answered with a well-formed
//!   envelope whose code is not a success code. The remote code and
//!   message are kept verbatim.
//! - `DeviceNotSupported` is the subset of remote codes that mean "this
//!   device cannot do that", so callers can skip rather than fail.
//! - `Network` wraps `reqwest::Error` for DNS, TCP, TLS and timeout
//!   failures. It is never retried.

use reqwest::StatusCode;

use crate::region::Region;

/// Unified error type for all ezviz-openapi operations.
#[derive(Debug, thiserror::Error)]
pub enum EzvizError {
    /// Token acquisition or refresh failed.
    #[error("authentication failed ({code}): {message}")]
    Auth {
        /// Remote status code (e.g. `"10017"`), the HTTP status when no
        /// envelope was returned, or `"network"` for transport failures.
        code: String,
        /// Remote message, verbatim.
        message: String,
        /// Local hint describing the usual cause of `code`.
        remark: String,
        /// Underlying transport or parse error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The endpoint answered with a non-success envelope code.
    #[error("API error {code}: {message}")]
    Api {
        /// Remote status code, verbatim.
        code: String,
        /// Remote message, verbatim.
        message: String,
        /// Local hint describing the usual cause of `code`.
        remark: String,
    },

    /// The remote code says the target device lacks the capability.
    #[error("device {device_serial} does not support {api_name} ({code}): {message}")]
    DeviceNotSupported {
        /// Remote status code, verbatim.
        code: String,
        /// Remote message, verbatim.
        message: String,
        /// Serial of the device the call targeted (may be empty).
        device_serial: String,
        /// Name of the library function that was called.
        api_name: String,
    },

    /// The endpoint only exists in one region and the client is bound to another.
    #[error("{api_name} is only available in region `{required}` (client region: `{actual}`)")]
    RegionRestricted {
        /// Name of the library function that was called.
        api_name: String,
        /// Region the endpoint is restricted to.
        required: Region,
        /// Region the client is configured for.
        actual: Region,
    },

    /// A required parameter was empty.
    #[error("missing required parameter `{0}`")]
    MissingParameter(&'static str),

    /// Invalid configuration: unknown region code, missing credentials.
    #[error("configuration error: {0}")]
    Config(String),

    /// Non-2xx HTTP status without a usable envelope.
    #[error("HTTP {status}: {body}")]
    Http {
        /// HTTP status returned by the server.
        status: StatusCode,
        /// Raw response body, possibly empty.
        body: String,
    },

    /// A 2xx response body was not valid JSON or had an unexpected shape.
    #[error("failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Transport-level failure, including request timeouts.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl EzvizError {
    /// Remote status code carried by `Auth`, `Api` and `DeviceNotSupported`.
    pub fn code(&self) -> Option<&str> {
        match self {
            EzvizError::Auth { code, .. }
            | EzvizError::Api { code, .. }
            | EzvizError::DeviceNotSupported { code, .. } => Some(code.as_str()),
            _ => None,
        }
    }

    /// Remote message carried by `Auth`, `Api` and `DeviceNotSupported`.
    pub fn message(&self) -> Option<&str> {
        match self {
            EzvizError::Auth { message, .. }
            | EzvizError::Api { message, .. }
            | EzvizError::DeviceNotSupported { message, .. } => Some(message.as_str()),
            _ => None,
        }
    }

    /// Returns `true` when the request exceeded the configured timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            EzvizError::Network(e) => e.is_timeout(),
            EzvizError::Auth {
                source: Some(source),
                ..
            } => source
                .downcast_ref::<reqwest::Error>()
                .is_some_and(reqwest::Error::is_timeout),
            _ => false,
        }
    }
}

/// Convenience alias used throughout the library.
pub type Result<T> = std::result::Result<T, EzvizError>;
