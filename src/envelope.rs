//! Response envelope handling.
//!
//! The platform wraps every answer in a JSON envelope. Most endpoints use
//! `{code, msg, data?, page?}`, newer service endpoints use
//! `{meta: {code, message}, data?}`, and a few wrap the status in
//! `{result: {code, msg}}`. The envelope code, not the HTTP status, is
//! the authoritative success signal.
//!
//! [`check_response`] turns a raw HTTP response into either the parsed
//! JSON value (returned unchanged) or the matching [`EzvizError`].

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::constants::{DEVICE_NOT_SUPPORTED_CODES, SUCCESS_CODE};
use crate::error::{EzvizError, Result};

/// Where an endpoint puts its status code and message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    /// Root `code`, falling back to `meta.code` when the root has none.
    Default,
    /// Root `code` / `msg`. Used by the `api/lapp` endpoints.
    #[default]
    Code,
    /// `meta.code` / `meta.message`.
    Meta,
    /// `result.code` / `result.msg`.
    Result,
}

/// Per-endpoint context used when mapping an envelope to an error.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CallSite<'a> {
    pub api_name: &'a str,
    pub device_serial: &'a str,
    pub format: ResponseFormat,
    /// Endpoint-specific remarks, consulted before [`GLOBAL_REMARKS`].
    pub remarks: &'a [(&'a str, &'a str)],
    /// Codes treated as success. Defaults to `["200"]`.
    pub success_codes: &'a [&'a str],
}

impl<'a> CallSite<'a> {
    pub fn new(api_name: &'a str, device_serial: &'a str) -> Self {
        CallSite {
            api_name,
            device_serial,
            format: ResponseFormat::default(),
            remarks: &[],
            success_codes: &[SUCCESS_CODE],
        }
    }

    pub fn format(mut self, format: ResponseFormat) -> Self {
        self.format = format;
        self
    }

    pub fn remarks(mut self, remarks: &'a [(&'a str, &'a str)]) -> Self {
        self.remarks = remarks;
        self
    }

    pub fn success_codes(mut self, codes: &'a [&'a str]) -> Self {
        self.success_codes = codes;
        self
    }
}

/// Remarks shared by all endpoints.
pub const GLOBAL_REMARKS: &[(&str, &str)] = &[
    ("2001", "camera is not registered with the cloud; check its network configuration"),
    ("2030", "device does not support the cloud protocol"),
    ("7007", "shares must be managed exclusively through the API"),
    ("9049", "personal plan bandwidth is limited to 1M"),
    ("10001", "parameter empty or malformed"),
    ("10002", "access token expired or invalid; fetch a new one"),
    ("10005", "appKey is frozen or not approved"),
    ("10007", "call quota exceeded for this account type"),
    ("10008", "signature error; check the encoding is UTF-8"),
    ("10010", "clock skew; synchronise server time"),
    ("10017", "appKey does not exist"),
    ("10030", "appKey and appSecret do not match"),
    ("20001", "channel does not exist; the device may have been re-added"),
    ("20002", "device is not registered or the serial does not exist"),
    ("20007", "device is offline"),
    ("20008", "device response timed out"),
    ("20010", "wrong verification code (six upper-case letters on the label)"),
    ("20018", "device does not belong to this account"),
    ("20031", "terminal binding is enabled on the device owner's account"),
    ("49999", "platform error; retry later"),
    ("60020", "device does not support this command"),
    ("60057", "IPC is not associated with the NVR"),
    ("60083", "privacy mask in progress"),
    ("60084", "privacy mask in progress"),
];

/// Looks `code` up in `custom`, then [`GLOBAL_REMARKS`].
pub fn remark_for<'a>(code: &str, custom: &'a [(&'a str, &'a str)]) -> &'a str {
    let global: &'a [(&'a str, &'a str)] = GLOBAL_REMARKS;
    custom
        .iter()
        .chain(global.iter())
        .find(|(c, _)| *c == code)
        .map_or("unknown error", |(_, remark)| *remark)
}

/// Converts an envelope code (JSON string or number) to a string.
pub fn code_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Extracts `(code, message)` from an envelope according to `format`.
pub fn extract_code_and_message(body: &Value, format: ResponseFormat) -> (Option<String>, String) {
    let field = |scope: Option<&Value>, key: &str| scope.and_then(|s| s.get(key)).cloned();
    let text = |v: Option<Value>| match v {
        Some(Value::String(s)) => Some(s),
        _ => None,
    };
    let meta = body.get("meta");
    let result = body.get("result");

    match format {
        ResponseFormat::Code => (
            body.get("code").and_then(code_to_string),
            text(field(Some(body), "msg")).unwrap_or_default(),
        ),
        ResponseFormat::Meta => (
            meta.and_then(|m| m.get("code")).and_then(code_to_string),
            text(field(meta, "message")).unwrap_or_default(),
        ),
        ResponseFormat::Result => (
            result.and_then(|r| r.get("code")).and_then(code_to_string),
            text(field(result, "msg")).unwrap_or_default(),
        ),
        ResponseFormat::Default => {
            let message = text(field(Some(body), "msg"))
                .or_else(|| text(field(Some(body), "message")))
                .unwrap_or_default();
            match body.get("code").and_then(code_to_string) {
                Some(code) => (Some(code), message),
                None => (
                    meta.and_then(|m| m.get("code")).and_then(code_to_string),
                    text(field(meta, "message")).unwrap_or(message),
                ),
            }
        }
    }
}

/// Maps an HTTP status and body to the parsed envelope or an error.
///
/// Order of checks:
/// 1. Body must be JSON (non-2xx → `Http`, 2xx → `Parse`).
/// 2. Device-not-supported codes win over the HTTP status.
/// 3. Non-2xx status → `Http`.
/// 4. Code outside the success set → `Api`.
pub(crate) fn check_response(status: StatusCode, body: &str, call: &CallSite<'_>) -> Result<Value> {
    let value: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) if status.is_success() => return Err(EzvizError::Parse(e)),
        Err(_) => {
            return Err(EzvizError::Http {
                status,
                body: body.to_string(),
            });
        }
    };

    let (code, message) = extract_code_and_message(&value, call.format);

    if let Some(code) = code.as_deref() {
        if DEVICE_NOT_SUPPORTED_CODES.contains(&code) {
            debug!(api = call.api_name, code, "device does not support operation");
            return Err(EzvizError::DeviceNotSupported {
                code: code.to_string(),
                message,
                device_serial: call.device_serial.to_string(),
                api_name: call.api_name.to_string(),
            });
        }
    }

    if !status.is_success() {
        return Err(EzvizError::Http {
            status,
            body: body.to_string(),
        });
    }

    match code {
        Some(code) if call.success_codes.contains(&code.as_str()) => Ok(value),
        Some(code) => {
            warn!(api = call.api_name, code = %code, "API call failed: {message}");
            let remark = remark_for(&code, call.remarks).to_string();
            Err(EzvizError::Api {
                code,
                message,
                remark,
            })
        }
        None => Err(EzvizError::Api {
            code: String::new(),
            message: "response envelope carried no status code".to_string(),
            remark: "unknown error".to_string(),
        }),
    }
}

// ── Typed views ────────────────────────────────────────────────────────

/// Typed view of the `{code, msg, data, page}` envelope.
///
/// Endpoint functions return the raw `serde_json::Value`; callers who
/// want structure can convert it with [`Envelope::from_value`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Status code as sent by the platform, normalised to a string.
    #[serde(deserialize_with = "deserialize_code")]
    pub code: String,
    /// Human-readable message.
    #[serde(default)]
    pub msg: String,
    /// Payload (object or list); absent on most write endpoints.
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    /// Paging information on list endpoints.
    #[serde(default)]
    pub page: Option<Page>,
}

impl<T: serde::de::DeserializeOwned> Envelope<T> {
    /// Deserializes an envelope from a value returned by an endpoint function.
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }
}

/// Paging block returned by list endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Total number of items across all pages.
    #[serde(default)]
    pub total: u64,
    /// Index of the returned page.
    #[serde(default)]
    pub page: u64,
    /// Page size used for this response.
    #[serde(default)]
    pub size: u64,
}

fn deserialize_code<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    code_to_string(&value)
        .ok_or_else(|| serde::de::Error::custom("envelope code must be a string or a number"))
}
