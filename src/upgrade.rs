//! Firmware and module upgrade endpoints.
//!
//! | Function | API Path | Token | Region |
//! |----------|----------|-------|--------|
//! | [`get_device_version_info`] | POST `api/lapp/device/version/info` | form | all |
//! | [`upgrade_device_firmware`] | POST `api/lapp/device/upgrade` | form | all |
//! | [`get_device_upgrade_status`] | POST `api/lapp/device/upgrade/status` | form | all |
//! | [`get_device_upgrade_modules`] | GET `api/service/device/upgrade/modules` | header | cn |
//! | [`upgrade_device_modules`] | POST `api/v3/device/upgrade/modules` | header | cn |
//! | [`get_device_module_upgrade_status`] | GET `api/service/device/upgrade/modules/status` | header | cn |
//!
//! The module endpoints belong to the newer `service`/`v3` family: the token
//! travels in an `accessToken` header and the status sits under `meta`.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::{EzvizClient, TokenPlacement, require};
use crate::envelope::{CallSite, ResponseFormat};
use crate::error::Result;
use crate::region::Region;

/// `data` of [`get_device_version_info`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    /// Version currently running on the device.
    pub current_version: String,

    /// Newest version available, equal to `current_version` when up to date.
    #[serde(default)]
    pub latest_version: Option<String>,

    /// 1 when an upgrade is available.
    #[serde(default)]
    pub is_need_upgrade: Option<i64>,

    /// 1 while an upgrade is running.
    #[serde(default)]
    pub is_upgrading: Option<i64>,
}

impl VersionInfo {
    /// Whether the platform offers a newer firmware.
    pub fn needs_upgrade(&self) -> bool {
        self.is_need_upgrade == Some(1)
    }
}

/// `data` of [`get_device_upgrade_status`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeStatus {
    /// Progress in percent, meaningful while `status` is 0.
    #[serde(default)]
    pub upgrade_progress: Option<i64>,

    /// 0 upgrading, 1 rebooting, 2 success, 3 failed.
    pub status: i64,
}

/// Fetches the current and latest firmware versions of a device.
pub async fn get_device_version_info(
    client: &EzvizClient,
    device_serial: &str,
) -> Result<Value> {
    require("deviceSerial", device_serial)?;
    let params = [("deviceSerial", device_serial.to_string())];
    let site = CallSite::new("get_device_version_info", device_serial);
    client
        .post_form("api/lapp/device/version/info", &params, &site)
        .await
}

/// Starts upgrading the device to the latest firmware.
///
/// Progress is polled through [`get_device_upgrade_status`].
pub async fn upgrade_device_firmware(
    client: &EzvizClient,
    device_serial: &str,
) -> Result<Value> {
    require("deviceSerial", device_serial)?;
    let params = [("deviceSerial", device_serial.to_string())];
    let remarks = [
        ("20007", "device offline"),
        ("60020", "device does not support upgrading"),
        ("60021", "device is already on the latest version"),
    ];
    let site = CallSite::new("upgrade_device_firmware", device_serial).remarks(&remarks);
    client
        .post_form("api/lapp/device/upgrade", &params, &site)
        .await
}

/// Fetches the firmware upgrade progress.
pub async fn get_device_upgrade_status(
    client: &EzvizClient,
    device_serial: &str,
) -> Result<Value> {
    require("deviceSerial", device_serial)?;
    let params = [("deviceSerial", device_serial.to_string())];
    let site = CallSite::new("get_device_upgrade_status", device_serial);
    client
        .post_form("api/lapp/device/upgrade/status", &params, &site)
        .await
}

/// Lists modules awaiting an upgrade. Call before [`upgrade_device_modules`].
///
/// # Errors
///
/// - `EzvizError::RegionRestricted`: client is not bound to `cn`.
/// - `EzvizError::Api`: `meta.code` is not 200.
pub async fn get_device_upgrade_modules(
    client: &EzvizClient,
    device_serial: &str,
) -> Result<Value> {
    const API: &str = "get_device_upgrade_modules";
    client.require_region(Region::Cn, API)?;
    require("deviceSerial", device_serial)?;
    let params = [("deviceSerial", device_serial.to_string())];
    let site = CallSite::new(API, device_serial).format(ResponseFormat::Meta);
    client
        .call(
            Method::GET,
            "api/service/device/upgrade/modules",
            &params,
            TokenPlacement::Header,
            &site,
        )
        .await
}

/// Triggers an upgrade of the given modules.
///
/// `modules` is passed through as returned by [`get_device_upgrade_modules`].
pub async fn upgrade_device_modules(
    client: &EzvizClient,
    device_serial: &str,
    modules: &str,
) -> Result<Value> {
    const API: &str = "upgrade_device_modules";
    client.require_region(Region::Cn, API)?;
    require("deviceSerial", device_serial)?;
    require("modules", modules)?;
    let params = [
        ("deviceSerial", device_serial.to_string()),
        ("modules", modules.to_string()),
    ];
    let site = CallSite::new(API, device_serial).format(ResponseFormat::Meta);
    client
        .call(
            Method::POST,
            "api/v3/device/upgrade/modules",
            &params,
            TokenPlacement::Header,
            &site,
        )
        .await
}

/// Fetches upgrade progress of a single module.
pub async fn get_device_module_upgrade_status(
    client: &EzvizClient,
    device_serial: &str,
    module: &str,
) -> Result<Value> {
    const API: &str = "get_device_module_upgrade_status";
    client.require_region(Region::Cn, API)?;
    require("deviceSerial", device_serial)?;
    require("module", module)?;
    let params = [
        ("deviceSerial", device_serial.to_string()),
        ("module", module.to_string()),
    ];
    let site = CallSite::new(API, device_serial).format(ResponseFormat::Meta);
    client
        .call(
            Method::GET,
            "api/service/device/upgrade/modules/status",
            &params,
            TokenPlacement::Header,
            &site,
        )
        .await
}
