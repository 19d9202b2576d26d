//! Device management endpoints.
//!
//! | Function | API Path | Region |
//! |----------|----------|--------|
//! | [`is_device_support_ezviz`] | POST `api/lapp/device/support/ezviz` | cn |
//! | [`search_device_info`] | GET/POST `api/v3/device/searchDeviceInfo` | cn |
//! | [`add_device`] | POST `api/lapp/device/add` | all |
//! | [`delete_device`] | POST `api/lapp/device/delete` | all |
//! | [`update_device_name`] | POST `api/lapp/device/name/update` | all |
//! | [`get_device_info`] | POST `api/lapp/device/info` | all |
//! | [`list_devices_by_page`] | POST `api/lapp/device/list` | all |
//! | [`list_devices_by_id`] | POST `api/lapp/device/list` | all |
//! | [`get_camera_list`] | POST `api/lapp/camera/list` | all |
//! | [`get_device_camera_list`] | POST `api/lapp/device/camera/list` | all |
//! | [`get_device_status`] | POST `api/lapp/device/status/get` | all |
//! | [`get_device_connection_info`] | POST `api/lapp/device/connection/info` | cn |
//! | [`get_device_capacity`] | POST `api/lapp/device/capacity` | all |
//! | [`capture_image`] | POST `api/lapp/device/capture` | all |
//! | [`set_device_defence`] | POST `api/lapp/device/defence/set` | all |
//! | [`update_camera_name`] | POST `api/lapp/camera/name/update` | cn |
//! | [`add_ipc_device`] | POST `api/lapp/device/ipc/add` | all |
//! | [`delete_ipc_device`] | POST `api/lapp/device/ipc/delete` | all |
//! | [`get_device_channel_status`] | GET `api/v3/open/device/metadata/channel/status` | cn |
//! | [`set_device_encrypt_off`] | POST `api/lapp/device/encrypt/off` | all |
//! | [`set_device_encrypt_on`] | POST `api/lapp/device/encrypt/on` | all |
//! | [`update_device_password`] | POST `api/lapp/device/password/update` | all |
//! | [`device_permission_check`] | GET `api/userdevice/v3/devices/op/permission` | all |
//! | [`get_device_realtime_status`] | GET `api/userdevice/v3/devices/realtimestatus` | cn |
//!
//! The `v3` channel status endpoint takes its fields as HTTP headers and
//! reports in `result`; the `userdevice` endpoints take query fields and
//! report in `meta`.
//! Every function returns the envelope as a `serde_json::Value`, unchanged.
//! [`Device`], [`Camera`] and [`DeviceStatus`] are typed views for callers who want to
//! deserialize the `data` field (see [`crate::envelope::Envelope`]).

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::{EzvizClient, TokenPlacement, require};
use crate::envelope::{CallSite, ResponseFormat};
use crate::error::Result;
use crate::region::Region;

// ── Response types ─────────────────────────────────────────────────────

/// A device as returned by the list and info endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// Serial number (upper-case letters and digits).
    pub device_serial: String,

    /// Display name set on the cloud.
    #[serde(default)]
    pub device_name: Option<String>,

    /// Hardware model (e.g. `"CS-C6CN-3H2WFR"`).
    #[serde(default)]
    pub model: Option<String>,

    /// Device type, also called category (e.g. `"IPC"`, `"NVR"`).
    #[serde(default)]
    pub device_type: Option<String>,

    /// 1 online, 0 offline.
    #[serde(default)]
    pub status: Option<i64>,

    /// 1 armed, 0 disarmed. Some devices report 8/16 for sleep modes.
    #[serde(default)]
    pub defence: Option<i64>,

    /// Firmware version string.
    #[serde(default)]
    pub device_version: Option<String>,

    /// Last time the device's record was modified, epoch ms.
    #[serde(default)]
    pub update_time: Option<i64>,

    /// Whether stream encryption is on (1) or off (0).
    #[serde(default)]
    pub is_encrypt: Option<i64>,
}

/// A video channel as returned by the camera list endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Camera {
    /// Serial number of the owning device.
    pub device_serial: String,

    /// Channel number, starting at 1.
    pub channel_no: i64,

    /// Channel name.
    #[serde(default)]
    pub channel_name: Option<String>,

    /// 1 online, 0 offline, -1 not yet reported.
    #[serde(default)]
    pub status: Option<i64>,

    /// Whether the channel is shared: 0 no, 1 to others, 2 from others.
    #[serde(default)]
    pub is_shared: Option<String>,

    /// Snapshot URL.
    #[serde(default)]
    pub pic_url: Option<String>,

    /// Video level: 0 fluent, 1 balanced, 2 HD, 3 ultra HD.
    #[serde(default)]
    pub video_level: Option<i64>,
}

/// `data` of [`get_device_status`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatus {
    /// Privacy mask: 0 off, 1 on.
    #[serde(default)]
    pub privacy_status: Option<i64>,

    /// PIR sensor state: 1 enabled, 0 disabled.
    #[serde(default)]
    pub pir_status: Option<i64>,

    /// Alarm sound mode: 0 short, 1 long, 2 mute.
    #[serde(default)]
    pub alarm_sound_mode: Option<i64>,

    /// Number of storage cards or disks.
    #[serde(default)]
    pub disk_num: Option<i64>,

    /// Per-disk state string, one digit per disk.
    #[serde(default)]
    pub disk_state: Option<String>,

    /// Cloud service state: -2 unsupported, -1 never opened, 0 inactive,
    /// 1 active, 2 expired.
    #[serde(default)]
    pub cloud_status: Option<i64>,

    /// NVR disk count, -1 when not attached to an NVR.
    #[serde(default)]
    pub nvr_disk_num: Option<i64>,

    /// Wi-Fi signal strength in percent.
    #[serde(default)]
    pub signal: Option<String>,
}

// ── Endpoint functions ─────────────────────────────────────────────────

/// Checks whether a device model/firmware pair supports the cloud protocol.
///
/// `app_key` defaults to the key the client authenticated with.
///
/// # Errors
///
/// - `EzvizError::RegionRestricted`: client is not bound to `cn`.
/// - `EzvizError::MissingParameter`: `model` or `version` is empty.
/// - `EzvizError::Api`: non-success envelope code.
pub async fn is_device_support_ezviz(
    client: &EzvizClient,
    model: &str,
    version: &str,
    app_key: Option<&str>,
) -> Result<Value> {
    const API: &str = "is_device_support_ezviz";
    client.require_region(Region::Cn, API)?;
    require("model", model)?;
    require("version", version)?;
    let params = [
        ("appKey", app_key.unwrap_or(client.app_key()).to_string()),
        ("model", model.to_string()),
        ("version", version.to_string()),
    ];
    let remarks = [("10001", "parameter empty or missing"), ("49999", "platform error")];
    let site = CallSite::new(API, "").remarks(&remarks);
    client
        .post_form("api/lapp/device/support/ezviz", &params, &site)
        .await
}

/// Looks up a device by serial before adding it.
///
/// The platform accepts the lookup as a form POST or as a GET with query
/// fields; `method` picks one, and any other verb is sent as a form body.
///
/// The status is carried in `result.code`. Besides `200`, the codes
/// `20020` (already added by you), `20023` (not yet registered) and
/// `20029` (online, not added) are informational and returned as success.
pub async fn search_device_info(
    client: &EzvizClient,
    device_serial: &str,
    model: Option<&str>,
    method: Method,
) -> Result<Value> {
    const API: &str = "search_device_info";
    client.require_region(Region::Cn, API)?;
    require("deviceSerial", device_serial)?;
    let mut params = vec![("deviceSerial", device_serial.to_string())];
    if let Some(model) = model {
        params.push(("model", model.to_string()));
    }
    let remarks = [
        ("10001", "invalid request parameter"),
        ("10004", "access token is not valid"),
        ("20002", "user does not exist"),
        ("20013", "device already added by another account"),
        ("20014", "serial number is incorrect"),
        ("60107", "not supported"),
    ];
    let success = ["200", "20020", "20023", "20029"];
    let site = CallSite::new(API, device_serial)
        .format(ResponseFormat::Result)
        .remarks(&remarks)
        .success_codes(&success);
    let path = "api/v3/device/searchDeviceInfo";
    client
        .call(method, path, &params, TokenPlacement::Param, &site)
        .await
}

/// Adds a device to the account.
///
/// `validate_code` is the six upper-case letters printed on the device label.
///
/// # Errors
///
/// - `EzvizError::MissingParameter`: either argument is empty.
/// - `EzvizError::Api`: e.g. `20010` wrong code, `20013` owned by another
///   account, `20017` already added.
/// - `EzvizError::Auth`: token acquisition failed.
/// - `EzvizError::Network`: transport-level failure.
pub async fn add_device(
    client: &EzvizClient,
    device_serial: &str,
    validate_code: &str,
) -> Result<Value> {
    require("deviceSerial", device_serial)?;
    require("validateCode", validate_code)?;
    let params = [
        ("deviceSerial", device_serial.to_string()),
        ("validateCode", validate_code.to_string()),
    ];
    let remarks = [
        ("20002", "device not registered with the cloud; activate it first"),
        ("20007", "device offline; check its network connection"),
        ("20010", "wrong verification code"),
        ("20011", "device network abnormal; retry later"),
        ("20013", "device already added by another account; unbind it first"),
        ("20017", "device already added to this account"),
        ("60034", "device cannot connect to the cloud directly; attach it to an NVR"),
        ("60058", "device requires ownership verification"),
        ("60066", "verification code must be refreshed on the device"),
    ];
    let site = CallSite::new("add_device", device_serial).remarks(&remarks);
    client.post_form("api/lapp/device/add", &params, &site).await
}

/// Removes a device from the account.
pub async fn delete_device(
    client: &EzvizClient,
    device_serial: &str,
) -> Result<Value> {
    require("deviceSerial", device_serial)?;
    let params = [("deviceSerial", device_serial.to_string())];
    let remarks = [
        ("20018", "device does not belong to this account"),
        ("20031", "terminal binding is enabled; disable it in the mobile app"),
    ];
    let site = CallSite::new("delete_device", device_serial).remarks(&remarks);
    client
        .post_form("api/lapp/device/delete", &params, &site)
        .await
}

/// Renames a device on the cloud. Names are limited to 50 bytes.
pub async fn update_device_name(
    client: &EzvizClient,
    device_serial: &str,
    device_name: &str,
) -> Result<Value> {
    require("deviceSerial", device_serial)?;
    require("deviceName", device_name)?;
    let params = [
        ("deviceSerial", device_serial.to_string()),
        ("deviceName", device_name.to_string()),
    ];
    let site = CallSite::new("update_device_name", device_serial);
    client
        .post_form("api/lapp/device/name/update", &params, &site)
        .await
}

/// Fetches the basic information of one device.
pub async fn get_device_info(
    client: &EzvizClient,
    device_serial: &str,
) -> Result<Value> {
    require("deviceSerial", device_serial)?;
    let params = [("deviceSerial", device_serial.to_string())];
    let site = CallSite::new("get_device_info", device_serial);
    client.post_form("api/lapp/device/info", &params, &site).await
}

/// Lists devices by page number.
///
/// `page_start` (0-based, platform maximum 400) and `page_size`
/// (platform maximum 50) are sent verbatim; the platform validates them.
pub async fn list_devices_by_page(
    client: &EzvizClient,
    page_start: u32,
    page_size: u32,
) -> Result<Value> {
    let params = [
        ("pageStart", page_start.to_string()),
        ("pageSize", page_size.to_string()),
    ];
    let site = CallSite::new("list_devices_by_page", "");
    client.post_form("api/lapp/device/list", &params, &site).await
}

/// Lists devices starting after the entry with index `start_id` (`"0"` for
/// the first page).
pub async fn list_devices_by_id(
    client: &EzvizClient,
    start_id: &str,
    page_size: u32,
) -> Result<Value> {
    require("id", start_id)?;
    let params = [
        ("id", start_id.to_string()),
        ("pageSize", page_size.to_string()),
    ];
    let site = CallSite::new("list_devices_by_id", "");
    client.post_form("api/lapp/device/list", &params, &site).await
}

/// Lists video channels across all devices, by page.
pub async fn get_camera_list(
    client: &EzvizClient,
    page_start: u32,
    page_size: u32,
) -> Result<Value> {
    let params = [
        ("pageStart", page_start.to_string()),
        ("pageSize", page_size.to_string()),
    ];
    let site = CallSite::new("get_camera_list", "");
    client.post_form("api/lapp/camera/list", &params, &site).await
}

/// Lists the channels of one device.
pub async fn get_device_camera_list(
    client: &EzvizClient,
    device_serial: &str,
) -> Result<Value> {
    require("deviceSerial", device_serial)?;
    let params = [("deviceSerial", device_serial.to_string())];
    let site = CallSite::new("get_device_camera_list", device_serial);
    client
        .post_form("api/lapp/device/camera/list", &params, &site)
        .await
}

/// Fetches status information (storage, signal, alarm state) for a channel.
pub async fn get_device_status(
    client: &EzvizClient,
    device_serial: &str,
    channel_no: u32,
) -> Result<Value> {
    require("deviceSerial", device_serial)?;
    let params = [
        ("deviceSerial", device_serial.to_string()),
        ("channelNo", channel_no.to_string()),
    ];
    let site = CallSite::new("get_device_status", device_serial);
    client
        .post_form("api/lapp/device/status/get", &params, &site)
        .await
}

/// Fetches network connection details (local/NAT IPs, ports) of a device.
pub async fn get_device_connection_info(
    client: &EzvizClient,
    device_serial: &str,
) -> Result<Value> {
    const API: &str = "get_device_connection_info";
    client.require_region(Region::Cn, API)?;
    require("deviceSerial", device_serial)?;
    let params = [("deviceSerial", device_serial.to_string())];
    let site = CallSite::new(API, device_serial);
    client
        .post_form("api/lapp/device/connection/info", &params, &site)
        .await
}

/// Fetches the capability set of a device (`support_*` / `ptz_*` flags).
pub async fn get_device_capacity(
    client: &EzvizClient,
    device_serial: &str,
) -> Result<Value> {
    require("deviceSerial", device_serial)?;
    let params = [("deviceSerial", device_serial.to_string())];
    let site = CallSite::new("get_device_capacity", device_serial);
    client
        .post_form("api/lapp/device/capacity", &params, &site)
        .await
}

/// Asks the device to take a snapshot; `data.picUrl` holds the image URL.
///
/// `quality` is forwarded only when set (the platform treats absence as default).
pub async fn capture_image(
    client: &EzvizClient,
    device_serial: &str,
    channel_no: u32,
    quality: Option<u32>,
) -> Result<Value> {
    require("deviceSerial", device_serial)?;
    let mut params = vec![
        ("deviceSerial", device_serial.to_string()),
        ("channelNo", channel_no.to_string()),
    ];
    if let Some(quality) = quality {
        params.push(("quality", quality.to_string()));
    }
    let remarks = [
        ("10051", "device does not belong to or is not shared with this user"),
        ("20006", "device network unstable; retry later"),
        ("20008", "too many requests or device cannot capture"),
        ("20032", "channel does not exist on this device"),
        ("60017", "device returned a failure"),
    ];
    let site = CallSite::new("capture_image", device_serial).remarks(&remarks);
    client
        .post_form("api/lapp/device/capture", &params, &site)
        .await
}

/// Arms (`true`) or disarms (`false`) motion detection.
pub async fn set_device_defence(
    client: &EzvizClient,
    device_serial: &str,
    armed: bool,
) -> Result<Value> {
    require("deviceSerial", device_serial)?;
    let params = [
        ("deviceSerial", device_serial.to_string()),
        ("isDefence", u8::from(armed).to_string()),
    ];
    let site = CallSite::new("set_device_defence", device_serial);
    client
        .post_form("api/lapp/device/defence/set", &params, &site)
        .await
}

/// Renames a channel on the cloud. Without `channel_no` channel 1 is renamed.
pub async fn update_camera_name(
    client: &EzvizClient,
    device_serial: &str,
    name: &str,
    channel_no: Option<u32>,
) -> Result<Value> {
    const API: &str = "update_camera_name";
    client.require_region(Region::Cn, API)?;
    require("deviceSerial", device_serial)?;
    require("name", name)?;
    let mut params = vec![
        ("deviceSerial", device_serial.to_string()),
        ("name", name.to_string()),
    ];
    if let Some(channel_no) = channel_no {
        params.push(("channelNo", channel_no.to_string()));
    }
    let remarks = [
        ("20018", "device does not belong to this account"),
        ("20032", "channel does not exist on this device"),
    ];
    let site = CallSite::new(API, device_serial).remarks(&remarks);
    client
        .post_form("api/lapp/camera/name/update", &params, &site)
        .await
}

const IPC_REMARKS: &[(&str, &str)] = &[
    ("20006", "device network unstable; retry later"),
    ("20007", "device offline"),
    ("20008", "too many requests; retry later"),
    ("20018", "device does not belong to this account"),
    ("60012", "device returned another error code"),
    ("60020", "device does not support linking IPCs"),
    ("60055", "IPC stream abnormal; check the IPC"),
];

/// Links an IPC to an NVR (`device_serial`).
///
/// `validate_code` is the IPC's label code, needed when its stream is encrypted.
pub async fn add_ipc_device(
    client: &EzvizClient,
    device_serial: &str,
    ipc_serial: &str,
    channel_no: Option<u32>,
    validate_code: Option<&str>,
) -> Result<Value> {
    require("deviceSerial", device_serial)?;
    require("ipcSerial", ipc_serial)?;
    let mut params = vec![
        ("deviceSerial", device_serial.to_string()),
        ("ipcSerial", ipc_serial.to_string()),
    ];
    if let Some(channel_no) = channel_no {
        params.push(("channelNo", channel_no.to_string()));
    }
    if let Some(code) = validate_code {
        params.push(("validateCode", code.to_string()));
    }
    let site = CallSite::new("add_ipc_device", device_serial).remarks(IPC_REMARKS);
    client
        .post_form("api/lapp/device/ipc/add", &params, &site)
        .await
}

/// Unlinks an IPC from an NVR.
pub async fn delete_ipc_device(
    client: &EzvizClient,
    device_serial: &str,
    ipc_serial: &str,
    channel_no: Option<u32>,
) -> Result<Value> {
    require("deviceSerial", device_serial)?;
    require("ipcSerial", ipc_serial)?;
    let mut params = vec![
        ("deviceSerial", device_serial.to_string()),
        ("ipcSerial", ipc_serial.to_string()),
    ];
    if let Some(channel_no) = channel_no {
        params.push(("channelNo", channel_no.to_string()));
    }
    let site = CallSite::new("delete_ipc_device", device_serial).remarks(&IPC_REMARKS[..6]);
    client
        .post_form("api/lapp/device/ipc/delete", &params, &site)
        .await
}

/// Fetches the state of every channel of an NVR.
///
/// `deviceSerial` and the token travel as headers; the status sits in
/// `result.code`.
pub async fn get_device_channel_status(
    client: &EzvizClient,
    device_serial: &str,
) -> Result<Value> {
    const API: &str = "get_device_channel_status";
    client.require_region(Region::Cn, API)?;
    require("deviceSerial", device_serial)?;
    let headers = [("deviceSerial", device_serial.to_string())];
    let remarks = [("20018", "device does not belong to this account")];
    let site = CallSite::new(API, device_serial)
        .format(ResponseFormat::Result)
        .remarks(&remarks);
    client
        .call_with_headers(
            Method::GET,
            "api/v3/open/device/metadata/channel/status",
            &headers,
            None,
            &site,
        )
        .await
}

const ENCRYPT_REMARKS: &[(&str, &str)] = &[
    ("20006", "device network unstable; retry later"),
    ("20008", "too many requests; retry later"),
    ("20010", "wrong verification code"),
    ("60016", "encryption is already in the requested state"),
];

/// Turns stream encryption off.
pub async fn set_device_encrypt_off(
    client: &EzvizClient,
    device_serial: &str,
) -> Result<Value> {
    require("deviceSerial", device_serial)?;
    let params = [("deviceSerial", device_serial.to_string())];
    let site = CallSite::new("set_device_encrypt_off", device_serial).remarks(ENCRYPT_REMARKS);
    client
        .post_form("api/lapp/device/encrypt/off", &params, &site)
        .await
}

/// Turns stream encryption on.
pub async fn set_device_encrypt_on(
    client: &EzvizClient,
    device_serial: &str,
) -> Result<Value> {
    require("deviceSerial", device_serial)?;
    let params = [("deviceSerial", device_serial.to_string())];
    let site = CallSite::new("set_device_encrypt_on", device_serial).remarks(ENCRYPT_REMARKS);
    client
        .post_form("api/lapp/device/encrypt/on", &params, &site)
        .await
}

/// Changes the stream encryption password. A device reset restores the
/// label code.
pub async fn update_device_password(
    client: &EzvizClient,
    device_serial: &str,
    old_password: &str,
    new_password: &str,
) -> Result<Value> {
    require("deviceSerial", device_serial)?;
    require("oldPassword", old_password)?;
    require("newPassword", new_password)?;
    let params = [
        ("deviceSerial", device_serial.to_string()),
        ("oldPassword", old_password.to_string()),
        ("newPassword", new_password.to_string()),
    ];
    let remarks = [
        ("20006", "device network unstable; retry later"),
        ("20008", "too many requests; retry later"),
        ("20010", "old password is wrong"),
        ("60012", "device returned another error code"),
        ("60020", "device does not support changing the password"),
    ];
    let site = CallSite::new("update_device_password", device_serial).remarks(&remarks);
    client
        .post_form("api/lapp/device/password/update", &params, &site)
        .await
}

const PERMISSION_REMARKS: &[(&str, &str)] = &[
    ("401", "unauthorized"),
    ("403", "forbidden"),
    ("404", "not found"),
    ("504", "network error"),
    ("2009", "device response timed out"),
    ("2021", "permission check failed"),
    ("70000", "permission check failed"),
];

/// Verifies the account may use the device and reports whether it is online.
///
/// `ssid` is the Wi-Fi the app is on and `client_ip` its public address;
/// both are forwarded only when set.
pub async fn device_permission_check(
    client: &EzvizClient,
    device_serial: &str,
    ssid: Option<&str>,
    client_ip: Option<&str>,
) -> Result<Value> {
    require("deviceSerial", device_serial)?;
    let mut params = vec![("deviceSerial", device_serial.to_string())];
    if let Some(ssid) = ssid {
        params.push(("ssid", ssid.to_string()));
    }
    if let Some(ip) = client_ip {
        params.push(("clientIP", ip.to_string()));
    }
    let site = CallSite::new("device_permission_check", device_serial)
        .format(ResponseFormat::Meta)
        .remarks(PERMISSION_REMARKS);
    client
        .call(
            Method::GET,
            "api/userdevice/v3/devices/op/permission",
            &params,
            TokenPlacement::Param,
            &site,
        )
        .await
}

/// Asks the platform whether the device is online right now.
///
/// The top-level `status` is 1 online, 0 offline.
pub async fn get_device_realtime_status(
    client: &EzvizClient,
    device_serial: &str,
) -> Result<Value> {
    const API: &str = "get_device_realtime_status";
    client.require_region(Region::Cn, API)?;
    require("deviceSerial", device_serial)?;
    let params = [("deviceSerial", device_serial.to_string())];
    let site = CallSite::new(API, device_serial)
        .format(ResponseFormat::Meta)
        .remarks(&PERMISSION_REMARKS[..6]);
    client
        .call(
            Method::GET,
            "api/userdevice/v3/devices/realtimestatus",
            &params,
            TokenPlacement::Param,
            &site,
        )
        .await
}
