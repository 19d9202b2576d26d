//! Pan/tilt/zoom and preset endpoints.
//!
//! | Function | API Path |
//! |----------|----------|
//! | [`start_ptz_control`] | POST `api/lapp/device/ptz/start` |
//! | [`stop_ptz_control`] | POST `api/lapp/device/ptz/stop` |
//! | [`device_mirror_ptz`] | POST `api/lapp/device/ptz/mirror` |
//! | [`add_device_preset`] | POST `api/lapp/device/preset/add` |
//! | [`move_device_preset`] | POST `api/lapp/device/preset/move` |
//! | [`clear_device_preset`] | POST `api/lapp/device/preset/clear` |
//! | [`compose_panorama_image`] | POST `api/service/cloudrecord/pic/panoramic/compose` (cn) |
//! | [`calibrate_ptz`] | POST `api/v3/device/ptz/manual/adjust` (cn) |
//! | [`reset_ptz`] | POST `api/v3/device/ctrl/ptz/reset` (cn) |
//! | [`control_ptz`] | PUT `api/v3/device/otap/action` (cn) |
//!
//! Direction and mirror command accept [`Direction`] / [`MirrorCommand`] or
//! any raw `u32`; speed is a plain integer. All are forwarded as-is. The
//! platform owns their ranges and answers out-of-range values with an
//! `Api` error.
//!
//! The `v3` endpoints take `deviceSerial` and the token as headers and
//! report in `meta`.

use reqwest::Method;
use serde_json::{Value, json};

use crate::client::{EzvizClient, TokenPlacement, require};
use crate::envelope::{CallSite, ResponseFormat};
use crate::error::Result;
use crate::region::Region;

/// Documented PTZ direction codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Direction {
    Up = 0,
    Down = 1,
    Left = 2,
    Right = 3,
    UpLeft = 4,
    DownLeft = 5,
    UpRight = 6,
    DownRight = 7,
    ZoomIn = 8,
    ZoomOut = 9,
    FocusNear = 10,
    FocusFar = 11,
}

impl From<Direction> for u32 {
    fn from(d: Direction) -> u32 {
        d as u32
    }
}

/// Documented mirror commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum MirrorCommand {
    UpDown = 0,
    LeftRight = 1,
    Center = 2,
}

impl From<MirrorCommand> for u32 {
    fn from(c: MirrorCommand) -> u32 {
        c as u32
    }
}

/// Start or stop half of a [`control_ptz`] movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum PtzAction {
    Start,
    Stop,
}

impl PtzAction {
    fn as_str(self) -> &'static str {
        match self {
            PtzAction::Start => "start",
            PtzAction::Stop => "stop",
        }
    }
}

const PTZ_REMARKS: &[(&str, &str)] = &[
    ("60000", "device does not support PTZ control"),
    ("60001", "user has no PTZ control permission"),
    ("60002", "device reached the upper limit"),
    ("60003", "device reached the lower limit"),
    ("60004", "device reached the left limit"),
    ("60005", "device reached the right limit"),
    ("60006", "PTZ operation failed"),
    ("60009", "PTZ is busy with another operation"),
    ("60020", "command not supported by the device"),
];

const PRESET_REMARKS: &[(&str, &str)] = &[
    ("60007", "no more presets can be added"),
    ("60008", "preset is being called"),
    ("60010", "preset index out of range"),
    ("60011", "preset does not exist"),
];

/// Starts moving the camera. Movement continues until [`stop_ptz_control`].
///
/// `speed`: 0 slow, 1 medium, 2 fast.
///
/// # Errors
///
/// - `EzvizError::MissingParameter`: `device_serial` is empty.
/// - `EzvizError::DeviceNotSupported`: device has no PTZ.
/// - `EzvizError::Api`: limit reached, busy, or other non-success code.
pub async fn start_ptz_control(
    client: &EzvizClient,
    device_serial: &str,
    channel_no: u32,
    direction: impl Into<u32>,
    speed: u32,
) -> Result<Value> {
    require("deviceSerial", device_serial)?;
    let direction: u32 = direction.into();
    let params = [
        ("deviceSerial", device_serial.to_string()),
        ("channelNo", channel_no.to_string()),
        ("direction", direction.to_string()),
        ("speed", speed.to_string()),
    ];
    let site = CallSite::new("start_ptz_control", device_serial).remarks(PTZ_REMARKS);
    client
        .post_form("api/lapp/device/ptz/start", &params, &site)
        .await
}

/// Stops camera movement. Without `direction` every movement stops.
pub async fn stop_ptz_control(
    client: &EzvizClient,
    device_serial: &str,
    channel_no: u32,
    direction: Option<Direction>,
) -> Result<Value> {
    require("deviceSerial", device_serial)?;
    let mut params = vec![
        ("deviceSerial", device_serial.to_string()),
        ("channelNo", channel_no.to_string()),
    ];
    if let Some(direction) = direction {
        params.push(("direction", u32::from(direction).to_string()));
    }
    let site = CallSite::new("stop_ptz_control", device_serial).remarks(PTZ_REMARKS);
    client
        .post_form("api/lapp/device/ptz/stop", &params, &site)
        .await
}

/// Flips the image (see [`MirrorCommand`]).
pub async fn device_mirror_ptz(
    client: &EzvizClient,
    device_serial: &str,
    channel_no: u32,
    command: impl Into<u32>,
) -> Result<Value> {
    require("deviceSerial", device_serial)?;
    let command: u32 = command.into();
    let params = [
        ("deviceSerial", device_serial.to_string()),
        ("channelNo", channel_no.to_string()),
        ("command", command.to_string()),
    ];
    let site = CallSite::new("device_mirror_ptz", device_serial).remarks(PTZ_REMARKS);
    client
        .post_form("api/lapp/device/ptz/mirror", &params, &site)
        .await
}

/// Saves the current position as a preset. `data.index` holds the new slot.
pub async fn add_device_preset(
    client: &EzvizClient,
    device_serial: &str,
    channel_no: u32,
) -> Result<Value> {
    require("deviceSerial", device_serial)?;
    let params = [
        ("deviceSerial", device_serial.to_string()),
        ("channelNo", channel_no.to_string()),
    ];
    let site = CallSite::new("add_device_preset", device_serial).remarks(PRESET_REMARKS);
    client
        .post_form("api/lapp/device/preset/add", &params, &site)
        .await
}

/// Moves the camera to a saved preset.
pub async fn move_device_preset(
    client: &EzvizClient,
    device_serial: &str,
    channel_no: u32,
    preset_index: u32,
) -> Result<Value> {
    require("deviceSerial", device_serial)?;
    let params = [
        ("deviceSerial", device_serial.to_string()),
        ("channelNo", channel_no.to_string()),
        ("presetIndex", preset_index.to_string()),
    ];
    let site = CallSite::new("move_device_preset", device_serial).remarks(PRESET_REMARKS);
    client
        .post_form("api/lapp/device/preset/move", &params, &site)
        .await
}

/// Deletes a saved preset.
pub async fn clear_device_preset(
    client: &EzvizClient,
    device_serial: &str,
    channel_no: u32,
    index: u32,
) -> Result<Value> {
    require("deviceSerial", device_serial)?;
    // The clear endpoint names the field `index`, unlike `presetIndex` on move.
    let params = [
        ("deviceSerial", device_serial.to_string()),
        ("channelNo", channel_no.to_string()),
        ("index", index.to_string()),
    ];
    let site = CallSite::new("clear_device_preset", device_serial).remarks(PRESET_REMARKS);
    client
        .post_form("api/lapp/device/preset/clear", &params, &site)
        .await
}

/// Stitches a panorama from the device's cloud recordings.
///
/// Needs cloud recording on the device. `local_index` is the resource
/// (channel) index.
pub async fn compose_panorama_image(
    client: &EzvizClient,
    device_serial: &str,
    local_index: &str,
) -> Result<Value> {
    const API: &str = "compose_panorama_image";
    client.require_region(Region::Cn, API)?;
    require("deviceSerial", device_serial)?;
    require("localIndex", local_index)?;
    let params = [
        ("deviceSerial", device_serial.to_string()),
        ("localIndex", local_index.to_string()),
    ];
    let remarks = [
        ("400", "invalid parameter"),
        ("404", "resource does not exist"),
        ("500", "service error"),
    ];
    let site = CallSite::new(API, device_serial)
        .format(ResponseFormat::Meta)
        .remarks(&remarks);
    client
        .call(
            Method::POST,
            "api/service/cloudrecord/pic/panoramic/compose",
            &params,
            TokenPlacement::Param,
            &site,
        )
        .await
}

/// Runs the manual PTZ calibration. `local_index` is the channel, 1 on an IPC.
pub async fn calibrate_ptz(
    client: &EzvizClient,
    device_serial: &str,
    local_index: u32,
) -> Result<Value> {
    const API: &str = "calibrate_ptz";
    client.require_region(Region::Cn, API)?;
    require("deviceSerial", device_serial)?;
    let headers = [
        ("deviceSerial", device_serial.to_string()),
        ("localIndex", local_index.to_string()),
    ];
    let site = CallSite::new(API, device_serial).format(ResponseFormat::Meta);
    client
        .call_with_headers(
            Method::POST,
            "api/v3/device/ptz/manual/adjust",
            &headers,
            None,
            &site,
        )
        .await
}

/// Returns the PTZ to its home position.
pub async fn reset_ptz(client: &EzvizClient, device_serial: &str) -> Result<Value> {
    const API: &str = "reset_ptz";
    client.require_region(Region::Cn, API)?;
    require("deviceSerial", device_serial)?;
    let headers = [("deviceSerial", device_serial.to_string())];
    let remarks = [
        ("20007", "device offline"),
        ("20008", "device response timed out; check its network or retry"),
    ];
    let site = CallSite::new(API, device_serial)
        .format(ResponseFormat::Meta)
        .remarks(&remarks);
    client
        .call_with_headers(
            Method::POST,
            "api/v3/device/ctrl/ptz/reset",
            &headers,
            None,
            &site,
        )
        .await
}

/// Starts or stops a movement through the device action interface.
///
/// Used by models that do not take [`start_ptz_control`]. `command` is one
/// of `up`, `down`, `left`, `right`, `upleft`, `downleft`, `upright`,
/// `downright`; `speed` runs 1 to 7. `task_id` defaults to `default_task`.
///
/// # Errors
///
/// - `EzvizError::RegionRestricted`: client is not bound to `cn`.
/// - `EzvizError::MissingParameter`: `device_serial` or `command` is empty.
/// - `EzvizError::Api`: `meta.code` is not 200.
pub async fn control_ptz(
    client: &EzvizClient,
    device_serial: &str,
    command: &str,
    action: PtzAction,
    speed: u32,
    task_id: Option<&str>,
) -> Result<Value> {
    const API: &str = "control_ptz";
    client.require_region(Region::Cn, API)?;
    require("deviceSerial", device_serial)?;
    require("command", command)?;
    let headers = [
        ("deviceSerial", device_serial.to_string()),
        ("localIndex", "0".to_string()),
        ("resourceCategory", "global".to_string()),
        ("domainIdentifier", "PTZManualCtrl".to_string()),
        ("actionIdentifier", "ModifyPTZCtrl".to_string()),
    ];
    let body = json!({
        "timeStamp": chrono::Utc::now().timestamp_millis().to_string(),
        "action": action.as_str(),
        "control": "ptz",
        "command": command,
        "speed": speed,
        "taskID": task_id.unwrap_or("default_task"),
    });
    let site = CallSite::new(API, device_serial).format(ResponseFormat::Meta);
    client
        .call_with_headers(
            Method::PUT,
            "api/v3/device/otap/action",
            &headers,
            Some(&body),
            &site,
        )
        .await
}
