//! Integration tests for the device endpoint family using wiremock.
//!
//! The client holds an injected token, so only the device API is mocked.
//! Each test checks the form fields the platform receives and how the
//! response envelope is mapped.

use ezviz_openapi::auth::TokenProvider;
use ezviz_openapi::client::EzvizClient;
use ezviz_openapi::devices::*;
use ezviz_openapi::envelope::Envelope;
use ezviz_openapi::error::EzvizError;
use ezviz_openapi::region::Region;
use reqwest::Method;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper: creates a cn-region client pointed at the given wiremock server.
fn mock_client(server: &MockServer) -> EzvizClient {
    EzvizClient::with_base_url(TokenProvider::with_token("mock-token"), &server.uri())
}

fn regional_client(server: &MockServer, region: Region) -> EzvizClient {
    let tp = TokenProvider::with_token("mock-token").with_region(region);
    EzvizClient::with_base_url(tp, &server.uri())
}

// ── add_device ─────────────────────────────────────────────────────────

#[tokio::test]
async fn add_device_returns_envelope_unchanged() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    Mock::given(method("POST"))
        .and(path("/api/lapp/device/add"))
        .and(body_string_contains("accessToken=mock-token"))
        .and(body_string_contains("deviceSerial=427734888"))
        .and(body_string_contains("validateCode=ABCDEF"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": "200",
            "msg": "Operation succeeded!"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let resp = add_device(&client, "427734888", "ABCDEF").await.unwrap();
    assert_eq!(
        resp,
        serde_json::json!({"code": "200", "msg": "Operation succeeded!"})
    );
}

#[tokio::test]
async fn add_device_failure_is_api_error_with_remark() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    Mock::given(method("POST"))
        .and(path("/api/lapp/device/add"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": "20010",
            "msg": "设备验证码错误"
        })))
        .mount(&server)
        .await;

    let err = add_device(&client, "427734888", "WRONG1").await.unwrap_err();
    match err {
        EzvizError::Api { code, message, remark } => {
            assert_eq!(code, "20010");
            assert_eq!(message, "设备验证码错误");
            assert_eq!(remark, "wrong verification code");
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}

#[tokio::test]
async fn add_device_with_empty_serial_sends_nothing() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = add_device(&client, "", "ABCDEF").await.unwrap_err();
    assert!(matches!(err, EzvizError::MissingParameter("deviceSerial")));

    let err = add_device(&client, "427734888", "").await.unwrap_err();
    assert!(matches!(err, EzvizError::MissingParameter("validateCode")));
}

#[tokio::test]
async fn not_supported_code_is_device_not_supported() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    Mock::given(method("POST"))
        .and(path("/api/lapp/device/defence/set"))
        .and(body_string_contains("isDefence=1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": "60020",
            "msg": "不支持该命令"
        })))
        .mount(&server)
        .await;

    let err = set_device_defence(&client, "427734888", true).await.unwrap_err();
    match err {
        EzvizError::DeviceNotSupported { code, device_serial, api_name, .. } => {
            assert_eq!(code, "60020");
            assert_eq!(device_serial, "427734888");
            assert_eq!(api_name, "set_device_defence");
        }
        other => panic!("expected DeviceNotSupported, got: {other:?}"),
    }
}

#[tokio::test]
async fn http_error_without_json_is_http_error() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    Mock::given(method("POST"))
        .and(path("/api/lapp/device/delete"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .mount(&server)
        .await;

    let err = delete_device(&client, "427734888").await.unwrap_err();
    match err {
        EzvizError::Http { status, body } => {
            assert_eq!(status.as_u16(), 503);
            assert_eq!(body, "Service Unavailable");
        }
        other => panic!("expected Http error, got: {other:?}"),
    }
}

// ── listing ────────────────────────────────────────────────────────────

#[tokio::test]
async fn list_devices_by_page_passes_pagination_verbatim() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    Mock::given(method("POST"))
        .and(path("/api/lapp/device/list"))
        .and(body_string_contains("pageStart=3"))
        .and(body_string_contains("pageSize=50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": "200",
            "msg": "操作成功!",
            "page": {"total": 151, "page": 3, "size": 50},
            "data": [
                {"deviceSerial": "C00000001", "deviceName": "Hall", "status": 1, "defence": 0},
                {"deviceSerial": "C00000002", "status": 0}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let resp = list_devices_by_page(&client, 3, 50).await.unwrap();
    let env: Envelope<Vec<Device>> = Envelope::from_value(resp).unwrap();
    let devices = env.data.unwrap();
    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0].device_name.as_deref(), Some("Hall"));
    assert_eq!(devices[1].status, Some(0));
    assert_eq!(env.page.unwrap().total, 151);
}

#[tokio::test]
async fn out_of_range_page_size_is_forwarded_to_platform() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    Mock::given(method("POST"))
        .and(path("/api/lapp/device/list"))
        .and(body_string_contains("pageSize=500"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": "10001",
            "msg": "参数错误"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = list_devices_by_page(&client, 0, 500).await.unwrap_err();
    assert_eq!(err.code(), Some("10001"));
}

#[tokio::test]
async fn list_devices_by_id_sends_id_field() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    Mock::given(method("POST"))
        .and(path("/api/lapp/device/list"))
        .and(body_string_contains("id=0"))
        .and(body_string_contains("pageSize=10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": "200", "msg": "操作成功!", "data": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    list_devices_by_id(&client, "0", 10).await.unwrap();
}

#[tokio::test]
async fn capture_image_omits_unset_quality() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    Mock::given(method("POST"))
        .and(path("/api/lapp/device/capture"))
        .and(body_string_contains("channelNo=1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": "200",
            "msg": "操作成功!",
            "data": {"picUrl": "https://example.invalid/snap.jpg"}
        })))
        .mount(&server)
        .await;

    let resp = capture_image(&client, "427734888", 1, None).await.unwrap();
    assert_eq!(resp["data"]["picUrl"], "https://example.invalid/snap.jpg");

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8(requests[0].body.clone()).unwrap();
    let fields: Vec<(String, String)> = serde_urlencoded::from_str(&body).unwrap();
    assert!(fields.iter().all(|(k, _)| k != "quality"));
}

// ── cn-only endpoints ──────────────────────────────────────────────────

#[tokio::test]
async fn cn_only_endpoint_outside_cn_is_region_restricted() {
    let server = MockServer::start().await;
    let client = regional_client(&server, Region::Us);

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = search_device_info(&client, "427734888", None, Method::POST)
        .await
        .unwrap_err();
    match err {
        EzvizError::RegionRestricted { api_name, required, actual } => {
            assert_eq!(api_name, "search_device_info");
            assert_eq!(required, Region::Cn);
            assert_eq!(actual, Region::Us);
        }
        other => panic!("expected RegionRestricted, got: {other:?}"),
    }

    let err = get_device_connection_info(&client, "427734888").await.unwrap_err();
    assert!(matches!(err, EzvizError::RegionRestricted { .. }));

    for err in [
        update_camera_name(&client, "427734888", "Yard", None).await.unwrap_err(),
        get_device_channel_status(&client, "427734888").await.unwrap_err(),
        get_device_realtime_status(&client, "427734888").await.unwrap_err(),
    ] {
        assert!(matches!(err, EzvizError::RegionRestricted { actual: Region::Us, .. }));
    }
}

#[tokio::test]
async fn search_device_info_accepts_informational_codes() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    Mock::given(method("POST"))
        .and(path("/api/v3/device/searchDeviceInfo"))
        .and(body_string_contains("deviceSerial=427734888"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "result": {"code": "20023", "msg": "设备未注册", "data": null}
        })))
        .mount(&server)
        .await;

    let resp = search_device_info(&client, "427734888", None, Method::POST)
        .await
        .unwrap();
    assert_eq!(resp["result"]["code"], "20023");
}

#[tokio::test]
async fn search_device_info_failure_reads_result_code() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    Mock::given(method("POST"))
        .and(path("/api/v3/device/searchDeviceInfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "result": {"code": "20014", "msg": "deviceSerial不合法"}
        })))
        .mount(&server)
        .await;

    let err = search_device_info(&client, "BAD", Some("CS-C6N"), Method::POST)
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some("20014"));
    assert_eq!(err.message(), Some("deviceSerial不合法"));
}

#[tokio::test]
async fn search_device_info_over_get_sends_query_fields() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    Mock::given(method("GET"))
        .and(path("/api/v3/device/searchDeviceInfo"))
        .and(query_param("accessToken", "mock-token"))
        .and(query_param("deviceSerial", "427734888"))
        .and(query_param("model", "CS-C6N"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "result": {"code": "20029", "msg": "设备在线，未被用户添加"},
            "data": {"displayName": "C6N"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let resp = search_device_info(&client, "427734888", Some("CS-C6N"), Method::GET)
        .await
        .unwrap();
    assert_eq!(resp["result"]["code"], "20029");
}

#[tokio::test]
async fn support_check_defaults_app_key_to_client_key() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    Mock::given(method("POST"))
        .and(path("/api/lapp/device/support/ezviz"))
        .and(body_string_contains("appKey=custom-key"))
        .and(body_string_contains("model=CS-C6N"))
        .and(body_string_contains("version=V5.3.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": "200", "msg": "操作成功!", "data": {"isSupport": 1}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let resp = is_device_support_ezviz(&client, "CS-C6N", "V5.3.0", Some("custom-key"))
        .await
        .unwrap();
    assert_eq!(resp["data"]["isSupport"], 1);
}

// ── simple per-device lookups ──────────────────────────────────────────

#[tokio::test]
async fn per_device_endpoints_post_serial_and_token() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    for endpoint in [
        "/api/lapp/device/name/update",
        "/api/lapp/device/camera/list",
        "/api/lapp/device/capacity",
        "/api/lapp/device/status/get",
    ] {
        Mock::given(method("POST"))
            .and(path(endpoint))
            .and(body_string_contains("accessToken=mock-token"))
            .and(body_string_contains("deviceSerial=427734888"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": "200", "msg": "操作成功!", "data": {}
            })))
            .expect(1)
            .mount(&server)
            .await;
    }

    update_device_name(&client, "427734888", "Garage").await.unwrap();
    get_device_camera_list(&client, "427734888").await.unwrap();
    get_device_capacity(&client, "427734888").await.unwrap();
    get_device_status(&client, "427734888", 1).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let rename = String::from_utf8(requests[0].body.clone()).unwrap();
    assert!(rename.contains("deviceName=Garage"));
    let status = String::from_utf8(requests[3].body.clone()).unwrap();
    assert!(status.contains("channelNo=1"));
}

#[tokio::test]
async fn camera_list_parses_channels() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    Mock::given(method("POST"))
        .and(path("/api/lapp/camera/list"))
        .and(body_string_contains("pageStart=0"))
        .and(body_string_contains("pageSize=2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": "200",
            "msg": "操作成功!",
            "page": {"total": 1, "page": 0, "size": 2},
            "data": [{"deviceSerial": "427734888", "channelNo": 1, "channelName": "Yard"}]
        })))
        .mount(&server)
        .await;

    let resp = get_camera_list(&client, 0, 2).await.unwrap();
    let cameras: Vec<Camera> = Envelope::from_value(resp).unwrap().data.unwrap();
    assert_eq!(cameras[0].channel_no, 1);
    assert_eq!(cameras[0].channel_name.as_deref(), Some("Yard"));
}

// ── channels and NVR links ─────────────────────────────────────────────

#[tokio::test]
async fn update_camera_name_sends_channel_when_given() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    Mock::given(method("POST"))
        .and(path("/api/lapp/camera/name/update"))
        .and(body_string_contains("deviceSerial=427734888"))
        .and(body_string_contains("name=Yard"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": "200", "msg": "操作成功!"
        })))
        .expect(2)
        .mount(&server)
        .await;

    update_camera_name(&client, "427734888", "Yard", Some(2)).await.unwrap();
    update_camera_name(&client, "427734888", "Yard", None).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let with_channel = String::from_utf8(requests[0].body.clone()).unwrap();
    assert!(with_channel.contains("channelNo=2"));
    let without = String::from_utf8(requests[1].body.clone()).unwrap();
    assert!(!without.contains("channelNo"));
}

#[tokio::test]
async fn update_camera_name_missing_channel_has_remark() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    Mock::given(method("POST"))
        .and(path("/api/lapp/camera/name/update"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": "20032", "msg": "该用户下通道不存在"
        })))
        .mount(&server)
        .await;

    let err = update_camera_name(&client, "427734888", "Yard", Some(9))
        .await
        .unwrap_err();
    assert!(
        matches!(err, EzvizError::Api { ref remark, .. } if remark.contains("channel")),
        "got: {err:?}"
    );
}

#[tokio::test]
async fn add_ipc_device_posts_ipc_fields() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    Mock::given(method("POST"))
        .and(path("/api/lapp/device/ipc/add"))
        .and(body_string_contains("accessToken=mock-token"))
        .and(body_string_contains("deviceSerial=NVR000001"))
        .and(body_string_contains("ipcSerial=427734888"))
        .and(body_string_contains("channelNo=3"))
        .and(body_string_contains("validateCode=ABCDEF"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": "200", "msg": "操作成功!"
        })))
        .expect(1)
        .mount(&server)
        .await;

    add_ipc_device(&client, "NVR000001", "427734888", Some(3), Some("ABCDEF"))
        .await
        .unwrap();
}

#[tokio::test]
async fn add_ipc_stream_failure_has_remark() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    Mock::given(method("POST"))
        .and(path("/api/lapp/device/ipc/add"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": "60055", "msg": "设备取流异常"
        })))
        .mount(&server)
        .await;

    let err = add_ipc_device(&client, "NVR000001", "427734888", None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EzvizError::Api { ref remark, .. } if remark.contains("IPC stream")));
}

#[tokio::test]
async fn delete_ipc_device_requires_ipc_serial() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    Mock::given(method("POST"))
        .and(path("/api/lapp/device/ipc/delete"))
        .and(body_string_contains("ipcSerial=427734888"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": "200", "msg": "操作成功!"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = delete_ipc_device(&client, "NVR000001", " ", None).await.unwrap_err();
    assert!(matches!(err, EzvizError::MissingParameter("ipcSerial")));
    delete_ipc_device(&client, "NVR000001", "427734888", None).await.unwrap();
}

#[tokio::test]
async fn channel_status_sends_serial_header_and_reads_result() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    Mock::given(method("GET"))
        .and(path("/api/v3/open/device/metadata/channel/status"))
        .and(header("accessToken", "mock-token"))
        .and(header("deviceSerial", "NVR000001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "result": {"code": "200", "msg": "操作成功"},
            "data": [{"channelNo": 1, "status": 1}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v3/open/device/metadata/channel/status"))
        .and(header("deviceSerial", "NVR000002"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "result": {"code": "20018", "msg": "该用户不拥有该设备"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let resp = get_device_channel_status(&client, "NVR000001").await.unwrap();
    assert_eq!(resp["data"][0]["status"], 1);

    let err = get_device_channel_status(&client, "NVR000002").await.unwrap_err();
    assert_eq!(err.code(), Some("20018"));
}

// ── encryption ─────────────────────────────────────────────────────────

#[tokio::test]
async fn encrypt_switches_post_to_their_paths() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    for endpoint in ["/api/lapp/device/encrypt/off", "/api/lapp/device/encrypt/on"] {
        Mock::given(method("POST"))
            .and(path(endpoint))
            .and(body_string_contains("accessToken=mock-token"))
            .and(body_string_contains("deviceSerial=427734888"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": "200", "msg": "操作成功!"
            })))
            .expect(1)
            .mount(&server)
            .await;
    }

    set_device_encrypt_off(&client, "427734888").await.unwrap();
    set_device_encrypt_on(&client, "427734888").await.unwrap();
}

#[tokio::test]
async fn encrypt_already_in_state_has_remark() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    Mock::given(method("POST"))
        .and(path("/api/lapp/device/encrypt/off"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": "60016", "msg": "加密开关已是关闭状态"
        })))
        .mount(&server)
        .await;

    let err = set_device_encrypt_off(&client, "427734888").await.unwrap_err();
    assert_eq!(err.code(), Some("60016"));
    assert!(matches!(err, EzvizError::Api { ref remark, .. } if remark.contains("encryption")));
}

#[tokio::test]
async fn update_device_password_posts_both_passwords() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    Mock::given(method("POST"))
        .and(path("/api/lapp/device/password/update"))
        .and(body_string_contains("oldPassword=ABCDEF"))
        .and(body_string_contains("newPassword=n3w-pass"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": "200", "msg": "操作成功!"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = update_device_password(&client, "427734888", "ABCDEF", "")
        .await
        .unwrap_err();
    assert!(matches!(err, EzvizError::MissingParameter("newPassword")));

    update_device_password(&client, "427734888", "ABCDEF", "n3w-pass")
        .await
        .unwrap();
}

// ── userdevice v3 ──────────────────────────────────────────────────────

#[tokio::test]
async fn permission_check_sends_optional_query_fields() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    Mock::given(method("GET"))
        .and(path("/api/userdevice/v3/devices/op/permission"))
        .and(query_param("accessToken", "mock-token"))
        .and(query_param("deviceSerial", "427734888"))
        .and(query_param("ssid", "home-wifi"))
        .and(query_param("clientIP", "203.0.113.7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "meta": {"code": 200, "message": "操作成功"},
            "status": 1
        })))
        .expect(1)
        .mount(&server)
        .await;

    let resp = device_permission_check(
        &client,
        "427734888",
        Some("home-wifi"),
        Some("203.0.113.7"),
    )
    .await
    .unwrap();
    assert_eq!(resp["status"], 1);
}

#[tokio::test]
async fn permission_check_failure_reads_meta_code() {
    let server = MockServer::start().await;
    let client = regional_client(&server, Region::Eu);

    Mock::given(method("GET"))
        .and(path("/api/userdevice/v3/devices/op/permission"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "meta": {"code": 70000, "message": "确权失败"}
        })))
        .mount(&server)
        .await;

    // Not region-restricted.
    let err = device_permission_check(&client, "427734888", None, None)
        .await
        .unwrap_err();
    match err {
        EzvizError::Api { code, message, remark } => {
            assert_eq!(code, "70000");
            assert_eq!(message, "确权失败");
            assert_eq!(remark, "permission check failed");
        }
        other => panic!("expected Api error, got: {other:?}"),
    }

    let requests = server.received_requests().await.unwrap();
    let query = requests[0].url.query().unwrap_or_default();
    assert!(!query.contains("ssid"));
    assert!(!query.contains("clientIP"));
}

#[tokio::test]
async fn realtime_status_reports_online_flag() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    Mock::given(method("GET"))
        .and(path("/api/userdevice/v3/devices/realtimestatus"))
        .and(query_param("accessToken", "mock-token"))
        .and(query_param("deviceSerial", "427734888"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "meta": {"code": 200, "message": "操作成功"},
            "status": 0
        })))
        .expect(1)
        .mount(&server)
        .await;

    let resp = get_device_realtime_status(&client, "427734888").await.unwrap();
    assert_eq!(resp["status"], 0);
}
