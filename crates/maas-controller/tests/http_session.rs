//! End-to-end session tests against a wiremock MAAS server.

use maas_controller::{
    AddFileArgs, AllocateMachineArgs, Controller, CreateDeviceArgs, MachinesArgs,
    ReleaseMachinesArgs,
};
use maas_core::config::{ControllerArgs, ControllerConfig};
use maas_core::{CallFailure, Error, ErrorKind, Params};
use reqwest::StatusCode;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header_regex, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API: &str = "/MAAS/api/2.0";

async fn mount_bootstrap(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("{API}/version/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "capabilities": ["networks-management", "static-ipaddresses"],
            "version": "2.4.2",
            "subversion": "7034-g2f5deb8b8-0ubuntu1"
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("{API}/users/")))
        .and(query_param("op", "whoami"))
        .and(header_regex("authorization", "^OAuth .*oauth_consumer_key=\"consumer\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!("admin")))
        .mount(server)
        .await;
}

fn args(server: &MockServer) -> ControllerArgs {
    ControllerArgs::new(format!("{}/MAAS/", server.uri()), "consumer:token:secret")
}

async fn connect(server: &MockServer) -> Controller {
    mount_bootstrap(server).await;
    Controller::new(args(server)).await.unwrap()
}

async fn received(server: &MockServer) -> usize {
    server.received_requests().await.unwrap_or_default().len()
}

#[tokio::test]
async fn session_bootstrap_reads_capabilities() {
    let server = MockServer::start().await;
    let controller = connect(&server).await;

    assert_eq!(controller.api_version().to_string(), "2.0");
    assert!(controller.capabilities().contains("networks-management"));
    assert!(!controller.capabilities().contains("version"));
    assert_eq!(controller.requests_issued(), 2);
}

#[tokio::test]
async fn bootstrap_from_config() {
    let server = MockServer::start().await;
    mount_bootstrap(&server).await;

    let config = ControllerConfig::new(format!("{}/MAAS/", server.uri()))
        .unwrap()
        .with_api_key("consumer:token:secret")
        .with_timeout(5);
    let controller = Controller::from_config(&config).await.unwrap();
    assert_eq!(controller.capabilities().len(), 2);

    let no_key = ControllerConfig::new(format!("{}/MAAS/", server.uri())).unwrap();
    let err = Controller::from_config(&no_key).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotValid);
}

#[tokio::test]
async fn bad_credentials_are_permission_denied() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{API}/version/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"capabilities": []})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{API}/users/")))
        .and(query_param("op", "whoami"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Invalid access token"))
        .mount(&server)
        .await;

    let err = Controller::new(args(&server)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    assert!(err.to_string().contains("Invalid access token"));
}

#[tokio::test]
async fn missing_api_is_unsupported_version() {
    let server = MockServer::start().await;

    let err = Controller::new(args(&server)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedVersion);
    assert!(err.to_string().contains(&server.uri()));
}

#[tokio::test]
async fn malformed_key_is_not_valid_without_requests() {
    let server = MockServer::start().await;

    let args = ControllerArgs::new(format!("{}/MAAS/", server.uri()), "just-a-token");
    let err = Controller::new(args).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotValid);
    assert_eq!(received(&server).await, 0);
}

#[tokio::test]
async fn primitives_normalize_paths_and_decode_json() {
    let server = MockServer::start().await;
    let controller = connect(&server).await;

    Mock::given(method("GET"))
        .and(path(format!("{API}/machines/")))
        .and(query_param("op", "list_allocated"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"system_id": "abc"}])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/tags/")))
        .and(query_param("op", "new"))
        .and(body_string_contains("name=gpu"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "gpu"})))
        .mount(&server)
        .await;

    let allocated = controller.get_op("machines", "list_allocated").await.unwrap();
    assert_eq!(allocated[0]["system_id"], "abc");

    let mut params = Params::new();
    params.add("name", "gpu");
    let tag = controller.post("tags/", "new", params).await.unwrap();
    assert_eq!(tag["name"], "gpu");

    assert_eq!(controller.requests_issued(), 4);
}

#[tokio::test]
async fn non_json_body_is_a_decode_failure() {
    let server = MockServer::start().await;
    let controller = connect(&server).await;

    Mock::given(method("GET"))
        .and(path(format!("{API}/zones/")))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = controller.get("zones").await.unwrap_err();
    assert!(matches!(err.failure, CallFailure::Decode(_)));
    assert_eq!(err.path, "zones/");
    assert!(err.status().is_none());

    let err = controller.zones().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unexpected);
}

#[tokio::test]
async fn list_operations_require_arrays() {
    let server = MockServer::start().await;
    let controller = connect(&server).await;

    Mock::given(method("GET"))
        .and(path(format!("{API}/fabrics/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 0}, {"id": 1}])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{API}/spaces/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 0})))
        .mount(&server)
        .await;

    assert_eq!(controller.fabrics().await.unwrap().len(), 2);

    let err = controller.spaces().await.unwrap_err();
    assert!(matches!(err, Error::Deserialization { .. }));
    assert_eq!(err.kind(), ErrorKind::Unexpected);
}

#[tokio::test]
async fn machines_query_sends_filters() {
    let server = MockServer::start().await;
    let controller = connect(&server).await;

    Mock::given(method("GET"))
        .and(path(format!("{API}/machines/")))
        .and(query_param("hostname", "node-1"))
        .and(query_param("zone", "rack-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"hostname": "node-1"}])))
        .expect(1)
        .mount(&server)
        .await;

    let machines = controller
        .machines(&MachinesArgs {
            hostnames: vec!["node-1".to_string()],
            zone: "rack-2".to_string(),
            ..MachinesArgs::default()
        })
        .await
        .unwrap();
    assert_eq!(machines.len(), 1);
}

#[tokio::test]
async fn allocation_conflict_is_no_match() {
    let server = MockServer::start().await;
    let controller = connect(&server).await;

    Mock::given(method("POST"))
        .and(path(format!("{API}/machines/")))
        .and(query_param("op", "allocate"))
        .and(body_string_contains("arch=arm64"))
        .respond_with(
            ResponseTemplate::new(409).set_body_string("No machine matching the constraints"),
        )
        .mount(&server)
        .await;

    let err = controller
        .allocate_machine(&AllocateMachineArgs {
            architecture: "arm64".to_string(),
            ..AllocateMachineArgs::default()
        })
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NoMatch);
    assert_eq!(err.error_code(), "NO_MATCH");
    assert!(err.to_string().contains("No machine matching the constraints"));
    assert_eq!(err.call().unwrap().status(), Some(StatusCode::CONFLICT));
}

#[tokio::test]
async fn release_failures_map_per_status() {
    let cases = [
        (400, ErrorKind::BadRequest),
        (403, ErrorKind::PermissionDenied),
        (409, ErrorKind::CannotComplete),
        (500, ErrorKind::Unexpected),
    ];

    for (status, kind) in cases {
        let server = MockServer::start().await;
        let controller = connect(&server).await;

        Mock::given(method("POST"))
            .and(path(format!("{API}/machines/")))
            .and(query_param("op", "release"))
            .and(body_string_contains("machines=abc"))
            .respond_with(ResponseTemplate::new(status).set_body_string("refused"))
            .mount(&server)
            .await;

        let err = controller
            .release_machines(&ReleaseMachinesArgs {
                system_ids: vec!["abc".to_string()],
                comment: String::new(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), kind, "status {status}");
    }
}

#[tokio::test]
async fn create_device_requires_a_mac() {
    let server = MockServer::start().await;
    let controller = connect(&server).await;
    let before = received(&server).await;

    let err = controller
        .create_device(&CreateDeviceArgs {
            hostname: "phone".to_string(),
            ..CreateDeviceArgs::default()
        })
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::BadRequest);
    assert!(err.call().is_none());
    assert_eq!(received(&server).await, before);
}

#[tokio::test]
async fn create_device_rejection_is_bad_request() {
    let server = MockServer::start().await;
    let controller = connect(&server).await;

    Mock::given(method("POST"))
        .and(path(format!("{API}/devices/")))
        .and(query_param("op", "create"))
        .respond_with(ResponseTemplate::new(400).set_body_string("Invalid MAC address"))
        .mount(&server)
        .await;

    let err = controller
        .create_device(&CreateDeviceArgs {
            mac_addresses: vec!["zz".to_string()],
            ..CreateDeviceArgs::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);
    assert!(err.to_string().contains("Invalid MAC address"));
}

#[tokio::test]
async fn file_fetch_and_delete() {
    let server = MockServer::start().await;
    let controller = connect(&server).await;

    Mock::given(method("GET"))
        .and(path(format!("{API}/files/notes.txt/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "filename": "notes.txt",
            "content": "aGVsbG8="
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{API}/files/missing/")))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("{API}/files/notes.txt/")))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let file = controller.get_file("notes.txt").await.unwrap();
    assert_eq!(file["filename"], "notes.txt");

    let err = controller.get_file("missing").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoMatch);

    let err = controller.get_file("").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotValid);

    controller.delete_file("notes.txt").await.unwrap();
}

#[tokio::test]
async fn filenames_with_url_syntax_stay_in_the_path() {
    let server = MockServer::start().await;
    let controller = connect(&server).await;

    Mock::given(method("GET"))
        .and(path(format!("{API}/files/a%3Fb/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "filename": "a?b",
            "content": ""
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("{API}/files/a%23b/")))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let file = controller.get_file("a?b").await.unwrap();
    assert_eq!(file["filename"], "a?b");
    controller.delete_file("a#b").await.unwrap();
}

#[tokio::test]
async fn files_listing_sends_prefix() {
    let server = MockServer::start().await;
    let controller = connect(&server).await;

    Mock::given(method("GET"))
        .and(path(format!("{API}/files/")))
        .and(query_param("prefix", "cloud-"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"filename": "cloud-init"}])))
        .expect(1)
        .mount(&server)
        .await;

    let files = controller.files("cloud-").await.unwrap();
    assert_eq!(files[0]["filename"], "cloud-init");
}

#[tokio::test]
async fn add_file_uploads_multipart() {
    let server = MockServer::start().await;
    let controller = connect(&server).await;

    Mock::given(method("POST"))
        .and(path(format!("{API}/files/")))
        .and(query_param("op", "create"))
        .and(body_string_contains("name=\"filename\""))
        .and(body_string_contains("notes.txt"))
        .and(body_string_contains("name=\"file\""))
        .and(body_string_contains("hello from a reader"))
        .respond_with(ResponseTemplate::new(201).set_body_string("created"))
        .expect(1)
        .mount(&server)
        .await;

    let reader = &b"hello from a reader, and more that is never read"[..];
    controller
        .add_file(AddFileArgs::from_reader("notes.txt", reader, 19))
        .await
        .unwrap();
}

#[tokio::test]
async fn add_file_rejection_is_bad_request() {
    let server = MockServer::start().await;
    let controller = connect(&server).await;

    Mock::given(method("POST"))
        .and(path(format!("{API}/files/")))
        .and(query_param("op", "create"))
        .respond_with(ResponseTemplate::new(400).set_body_string("File too large"))
        .mount(&server)
        .await;

    let err = controller
        .add_file(AddFileArgs::from_content("big.iso", vec![0; 16]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);

    let before = received(&server).await;
    let err = controller
        .add_file(AddFileArgs::from_content("dir/big.iso", vec![0; 16]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotValid);
    assert_eq!(received(&server).await, before);
}

#[tokio::test]
async fn delete_failure_is_unexpected() {
    let server = MockServer::start().await;
    let controller = connect(&server).await;

    Mock::given(method("DELETE"))
        .and(path(format!("{API}/files/locked/")))
        .respond_with(ResponseTemplate::new(500).set_body_string("database is locked"))
        .mount(&server)
        .await;

    let err = controller.delete_file("locked").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unexpected);
    assert_eq!(
        err.call().unwrap().status(),
        Some(StatusCode::INTERNAL_SERVER_ERROR)
    );
}
