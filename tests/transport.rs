use assert_matches::assert_matches;
use serde_json::json;

use kbase_ws_client::WsError;
use kbase_ws_client::transport::{HttpTransport, Transport};

// Unroutable on purpose: these tests must fail before or at the socket,
// never against a real service.
const DEAD_URL: &str = "http://127.0.0.1:9/services/ws";

#[test]
fn download_refuses_existing_destination_before_any_network() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out.json");
    std::fs::write(&dest, b"occupied").unwrap();

    let transport = HttpTransport::new(DEAD_URL, None).unwrap();
    let err = transport
        .call_download("Workspace.get_objects2", json!({}), &dest)
        .unwrap_err();
    // A network attempt against the dead URL would have produced Http.
    assert_matches!(err, WsError::Filesystem(msg) => {
        assert!(msg.contains("already exists"));
    });
    assert_eq!(std::fs::read(&dest).unwrap(), b"occupied");
}

#[test]
fn download_probes_writability_before_any_network() {
    let transport = HttpTransport::new(DEAD_URL, None).unwrap();
    let err = transport
        .call_download(
            "Workspace.get_objects2",
            json!({}),
            std::path::Path::new("/no-such-dir/out.json"),
        )
        .unwrap_err();
    assert_matches!(err, WsError::Filesystem(_));
}

#[test]
fn download_to_valid_path_reaches_the_network() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out.json");
    let transport = HttpTransport::new(DEAD_URL, None).unwrap();
    let err = transport
        .call_download("Workspace.get_objects2", json!({}), &dest)
        .unwrap_err();
    assert_matches!(err, WsError::Http(_));
}

#[test]
fn json_call_against_dead_service_is_an_http_error() {
    let transport = HttpTransport::new(DEAD_URL, None).unwrap();
    let err = transport
        .call("Workspace.list_workspace_info", json!({}))
        .unwrap_err();
    assert_matches!(err, WsError::Http(_));
}

#[test]
fn base_url_is_normalized() {
    let transport = HttpTransport::new("https://ci.kbase.us/services/ws/", None).unwrap();
    assert_eq!(transport.url(), "https://ci.kbase.us/services/ws");
}
