//! Tests against the live CI workspace service. All ignored by default;
//! run with `cargo test -- --ignored` and a `TEST_TOKEN` env var holding a
//! CI auth token.

use serde_json::json;

use kbase_ws_client::WorkspaceClient;
use kbase_ws_client::WsError;

const URL: &str = "https://ci.kbase.us/services/ws";

fn live_client() -> WorkspaceClient {
    let token = std::env::var("TEST_TOKEN").expect("TEST_TOKEN is required for live tests");
    WorkspaceClient::new(URL, Some(&token)).unwrap()
}

#[test]
#[ignore]
fn req_fetches_an_object() {
    let client = live_client();
    let objs = client
        .req(
            "Workspace.get_objects2",
            json!({"objects": [{"ref": "15/38/4"}], "no_data": 1}),
        )
        .unwrap();
    assert!(objs["data"][0]["info"].is_array());
}

#[test]
#[ignore]
fn admin_req_fetches_an_object() {
    let client = live_client();
    let objs = client
        .admin_req(
            "getObjects",
            json!({"objects": [{"ref": "15/38/4"}], "no_data": 1}),
        )
        .unwrap();
    assert!(objs["data"][0]["info"].is_array());
}

#[test]
#[ignore]
fn admin_req_download_streams_to_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("obj.json");
    let client = live_client();
    client
        .admin_req_download(
            "getObjects",
            json!({"objects": [{"ref": "15/38/4"}], "no_data": 1}),
            &dest,
        )
        .unwrap();
    assert!(std::fs::metadata(&dest).unwrap().len() > 0);
}

#[test]
#[ignore]
fn bad_reference_is_a_protocol_error() {
    let client = live_client();
    let err = client
        .req(
            "Workspace.get_objects2",
            json!({"objects": [{"ref": "0/0/0"}], "no_data": 1}),
        )
        .unwrap_err();
    assert!(matches!(err, WsError::Protocol { .. }));
}

#[test]
#[ignore]
fn listing_a_public_workspace_yields_rows() {
    let client = live_client();
    let first = client
        .list_object_infos(15, false, true)
        .next()
        .expect("workspace 15 should not be empty")
        .unwrap();
    assert!(first.objid >= 1);
}
