use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::WsError;

pub const RPC_VERSION: &str = "1.1";
pub const ADMIN_METHOD: &str = "Workspace.administer";

/// A JSON-RPC 1.1 request as the workspace service expects it: a single
/// positional parameter object wrapped in a one-element array.
#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest {
    pub version: &'static str,
    pub method: String,
    pub params: [Value; 1],
}

impl RpcRequest {
    pub fn new(method: &str, params: Value) -> Self {
        Self {
            version: RPC_VERSION,
            method: method.to_string(),
            params: [params],
        }
    }

    /// Admin commands nest the real method and params under the fixed
    /// administer entry point.
    pub fn admin(command: &str, params: Value) -> Self {
        Self::new(ADMIN_METHOD, json!({ "command": command, "params": params }))
    }

}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Vec<Value>>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Interpret an RPC response body given its HTTP status. A success response
/// always carries a non-empty `result` array; anything else is a protocol
/// error carrying the raw body for diagnosis.
pub fn interpret_response(status: u16, body: &str) -> Result<Value, WsError> {
    if !(200..300).contains(&status) {
        return Err(protocol_error(status, body));
    }
    let parsed: RpcResponse = match serde_json::from_str(body) {
        Ok(parsed) => parsed,
        Err(_) => return Err(protocol_error(status, body)),
    };
    if parsed.error.is_some() {
        return Err(protocol_error(status, body));
    }
    match parsed.result {
        Some(mut rows) if !rows.is_empty() => Ok(rows.remove(0)),
        _ => Err(protocol_error(status, body)),
    }
}

pub(crate) fn protocol_error(status: u16, body: &str) -> WsError {
    let message = serde_json::from_str::<RpcResponse>(body)
        .ok()
        .and_then(|resp| resp.error)
        .and_then(|err| err.message);
    WsError::Protocol {
        status,
        body: body.to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn request_shape() {
        let request = RpcRequest::new("Workspace.get_objects2", json!({"objects": []}));
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["version"], "1.1");
        assert_eq!(value["method"], "Workspace.get_objects2");
        assert_eq!(value["params"], json!([{"objects": []}]));
        assert!(value.get("id").is_none());
    }

    #[test]
    fn admin_request_nests_command() {
        let request = RpcRequest::admin("listObjects", json!({"ids": [1]}));
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["method"], "Workspace.administer");
        assert_eq!(
            value["params"],
            json!([{"command": "listObjects", "params": {"ids": [1]}}])
        );
    }

    #[test]
    fn success_unwraps_first_result() {
        let result = interpret_response(200, r#"{"result": [{"infos": []}]}"#).unwrap();
        assert_eq!(result, json!({"infos": []}));
    }

    #[test]
    fn error_key_is_a_protocol_error() {
        let err = interpret_response(
            200,
            r#"{"error": {"code": -32500, "message": "Object 0 cannot be accessed"}}"#,
        )
        .unwrap_err();
        assert_matches!(err, WsError::Protocol { status: 200, message: Some(msg), .. } => {
            assert_eq!(msg, "Object 0 cannot be accessed");
        });
    }

    #[test]
    fn missing_result_is_a_protocol_error() {
        let err = interpret_response(200, r#"{"ok": true}"#).unwrap_err();
        assert_matches!(err, WsError::Protocol { status: 200, message: None, .. });
    }

    #[test]
    fn empty_result_is_a_protocol_error() {
        let err = interpret_response(200, r#"{"result": []}"#).unwrap_err();
        assert_matches!(err, WsError::Protocol { .. });
    }

    #[test]
    fn bad_status_wins_over_body() {
        let err = interpret_response(500, "Internal Server Error").unwrap_err();
        assert_matches!(err, WsError::Protocol { status: 500, body, .. } => {
            assert_eq!(body, "Internal Server Error");
        });
    }

    #[test]
    fn malformed_body_is_a_protocol_error() {
        let err = interpret_response(200, "not json").unwrap_err();
        assert_matches!(err, WsError::Protocol { status: 200, .. });
    }
}
