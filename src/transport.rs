use std::fs::File;
use std::io;
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use tracing::debug;

use crate::envelope::{self, RpcRequest};
use crate::error::WsError;
use crate::fs_util;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Seam between the client and the wire. The HTTP implementation below is
/// the real thing; tests script their own.
pub trait Transport: Send + Sync {
    /// Issue a workspace RPC and return the unwrapped first result value.
    fn call(&self, method: &str, params: Value) -> Result<Value, WsError>;

    /// Issue a privileged command through the administer entry point.
    fn call_admin(&self, command: &str, params: Value) -> Result<Value, WsError>;

    /// Issue a workspace RPC and stream the response body to `dest` instead
    /// of parsing it. `dest` must not exist and must be writable; this is
    /// checked before any network call. Once streaming starts, only the
    /// HTTP status can signal failure.
    fn call_download(&self, method: &str, params: Value, dest: &Path) -> Result<(), WsError>;

    /// Admin variant of `call_download`.
    fn call_admin_download(&self, command: &str, params: Value, dest: &Path)
    -> Result<(), WsError>;

    /// POST a raw JSON-RPC payload to an arbitrary sibling service and
    /// interpret the response envelope. Used for the handle service.
    fn call_service(&self, url: &str, payload: &Value) -> Result<Value, WsError>;
}

pub struct HttpTransport {
    client: Client,
    url: String,
    token: Option<String>,
}

impl HttpTransport {
    pub fn new(url: &str, token: Option<&str>) -> Result<Self, WsError> {
        Self::with_timeout(url, token, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(url: &str, token: Option<&str>, timeout: Duration) -> Result<Self, WsError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("kbase-ws-client/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| WsError::Http(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| WsError::Http(err.to_string()))?;
        Ok(Self {
            client,
            url: url.trim_end_matches('/').to_string(),
            token: token.map(str::to_string),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn post(&self, url: &str, body: String) -> Result<reqwest::blocking::Response, WsError> {
        let mut request = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, token);
        }
        request.send().map_err(|err| WsError::Http(err.to_string()))
    }

    fn post_json(&self, request: &RpcRequest) -> Result<Value, WsError> {
        debug!(method = %request.method, "workspace rpc");
        let body = serde_json::to_string(request).map_err(|err| WsError::Http(err.to_string()))?;
        let response = self.post(&self.url, body)?;
        let status = response.status().as_u16();
        let text = response.text().map_err(|err| WsError::Http(err.to_string()))?;
        envelope::interpret_response(status, &text)
    }

    fn post_download(&self, request: &RpcRequest, dest: &Path) -> Result<(), WsError> {
        fs_util::validate_file_for_writing(dest)?;
        debug!(method = %request.method, dest = %dest.display(), "workspace rpc download");
        let body = serde_json::to_string(request).map_err(|err| WsError::Http(err.to_string()))?;
        let mut response = self.post(&self.url, body)?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().unwrap_or_default();
            return Err(envelope::protocol_error(status, &text));
        }
        let mut file = File::create(dest).map_err(|err| WsError::Filesystem(err.to_string()))?;
        io::copy(&mut response, &mut file).map_err(|err| WsError::Filesystem(err.to_string()))?;
        Ok(())
    }
}

impl Transport for HttpTransport {
    fn call(&self, method: &str, params: Value) -> Result<Value, WsError> {
        self.post_json(&RpcRequest::new(method, params))
    }

    fn call_admin(&self, command: &str, params: Value) -> Result<Value, WsError> {
        self.post_json(&RpcRequest::admin(command, params))
    }

    fn call_download(&self, method: &str, params: Value, dest: &Path) -> Result<(), WsError> {
        self.post_download(&RpcRequest::new(method, params), dest)
    }

    fn call_admin_download(
        &self,
        command: &str,
        params: Value,
        dest: &Path,
    ) -> Result<(), WsError> {
        self.post_download(&RpcRequest::admin(command, params), dest)
    }

    fn call_service(&self, url: &str, payload: &Value) -> Result<Value, WsError> {
        debug!(%url, "sibling service rpc");
        let body = serde_json::to_string(payload).map_err(|err| WsError::Http(err.to_string()))?;
        let response = self.post(url, body)?;
        let status = response.status().as_u16();
        let text = response.text().map_err(|err| WsError::Http(err.to_string()))?;
        envelope::interpret_response(status, &text)
    }
}
