use std::collections::BTreeMap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use tracing::debug;

use crate::error::WsError;
use crate::fs_util;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Node metadata as the blob store reports it. The embedded `status` field
/// is the store's own verdict on the node, independent of the HTTP status.
#[derive(Debug, Clone, Deserialize)]
pub struct BlobNode {
    pub status: i64,
    #[serde(default)]
    pub data: Option<BlobNodeData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlobNodeData {
    pub id: String,
    #[serde(default)]
    pub file: Option<BlobFile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlobFile {
    pub name: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub checksum: BTreeMap<String, String>,
}

/// Seam over the blob store, mirroring the transport seam.
pub trait BlobStore: Send + Sync {
    /// Fetch node metadata, gating on the store's status field: 401 and 404
    /// are terminal failure states for the node itself.
    fn node(&self, node_id: &str) -> Result<BlobNode, WsError>;

    /// Stream a node's raw bytes to an explicit destination path.
    fn download(&self, node_id: &str, dest: &Path) -> Result<(), WsError>;

    /// Download a node into `save_dir` under its declared file name and
    /// return the final path.
    fn download_to_dir(&self, node_id: &str, save_dir: &Path) -> Result<PathBuf, WsError>;
}

pub struct HttpBlobStore {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpBlobStore {
    pub fn new(base_url: &str, token: Option<&str>) -> Result<Self, WsError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("kbase-ws-client/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| WsError::Http(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|err| WsError::Http(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(str::to_string),
        })
    }

    fn node_url(&self, node_id: &str) -> String {
        format!("{}/shock-api/node/{}", self.base_url, node_id)
    }

    fn get(&self, url: &str) -> Result<reqwest::blocking::Response, WsError> {
        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            // The blob store wants the OAuth prefix, unlike the workspace.
            request = request.header(AUTHORIZATION, format!("OAuth {token}"));
        }
        request.send().map_err(|err| WsError::Http(err.to_string()))
    }

    fn stream_raw(&self, node_id: &str, dest: &Path) -> Result<(), WsError> {
        let url = format!("{}?download_raw", self.node_url(node_id));
        debug!(node_id, dest = %dest.display(), "blob download");
        let mut response = self.get(&url)?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().unwrap_or_default();
            return Err(WsError::Http(format!(
                "blob store returned {status}: {text}"
            )));
        }
        let mut file = File::create(dest).map_err(|err| WsError::Filesystem(err.to_string()))?;
        io::copy(&mut response, &mut file).map_err(|err| WsError::Filesystem(err.to_string()))?;
        Ok(())
    }
}

/// Apply the store's own status verdict: 401 and 404 are terminal for the
/// node, anything else passes through.
fn gate_node(node: BlobNode, node_id: &str) -> Result<BlobNode, WsError> {
    match node.status {
        401 => Err(WsError::UnauthorizedBlobAccess(node_id.to_string())),
        404 => Err(WsError::MissingBlob(node_id.to_string())),
        _ => Ok(node),
    }
}

/// The declared name is server-controlled; anything that would resolve
/// outside the save directory is rejected.
fn validate_blob_file_name(name: &str) -> Result<(), WsError> {
    if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
        return Err(WsError::Filesystem(format!(
            "blob file name path traversal detected: {name}"
        )));
    }
    Ok(())
}

impl BlobStore for HttpBlobStore {
    fn node(&self, node_id: &str) -> Result<BlobNode, WsError> {
        let response = self.get(&self.node_url(node_id))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().unwrap_or_default();
            return Err(WsError::Http(format!(
                "blob store returned {status}: {text}"
            )));
        }
        let node: BlobNode = response
            .json()
            .map_err(|err| WsError::decode("shock node", err))?;
        gate_node(node, node_id)
    }

    fn download(&self, node_id: &str, dest: &Path) -> Result<(), WsError> {
        fs_util::validate_file_for_writing(dest)?;
        self.node(node_id)?;
        self.stream_raw(node_id, dest)
    }

    fn download_to_dir(&self, node_id: &str, save_dir: &Path) -> Result<PathBuf, WsError> {
        let node = self.node(node_id)?;
        let name = node
            .data
            .and_then(|data| data.file)
            .map(|file| file.name)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| WsError::decode("shock node", "node has no declared file name"))?;
        validate_blob_file_name(&name)?;
        let dest = save_dir.join(name);
        fs_util::validate_file_for_writing(&dest)?;
        self.stream_raw(node_id, &dest)?;
        Ok(dest)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    fn node_with_status(status: i64) -> BlobNode {
        serde_json::from_value(json!({"status": status})).unwrap()
    }

    #[test]
    fn gate_maps_401_to_unauthorized() {
        let err = gate_node(node_with_status(401), "35f7f3a0").unwrap_err();
        assert_matches!(err, WsError::UnauthorizedBlobAccess(id) => {
            assert_eq!(id, "35f7f3a0");
        });
    }

    #[test]
    fn gate_maps_404_to_missing() {
        let err = gate_node(node_with_status(404), "35f7f3a0").unwrap_err();
        assert_matches!(err, WsError::MissingBlob(id) => {
            assert_eq!(id, "35f7f3a0");
        });
    }

    #[test]
    fn gate_passes_other_statuses_through() {
        let node = gate_node(node_with_status(200), "35f7f3a0").unwrap();
        assert_eq!(node.status, 200);
    }

    #[test]
    fn file_name_traversal_is_rejected() {
        for bad in ["../escape.fa", "..\\escape.fa", "/etc/cron.d/x", "a/b.fa", ".", ".."] {
            let err = validate_blob_file_name(bad).unwrap_err();
            assert_matches!(err, WsError::Filesystem(msg) => {
                assert!(msg.contains("path traversal"));
            });
        }
    }

    #[test]
    fn plain_file_names_are_accepted() {
        for good in ["assembly.fa", "reads_fwd.fastq", "..hidden", "a b.fa"] {
            validate_blob_file_name(good).unwrap();
        }
    }

    #[test]
    fn node_metadata_decodes() {
        let node: BlobNode = serde_json::from_value(json!({
            "status": 200,
            "data": {
                "id": "35f7f3a0",
                "file": {"name": "assembly.fa", "size": 2048, "checksum": {"md5": "aa11"}}
            }
        }))
        .unwrap();
        assert_eq!(node.status, 200);
        let file = node.data.unwrap().file.unwrap();
        assert_eq!(file.name, "assembly.fa");
        assert_eq!(file.size, Some(2048));
        assert_eq!(file.checksum["md5"], "aa11");
    }

    #[test]
    fn node_metadata_tolerates_missing_data() {
        let node: BlobNode = serde_json::from_value(json!({"status": 404})).unwrap();
        assert_eq!(node.status, 404);
        assert!(node.data.is_none());
    }
}
