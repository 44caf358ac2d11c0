use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;
use uuid::Uuid;

use crate::blob::{BlobStore, HttpBlobStore};
use crate::config::ClientConfig;
use crate::error::WsError;
use crate::listing::{IdVersionIter, ObjInfoIter, WsInfoIter};
use crate::transport::{HttpTransport, Transport};
use crate::types::{
    ASSEMBLY_TYPE, CONTIGSET_TYPE, NARRATIVE_TYPE, ObjInfo, ObjectData, ObjectRef,
    PAIRED_END_TYPE, SINGLE_END_TYPE,
};

const HANDLE_METHOD: &str = "AbstractHandle.hids_to_handles";

/// Client for one workspace service instance. Holds only fixed
/// configuration; safe to reuse sequentially, unsynchronized for
/// concurrent use.
pub struct WorkspaceClient<T = HttpTransport, B = HttpBlobStore> {
    transport: T,
    blob: B,
    url: String,
    token: Option<String>,
}

impl WorkspaceClient {
    /// Connect to the workspace service at `url` (the service root path,
    /// e.g. `https://ci.kbase.us/services/ws`) with an optional auth token.
    pub fn new(url: &str, token: Option<&str>) -> Result<Self, WsError> {
        let transport = HttpTransport::new(url, token)?;
        let blob = HttpBlobStore::new(url, token)?;
        Ok(Self::with_parts(transport, blob, url, token))
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, WsError> {
        let token = config.token.as_deref();
        let transport = HttpTransport::with_timeout(&config.url, token, config.timeout())?;
        let blob = HttpBlobStore::new(&config.url, token)?;
        Ok(Self::with_parts(transport, blob, &config.url, token))
    }
}

impl<T: Transport, B: BlobStore> WorkspaceClient<T, B> {
    /// Assemble a client from explicit parts. The main entry point for
    /// scripted transports and blob stores in tests.
    pub fn with_parts(transport: T, blob: B, url: &str, token: Option<&str>) -> Self {
        Self {
            transport,
            blob,
            url: url.trim_end_matches('/').to_string(),
            token: token.map(str::to_string),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn blob_store(&self) -> &B {
        &self.blob
    }

    // -- raw RPC pass-throughs ------------------------------------------

    pub fn req(&self, method: &str, params: Value) -> Result<Value, WsError> {
        self.transport.call(method, params)
    }

    pub fn admin_req(&self, command: &str, params: Value) -> Result<Value, WsError> {
        self.transport.call_admin(command, params)
    }

    pub fn req_download(&self, method: &str, params: Value, dest: &Path) -> Result<(), WsError> {
        self.transport.call_download(method, params, dest)
    }

    pub fn admin_req_download(
        &self,
        command: &str,
        params: Value,
        dest: &Path,
    ) -> Result<(), WsError> {
        self.transport.call_admin_download(command, params, dest)
    }

    // -- enumeration ----------------------------------------------------

    /// Lazily enumerate the workspaces visible to the caller's token, or
    /// every workspace the service knows about in admin mode.
    pub fn list_workspace_infos(&self, admin: bool) -> WsInfoIter<'_> {
        WsInfoIter::new(&self.transport, admin)
    }

    /// Lazily enumerate object metadata in one workspace. `latest` limits
    /// the listing to the newest version of each object.
    pub fn list_object_infos(&self, wsid: i64, admin: bool, latest: bool) -> ObjInfoIter<'_> {
        ObjInfoIter::new(&self.transport, wsid, admin, latest)
    }

    /// Same pagination, projected down to `(objid, version)` pairs.
    pub fn list_id_version_pairs(
        &self,
        wsid: i64,
        admin: bool,
        latest: bool,
    ) -> IdVersionIter<'_> {
        IdVersionIter(ObjInfoIter::new(&self.transport, wsid, admin, latest))
    }

    // -- reference resolution -------------------------------------------

    /// Fetch metadata only for one object reference; no payload.
    pub fn get_object_info(&self, reference: &ObjectRef, admin: bool) -> Result<ObjInfo, WsError> {
        let params = json!({
            "objects": [{"ref": reference.as_str()}],
            "includeMetadata": 1,
        });
        let (method, result) = if admin {
            ("getObjectInfo", self.transport.call_admin("getObjectInfo", params))
        } else {
            (
                "Workspace.get_object_info3",
                self.transport.call("Workspace.get_object_info3", params),
            )
        };

        #[derive(Deserialize)]
        struct InfoResult {
            infos: Vec<ObjInfo>,
        }

        let decoded: InfoResult =
            serde_json::from_value(result?).map_err(|err| WsError::decode(method, err))?;
        decoded
            .infos
            .into_iter()
            .next()
            .ok_or_else(|| WsError::decode(method, "empty infos array"))
    }

    fn get_object(
        &self,
        reference: &ObjectRef,
        included: Option<Value>,
        admin: bool,
    ) -> Result<ObjectData, WsError> {
        let mut spec = json!({"ref": reference.as_str()});
        if let Some(included) = included {
            spec["included"] = included;
        }
        let params = json!({"objects": [spec]});
        let (method, result) = if admin {
            ("getObjects", self.transport.call_admin("getObjects", params))
        } else {
            (
                "Workspace.get_objects2",
                self.transport.call("Workspace.get_objects2", params),
            )
        };

        #[derive(Deserialize)]
        struct GetObjectsResult {
            data: Vec<ObjectData>,
        }

        let decoded: GetObjectsResult =
            serde_json::from_value(result?).map_err(|err| WsError::decode(method, err))?;
        decoded
            .data
            .into_iter()
            .next()
            .ok_or_else(|| WsError::decode(method, "empty data array"))
    }

    /// Resolve a genome reference to the compound `genome;assembly`
    /// reference of its assembly, falling back to the legacy contigset
    /// field for old genome types.
    pub fn get_assembly_ref(&self, genome_ref: &ObjectRef) -> Result<ObjectRef, WsError> {
        let object = self.get_object(
            genome_ref,
            Some(json!(["assembly_ref", "contigset_ref"])),
            false,
        )?;

        #[derive(Deserialize)]
        struct GenomeRefs {
            #[serde(default)]
            assembly_ref: Option<String>,
            #[serde(default)]
            contigset_ref: Option<String>,
        }

        let refs: GenomeRefs = serde_json::from_value(object.data)
            .map_err(|err| WsError::decode("Workspace.get_objects2", err))?;
        let assembly = refs
            .assembly_ref
            .or(refs.contigset_ref)
            .ok_or_else(|| WsError::InvalidGenome(genome_ref.to_string()))?;
        let assembly: ObjectRef = assembly.parse()?;
        Ok(genome_ref.chain(&assembly))
    }

    /// Scan a workspace's object list for its narrative object. Access
    /// failures surface as remote protocol errors; a workspace without a
    /// narrative yields `None`.
    pub fn find_narrative(&self, wsid: i64, admin: bool) -> Result<Option<ObjInfo>, WsError> {
        for info in self.list_object_infos(wsid, admin, true) {
            let info = info?;
            if info.type_matches(NARRATIVE_TYPE) {
                return Ok(Some(info));
            }
        }
        Ok(None)
    }

    /// Resolve a handle ID stored inside an object to a blob-store node ID,
    /// via the handle service that lives next to the workspace.
    pub fn handle_to_blob(&self, handle_id: &str) -> Result<String, WsError> {
        let payload = json!({
            "method": HANDLE_METHOD,
            "params": [[handle_id]],
            "id": Uuid::new_v4().to_string(),
        });
        let url = self.url.replace("/ws", "/handle_service");
        let result = self.transport.call_service(&url, &payload)?;

        #[derive(Deserialize)]
        struct HandleRecord {
            id: String,
        }

        let records: Vec<HandleRecord> =
            serde_json::from_value(result).map_err(|err| WsError::decode(HANDLE_METHOD, err))?;
        records
            .into_iter()
            .next()
            .map(|record| record.id)
            .ok_or_else(|| WsError::decode(HANDLE_METHOD, "no handle record returned"))
    }

    // -- typed downloads ------------------------------------------------

    /// Download an assembly's FASTA blob into `save_dir` under its declared
    /// file name. Legacy contigsets go through the same path.
    pub fn download_assembly(
        &self,
        reference: &ObjectRef,
        save_dir: &Path,
    ) -> Result<PathBuf, WsError> {
        let object = self.get_object(reference, Some(json!(["fasta_handle_ref"])), false)?;
        if !object.info.type_matches(ASSEMBLY_TYPE) && !object.info.type_matches(CONTIGSET_TYPE) {
            return Err(WsError::InvalidWorkspaceType {
                found: object.info.type_string,
                expected: format!("{ASSEMBLY_TYPE}, {CONTIGSET_TYPE}"),
            });
        }

        #[derive(Deserialize)]
        struct AssemblyData {
            #[serde(default)]
            fasta_handle_ref: Option<String>,
        }

        let data: AssemblyData = serde_json::from_value(object.data)
            .map_err(|err| WsError::decode("Workspace.get_objects2", err))?;
        let handle = data.fasta_handle_ref.ok_or_else(|| {
            WsError::decode("Workspace.get_objects2", "assembly has no fasta_handle_ref")
        })?;
        let node_id = self.handle_to_blob(&handle)?;
        debug!(%reference, %node_id, "downloading assembly");
        self.blob.download_to_dir(&node_id, save_dir)
    }

    /// Download a reads object's FASTQ blobs into `save_dir`. Paired
    /// non-interleaved libraries produce two files, forward then reverse;
    /// interleaved and single-end libraries produce one. A failure partway
    /// leaves the already-written files in place.
    pub fn download_reads(
        &self,
        reference: &ObjectRef,
        save_dir: &Path,
    ) -> Result<Vec<PathBuf>, WsError> {
        let object = self.get_object(reference, None, false)?;
        let paired = object.info.type_matches(PAIRED_END_TYPE);
        let single = object.info.type_matches(SINGLE_END_TYPE);
        if !paired && !single {
            return Err(WsError::InvalidWorkspaceType {
                found: object.info.type_string,
                expected: format!("{PAIRED_END_TYPE}, {SINGLE_END_TYPE}"),
            });
        }

        #[derive(Deserialize)]
        struct ReadsFile {
            hid: String,
        }

        #[derive(Deserialize)]
        struct ReadsLib {
            file: ReadsFile,
        }

        #[derive(Deserialize)]
        struct ReadsData {
            #[serde(default)]
            interleaved: Option<i64>,
            #[serde(default)]
            lib: Option<ReadsLib>,
            #[serde(default)]
            lib1: Option<ReadsLib>,
            #[serde(default)]
            lib2: Option<ReadsLib>,
        }

        let data: ReadsData = serde_json::from_value(object.data)
            .map_err(|err| WsError::decode("Workspace.get_objects2", err))?;

        let mut handles = Vec::new();
        if paired {
            let lib1 = data.lib1.ok_or_else(|| {
                WsError::decode("Workspace.get_objects2", "paired-end reads without lib1")
            })?;
            handles.push(lib1.file.hid);
            if data.interleaved.unwrap_or(0) == 0 {
                let lib2 = data.lib2.ok_or_else(|| {
                    WsError::decode(
                        "Workspace.get_objects2",
                        "non-interleaved paired-end reads without lib2",
                    )
                })?;
                handles.push(lib2.file.hid);
            }
        } else {
            let lib = data.lib.ok_or_else(|| {
                WsError::decode("Workspace.get_objects2", "single-end reads without lib")
            })?;
            handles.push(lib.file.hid);
        }

        let mut paths = Vec::new();
        for handle in handles {
            let node_id = self.handle_to_blob(&handle)?;
            paths.push(self.blob.download_to_dir(&node_id, save_dir)?);
        }
        debug!(%reference, files = paths.len(), "downloaded reads");
        Ok(paths)
    }

    /// Stream one blob-store node straight to `dest`.
    pub fn download_blob(&self, node_id: &str, dest: &Path) -> Result<(), WsError> {
        self.blob.download(node_id, dest)
    }
}
