use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::WsError;

pub const NARRATIVE_TYPE: &str = "KBaseNarrative.Narrative";
pub const GENOME_TYPE: &str = "KBaseGenomes.Genome";
pub const ASSEMBLY_TYPE: &str = "KBaseGenomeAnnotations.Assembly";
pub const CONTIGSET_TYPE: &str = "KBaseGenomes.ContigSet";
pub const PAIRED_END_TYPE: &str = "KBaseFile.PairedEndLibrary";
pub const SINGLE_END_TYPE: &str = "KBaseFile.SingleEndLibrary";

/// An object address of the form `wsid/objid` or `wsid/objid/version`,
/// optionally chained with `;` to express a secondary lookup resolved from
/// within the first object. Opaque to the transport layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectRef(String);

impl ObjectRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Chain this reference to one reachable from inside it.
    pub fn chain(&self, next: &ObjectRef) -> ObjectRef {
        ObjectRef(format!("{};{}", self.0, next.0))
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ObjectRef {
    type Err = WsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(WsError::InvalidReference(value.to_string()));
        }
        for segment in trimmed.split(';') {
            let parts = segment.split('/').collect::<Vec<_>>();
            let arity_ok = parts.len() == 2 || parts.len() == 3;
            let numeric = parts
                .iter()
                .all(|part| !part.is_empty() && part.chars().all(|ch| ch.is_ascii_digit()));
            if !arity_ok || !numeric {
                return Err(WsError::InvalidReference(value.to_string()));
            }
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// Object metadata as listing and get-info calls return it. Field order
/// matches the wire tuple exactly; values pass through untransformed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjInfo {
    pub objid: i64,
    pub name: String,
    pub type_string: String,
    pub save_date: String,
    pub version: i64,
    pub saved_by: String,
    pub wsid: i64,
    pub workspace: String,
    pub checksum: String,
    pub size: i64,
    pub metadata: BTreeMap<String, String>,
}

type ObjInfoWire = (
    i64,
    String,
    String,
    String,
    i64,
    String,
    i64,
    String,
    String,
    i64,
    Option<BTreeMap<String, String>>,
);

impl<'de> Deserialize<'de> for ObjInfo {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (
            objid,
            name,
            type_string,
            save_date,
            version,
            saved_by,
            wsid,
            workspace,
            checksum,
            size,
            metadata,
        ) = ObjInfoWire::deserialize(deserializer)?;
        Ok(Self {
            objid,
            name,
            type_string,
            save_date,
            version,
            saved_by,
            wsid,
            workspace,
            checksum,
            size,
            metadata: metadata.unwrap_or_default(),
        })
    }
}

impl ObjInfo {
    /// Full `wsid/objid/version` address of this exact object version.
    pub fn object_ref(&self) -> ObjectRef {
        ObjectRef(format!("{}/{}/{}", self.wsid, self.objid, self.version))
    }

    /// Match the `Module.Type` prefix of the versioned type string
    /// (`Module.Type-X.Y`).
    pub fn type_matches(&self, prefix: &str) -> bool {
        match self.type_string.strip_prefix(prefix) {
            Some(rest) => rest.is_empty() || rest.starts_with('-'),
            None => false,
        }
    }
}

/// Workspace container metadata, in wire tuple order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WsInfo {
    pub id: i64,
    pub name: String,
    pub owner: String,
    pub moddate: String,
    pub max_objid: i64,
    pub user_permission: String,
    pub globalread: String,
    pub lockstat: String,
    pub metadata: BTreeMap<String, String>,
}

type WsInfoWire = (
    i64,
    String,
    String,
    String,
    i64,
    String,
    String,
    String,
    Option<BTreeMap<String, String>>,
);

impl<'de> Deserialize<'de> for WsInfo {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (id, name, owner, moddate, max_objid, user_permission, globalread, lockstat, metadata) =
            WsInfoWire::deserialize(deserializer)?;
        Ok(Self {
            id,
            name,
            owner,
            moddate,
            max_objid,
            user_permission,
            globalread,
            lockstat,
            metadata: metadata.unwrap_or_default(),
        })
    }
}

/// One entry of a get-objects result: the info tuple plus the object payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ObjectData {
    pub info: ObjInfo,
    pub data: Value,
}
