use serde_json::json;
use tracing::debug;

use crate::error::WsError;
use crate::transport::Transport;
use crate::types::{ObjInfo, WsInfo};

/// Objects fetched per list-objects call. The remote caps result sets at
/// this size, so a page with fewer rows is the end-of-listing signal.
pub const PAGE_SIZE: usize = 10_000;

/// Lazy pagination over one workspace's object metadata. Each advance past
/// the buffered page performs the next blocking network call; dropping the
/// iterator stops further fetches. A fresh iterator always starts at
/// object id zero.
pub struct ObjInfoIter<'a> {
    transport: &'a dyn Transport,
    wsid: i64,
    admin: bool,
    latest: bool,
    min_objid: i64,
    page: std::vec::IntoIter<ObjInfo>,
    done: bool,
}

impl<'a> ObjInfoIter<'a> {
    pub(crate) fn new(transport: &'a dyn Transport, wsid: i64, admin: bool, latest: bool) -> Self {
        Self {
            transport,
            wsid,
            admin,
            latest,
            min_objid: 0,
            page: Vec::new().into_iter(),
            done: false,
        }
    }

    fn fetch_page(&self) -> Result<Vec<ObjInfo>, WsError> {
        let params = json!({
            "ids": [self.wsid],
            "minObjectID": self.min_objid,
            "limit": PAGE_SIZE,
            "showAllVersions": if self.latest { 0 } else { 1 },
        });
        let (method, result) = if self.admin {
            ("listObjects", self.transport.call_admin("listObjects", params))
        } else {
            (
                "Workspace.list_objects",
                self.transport.call("Workspace.list_objects", params),
            )
        };
        let rows: Vec<ObjInfo> = serde_json::from_value(result?)
            .map_err(|err| WsError::decode(method, err))?;
        debug!(wsid = self.wsid, min_objid = self.min_objid, rows = rows.len(), "listed page");
        Ok(rows)
    }
}

impl Iterator for ObjInfoIter<'_> {
    type Item = Result<ObjInfo, WsError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(info) = self.page.next() {
                return Some(Ok(info));
            }
            if self.done {
                return None;
            }
            match self.fetch_page() {
                Ok(rows) => {
                    if rows.len() < PAGE_SIZE {
                        self.done = true;
                    }
                    if let Some(max) = rows.iter().map(|info| info.objid).max() {
                        self.min_objid = max + 1;
                    }
                    self.page = rows.into_iter();
                }
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
    }
}

/// Projection of [`ObjInfoIter`] down to `(objid, version)` pairs.
pub struct IdVersionIter<'a>(pub(crate) ObjInfoIter<'a>);

impl Iterator for IdVersionIter<'_> {
    type Item = Result<(i64, i64), WsError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.0
            .next()
            .map(|item| item.map(|info| (info.objid, info.version)))
    }
}

/// Lazy view over the workspaces visible to the caller's token (or all
/// workspaces, in admin mode). The remote call is not itself paginated;
/// it fires on the first advance.
pub struct WsInfoIter<'a> {
    transport: &'a dyn Transport,
    admin: bool,
    page: Option<std::vec::IntoIter<WsInfo>>,
    failed: bool,
}

impl<'a> WsInfoIter<'a> {
    pub(crate) fn new(transport: &'a dyn Transport, admin: bool) -> Self {
        Self {
            transport,
            admin,
            page: None,
            failed: false,
        }
    }

    fn fetch(&self) -> Result<Vec<WsInfo>, WsError> {
        let (method, result) = if self.admin {
            (
                "listWorkspaces",
                self.transport.call_admin("listWorkspaces", json!({})),
            )
        } else {
            (
                "Workspace.list_workspace_info",
                self.transport
                    .call("Workspace.list_workspace_info", json!({})),
            )
        };
        serde_json::from_value(result?).map_err(|err| WsError::decode(method, err))
    }
}

impl Iterator for WsInfoIter<'_> {
    type Item = Result<WsInfo, WsError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        if self.page.is_none() {
            match self.fetch() {
                Ok(rows) => self.page = Some(rows.into_iter()),
                Err(err) => {
                    self.failed = true;
                    return Some(Err(err));
                }
            }
        }
        self.page.as_mut()?.next().map(Ok)
    }
}
