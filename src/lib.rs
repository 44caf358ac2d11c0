pub mod blob;
pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod fs_util;
pub mod listing;
pub mod transport;
pub mod types;

pub use client::WorkspaceClient;
pub use config::ClientConfig;
pub use error::WsError;
pub use types::{ObjInfo, ObjectRef, WsInfo};
