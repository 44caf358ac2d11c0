use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum WsError {
    #[error("workspace error with code {status}: {}", message.as_deref().unwrap_or("<no message>"))]
    Protocol {
        status: u16,
        body: String,
        message: Option<String>,
    },

    #[error("unauthorized access to blob with ID {0}")]
    UnauthorizedBlobAccess(String),

    #[error("missing blob with ID {0}")]
    MissingBlob(String),

    #[error("invalid workspace type {found}: expected one of [{expected}]")]
    InvalidWorkspaceType { found: String, expected: String },

    #[error("genome {0} has neither an assembly nor a contigset reference")]
    InvalidGenome(String),

    #[error("invalid object reference: {0}")]
    InvalidReference(String),

    #[error("{method} returned an unexpected response shape: {reason}")]
    Decode { method: String, reason: String },

    #[error("workspace request failed: {0}")]
    Http(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("missing configuration: {0}")]
    Config(String),
}

impl WsError {
    pub(crate) fn decode(method: &str, reason: impl ToString) -> Self {
        WsError::Decode {
            method: method.to_string(),
            reason: reason.to_string(),
        }
    }
}
