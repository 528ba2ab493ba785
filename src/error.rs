use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ObdError {
    #[error("OBD request failed: {0}")]
    Http(String),

    #[error("OBD returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("OBD returned a non-JSON body: {0}")]
    InvalidJson(String),

    #[error("failed to read account list at {0}")]
    InputRead(PathBuf),

    #[error("failed to parse account list: {0}")]
    InputParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("builderPDOs payload is not a list: {0}")]
    MalformedPdoList(String),

    #[error("PDO record without a usable TOUNIQUENUMBER: {0}")]
    MissingPdoId(String),

    #[error("interrupted by user")]
    Interrupted,

    #[error("giving up after {attempts} consecutive failed passes")]
    #[diagnostic(help("the remote service kept failing; rerun later to resume from the cache"))]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<ObdError>,
    },
}

impl ObdError {
    /// Whether a failed pass is worth repeating after a backoff delay.
    pub fn is_transient(&self) -> bool {
        match self {
            ObdError::Http(_) | ObdError::InvalidJson(_) => true,
            ObdError::Status { status, .. } => matches!(status, 408 | 429 | 500..=599),
            _ => false,
        }
    }
}
