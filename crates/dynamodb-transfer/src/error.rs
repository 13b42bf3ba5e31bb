//! Error types for DynamoDB transfer operations

use thiserror::Error;

/// Result type alias for transfer operations
pub type Result<T> = std::result::Result<T, TransferError>;

/// Main error type for export/import tracking and data file access
///
/// Service and transport failures that this crate does not interpret are
/// carried through [`TransferError::Service`] unmodified; there is no
/// retry-on-transient-error logic anywhere in this crate.
#[derive(Error, Debug)]
pub enum TransferError {
    /// A job handle that was required for an operation is no longer known
    /// to the service. `describe*` calls report this as `Ok(None)` instead.
    #[error("job '{handle}' is not known to the service")]
    UnknownJob { handle: String },

    /// A job reached a terminal failure or cancellation status while waiting.
    #[error("job '{handle}' ended with status {status}: {message}")]
    JobFailed {
        handle: String,
        status: String,
        message: String,
    },

    /// The waiter's deadline was exceeded before the job reached a terminal status.
    #[error("timed out after {timeout_secs} seconds while polling")]
    Timeout { timeout_secs: u64 },

    /// A manifest document could not be parsed. The whole resolution fails;
    /// no partial manifest is ever returned.
    #[error("corrupt manifest at line {line}: {reason}")]
    CorruptManifest { line: usize, reason: String },

    /// The summary manifest carries an export type tag this crate does not know.
    #[error("unsupported manifest export type: '{0}'")]
    UnsupportedExportType(String),

    /// The requested operation is unsupported by design and fails before any I/O.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(&'static str),

    /// A data file line or an encode input was not shaped as a keyed record.
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    /// An S3 URI did not have the `s3://bucket/key` shape.
    #[error("invalid S3 URI: '{0}'")]
    InvalidS3Uri(String),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(#[from] chrono::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Raw service or transport error, propagated unchanged.
    #[error(transparent)]
    Service(#[from] anyhow::Error),
}

impl TransferError {
    /// Wrap a raw service/transport error without interpreting it.
    pub fn service<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        TransferError::Service(anyhow::Error::new(err))
    }

    /// Returns true for the waiter's deadline error.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransferError::Timeout { .. })
    }
}
