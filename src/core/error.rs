//! Error taxonomy for platform operations
//!
//! Per-record failures (a record that cannot be found, a dangling
//! reference) are collected into batch results by the callers; only the
//! variants that poison the whole session, such as `AuthExpired` or a
//! broken configuration, are meant to abort a batch.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FolioError {
    /// No record on the platform matches the identifier.
    #[error("no record found for {0}")]
    NotFound(String),

    /// The platform could not be reached at all.
    #[error("platform unreachable: {0}")]
    Network(String),

    /// The platform answered with a server-side error.
    #[error("platform returned HTTP {status} for {path}")]
    Server { status: u16, path: String },

    /// The platform rejected the token. The caller must re-authenticate;
    /// already-applied mutations stay applied.
    #[error("authentication token rejected; re-authentication required")]
    AuthExpired,

    /// A record references another record that does not exist.
    #[error("record inconsistency: {0}")]
    Consistency(String),

    /// The request was malformed before any network call was made.
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Config(String),

    /// The pre-mutation snapshot could not be written. The mutation is
    /// not attempted when this happens.
    #[error("backup failed for record {record_id}")]
    Backup {
        record_id: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed record body: {0}")]
    Json(#[from] serde_json::Error),
}

impl FolioError {
    /// True when a read-only probe may be retried. Mutating calls are
    /// never retried on these, since the prior attempt's outcome on the
    /// server is unknown.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FolioError::Network(_) | FolioError::Server { status: 500.., .. }
        )
    }
}

impl From<reqwest::Error> for FolioError {
    fn from(err: reqwest::Error) -> Self {
        FolioError::Network(err.to_string())
    }
}
