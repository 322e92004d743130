use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Discord error codes that mean the bot simply cannot see the resource.
/// Ban capture downgrades to a warning on these instead of failing the whole
/// snapshot.
const MISSING_ACCESS: i64 = 50001;
const MISSING_PERMISSIONS: i64 = 50013;

#[derive(Debug, Error)]
pub enum Error {
    #[error("snapshot {0} does not exist")]
    NotFound(i64),

    #[error("cannot delete a pinned snapshot")]
    Pinned,

    #[error("pin quota reached ({0} pinned snapshots allowed per guild)")]
    Capacity(u32),

    /// A persistence failure while writing a generation. The enclosing
    /// transaction has already been rolled back; no partial generation is
    /// ever visible.
    #[error("snapshot transaction failed: {0}")]
    Transaction(#[source] rusqlite::Error),

    /// The Discord collaborator returned an error payload. `code` is the
    /// Discord error code, or 0 for transport-level and pagination faults.
    #[error("discord api error {code}: {message}")]
    UpstreamApi { code: i64, message: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Db(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    pub fn upstream(code: i64, message: impl Into<String>) -> Self {
        Error::UpstreamApi {
            code,
            message: message.into(),
        }
    }

    /// True when the upstream rejection is a visibility problem rather than
    /// a hard failure.
    pub fn is_missing_access(&self) -> bool {
        matches!(
            self,
            Error::UpstreamApi { code, .. } if *code == MISSING_ACCESS || *code == MISSING_PERMISSIONS
        )
    }
}
