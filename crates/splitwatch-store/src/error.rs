//! Error types for the session store.

/// Errors that can occur while snapshotting or restoring session records.
///
/// Note what is *not* here: a close-out for a missing or already-closed
/// record is a logged no-op, never an error — the engine's view of
/// "resolved" wins and the store is asked to converge, not to veto.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing the snapshot file failed.
    #[error("snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The snapshot contents are not valid session records.
    #[error("malformed snapshot: {0}")]
    Format(#[from] serde_json::Error),
}
