//! Error types for the photo store.

use std::path::PathBuf;

/// Failure of a photo store operation.
///
/// An operation that finds nothing returns an empty result, never one of
/// these variants.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing file could not be opened or the schema could not be ensured.
    #[error("failed to initialize photo store at {}: {reason}", .path.display())]
    Init { path: PathBuf, reason: String },

    /// A write (insert or delete) was rejected by the storage engine.
    #[error("photo store write failed: {0}")]
    Write(#[source] rusqlite::Error),

    /// A query failed or returned rows that could not be decoded.
    #[error("photo store read failed: {0}")]
    Read(#[source] rusqlite::Error),

    /// The record was rejected before reaching storage.
    #[error("invalid photo record: {0}")]
    InvalidRecord(String),

    /// The worker running the statement panicked or the handle is unusable.
    #[error("photo store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn init<S: Into<String>>(path: impl Into<PathBuf>, reason: S) -> Self {
        Self::Init {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid<S: Into<String>>(msg: S) -> Self {
        Self::InvalidRecord(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::init("/tmp/gallery.db", "disk I/O error");
        assert_eq!(
            err.to_string(),
            "failed to initialize photo store at /tmp/gallery.db: disk I/O error"
        );

        let err = StoreError::invalid("uri is empty");
        assert_eq!(err.to_string(), "invalid photo record: uri is empty");

        let err = StoreError::Write(rusqlite::Error::QueryReturnedNoRows);
        assert!(err.to_string().starts_with("photo store write failed"));
    }

    #[test]
    fn test_error_source_is_kept() {
        use std::error::Error;

        let err = StoreError::Read(rusqlite::Error::InvalidQuery);
        assert!(err.source().is_some());

        let err = StoreError::Unavailable("worker panicked".into());
        assert!(err.source().is_none());
    }
}
