//! Durable stores for YukinoBot.
//!
//! All persistence operations are plain functions over a
//! `rusqlite::Connection`, so callers choose where the connection comes from
//! (usually the shared pool) and whether to run on a blocking thread.
//!
//! Four stores live here: guild TTS settings, the pronunciation dictionary,
//! per-user voice profiles, and the voice-command allow-list. All writes are
//! single-row upserts or keyed deletes; last write wins.

use thiserror::Error;

pub mod allow;
pub mod dict;
pub mod profile;
pub mod settings;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Returns true when the error is a primary-key/uniqueness violation.
///
/// Used by inserts whose duplicate case is an expected outcome (dictionary
/// entries, allow-list rows) rather than a failure.
pub(crate) fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(code, _)
            if code.code == rusqlite::ffi::ErrorCode::ConstraintViolation
    )
}
