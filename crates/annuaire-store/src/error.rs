use thiserror::Error;

/// Errors produced by the store layer.
///
/// The vouch and identity variants are recoverable business outcomes and are
/// always reported to the caller as typed results; nothing here is fatal.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A query expected exactly one row but found none.
    #[error("Record not found")]
    NotFound,

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// UUID parsing error.
    #[error("UUID error: {0}")]
    Uuid(#[from] uuid::Error),

    /// Chrono parsing error.
    #[error("Timestamp parse error: {0}")]
    ChronoParse(#[from] chrono::ParseError),

    /// The voucher is not allowed to vouch.
    #[error("Voucher is not allowed to vouch")]
    NotVouchable,

    /// The (vouchee, voucher) pair already has a vouch.
    #[error("This profile has already been vouched by this voucher")]
    DuplicateVouch,

    /// The vouchee has reached the received-vouch limit.
    #[error("Vouch limit of {limit} reached")]
    VouchLimitExceeded { limit: u32 },

    /// Refused to delete the only primary contact identity of a profile.
    #[error("Cannot delete the only contact identity; reassign another one first")]
    LastContactIdentity,

    /// The identity or account is already claimed.
    #[error("This identity is already claimed")]
    DuplicateIdentityClaim,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
