//! Shared row-decoding helpers for the typed CRUD modules.
//!
//! All columns are stored as TEXT/INTEGER; these helpers convert them back
//! into domain types, reporting failures as `FromSqlConversionFailure` so
//! they surface through the normal rusqlite error path.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use annuaire_shared::{PrivacyLevel, ProviderType};

pub(crate) fn parse_uuid(idx: usize, s: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub(crate) fn parse_ts(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

pub(crate) fn parse_date(idx: usize, s: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub(crate) fn parse_level(idx: usize, code: i64) -> rusqlite::Result<PrivacyLevel> {
    u8::try_from(code)
        .ok()
        .and_then(PrivacyLevel::from_code)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, code))
}

pub(crate) fn parse_provider(idx: usize, code: i64) -> rusqlite::Result<ProviderType> {
    u8::try_from(code)
        .ok()
        .and_then(ProviderType::from_code)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, code))
}
