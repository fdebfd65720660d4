//! Row codecs and error mapping shared by the SQLite repositories.

use chrono::{DateTime, TimeZone, Utc};
use relaygate_common::storage::StorageError;
use relaygate_domain::GatewayError;
use tokio::task::JoinError;

use crate::errors::InfraError;

pub(crate) fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub(crate) fn opt_to_millis(at: Option<DateTime<Utc>>) -> Option<i64> {
    at.map(to_millis)
}

pub(crate) fn from_millis(millis: i64) -> rusqlite::Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single().ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Integer,
            format!("timestamp out of range: {millis}").into(),
        )
    })
}

pub(crate) fn opt_from_millis(millis: Option<i64>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    millis.map(from_millis).transpose()
}

pub(crate) fn now_millis() -> i64 {
    to_millis(Utc::now())
}

/// Parse a stored enum column via its `FromStr` impl.
pub(crate) fn parse_column<T>(idx: usize, raw: &str) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = GatewayError>,
{
    raw.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub(crate) fn sql_error(err: rusqlite::Error) -> GatewayError {
    GatewayError::from(InfraError::from(err))
}

pub(crate) fn storage_error(err: StorageError) -> GatewayError {
    GatewayError::from(InfraError::from(err))
}

pub(crate) fn map_join_error(err: JoinError) -> GatewayError {
    if err.is_cancelled() {
        GatewayError::Internal("blocking database task cancelled".into())
    } else {
        GatewayError::Internal(format!("blocking database task panicked: {err}"))
    }
}
