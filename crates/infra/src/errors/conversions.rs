//! Conversions from external infrastructure errors into gateway errors.

use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use relaygate_common::storage::StorageError;
use relaygate_domain::GatewayError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub GatewayError);

impl From<InfraError> for GatewayError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<GatewayError> for InfraError {
    fn from(value: GatewayError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoGatewayError {
    fn into_gateway(self) -> GatewayError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → GatewayError */
/* -------------------------------------------------------------------------- */

impl IntoGatewayError for SqlError {
    fn into_gateway(self) -> GatewayError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => {
                        GatewayError::Database("database is busy".into())
                    }
                    (ErrorCode::DatabaseLocked, _) => {
                        GatewayError::Database("database is locked".into())
                    }
                    (ErrorCode::ConstraintViolation, 2067 | 1555) => {
                        GatewayError::Database(format!("unique constraint violation: {message}"))
                    }
                    (ErrorCode::ConstraintViolation, 787) => {
                        GatewayError::Database("foreign key constraint violation".into())
                    }
                    _ => GatewayError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => GatewayError::Database("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                GatewayError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, name, ty) => {
                GatewayError::Database(format!("invalid column type for {name}: {ty}"))
            }
            RE::Utf8Error(_) => GatewayError::Database("invalid UTF-8 returned from sqlite".into()),
            RE::InvalidPath(path) => GatewayError::Database(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            other => GatewayError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_gateway())
    }
}

/* -------------------------------------------------------------------------- */
/* StorageError → GatewayError */
/* -------------------------------------------------------------------------- */

impl IntoGatewayError for StorageError {
    fn into_gateway(self) -> GatewayError {
        match self {
            StorageError::Rusqlite(err) => err.into_gateway(),
            StorageError::InvalidConfig(message) => GatewayError::Configuration(message),
            other => GatewayError::Database(other.to_string()),
        }
    }
}

impl From<StorageError> for InfraError {
    fn from(value: StorageError) -> Self {
        InfraError(value.into_gateway())
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → GatewayError */
/* -------------------------------------------------------------------------- */

impl IntoGatewayError for HttpError {
    fn into_gateway(self) -> GatewayError {
        if self.is_timeout() {
            return GatewayError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return GatewayError::Network("HTTP connection failure".into());
        }

        if self.is_decode() {
            return GatewayError::OAuthExchange(format!("unexpected response body: {self}"));
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                401 | 403 => GatewayError::OAuthExchange(message),
                429 => GatewayError::Network(message),
                400..=499 => GatewayError::InvalidInput(message),
                _ => GatewayError::Network(message),
            };
        }

        GatewayError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_gateway())
    }
}

/* -------------------------------------------------------------------------- */
/* jsonwebtoken::Error → GatewayError */
/* -------------------------------------------------------------------------- */

impl IntoGatewayError for JwtError {
    fn into_gateway(self) -> GatewayError {
        match self.kind() {
            JwtErrorKind::InvalidRsaKey(_) | JwtErrorKind::InvalidKeyFormat => {
                GatewayError::Configuration("GitHub App private key is not a valid RSA PEM".into())
            }
            _ => GatewayError::Internal(format!("failed to sign app JWT: {self}")),
        }
    }
}

impl From<JwtError> for InfraError {
    fn from(value: JwtError) -> Self {
        InfraError(value.into_gateway())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
