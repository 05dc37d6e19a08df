//! Error types shared by the Calendula crates.
//!
//! Each enum keeps the technical detail in its `Display` output for logs and
//! offers `user_message()` for anything shown to the user.

use thiserror::Error;

/// Failures while starting or shutting down the application context.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Config(e) => e.user_message(),
            AppError::Storage(e) => e.user_message(),
            AppError::Io(_) => "Could not prepare the data directory.",
        }
    }
}

/// HTTP failures talking to the weather and geocoding services.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed(_) => "Weather service unreachable. Check your connection.",
            NetworkError::Timeout => "Weather service took too long to answer.",
            NetworkError::ServerError { status, .. } if *status >= 500 => {
                "Weather service is having trouble. Try again later."
            }
            NetworkError::ServerError { .. } => "Weather request was rejected.",
            NetworkError::InvalidResponse(_) => "Weather service sent an unexpected answer.",
        }
    }
}

/// Failures of the local key-value store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Data corruption detected: {0}")]
    Corruption(String),
}

impl StorageError {
    pub fn user_message(&self) -> &'static str {
        match self {
            StorageError::Unavailable(_) => "Saved reminders are unavailable right now.",
            StorageError::QueryFailed(_) => "Could not save your changes.",
            StorageError::Corruption(_) => "Saved data is damaged and was not loaded.",
        }
    }
}

/// Problems with `config.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot locate the user configuration directory")]
    NoConfigDir,

    #[error("Failed to access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::NoConfigDir | ConfigError::Io { .. } => {
                "Could not read or write the configuration file."
            }
            ConfigError::Parse(_) | ConfigError::Serialize(_) => {
                "The configuration file is malformed. Check config.toml."
            }
            ConfigError::Invalid(_) => "The configuration has invalid values. Check config.toml.",
        }
    }
}

/// Classify a reqwest failure.
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        if self.is_timeout() {
            return NetworkError::Timeout;
        }
        if self.is_decode() {
            return NetworkError::InvalidResponse(self.to_string());
        }
        match self.status() {
            Some(status) => NetworkError::ServerError {
                status: status.as_u16(),
                message: self.to_string(),
            },
            None => NetworkError::ConnectionFailed(self.to_string()),
        }
    }
}

/// Classify a rusqlite failure.
pub trait RusqliteErrorExt {
    fn into_storage_error(self) -> StorageError;
}

impl RusqliteErrorExt for rusqlite::Error {
    fn into_storage_error(self) -> StorageError {
        use rusqlite::ErrorCode;

        match &self {
            rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::DatabaseCorrupt => {
                StorageError::Corruption(self.to_string())
            }
            rusqlite::Error::SqliteFailure(e, _)
                if matches!(
                    e.code,
                    ErrorCode::CannotOpen | ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
                ) =>
            {
                StorageError::Unavailable(self.to_string())
            }
            _ => StorageError::QueryFailed(self.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_app_error_wraps_storage() {
        let app_err: AppError = StorageError::Corruption("bad page".into()).into();
        assert!(matches!(app_err, AppError::Storage(StorageError::Corruption(_))));
        assert!(app_err.user_message().contains("damaged"));
    }

    #[test]
    fn test_server_error_message_depends_on_status() {
        let server = NetworkError::ServerError {
            status: 503,
            message: "unavailable".into(),
        };
        let client = NetworkError::ServerError {
            status: 404,
            message: "missing".into(),
        };
        assert!(server.user_message().contains("later"));
        assert!(client.user_message().contains("rejected"));
    }

    #[test]
    fn test_sqlite_codes_are_classified() {
        let corrupt = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CORRUPT),
            None,
        );
        assert!(matches!(corrupt.into_storage_error(), StorageError::Corruption(_)));

        let busy = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        assert!(matches!(busy.into_storage_error(), StorageError::Unavailable(_)));

        let no_rows = rusqlite::Error::QueryReturnedNoRows.into_storage_error();
        assert!(matches!(no_rows, StorageError::QueryFailed(_)));
    }

    #[test]
    fn test_config_parse_error_message() {
        let parse = toml::from_str::<toml::Value>("= nope").unwrap_err();
        let err = ConfigError::from(parse);
        assert!(err.user_message().contains("malformed"));
    }
}
