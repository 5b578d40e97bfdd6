//! Centralized error types for SkyCast.
//!
//! This module provides a typed error hierarchy that:
//! - Separates provider failures, malformed payloads and local storage faults
//! - Provides user-friendly messages suitable for UI display
//! - Preserves full error context for debugging/logging

use thiserror::Error;

/// Top-level application error type.
///
/// Use `user_message()` to get a UI-appropriate message.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Weather service error: {0}")]
    Weather(#[from] WeatherError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Recover the typed error from an `anyhow` chain built with `?` or `.context()`.
    /// Anything unrecognized stays `Other`.
    pub fn from_anyhow(err: anyhow::Error) -> Self {
        let err = match err.downcast::<ConfigError>() {
            Ok(e) => return AppError::Config(e),
            Err(err) => err,
        };
        let err = match err.downcast::<StorageError>() {
            Ok(e) => return AppError::Storage(e),
            Err(err) => err,
        };
        let err = match err.downcast::<WeatherError>() {
            Ok(e) => return AppError::Weather(e),
            Err(err) => err,
        };
        match err.downcast::<std::io::Error>() {
            Ok(e) => AppError::Io(e),
            Err(err) => AppError::Other(err),
        }
    }

    /// Returns a user-friendly message suitable for display in the UI.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Network(e) => e.user_message(),
            AppError::Storage(e) => e.user_message(),
            AppError::Config(e) => e.user_message(),
            AppError::Weather(e) => e.user_message(),
            AppError::Io(_) => "A file operation failed. Please try again.",
            AppError::Other(_) => "An unexpected error occurred. Please try again.",
        }
    }
}

/// Transport-level errors (connectivity, timeouts, TLS).
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("TLS/SSL error: {0}")]
    TlsError(String),
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed(_) => {
                "Unable to connect. Check your internet connection."
            }
            NetworkError::Timeout => "The request timed out. Please try again.",
            NetworkError::InvalidRequest(_) => "The request could not be built. Check your settings.",
            NetworkError::TlsError(_) => "Secure connection failed. Check your network settings.",
        }
    }
}

/// Local key-value store errors.
///
/// Read failures are recovered as "no data"; write failures are logged and
/// swallowed by the callers.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Stored data is corrupted: {0}")]
    Corruption(String),
}

impl StorageError {
    pub fn user_message(&self) -> &'static str {
        match self {
            StorageError::Unavailable(_) => "Unable to access local data. Try restarting the app.",
            StorageError::ReadFailed(_) => "Saved data could not be loaded.",
            StorageError::WriteFailed(_) => "Changes could not be saved locally.",
            StorageError::Corruption(_) => {
                "Local data may be corrupted. Consider resetting app data."
            }
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::NotFound(_) => "Configuration not found. Using defaults.",
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::ParseError(_) => "Configuration file is malformed. Check your settings.",
        }
    }
}

/// Weather and geocoding provider errors.
#[derive(Debug, Error)]
pub enum WeatherError {
    /// Provider answered with a non-success HTTP status.
    #[error("Provider returned status {status}")]
    Provider { status: u16 },

    /// Payload is structurally invalid (missing fields, mismatched arrays).
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
}

impl WeatherError {
    /// Create a malformed-response error.
    pub fn malformed(message: impl Into<String>) -> Self {
        WeatherError::MalformedResponse(message.into())
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            WeatherError::Provider { status } if *status >= 500 => {
                "Weather service unavailable. Please try again later."
            }
            WeatherError::Provider { .. } => "Weather service error. Please try again.",
            WeatherError::MalformedResponse(_) => {
                "Received unexpected weather data. Please try again."
            }
            WeatherError::Network(e) => e.user_message(),
        }
    }
}

impl From<reqwest::Error> for WeatherError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            return WeatherError::Provider {
                status: status.as_u16(),
            };
        }
        if e.is_decode() {
            return WeatherError::MalformedResponse(e.to_string());
        }
        WeatherError::Network(e.into_network_error())
    }
}

/// Extension trait for converting reqwest errors to our error types.
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        if self.is_timeout() {
            NetworkError::Timeout
        } else if self.is_builder() {
            NetworkError::InvalidRequest(self.to_string())
        } else {
            NetworkError::ConnectionFailed(self.to_string())
        }
    }
}

/// Extension trait for converting rusqlite errors to our error types.
pub trait RusqliteErrorExt {
    fn into_storage_error(self) -> StorageError;
}

impl RusqliteErrorExt for rusqlite::Error {
    fn into_storage_error(self) -> StorageError {
        match &self {
            rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("corrupt") => {
                StorageError::Corruption(self.to_string())
            }
            rusqlite::Error::SqliteFailure(_, _) => StorageError::Unavailable(self.to_string()),
            _ => StorageError::ReadFailed(self.to_string()),
        }
    }
}
