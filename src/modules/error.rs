//! Error types for the identity core

use std::io;

use thiserror::Error;

use crate::modules::auth::PasswordError;

/// Failures surfaced to the request boundary. None of them are fatal to the process.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid OTP")]
    InvalidCode,

    #[error("OTP has expired")]
    Expired,

    #[error("Unknown employee ID: {0}")]
    NotFound(String),

    #[error("Invalid employee ID or password")]
    AuthFailed,

    #[error("Failed to deliver OTP: {0}")]
    DeliveryFailed(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl IdentityError {
    /// Stable classification used when reporting a declined operation
    pub fn kind(&self) -> &'static str {
        match self {
            IdentityError::InvalidInput(_) => "invalid_input",
            IdentityError::InvalidCode => "invalid_code",
            IdentityError::Expired => "expired",
            IdentityError::NotFound(_) => "not_found",
            IdentityError::AuthFailed => "auth_failed",
            IdentityError::DeliveryFailed(_) => "delivery_failed",
            IdentityError::Storage(_) => "storage_error",
        }
    }
}

// Policy violations are reported to callers as invalid input
impl From<PasswordError> for IdentityError {
    fn from(e: PasswordError) -> Self {
        IdentityError::InvalidInput(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store lock poisoned")]
    Poisoned,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Mail is not configured: {0}")]
    NotConfigured(String),

    #[error("Invalid address: {0}")]
    Address(String),

    #[error("Failed to build message: {0}")]
    Message(String),

    #[error("SMTP transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
