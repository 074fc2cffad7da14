use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::modules::error::IdentityError;

/// Workflow an OTP is scoped to
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OtpPurpose {
    #[serde(rename = "registration")]
    Registration,
    #[serde(rename = "reset_password")]
    PasswordReset,
}

impl OtpPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpPurpose::Registration => "registration",
            OtpPurpose::PasswordReset => "reset_password",
        }
    }
}

impl fmt::Display for OtpPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OtpPurpose {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "registration" => Ok(OtpPurpose::Registration),
            "reset_password" | "password_reset" => Ok(OtpPurpose::PasswordReset),
            other => Err(IdentityError::InvalidInput(format!(
                "Unknown OTP purpose '{}'",
                other
            ))),
        }
    }
}

/// A persisted one-time code
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OtpRecord {
    pub id: u64,
    pub recipient: String,
    pub code: String,
    pub purpose: OtpPurpose,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
}

impl OtpRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// True for the record that currently holds the active slot of (recipient, purpose)
    pub fn is_active_for(&self, recipient: &str, purpose: OtpPurpose) -> bool {
        !self.used && self.purpose == purpose && self.recipient == recipient
    }
}
