use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::modules::admin::AdminSettings;
use crate::modules::email::SmtpSettings;
use crate::modules::error::ConfigError;
use crate::OTP_TTL_MINUTES;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct StoreSettings {
    pub path: PathBuf,
    /// Encrypt the store file with a key derived from the store passphrase
    pub encrypt: bool,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("sat_portal.db.json"),
            encrypt: false,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct OtpSettings {
    pub ttl_minutes: i64,
}

impl Default for OtpSettings {
    fn default() -> Self {
        Self {
            ttl_minutes: OTP_TTL_MINUTES,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LogSettings {
    pub file: Option<PathBuf>,
    pub level: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            file: None,
            level: "info".to_string(),
        }
    }
}

/// Everything read from `portal.json`
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct PortalConfig {
    pub store: StoreSettings,
    pub otp: OtpSettings,
    pub admins: AdminSettings,
    pub mail: SmtpSettings,
    pub log: LogSettings,
}

impl PortalConfig {
    /// Load from `path`; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(
                    "Configuration file {} not found, using defaults",
                    path.display()
                );
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.otp.ttl_minutes <= 0 {
            return Err(ConfigError::Invalid(format!(
                "otp.ttl_minutes must be positive, got {}",
                self.otp.ttl_minutes
            )));
        }
        if self.admins.password_rounds == 0 {
            return Err(ConfigError::Invalid(
                "admins.password_rounds must be at least 1".to_string(),
            ));
        }
        if self.admins.email_domain.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "admins.email_domain must not be empty".to_string(),
            ));
        }
        if self.store.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("store.path must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
