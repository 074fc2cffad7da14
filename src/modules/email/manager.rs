use keyring::Entry;
use std::env;

use crate::MAIL_PASSWORD_ENV;

const KEYRING_SERVICE: &str = "sat-portal";
const KEYRING_USER: &str = "smtp-password";

/// Keeps the SMTP password out of the configuration file
pub struct SecureEmailManager {
    keyring: Entry,
}

impl SecureEmailManager {
    pub fn new() -> Result<Self, String> {
        let keyring = Entry::new(KEYRING_SERVICE, KEYRING_USER)
            .map_err(|e| format!("Failed to open keyring entry: {}", e))?;
        Ok(Self { keyring })
    }

    /// Store the SMTP password in the system keyring
    pub fn store_password(&self, password: &str) -> Result<(), String> {
        self.keyring
            .set_password(password)
            .map_err(|e| format!("Failed to store SMTP password: {}", e))
    }

    pub fn get_password(&self) -> Result<String, String> {
        self.keyring
            .get_password()
            .map_err(|e| format!("Failed to retrieve SMTP password: {}", e))
    }
}

/// SMTP password from the environment, falling back to the keyring
pub fn resolve_mail_password() -> Option<String> {
    if let Ok(password) = env::var(MAIL_PASSWORD_ENV) {
        if !password.trim().is_empty() {
            return Some(password);
        }
    }

    match SecureEmailManager::new().and_then(|manager| manager.get_password()) {
        Ok(password) => Some(password),
        Err(e) => {
            log::debug!("No SMTP password in keyring: {}", e);
            None
        }
    }
}
