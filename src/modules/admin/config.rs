use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::{DEFAULT_EMAIL_DOMAIN, PASSWORD_HASH_ROUNDS};

/// Privilege level reported at login
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AdminRole {
    #[default]
    Admin,
    SuperAdmin,
}

impl AdminRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminRole::Admin => "admin",
            AdminRole::SuperAdmin => "superadmin",
        }
    }
}

/// Deployment-time default for one admin identifier
#[derive(Serialize, Deserialize, Clone, PartialEq)]
pub struct StaticCredential {
    #[serde(rename = "password")]
    pub default_password: String,
    pub branch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<AdminRole>,
}

impl StaticCredential {
    pub fn new(default_password: &str, branch: &str) -> Self {
        Self {
            default_password: default_password.to_string(),
            branch: branch.to_string(),
            role: None,
        }
    }

    pub fn with_role(mut self, role: AdminRole) -> Self {
        self.role = Some(role);
        self
    }

    pub fn role(&self) -> AdminRole {
        self.role.unwrap_or_default()
    }
}

// Keep default passwords out of logs
impl fmt::Debug for StaticCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredential")
            .field("default_password", &"<redacted>")
            .field("branch", &self.branch)
            .field("role", &self.role)
            .finish()
    }
}

/// Static credentials keyed by employee ID
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct StaticCredentialTable(BTreeMap<String, StaticCredential>);

impl StaticCredentialTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, employee_id: &str, entry: StaticCredential) -> Self {
        self.0.insert(employee_id.to_string(), entry);
        self
    }

    pub fn get(&self, employee_id: &str) -> Option<&StaticCredential> {
        self.0.get(employee_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &StaticCredential)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The `admins` section of the portal configuration
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AdminSettings {
    // Domain used to synthesize admin email addresses
    pub email_domain: String,
    // PBKDF2 rounds for newly hashed admin passwords
    pub password_rounds: u32,
    pub credentials: StaticCredentialTable,
}

impl Default for AdminSettings {
    fn default() -> Self {
        Self {
            email_domain: DEFAULT_EMAIL_DOMAIN.to_string(),
            password_rounds: PASSWORD_HASH_ROUNDS,
            credentials: StaticCredentialTable::new(),
        }
    }
}
