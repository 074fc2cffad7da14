use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::config::{AdminRole, StaticCredential, StaticCredentialTable};
use crate::modules::auth::{plaintext_matches, PasswordHasher};
use crate::modules::error::{IdentityError, StoreError};
use crate::modules::store::{Store, Tables};
use crate::modules::utils::logging::log_auth_event;
use crate::modules::utils::Clock;

/// A persisted department administrator
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AdminAccount {
    pub id: u64,
    pub display_name: String,
    pub employee_id: String,
    pub email: String,
    pub branch: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Result of `ensure_provisioned`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioning {
    Created,
    AlreadyProvisioned,
}

/// A successful admin login
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub account: AdminAccount,
    pub role: AdminRole,
    /// The account was created by this login from its static default
    pub provisioned_now: bool,
}

/// Reconciles the static credential table with persisted admin accounts.
///
/// Accounts are created from the table at startup (`run_at_startup`) or on the
/// first successful static-default login. Both paths go through
/// `ensure_provisioned`, and neither ever touches an existing account.
pub struct CredentialBootstrap {
    pub(super) store: Arc<Store>,
    hasher: Arc<dyn PasswordHasher>,
    clock: Arc<dyn Clock>,
    pub(super) table: StaticCredentialTable,
    email_domain: String,
}

impl CredentialBootstrap {
    pub fn new(
        store: Arc<Store>,
        hasher: Arc<dyn PasswordHasher>,
        clock: Arc<dyn Clock>,
        table: StaticCredentialTable,
        email_domain: &str,
    ) -> Self {
        Self {
            store,
            hasher,
            clock,
            table,
            email_domain: email_domain.to_string(),
        }
    }

    pub fn table(&self) -> &StaticCredentialTable {
        &self.table
    }

    /// Create the account for `employee_id` from its static entry unless one already exists
    pub fn ensure_provisioned(
        &self,
        tables: &mut Tables,
        employee_id: &str,
        entry: &StaticCredential,
    ) -> Result<Provisioning, StoreError> {
        if tables.find_admin(employee_id).is_some() {
            return Ok(Provisioning::AlreadyProvisioned);
        }

        let account = AdminAccount {
            id: 0,
            display_name: format!("Admin - {}", entry.branch),
            employee_id: employee_id.to_string(),
            email: format!("{}@{}", employee_id, self.email_domain),
            branch: entry.branch.clone(),
            password_hash: self.hasher.hash(&entry.default_password),
            created_at: self.clock.now(),
        };
        tables.insert_admin(account)?;
        Ok(Provisioning::Created)
    }

    /// Authenticate an admin, provisioning the account from its static default on first login
    pub fn login(
        &self,
        employee_id: &str,
        supplied_password: &str,
    ) -> Result<AdminSession, IdentityError> {
        if employee_id.trim().is_empty() || supplied_password.is_empty() {
            return Err(IdentityError::InvalidInput(
                "Employee ID and password are required".to_string(),
            ));
        }

        let entry = self.table.get(employee_id);
        let result: Result<(AdminAccount, bool), IdentityError> =
            self.store.transaction(|tables| {
                // A persisted account always wins over the static default
                if let Some(account) = tables.find_admin(employee_id) {
                    return if self.hasher.verify(supplied_password, &account.password_hash) {
                        Ok((account.clone(), false))
                    } else {
                        Err(IdentityError::AuthFailed)
                    };
                }

                let entry = entry.ok_or_else(|| IdentityError::NotFound(employee_id.to_string()))?;
                if !plaintext_matches(supplied_password, &entry.default_password) {
                    return Err(IdentityError::AuthFailed);
                }

                self.ensure_provisioned(tables, employee_id, entry)?;
                let account = tables.find_admin(employee_id).cloned().ok_or_else(|| {
                    StoreError::Conflict(format!("Admin '{}' vanished after creation", employee_id))
                })?;
                Ok((account, true))
            });

        match result {
            Ok((account, provisioned_now)) => {
                let details = if provisioned_now {
                    "provisioned from static default"
                } else {
                    "stored credentials"
                };
                log_auth_event("admin_login", employee_id, true, Some(details));
                Ok(AdminSession {
                    account,
                    role: entry.map(StaticCredential::role).unwrap_or_default(),
                    provisioned_now,
                })
            }
            Err(e) => {
                log_auth_event("admin_login", employee_id, false, Some(e.kind()));
                Err(e)
            }
        }
    }
}
