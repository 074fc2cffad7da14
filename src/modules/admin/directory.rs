use itertools::Itertools;
use std::sync::Arc;

use super::credentials::AdminAccount;
use crate::modules::auth::PasswordHasher;
use crate::modules::error::IdentityError;
use crate::modules::store::Store;
use crate::modules::utils::logging::log_data_operation;

/// Maintenance over persisted admin accounts
pub struct AdminDirectory {
    store: Arc<Store>,
    hasher: Arc<dyn PasswordHasher>,
}

impl AdminDirectory {
    pub fn new(store: Arc<Store>, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { store, hasher }
    }

    /// All accounts ordered by branch, then employee ID
    pub fn list(&self) -> Result<Vec<AdminAccount>, IdentityError> {
        let tables = self.store.snapshot()?;
        Ok(tables
            .admins
            .into_values()
            .sorted_by(|a, b| {
                a.branch
                    .cmp(&b.branch)
                    .then_with(|| a.employee_id.cmp(&b.employee_id))
            })
            .collect())
    }

    pub fn get(&self, employee_id: &str) -> Result<AdminAccount, IdentityError> {
        self.store
            .snapshot()?
            .find_admin(employee_id)
            .cloned()
            .ok_or_else(|| IdentityError::NotFound(employee_id.to_string()))
    }

    /// Replace the stored hash. The static table is never consulted or changed.
    pub fn change_password(
        &self,
        employee_id: &str,
        new_password: &str,
    ) -> Result<(), IdentityError> {
        if new_password.is_empty() {
            return Err(IdentityError::InvalidInput(
                "New password must not be empty".to_string(),
            ));
        }

        let new_hash = self.hasher.hash(new_password);
        let result: Result<(), IdentityError> = self.store.transaction(|tables| {
            let account = tables
                .find_admin_mut(employee_id)
                .ok_or_else(|| IdentityError::NotFound(employee_id.to_string()))?;
            account.password_hash = new_hash;
            Ok(())
        });

        log_data_operation(
            "change_password",
            employee_id,
            "admin_account",
            result.is_ok(),
            result.as_ref().err().map(IdentityError::kind),
        );
        result
    }

    pub fn remove(&self, employee_id: &str) -> Result<AdminAccount, IdentityError> {
        let result: Result<AdminAccount, IdentityError> = self.store.transaction(|tables| {
            tables
                .remove_admin(employee_id)
                .ok_or_else(|| IdentityError::NotFound(employee_id.to_string()))
        });

        log_data_operation(
            "remove",
            employee_id,
            "admin_account",
            result.is_ok(),
            result.as_ref().err().map(IdentityError::kind),
        );
        result
    }
}
