use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::modules::admin::AdminAccount;
use crate::modules::error::StoreError;
use crate::modules::otp::{OtpPurpose, OtpRecord};

/// Everything the identity core persists.
///
/// Admins are keyed by employee ID, which makes a second row for the same
/// employee unrepresentable.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Tables {
    pub otps: Vec<OtpRecord>,
    pub admins: BTreeMap<String, AdminAccount>,
    pub next_otp_id: u64,
    pub next_admin_id: u64,
}

impl Tables {
    /// Delete unused OTPs for (recipient, purpose), returning how many were removed
    pub fn remove_unused_otps(&mut self, recipient: &str, purpose: OtpPurpose) -> usize {
        let before = self.otps.len();
        self.otps
            .retain(|record| !record.is_active_for(recipient, purpose));
        before - self.otps.len()
    }

    pub fn find_unused_otp_mut(
        &mut self,
        recipient: &str,
        code: &str,
        purpose: OtpPurpose,
    ) -> Option<&mut OtpRecord> {
        self.otps
            .iter_mut()
            .find(|record| record.is_active_for(recipient, purpose) && record.code == code)
    }

    pub fn insert_otp(&mut self, mut record: OtpRecord) -> u64 {
        self.next_otp_id += 1;
        record.id = self.next_otp_id;
        self.otps.push(record);
        self.next_otp_id
    }

    pub fn unused_otp_count(&self, recipient: &str, purpose: OtpPurpose) -> usize {
        self.otps
            .iter()
            .filter(|record| record.is_active_for(recipient, purpose))
            .count()
    }

    pub fn find_admin(&self, employee_id: &str) -> Option<&AdminAccount> {
        self.admins.get(employee_id)
    }

    pub fn find_admin_mut(&mut self, employee_id: &str) -> Option<&mut AdminAccount> {
        self.admins.get_mut(employee_id)
    }

    /// Insert a new admin, assigning its ID. Fails if the employee ID is taken.
    pub fn insert_admin(&mut self, mut account: AdminAccount) -> Result<&AdminAccount, StoreError> {
        if self.admins.contains_key(&account.employee_id) {
            return Err(StoreError::Conflict(format!(
                "Admin '{}' already exists",
                account.employee_id
            )));
        }
        if self.admins.values().any(|a| a.email == account.email) {
            return Err(StoreError::Conflict(format!(
                "Email '{}' already belongs to another admin",
                account.email
            )));
        }

        self.next_admin_id += 1;
        account.id = self.next_admin_id;
        let key = account.employee_id.clone();
        Ok(self.admins.entry(key).or_insert(account))
    }

    pub fn remove_admin(&mut self, employee_id: &str) -> Option<AdminAccount> {
        self.admins.remove(employee_id)
    }
}
