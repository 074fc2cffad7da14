use log::{error, info};

use super::credentials::{CredentialBootstrap, Provisioning};
use crate::modules::error::IdentityError;

/// What one startup reconciliation pass did
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BootstrapReport {
    pub created: Vec<String>,
    pub already_provisioned: usize,
    /// The batch failed and nothing was committed
    pub aborted: bool,
}

impl CredentialBootstrap {
    /// Create every missing account from the static table as one batch
    pub fn reconcile(&self) -> Result<BootstrapReport, IdentityError> {
        self.store.transaction(|tables| {
            let mut report = BootstrapReport::default();
            for (employee_id, entry) in self.table.iter() {
                match self.ensure_provisioned(tables, employee_id, entry)? {
                    Provisioning::Created => report.created.push(employee_id.clone()),
                    Provisioning::AlreadyProvisioned => report.already_provisioned += 1,
                }
            }
            Ok::<_, IdentityError>(report)
        })
    }

    /// Startup pass. Never fails: errors are logged and login-time provisioning recovers.
    pub fn run_at_startup(&self) -> BootstrapReport {
        match self.reconcile() {
            Ok(report) => {
                for employee_id in &report.created {
                    info!("Created admin record for {}", employee_id);
                }
                info!(
                    "Admin credentials synced with database: {} created, {} already provisioned",
                    report.created.len(),
                    report.already_provisioned
                );
                report
            }
            Err(e) => {
                error!("Error syncing admin credentials: {}", e);
                BootstrapReport {
                    aborted: true,
                    ..BootstrapReport::default()
                }
            }
        }
    }
}
