pub mod config;
mod credentials;
mod directory;
mod setup;

pub use config::{AdminRole, AdminSettings, StaticCredential, StaticCredentialTable};
pub use credentials::{AdminAccount, AdminSession, CredentialBootstrap, Provisioning};
pub use directory::AdminDirectory;
pub use setup::BootstrapReport;
