pub mod manager;
mod notifier;
mod setup;
mod smtp;
mod templates;

pub use manager::{resolve_mail_password, SecureEmailManager};
pub use notifier::{Notifier, UnavailableNotifier};
pub use setup::{send_configuration_test, setup_mail_account};
pub use smtp::{notifier_for, SmtpNotifier, SmtpSettings};
pub use templates::{configuration_test_email, otp_email, EmailContent};

#[cfg(test)]
pub(crate) use notifier::testing;
