use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::transport::smtp::PoolConfig;
use lettre::{Message, SmtpTransport, Transport};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::notifier::{Notifier, UnavailableNotifier};
use crate::modules::error::NotifyError;

const IMPLICIT_TLS_PORT: u16 = 465;

/// SMTP account settings as they appear in the configuration file
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SmtpSettings {
    // Account used both to authenticate and as the sender address
    pub username: String,
    // Explicit server; detected from the username's domain when absent
    pub host: Option<String>,
    // Submission port (587 for STARTTLS)
    pub port: u16,
    // Display name on outgoing mail
    pub sender_name: String,
    // Log the code when delivery fails instead of failing the request
    pub dev_fallback: bool,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            username: String::new(),
            host: None,
            port: 587,
            sender_name: "SAT Portal".to_string(),
            dev_fallback: false,
        }
    }
}

impl SmtpSettings {
    /// Server to connect to, detected from the account's provider when not configured
    pub fn resolved_host(&self) -> String {
        if let Some(host) = &self.host {
            return host.clone();
        }

        let domain = self
            .username
            .rsplit_once('@')
            .map(|(_, domain)| domain.to_lowercase())
            .unwrap_or_default();

        if domain.contains("outlook.com") || domain.contains("hotmail.com") {
            "smtp-mail.outlook.com".to_string()
        } else if domain.contains("yahoo.com") {
            "smtp.mail.yahoo.com".to_string()
        } else {
            // Gmail, and institutional domains hosted on it
            "smtp.gmail.com".to_string()
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.username.trim().is_empty()
    }
}

/// Sends mail over SMTP with STARTTLS, retrying once over implicit TLS on port 465
pub struct SmtpNotifier {
    settings: SmtpSettings,
    password: String,
}

impl SmtpNotifier {
    pub fn new(settings: SmtpSettings, password: &str) -> Self {
        // App passwords are often pasted with the spaces Google displays them with
        let password = password.chars().filter(|c| !c.is_whitespace()).collect();
        Self { settings, password }
    }

    fn build_message(&self, recipient: &str, subject: &str, body: &str) -> Result<Message, NotifyError> {
        Message::builder()
            .from(
                format!("{} <{}>", self.settings.sender_name, self.settings.username)
                    .parse()
                    .map_err(|e| NotifyError::Address(format!("from: {}", e)))?,
            )
            .to(recipient
                .parse()
                .map_err(|e| NotifyError::Address(format!("to: {}", e)))?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(body.to_string())
            .map_err(|e| NotifyError::Message(e.to_string()))
    }

    fn transport(&self, host: &str, port: u16, implicit_tls: bool) -> Result<SmtpTransport, NotifyError> {
        let tls_parameters = TlsParameters::builder(host.to_string())
            .build()
            .map_err(|e| NotifyError::Transport(format!("TLS parameters: {}", e)))?;
        let tls = if implicit_tls {
            Tls::Wrapper(tls_parameters)
        } else {
            Tls::Required(tls_parameters)
        };

        Ok(SmtpTransport::builder_dangerous(host)
            .credentials(Credentials::new(
                self.settings.username.clone(),
                self.password.clone(),
            ))
            .port(port)
            .tls(tls)
            .pool_config(PoolConfig::new().max_size(1))
            .timeout(Some(Duration::from_secs(10)))
            .build())
    }
}

impl Notifier for SmtpNotifier {
    fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        if !self.settings.is_configured() || self.password.is_empty() {
            return Err(NotifyError::NotConfigured(
                "SMTP username or password missing".to_string(),
            ));
        }

        let email = self.build_message(recipient, subject, body)?;
        let host = self.settings.resolved_host();

        let starttls_error = match self
            .transport(&host, self.settings.port, false)?
            .send(&email)
        {
            Ok(_) => {
                info!("Email sent successfully to: {}", recipient);
                return Ok(());
            }
            Err(e) => e,
        };
        warn!(
            "STARTTLS send via {}:{} failed, trying implicit TLS: {}",
            host, self.settings.port, starttls_error
        );

        match self
            .transport(&host, IMPLICIT_TLS_PORT, true)?
            .send(&email)
        {
            Ok(_) => {
                info!("Email sent successfully to: {}", recipient);
                Ok(())
            }
            Err(e) => Err(NotifyError::Transport(format!(
                "STARTTLS: {}; implicit TLS: {}",
                starttls_error, e
            ))),
        }
    }
}

/// SMTP when both the account and its password are available.
///
/// Otherwise every send fails with `NotConfigured`, leaving the fallback
/// decision to the caller.
pub fn notifier_for(settings: &SmtpSettings, password: Option<&str>) -> Arc<dyn Notifier> {
    if !settings.is_configured() {
        return Arc::new(UnavailableNotifier::new("mail.username is not set"));
    }
    match password {
        Some(password) if !password.trim().is_empty() => {
            Arc::new(SmtpNotifier::new(settings.clone(), password))
        }
        _ => Arc::new(UnavailableNotifier::new(
            "no SMTP password found in the environment or keyring",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(username: &str) -> SmtpSettings {
        SmtpSettings {
            username: username.to_string(),
            ..SmtpSettings::default()
        }
    }

    #[test]
    fn test_host_detection() {
        assert_eq!(settings("portal@gmail.com").resolved_host(), "smtp.gmail.com");
        assert_eq!(
            settings("portal@Outlook.com").resolved_host(),
            "smtp-mail.outlook.com"
        );
        assert_eq!(
            settings("portal@hotmail.com").resolved_host(),
            "smtp-mail.outlook.com"
        );
        assert_eq!(
            settings("portal@yahoo.com").resolved_host(),
            "smtp.mail.yahoo.com"
        );
        assert_eq!(settings("exam@srit.ac.in").resolved_host(), "smtp.gmail.com");

        let explicit = SmtpSettings {
            host: Some("mail.srit.ac.in".to_string()),
            ..settings("exam@srit.ac.in")
        };
        assert_eq!(explicit.resolved_host(), "mail.srit.ac.in");
    }

    #[test]
    fn test_missing_credentials_yield_failing_notifier() {
        let unconfigured = notifier_for(&SmtpSettings::default(), Some("secret"));
        assert!(matches!(
            unconfigured.send("a@x.edu", "subject", "body"),
            Err(NotifyError::NotConfigured(_))
        ));

        let no_password = notifier_for(&settings("portal@gmail.com"), None);
        assert!(matches!(
            no_password.send("a@x.edu", "subject", "body"),
            Err(NotifyError::NotConfigured(_))
        ));

        let blank_password = notifier_for(&settings("portal@gmail.com"), Some("  "));
        assert!(matches!(
            blank_password.send("a@x.edu", "subject", "body"),
            Err(NotifyError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_password_spaces_stripped() {
        let notifier = SmtpNotifier::new(settings("portal@gmail.com"), "abcd efgh ijkl mnop");
        assert_eq!(notifier.password, "abcdefghijklmnop");
    }

    #[test]
    fn test_unconfigured_notifier_refuses_to_send() {
        let notifier = SmtpNotifier::new(SmtpSettings::default(), "secret");
        assert!(matches!(
            notifier.send("a@x.edu", "subject", "body"),
            Err(NotifyError::NotConfigured(_))
        ));

        let no_password = SmtpNotifier::new(settings("portal@gmail.com"), "   ");
        assert!(matches!(
            no_password.send("a@x.edu", "subject", "body"),
            Err(NotifyError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_message_building() {
        let notifier = SmtpNotifier::new(settings("portal@gmail.com"), "secret");
        assert!(notifier.build_message("a@x.edu", "Subject", "<p>hi</p>").is_ok());
        assert!(matches!(
            notifier.build_message("not an address", "Subject", "body"),
            Err(NotifyError::Address(_))
        ));
    }
}
