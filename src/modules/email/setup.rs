use super::manager::SecureEmailManager;
use super::notifier::Notifier;
use super::smtp::SmtpSettings;
use super::templates::configuration_test_email;
use crate::modules::auth::password::read_password;
use crate::modules::utils::io::{is_valid_email, read_line};

/// Interactively fill in `settings` and store the SMTP password in the keyring.
///
/// The caller persists `settings`; the password never goes to the config file.
pub fn setup_mail_account(settings: &mut SmtpSettings) -> Result<(), String> {
    println!("\n=== Email Configuration Setup ===");

    let username = loop {
        if settings.is_configured() {
            println!(
                "Enter the sending email address (blank keeps {}):",
                settings.username
            );
        } else {
            println!("Enter the sending email address:");
        }
        let input = read_line().map_err(|e| format!("Failed to read input: {}", e))?;

        if input.is_empty() && settings.is_configured() {
            break settings.username.clone();
        }
        if !is_valid_email(&input) {
            println!("Invalid email format. Please try again.");
            continue;
        }
        break input;
    };
    settings.username = username;

    let host = loop {
        println!(
            "Enter SMTP server address (blank detects {}):",
            SmtpSettings {
                host: None,
                ..settings.clone()
            }
            .resolved_host()
        );
        let input = read_line().map_err(|e| format!("Failed to read input: {}", e))?;

        if input.is_empty() {
            break None;
        }
        if !input.contains('.') || input.contains(' ') {
            println!("Invalid SMTP server format. Please enter a valid domain.");
            continue;
        }
        break Some(input);
    };
    settings.host = host;

    let port = loop {
        println!("Enter SMTP port (default: 587):");
        let input = read_line().map_err(|e| format!("Failed to read input: {}", e))?;

        if input.is_empty() {
            break 587;
        }
        match input.parse::<u16>() {
            Ok(p) if p > 0 => break p,
            _ => println!("Invalid port number. Please enter a number between 1 and 65535."),
        }
    };
    settings.port = port;

    println!("Enter the SMTP password (for Gmail, an App Password):");
    let password = read_password().map_err(|e| format!("Failed to read password: {}", e))?;
    if password.trim().is_empty() {
        return Err("SMTP password cannot be empty".to_string());
    }

    SecureEmailManager::new()?.store_password(&password)?;

    println!("\nEmail configuration saved.");
    println!("Run `sat-portal mail-test <address>` to verify it.");
    Ok(())
}

/// Send the configuration test message to `recipient`
pub fn send_configuration_test(notifier: &dyn Notifier, recipient: &str) -> Result<(), String> {
    if !is_valid_email(recipient) {
        return Err(format!("Invalid recipient address: {}", recipient));
    }

    let email = configuration_test_email();
    notifier
        .send(recipient, &email.subject, &email.body)
        .map_err(|e| format!("Test email failed: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::email::testing::RecordingNotifier;

    #[test]
    fn test_configuration_test_is_sent() {
        let notifier = RecordingNotifier::default();

        send_configuration_test(&notifier, "hod.cse@srit.ac.in").unwrap();

        let messages = notifier.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].subject, "SAT Portal - Email Configuration Test");
    }

    #[test]
    fn test_configuration_test_rejects_bad_recipient() {
        let notifier = RecordingNotifier::default();

        assert!(send_configuration_test(&notifier, "not-an-address").is_err());
        assert!(notifier.messages().is_empty());
    }

    #[test]
    fn test_configuration_test_reports_transport_failure() {
        let notifier = RecordingNotifier::failing();

        let err = send_configuration_test(&notifier, "hod.cse@srit.ac.in").unwrap_err();
        assert!(err.starts_with("Test email failed"));
    }
}
