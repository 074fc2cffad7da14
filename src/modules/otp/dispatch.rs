use log::{error, warn};
use std::sync::Arc;

use super::ledger::OtpLedger;
use super::model::OtpPurpose;
use crate::modules::email::{otp_email, Notifier};
use crate::modules::error::IdentityError;

/// How an issued code reached (or failed to reach) the recipient
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Sent,
    /// Delivery failed and the code was written to the log instead
    LoggedFallback,
}

/// Issues codes through the ledger and mails them out.
///
/// A failed delivery never retracts the issued code.
pub struct OtpDispatcher {
    ledger: Arc<OtpLedger>,
    notifier: Arc<dyn Notifier>,
    dev_fallback: bool,
}

impl OtpDispatcher {
    pub fn new(ledger: Arc<OtpLedger>, notifier: Arc<dyn Notifier>, dev_fallback: bool) -> Self {
        Self {
            ledger,
            notifier,
            dev_fallback,
        }
    }

    pub fn ledger(&self) -> &OtpLedger {
        &self.ledger
    }

    pub fn send_code(
        &self,
        recipient: &str,
        purpose: OtpPurpose,
    ) -> Result<DeliveryOutcome, IdentityError> {
        let code = self.ledger.issue(recipient, purpose)?;
        let email = otp_email(&code, purpose, self.ledger.ttl().num_minutes());

        match self.notifier.send(recipient, &email.subject, &email.body) {
            Ok(()) => Ok(DeliveryOutcome::Sent),
            Err(e) => {
                error!("Error sending {} OTP email: {}", purpose, e);
                if self.dev_fallback {
                    warn!("DEV MODE: {} OTP for {} is {}", purpose, recipient, code);
                    Ok(DeliveryOutcome::LoggedFallback)
                } else {
                    Err(IdentityError::DeliveryFailed(e.to_string()))
                }
            }
        }
    }

    /// Consume a code previously sent with `send_code`
    pub fn confirm(
        &self,
        recipient: &str,
        code: &str,
        purpose: OtpPurpose,
    ) -> Result<(), IdentityError> {
        self.ledger.verify(recipient, code, purpose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::email::testing::RecordingNotifier;
    use crate::modules::email::{notifier_for, SmtpSettings};
    use crate::modules::store::Store;
    use crate::modules::utils::SystemClock;

    fn setup(notifier: Arc<RecordingNotifier>, dev_fallback: bool) -> (OtpDispatcher, Arc<Store>) {
        let store = Arc::new(Store::in_memory());
        let ledger = Arc::new(OtpLedger::new(store.clone(), Arc::new(SystemClock)));
        (OtpDispatcher::new(ledger, notifier, dev_fallback), store)
    }

    fn code_in(body: &str) -> String {
        let start = body.find("007bff;\">").unwrap() + "007bff;\">".len();
        body[start..start + 6].to_string()
    }

    #[test]
    fn test_sent_code_can_be_confirmed() {
        let notifier = Arc::new(RecordingNotifier::default());
        let (dispatcher, _) = setup(notifier.clone(), false);

        let outcome = dispatcher
            .send_code("a@x.edu", OtpPurpose::Registration)
            .unwrap();
        assert_eq!(outcome, DeliveryOutcome::Sent);

        let messages = notifier.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].recipient, "a@x.edu");
        assert_eq!(messages[0].subject, "SAT Portal - Email Verification OTP");

        let code = code_in(&messages[0].body);
        assert!(dispatcher
            .confirm("a@x.edu", &code, OtpPurpose::Registration)
            .is_ok());
        assert!(matches!(
            dispatcher.confirm("a@x.edu", &code, OtpPurpose::Registration),
            Err(IdentityError::InvalidCode)
        ));
    }

    #[test]
    fn test_delivery_failure_keeps_issued_code() {
        let notifier = Arc::new(RecordingNotifier::failing());
        let (dispatcher, store) = setup(notifier, false);

        assert!(matches!(
            dispatcher.send_code("a@x.edu", OtpPurpose::PasswordReset),
            Err(IdentityError::DeliveryFailed(_))
        ));

        let tables = store.snapshot().unwrap();
        assert_eq!(tables.unused_otp_count("a@x.edu", OtpPurpose::PasswordReset), 1);
        let code = tables.otps[0].code.clone();
        assert!(dispatcher
            .confirm("a@x.edu", &code, OtpPurpose::PasswordReset)
            .is_ok());
    }

    #[test]
    fn test_dev_fallback_reports_logged_code() {
        let notifier = Arc::new(RecordingNotifier::failing());
        let (dispatcher, store) = setup(notifier, true);

        let outcome = dispatcher
            .send_code("a@x.edu", OtpPurpose::Registration)
            .unwrap();
        assert_eq!(outcome, DeliveryOutcome::LoggedFallback);
        assert_eq!(store.snapshot().unwrap().otps.len(), 1);
    }

    #[test]
    fn test_unconfigured_mail_without_fallback_is_delivery_failure() {
        let store = Arc::new(Store::in_memory());
        let ledger = Arc::new(OtpLedger::new(store.clone(), Arc::new(SystemClock)));
        let notifier = notifier_for(&SmtpSettings::default(), None);
        let dispatcher = OtpDispatcher::new(ledger, notifier, false);

        assert!(matches!(
            dispatcher.send_code("a@x.edu", OtpPurpose::Registration),
            Err(IdentityError::DeliveryFailed(_))
        ));
        assert_eq!(
            store
                .snapshot()
                .unwrap()
                .unused_otp_count("a@x.edu", OtpPurpose::Registration),
            1
        );
    }

    #[test]
    fn test_unconfigured_mail_with_fallback_is_logged() {
        let store = Arc::new(Store::in_memory());
        let ledger = Arc::new(OtpLedger::new(store, Arc::new(SystemClock)));
        let notifier = notifier_for(&SmtpSettings::default(), None);
        let dispatcher = OtpDispatcher::new(ledger, notifier, true);

        assert_eq!(
            dispatcher
                .send_code("a@x.edu", OtpPurpose::Registration)
                .unwrap(),
            DeliveryOutcome::LoggedFallback
        );
    }

    #[test]
    fn test_invalid_recipient_sends_nothing() {
        let notifier = Arc::new(RecordingNotifier::default());
        let (dispatcher, _) = setup(notifier.clone(), true);

        assert!(matches!(
            dispatcher.send_code("nobody", OtpPurpose::Registration),
            Err(IdentityError::InvalidInput(_))
        ));
        assert!(notifier.messages().is_empty());
    }
}
