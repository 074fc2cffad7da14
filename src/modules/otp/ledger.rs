use chrono::Duration;
use rand::distributions::Uniform;
use rand::Rng;
use std::sync::Arc;

use super::model::{OtpPurpose, OtpRecord};
use crate::modules::error::IdentityError;
use crate::modules::store::Store;
use crate::modules::utils::logging::{log_auth_event, log_data_operation};
use crate::modules::utils::{is_valid_email, Clock};
use crate::{OTP_LENGTH, OTP_TTL_MINUTES};

/// Issues, checks and retires one-time codes scoped by (recipient, purpose)
pub struct OtpLedger {
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl OtpLedger {
    pub fn new(store: Arc<Store>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            ttl: Duration::minutes(OTP_TTL_MINUTES),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a fresh code, replacing any unused one for the same (recipient, purpose)
    pub fn issue(&self, recipient: &str, purpose: OtpPurpose) -> Result<String, IdentityError> {
        if !is_valid_email(recipient) {
            return Err(IdentityError::InvalidInput(
                "Invalid email format".to_string(),
            ));
        }

        let code = generate_code();
        let now = self.clock.now();

        let replaced = self.store.transaction(|tables| {
            let replaced = tables.remove_unused_otps(recipient, purpose);
            tables.insert_otp(OtpRecord {
                id: 0,
                recipient: recipient.to_string(),
                code: code.clone(),
                purpose,
                created_at: now,
                expires_at: now + self.ttl,
                used: false,
            });
            Ok::<_, IdentityError>(replaced)
        })?;

        let details = format!("purpose={}, replaced={}", purpose, replaced);
        log_data_operation("otp_issue", recipient, "otps", true, Some(&details));
        Ok(code)
    }

    /// Consume a code. Succeeds at most once per issued code.
    pub fn verify(
        &self,
        recipient: &str,
        code: &str,
        purpose: OtpPurpose,
    ) -> Result<(), IdentityError> {
        if !is_valid_email(recipient) {
            return Err(IdentityError::InvalidInput(
                "Invalid email format".to_string(),
            ));
        }

        let now = self.clock.now();
        let result: Result<(), IdentityError> = self.store.transaction(|tables| {
            let record = tables
                .find_unused_otp_mut(recipient, code, purpose)
                .ok_or(IdentityError::InvalidCode)?;

            // Expired records stay unused; the transaction is discarded
            if record.is_expired(now) {
                return Err(IdentityError::Expired);
            }

            record.used = true;
            Ok(())
        });

        match &result {
            Ok(()) => log_auth_event("otp_verify", recipient, true, Some(purpose.as_str())),
            Err(e) => log_auth_event("otp_verify", recipient, false, Some(&e.to_string())),
        }
        result
    }
}

/// Six independent, uniformly random decimal digits
fn generate_code() -> String {
    rand::thread_rng()
        .sample_iter(&Uniform::new(0, 10))
        .take(OTP_LENGTH)
        .map(|d: u8| d.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::store::testing::FlakyBackend;
    use crate::modules::utils::ManualClock;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::Ordering;

    const RECIPIENT: &str = "a@x.edu";

    fn setup_ledger() -> (OtpLedger, Arc<Store>, Arc<ManualClock>) {
        let store = Arc::new(Store::in_memory());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap(),
        ));
        let ledger = OtpLedger::new(store.clone(), clock.clone());
        (ledger, store, clock)
    }

    #[test]
    fn test_generated_codes_are_six_digits() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_issue_persists_active_record() {
        let (ledger, store, clock) = setup_ledger();

        let code = ledger.issue(RECIPIENT, OtpPurpose::Registration).unwrap();

        let tables = store.snapshot().unwrap();
        assert_eq!(tables.otps.len(), 1);
        let record = &tables.otps[0];
        assert_eq!(record.code, code);
        assert_eq!(record.recipient, RECIPIENT);
        assert!(!record.used);
        assert_eq!(record.created_at, clock.now());
        assert_eq!(record.expires_at, clock.now() + Duration::minutes(10));
    }

    #[test]
    fn test_code_verifies_exactly_once() {
        let (ledger, store, _) = setup_ledger();

        let code = ledger.issue(RECIPIENT, OtpPurpose::Registration).unwrap();

        assert!(ledger
            .verify(RECIPIENT, &code, OtpPurpose::Registration)
            .is_ok());
        assert!(matches!(
            ledger.verify(RECIPIENT, &code, OtpPurpose::Registration),
            Err(IdentityError::InvalidCode)
        ));

        // The record is retired, not deleted
        let tables = store.snapshot().unwrap();
        assert_eq!(tables.otps.len(), 1);
        assert!(tables.otps[0].used);
    }

    #[test]
    fn test_expired_code_is_distinguishable_and_untouched() {
        let (ledger, store, clock) = setup_ledger();

        let code = ledger.issue(RECIPIENT, OtpPurpose::Registration).unwrap();
        clock.advance(Duration::minutes(11));

        assert!(matches!(
            ledger.verify(RECIPIENT, &code, OtpPurpose::Registration),
            Err(IdentityError::Expired)
        ));
        // Still expired on retry, never Ok
        assert!(matches!(
            ledger.verify(RECIPIENT, &code, OtpPurpose::Registration),
            Err(IdentityError::Expired)
        ));

        let wrong = if code == "000000" { "111111" } else { "000000" };
        assert!(matches!(
            ledger.verify(RECIPIENT, wrong, OtpPurpose::Registration),
            Err(IdentityError::InvalidCode)
        ));

        let tables = store.snapshot().unwrap();
        assert_eq!(tables.otps.len(), 1);
        assert!(!tables.otps[0].used);
    }

    #[test]
    fn test_code_valid_at_expiry_instant() {
        let (ledger, _, clock) = setup_ledger();

        let code = ledger.issue(RECIPIENT, OtpPurpose::PasswordReset).unwrap();
        clock.advance(Duration::minutes(10));

        assert!(ledger
            .verify(RECIPIENT, &code, OtpPurpose::PasswordReset)
            .is_ok());
    }

    #[test]
    fn test_reissue_invalidates_prior_code_for_same_purpose_only() {
        let (ledger, store, _) = setup_ledger();

        let reset_code = ledger.issue(RECIPIENT, OtpPurpose::PasswordReset).unwrap();
        let first = ledger.issue(RECIPIENT, OtpPurpose::Registration).unwrap();
        let second = ledger.issue(RECIPIENT, OtpPurpose::Registration).unwrap();

        let tables = store.snapshot().unwrap();
        assert_eq!(tables.unused_otp_count(RECIPIENT, OtpPurpose::Registration), 1);
        assert_eq!(tables.unused_otp_count(RECIPIENT, OtpPurpose::PasswordReset), 1);

        if first != second {
            assert!(matches!(
                ledger.verify(RECIPIENT, &first, OtpPurpose::Registration),
                Err(IdentityError::InvalidCode)
            ));
        }
        assert!(ledger
            .verify(RECIPIENT, &second, OtpPurpose::Registration)
            .is_ok());
        assert!(ledger
            .verify(RECIPIENT, &reset_code, OtpPurpose::PasswordReset)
            .is_ok());
    }

    #[test]
    fn test_at_most_one_unused_record_per_pair() {
        let (ledger, store, _) = setup_ledger();

        for _ in 0..5 {
            ledger.issue(RECIPIENT, OtpPurpose::Registration).unwrap();
            ledger.issue("b@x.edu", OtpPurpose::Registration).unwrap();
        }

        let tables = store.snapshot().unwrap();
        assert_eq!(tables.unused_otp_count(RECIPIENT, OtpPurpose::Registration), 1);
        assert_eq!(tables.unused_otp_count("b@x.edu", OtpPurpose::Registration), 1);
        assert_eq!(tables.otps.len(), 2);
    }

    #[test]
    fn test_used_records_survive_reissue() {
        let (ledger, store, _) = setup_ledger();

        let code = ledger.issue(RECIPIENT, OtpPurpose::Registration).unwrap();
        ledger
            .verify(RECIPIENT, &code, OtpPurpose::Registration)
            .unwrap();
        ledger.issue(RECIPIENT, OtpPurpose::Registration).unwrap();

        let tables = store.snapshot().unwrap();
        assert_eq!(tables.otps.len(), 2);
        assert_eq!(tables.unused_otp_count(RECIPIENT, OtpPurpose::Registration), 1);
    }

    #[test]
    fn test_wrong_purpose_or_recipient_is_invalid_code() {
        let (ledger, _, _) = setup_ledger();

        let code = ledger.issue(RECIPIENT, OtpPurpose::Registration).unwrap();

        assert!(matches!(
            ledger.verify(RECIPIENT, &code, OtpPurpose::PasswordReset),
            Err(IdentityError::InvalidCode)
        ));
        assert!(matches!(
            ledger.verify("b@x.edu", &code, OtpPurpose::Registration),
            Err(IdentityError::InvalidCode)
        ));
        assert!(matches!(
            ledger.verify("A@x.edu", &code, OtpPurpose::Registration),
            Err(IdentityError::InvalidCode)
        ));
    }

    #[test]
    fn test_malformed_recipient_rejected() {
        let (ledger, store, _) = setup_ledger();

        assert!(matches!(
            ledger.issue("not-an-email", OtpPurpose::Registration),
            Err(IdentityError::InvalidInput(_))
        ));
        assert!(matches!(
            ledger.verify("not-an-email", "123456", OtpPurpose::Registration),
            Err(IdentityError::InvalidInput(_))
        ));
        assert!(store.snapshot().unwrap().otps.is_empty());
    }

    #[test]
    fn test_storage_failure_changes_nothing() {
        let backend = FlakyBackend::default();
        let switch = backend.switch();
        let store = Arc::new(Store::with_backend(Box::new(backend)));
        let ledger = OtpLedger::new(store.clone(), Arc::new(ManualClock::new(Utc::now())));

        let code = ledger.issue(RECIPIENT, OtpPurpose::Registration).unwrap();
        let before = store.snapshot().unwrap();

        switch.store(true, Ordering::SeqCst);
        assert!(matches!(
            ledger.issue(RECIPIENT, OtpPurpose::Registration),
            Err(IdentityError::Storage(_))
        ));
        assert!(matches!(
            ledger.verify(RECIPIENT, &code, OtpPurpose::Registration),
            Err(IdentityError::Storage(_))
        ));
        assert_eq!(store.snapshot().unwrap(), before);

        // The first code was neither replaced nor consumed
        switch.store(false, Ordering::SeqCst);
        assert!(ledger
            .verify(RECIPIENT, &code, OtpPurpose::Registration)
            .is_ok());
    }

    #[test]
    fn test_custom_ttl() {
        let (ledger, _, clock) = setup_ledger();
        let ledger = ledger.with_ttl(Duration::minutes(2));
        assert_eq!(ledger.ttl(), Duration::minutes(2));

        let code = ledger.issue(RECIPIENT, OtpPurpose::Registration).unwrap();
        clock.advance(Duration::minutes(3));
        assert!(matches!(
            ledger.verify(RECIPIENT, &code, OtpPurpose::Registration),
            Err(IdentityError::Expired)
        ));
    }
}
