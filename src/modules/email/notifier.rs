use log::warn;

use crate::modules::error::NotifyError;

/// Outbound message delivery
pub trait Notifier: Send + Sync {
    fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), NotifyError>;
}

/// Stands in for SMTP when no usable mail credentials exist.
///
/// Every send fails with `NotConfigured`; the body is never written anywhere.
#[derive(Debug, Clone)]
pub struct UnavailableNotifier {
    reason: String,
}

impl UnavailableNotifier {
    pub fn new(reason: &str) -> Self {
        Self {
            reason: reason.to_string(),
        }
    }
}

impl Notifier for UnavailableNotifier {
    fn send(&self, _recipient: &str, subject: &str, _body: &str) -> Result<(), NotifyError> {
        warn!("Cannot send {:?}: {}", subject, self.reason);
        Err(NotifyError::NotConfigured(self.reason.clone()))
    }
}
