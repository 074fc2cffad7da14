// First, declare the modules folder itself
mod modules;

// Re-export everything from modules for easier access
pub use modules::{admin, auth, config, email, encryption, error, otp, store, utils};

// Re-export commonly used types
pub use modules::admin::{AdminAccount, AdminDirectory, CredentialBootstrap, StaticCredentialTable};
pub use modules::config::PortalConfig;
pub use modules::error::{IdentityError, StoreError};
pub use modules::otp::{OtpDispatcher, OtpLedger, OtpPurpose, OtpRecord};
pub use modules::store::Store;

// Constants
pub const CONFIG_FILE: &str = "portal.json";
pub const OTP_LENGTH: usize = 6;
pub const OTP_TTL_MINUTES: i64 = 10;
pub const PASSWORD_HASH_ROUNDS: u32 = 100_000;
pub const DEFAULT_EMAIL_DOMAIN: &str = "srit.ac.in";
pub const MAIL_PASSWORD_ENV: &str = "SAT_PORTAL_MAIL_PASSWORD";
pub const STORE_KEY_ENV: &str = "SAT_PORTAL_STORE_KEY";

// Type aliases
pub type HmacSha256 = hmac::Hmac<sha2::Sha256>;
