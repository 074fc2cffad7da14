mod crypto;
pub mod keys;

pub use crypto::{decrypt_data, encrypt_data};
pub use keys::{derive_key, derive_key_from_passphrase, generate_random_nonce, generate_random_salt};
