use crate::HmacSha256;
use pbkdf2::pbkdf2;
use rand::Rng;

pub const SALT_LEN: usize = 16;
pub const NONCE_LEN: usize = 12;
pub const KEY_LEN: usize = 32;

/// Rounds used when deriving a store key from a passphrase
const STORE_KEY_ROUNDS: u32 = 100_000;

/// Function to generate a random salt for PBKDF2
pub fn generate_random_salt() -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..SALT_LEN).map(|_| rng.gen()).collect()
}

/// Function to generate a random nonce for AES-GCM
pub fn generate_random_nonce() -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..NONCE_LEN).map(|_| rng.gen()).collect()
}

/// Derive `KEY_LEN` bytes from a secret using PBKDF2-HMAC-SHA256
pub fn derive_key(secret: &str, salt: &[u8], rounds: u32) -> Vec<u8> {
    let mut key = vec![0u8; KEY_LEN];
    pbkdf2::<HmacSha256>(secret.as_bytes(), salt, rounds, &mut key);
    key
}

/// Function to derive a 32-byte store key from the passphrase
pub fn derive_key_from_passphrase(passphrase: &str, salt: &[u8]) -> Vec<u8> {
    derive_key(passphrase, salt, STORE_KEY_ROUNDS)
}
