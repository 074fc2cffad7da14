use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::modules::encryption::keys::{derive_key, generate_random_salt};
use crate::PASSWORD_HASH_ROUNDS;

const HASH_SCHEME: &str = "pbkdf2-sha256";

/// Password policy violations
#[derive(Debug, Error, PartialEq)]
pub enum PasswordError {
    #[error("Password must be at least 8 characters long")]
    TooShort,

    #[error("Password must contain at least one uppercase letter")]
    NoUppercase,

    #[error("Password must contain at least one lowercase letter")]
    NoLowercase,

    #[error("Password must contain at least one number")]
    NoNumber,
}

/// Function to validate password strength
pub fn validate_password(password: &str) -> Result<(), PasswordError> {
    if password.chars().count() < 8 {
        return Err(PasswordError::TooShort);
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        return Err(PasswordError::NoUppercase);
    }
    if !password.chars().any(|c| c.is_lowercase()) {
        return Err(PasswordError::NoLowercase);
    }
    if !password.chars().any(|c| c.is_numeric()) {
        return Err(PasswordError::NoNumber);
    }
    Ok(())
}

/// Salted, slow one-way password hashing
pub trait PasswordHasher: Send + Sync {
    /// Produce an opaque, self-describing hash string
    fn hash(&self, plaintext: &str) -> String;

    /// Check `plaintext` against a hash produced by `hash`
    fn verify(&self, plaintext: &str, hash: &str) -> bool;
}

/// PBKDF2-HMAC-SHA256 with a fresh salt per hash.
///
/// Hashes are stored as `pbkdf2-sha256$<rounds>$<salt hex>$<hash hex>`, so the
/// round count can change without invalidating existing hashes.
#[derive(Debug, Clone, Copy)]
pub struct Pbkdf2Hasher {
    rounds: u32,
}

impl Pbkdf2Hasher {
    pub fn new(rounds: u32) -> Self {
        Self {
            rounds: rounds.max(1),
        }
    }
}

impl Default for Pbkdf2Hasher {
    fn default() -> Self {
        Self::new(PASSWORD_HASH_ROUNDS)
    }
}

impl PasswordHasher for Pbkdf2Hasher {
    fn hash(&self, plaintext: &str) -> String {
        let salt = generate_random_salt();
        let derived = derive_key(plaintext, &salt, self.rounds);
        format!(
            "{}${}${}${}",
            HASH_SCHEME,
            self.rounds,
            hex::encode(&salt),
            hex::encode(derived)
        )
    }

    fn verify(&self, plaintext: &str, hash: &str) -> bool {
        let parts: Vec<&str> = hash.split('$').collect();
        if parts.len() != 4 || parts[0] != HASH_SCHEME {
            log::warn!("Refusing to verify against an unrecognized password hash format");
            return false;
        }

        let rounds = match parts[1].parse::<u32>() {
            Ok(rounds) if rounds > 0 => rounds,
            _ => return false,
        };
        let (salt, expected) = match (hex::decode(parts[2]), hex::decode(parts[3])) {
            (Ok(salt), Ok(expected)) => (salt, expected),
            _ => return false,
        };

        let derived = derive_key(plaintext, &salt, rounds);
        derived.as_slice().ct_eq(expected.as_slice()).into()
    }
}

/// Compare a supplied password with a plaintext default in constant time
pub fn plaintext_matches(supplied: &str, expected: &str) -> bool {
    supplied.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Helper function to read a password securely
pub fn read_password() -> std::io::Result<String> {
    rpassword::read_password()
}
