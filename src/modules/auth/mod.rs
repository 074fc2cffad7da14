pub mod password;

// Re-export the main types and functions
pub use password::{
    plaintext_matches, validate_password, PasswordError, PasswordHasher, Pbkdf2Hasher,
};
