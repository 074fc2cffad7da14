use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};

use super::keys::NONCE_LEN;

/// Function to encrypt data using AES-256-GCM
pub fn encrypt_data(data: &[u8], encryption_key: &[u8], nonce: &[u8]) -> Result<Vec<u8>, String> {
    if nonce.len() != NONCE_LEN {
        return Err(format!("Nonce must be {} bytes", NONCE_LEN));
    }
    let cipher = Aes256Gcm::new_from_slice(encryption_key)
        .map_err(|_| "Encryption key must be 32 bytes".to_string())?;
    cipher
        .encrypt(Nonce::from_slice(nonce), data)
        .map_err(|_| "Encryption failed".to_string())
}

/// Function to decrypt data using AES-256-GCM
pub fn decrypt_data(
    encrypted_data: &[u8],
    encryption_key: &[u8],
    nonce: &[u8],
) -> Result<Vec<u8>, String> {
    if nonce.len() != NONCE_LEN {
        return Err(format!("Nonce must be {} bytes", NONCE_LEN));
    }
    let cipher = Aes256Gcm::new_from_slice(encryption_key)
        .map_err(|_| "Encryption key must be 32 bytes".to_string())?;
    cipher
        .decrypt(Nonce::from_slice(nonce), encrypted_data)
        .map_err(|_| "Decryption failed".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    /// Test that decryption fails with incorrect key
    fn test_decryption_with_wrong_key() {
        let original_data = b"{\"otps\":[],\"admins\":{}}";
        let encryption_key = vec![1u8; 32];
        let nonce = vec![1u8; NONCE_LEN];
        let wrong_key = vec![2u8; 32];

        let encrypted_data = encrypt_data(original_data, &encryption_key, &nonce).unwrap();
        assert_ne!(encrypted_data.as_slice(), original_data.as_slice());

        assert_eq!(
            decrypt_data(&encrypted_data, &encryption_key, &nonce).unwrap(),
            original_data.to_vec()
        );
        assert!(decrypt_data(&encrypted_data, &wrong_key, &nonce).is_err());
    }

    #[test]
    fn test_tampered_ciphertext_rejected() {
        let key = vec![7u8; 32];
        let nonce = vec![3u8; NONCE_LEN];
        let mut encrypted = encrypt_data(b"admins", &key, &nonce).unwrap();
        encrypted[0] ^= 0xff;

        assert!(decrypt_data(&encrypted, &key, &nonce).is_err());
    }

    #[test]
    fn test_bad_key_length() {
        assert!(encrypt_data(b"data", &[0u8; 16], &[0u8; NONCE_LEN]).is_err());
        assert!(encrypt_data(b"data", &[0u8; 32], &[0u8; 8]).is_err());
    }
}
