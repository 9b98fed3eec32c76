use pbkdf2::pbkdf2;
use rand::Rng;

use crate::{HmacSha256, PBKDF2_ITERATIONS};

/// Scheme tag recorded in every digest so the encoding stays self-describing
const DIGEST_SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;

/// Password strength violations reported at provisioning time
#[derive(Debug)]
pub enum PasswordError {
    TooShort,
    NoUppercase,
    NoLowercase,
    NoNumber,
    NoSpecialChar,
}

/// Function to validate password strength
pub fn validate_password(password: &str) -> Result<(), PasswordError> {
    if password.len() < 8 {
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
    if !password
        .chars()
        .any(|c| "!@#$%^&*()_+-=[]{}|;:,.<>?".contains(c))
    {
        return Err(PasswordError::NoSpecialChar);
    }
    Ok(())
}

/// Hash a plaintext password into a salted, self-describing digest:
/// `pbkdf2-sha256$<iterations>$<salt-hex>$<key-hex>`
pub fn hash_password(password: &str) -> String {
    let mut rng = rand::thread_rng();
    let salt: Vec<u8> = (0..SALT_LEN).map(|_| rng.gen()).collect();
    let key = derive_key(password, &salt, PBKDF2_ITERATIONS);
    format!(
        "{}${}${}${}",
        DIGEST_SCHEME,
        PBKDF2_ITERATIONS,
        hex::encode(&salt),
        hex::encode(key)
    )
}

/// Verify a plaintext password against a stored digest.
///
/// A malformed digest verifies as false rather than erroring; the digest
/// comparison itself is constant-time.
pub fn verify_password(password: &str, digest: &str) -> bool {
    let mut parts = digest.split('$');
    let (scheme, iterations, salt_hex, key_hex) = match (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) {
        (Some(s), Some(i), Some(salt), Some(key), None) => (s, i, salt, key),
        _ => return false,
    };
    if scheme != DIGEST_SCHEME {
        return false;
    }
    let iterations: u32 = match iterations.parse() {
        Ok(n) if n > 0 => n,
        _ => return false,
    };
    let salt = match hex::decode(salt_hex) {
        Ok(salt) => salt,
        Err(_) => return false,
    };
    let stored_key = match hex::decode(key_hex) {
        Ok(key) => key,
        Err(_) => return false,
    };

    let derived = derive_key(password, &salt, iterations);
    constant_time_eq(&derived, &stored_key)
}

/// Derive a 32-byte key from the password using PBKDF2-HMAC-SHA256
fn derive_key(password: &str, salt: &[u8], iterations: u32) -> Vec<u8> {
    let mut key = vec![0u8; KEY_LEN];
    pbkdf2::<HmacSha256>(password.as_bytes(), salt, iterations, &mut key);
    key
}

/// Compare two byte strings without short-circuiting on the first mismatch
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
