//! Django-compatible PBKDF2 password credentials.
//!
//! Encoded form: `pbkdf2_sha256$<iterations>$<salt>$<base64(derived key)>`.
//! The downstream application verifies credentials with exactly these
//! parameters, so they are constants rather than configuration.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use pbkdf2::pbkdf2_hmac;
use rand::{Rng, distributions::Alphanumeric};
use sha2::Sha256;
use subtle::ConstantTimeEq;

/// Algorithm identifier written as the first field of the encoded hash.
pub const ALGORITHM: &str = "pbkdf2_sha256";

/// Iteration count expected by the verifying application.
pub const ITERATIONS: u32 = 150_000;

/// Length of the generated alphanumeric salt.
pub const SALT_LENGTH: usize = 12;

const KEY_LENGTH: usize = 32;

/// Newtype for password to prevent accidental logging
#[derive(Clone)]
pub struct Password(String);

impl Password {
    pub fn new(password: impl Into<String>) -> Self {
        Self(password.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Password(****)")
    }
}

/// Newtype for an encoded password hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHashString(String);

impl PasswordHashString {
    pub fn new(hash: String) -> Self {
        Self(hash)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Salt field of the encoded hash, if the encoding is well formed.
    pub fn salt(&self) -> Option<&str> {
        parse(&self.0).ok().map(|parts| parts.salt)
    }
}

struct EncodedParts<'a> {
    iterations: u32,
    salt: &'a str,
    hash: &'a str,
}

fn parse(encoded: &str) -> Result<EncodedParts<'_>, anyhow::Error> {
    let mut fields = encoded.splitn(4, '$');
    let (Some(algorithm), Some(iterations), Some(salt), Some(hash)) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Err(anyhow::anyhow!("Invalid password hash format"));
    };

    if algorithm != ALGORITHM {
        return Err(anyhow::anyhow!("Unsupported hash algorithm: {}", algorithm));
    }

    let iterations = iterations
        .parse::<u32>()
        .map_err(|e| anyhow::anyhow!("Invalid iteration count: {}", e))?;

    Ok(EncodedParts {
        iterations,
        salt,
        hash,
    })
}

/// Generate a random alphanumeric salt.
pub fn generate_salt() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SALT_LENGTH)
        .map(char::from)
        .collect()
}

fn derive(password: &Password, salt: &str, iterations: u32) -> String {
    let mut key = [0u8; KEY_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_str().as_bytes(), salt.as_bytes(), iterations, &mut key);
    STANDARD.encode(key)
}

/// Hash a password with an explicit salt and iteration count.
pub fn hash_password_with_salt(
    password: &Password,
    salt: &str,
    iterations: u32,
) -> Result<PasswordHashString, anyhow::Error> {
    if salt.is_empty() || salt.contains('$') {
        return Err(anyhow::anyhow!("Salt must be non-empty and must not contain '$'"));
    }
    if iterations == 0 {
        return Err(anyhow::anyhow!("Iteration count must be positive"));
    }

    let hash = derive(password, salt, iterations);

    Ok(PasswordHashString::new(format!(
        "{}${}${}${}",
        ALGORITHM, iterations, salt, hash
    )))
}

/// Hash a password with a freshly generated salt.
///
/// Each call draws a new salt, so two hashes of the same password differ.
pub fn hash_password(password: &Password) -> Result<PasswordHashString, anyhow::Error> {
    hash_password_with_salt(password, &generate_salt(), ITERATIONS)
}

/// Verify a password against an encoded hash using constant-time comparison
pub fn verify_password(
    password: &Password,
    password_hash: &PasswordHashString,
) -> Result<(), anyhow::Error> {
    let parts = parse(password_hash.as_str())?;
    let expected = derive(password, parts.salt, parts.iterations);

    if bool::from(expected.as_bytes().ct_eq(parts.hash.as_bytes())) {
        Ok(())
    } else {
        Err(anyhow::anyhow!("Password verification failed"))
    }
}
