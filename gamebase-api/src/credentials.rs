use aws_lc_rs::{pbkdf2, rand::fill};
use base64::{Engine, prelude::BASE64_STANDARD};
use std::num::NonZeroU32;
use thiserror::Error;

const SCHEME: &str = "pbkdf2-sha256";
const ITERATIONS: u32 = 100_000;
const SALT_LEN: usize = 16;
const DIGEST_LEN: usize = 32;

/// Errors that can occur while hashing or checking a password.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// An unspecified error occurred in the crypto provider.
    #[error("An unspecified error occurred while hashing a password")]
    Unspecified(#[from] aws_lc_rs::error::Unspecified),

    /// Failed to decode base64 data of a stored digest.
    #[error("An error occurred while decoding BASE64 data of a stored password: {0}")]
    Decode(#[from] base64::DecodeError),

    /// The stored digest does not follow the `scheme$iterations$salt$digest` layout.
    #[error("The stored password digest is malformed")]
    Malformed,
}

/// Hashes `password` with a fresh random salt.
///
/// The result is self describing: `pbkdf2-sha256$<iterations>$<salt>$<digest>`, salt
/// and digest base64 encoded.
pub fn hash_password(password: &str) -> Result<String, CredentialError> {
    let mut salt = [0u8; SALT_LEN];
    fill(&mut salt)?;

    let iterations = NonZeroU32::new(ITERATIONS).ok_or(CredentialError::Malformed)?;
    let mut digest = [0u8; DIGEST_LEN];
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        iterations,
        &salt,
        password.as_bytes(),
        &mut digest,
    );

    Ok(format!(
        "{SCHEME}${ITERATIONS}${}${}",
        BASE64_STANDARD.encode(salt),
        BASE64_STANDARD.encode(digest)
    ))
}

/// Checks `password` against a digest produced by [`hash_password`] in constant time.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, CredentialError> {
    let mut parts = stored.split('$');
    let (Some(SCHEME), Some(iterations), Some(salt), Some(digest), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return Err(CredentialError::Malformed);
    };

    let iterations = iterations
        .parse::<u32>()
        .ok()
        .and_then(NonZeroU32::new)
        .ok_or(CredentialError::Malformed)?;
    let salt = BASE64_STANDARD.decode(salt)?;
    let digest = BASE64_STANDARD.decode(digest)?;

    Ok(pbkdf2::verify(
        pbkdf2::PBKDF2_HMAC_SHA256,
        iterations,
        &salt,
        password.as_bytes(),
        &digest,
    )
    .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashed_password_verifies() {
        let stored = hash_password("hunter2").unwrap();

        assert!(stored.starts_with("pbkdf2-sha256$100000$"));
        assert!(verify_password("hunter2", &stored).unwrap());
        assert!(!verify_password("hunter3", &stored).unwrap());
    }

    #[test]
    fn salts_differ_between_hashes() {
        assert_ne!(
            hash_password("same").unwrap(),
            hash_password("same").unwrap()
        );
    }

    #[test]
    fn malformed_digest_is_an_error() {
        assert!(matches!(
            verify_password("x", "plaintext"),
            Err(CredentialError::Malformed)
        ));
    }
}
