//! Stored password hashes: PBKDF2-HMAC-SHA256, encoded as
//! `pbkdf2-sha256$<iterations>$<salt hex>$<hash hex>`.

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;

use crate::{Error, Result};

const SCHEME: &str = "pbkdf2-sha256";
const ITERATIONS: u32 = 100_000;
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);

    let mut hash = [0u8; HASH_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, ITERATIONS, &mut hash);

    format!(
        "{}${}${}${}",
        SCHEME,
        ITERATIONS,
        hex::encode(salt),
        hex::encode(hash)
    )
}

pub fn verify_password(password: &str, stored: &str) -> Result<bool> {
    let mut parts = stored.split('$');
    let (scheme, iterations, salt_hex, hash_hex) = match (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) {
        (Some(s), Some(i), Some(salt), Some(hash), None) => (s, i, salt, hash),
        _ => return Err(Error::BadPasswordHash),
    };

    if scheme != SCHEME {
        return Err(Error::BadPasswordHash);
    }

    let iterations: u32 = iterations.parse().map_err(|_| Error::BadPasswordHash)?;
    let salt = hex::decode(salt_hex).map_err(|_| Error::BadPasswordHash)?;
    let expected = hex::decode(hash_hex).map_err(|_| Error::BadPasswordHash)?;

    let mut actual = vec![0u8; expected.len()];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, iterations, &mut actual);

    // Length equality first so the comparison below is shape-safe.
    if actual.len() != expected.len() {
        return Ok(false);
    }

    let mut diff = 0u8;
    for (a, b) in actual.iter().zip(expected.iter()) {
        diff |= a ^ b;
    }
    Ok(diff == 0)
}
