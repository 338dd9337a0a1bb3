//! Password hashing.
//!
//! PBKDF2-HMAC-SHA256 with a random per-password salt. Stored as
//! `pbkdf2-sha256$<iterations>$<salt hex>$<hash hex>` so the iteration count
//! can be raised later without invalidating existing hashes.

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;

const ITERATIONS: u32 = 120_000;
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

/// Hash a password for storage.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);

    let mut out = [0u8; HASH_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, ITERATIONS, &mut out);

    format!(
        "pbkdf2-sha256${ITERATIONS}${}${}",
        hex::encode(salt),
        hex::encode(out)
    )
}

/// Verify a password against a stored hash. Unparseable hashes verify false.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');
    let (scheme, iterations, salt_hex, hash_hex) = match (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) {
        (Some(scheme), Some(iterations), Some(salt), Some(hash), None) => {
            (scheme, iterations, salt, hash)
        }
        _ => return false,
    };
    if scheme != "pbkdf2-sha256" {
        return false;
    }
    let Ok(iterations) = iterations.parse::<u32>() else {
        return false;
    };
    let Ok(salt) = hex::decode(salt_hex) else {
        return false;
    };
    let Ok(expected) = hex::decode(hash_hex) else {
        return false;
    };

    let mut out = vec![0u8; expected.len()];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, iterations, &mut out);
    constant_time_eq(&out, &expected)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_correct_password() {
        let hash = hash_password("hunter2hunter2");
        assert!(verify_password("hunter2hunter2", &hash));
    }

    #[test]
    fn rejects_wrong_password() {
        let hash = hash_password("hunter2hunter2");
        assert!(!verify_password("hunter3hunter3", &hash));
    }

    #[test]
    fn salts_are_unique_per_hash() {
        let a = hash_password("same password");
        let b = hash_password("same password");
        assert_ne!(a, b);
        assert!(verify_password("same password", &a));
        assert!(verify_password("same password", &b));
    }

    #[test]
    fn rejects_malformed_stored_hashes() {
        assert!(!verify_password("anything", ""));
        assert!(!verify_password("anything", "bcrypt$10$zz$zz"));
        assert!(!verify_password("anything", "pbkdf2-sha256$notanumber$aa$bb"));
        assert!(!verify_password("anything", "pbkdf2-sha256$1000$nothex$bb"));
    }
}
