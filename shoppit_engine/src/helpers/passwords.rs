//! Salted password hashing.
//!
//! Stored form is `{salt}${digest}`, both hex: a 16-byte random salt and the Blake2b-512 digest of
//! `salt || password`. Verification recomputes the digest from the stored salt and compares.

use blake2::{Blake2b512, Digest};

const SALT_LEN: usize = 16;

pub fn hash_password(password: &str) -> String {
    let salt: [u8; SALT_LEN] = rand::random();
    format!("{}${}", to_hex(&salt), digest_hex(&salt, password))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_hex, digest)) = stored.split_once('$') else {
        return false;
    };
    let Some(salt) = from_hex(salt_hex) else {
        return false;
    };
    digest_hex(&salt, password) == digest
}

fn digest_hex(salt: &[u8], password: &str) -> String {
    let mut hasher = Blake2b512::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    to_hex(&hasher.finalize())
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
        use std::fmt::Write;
        let _ = write!(s, "{b:02x}");
        s
    })
}

fn from_hex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len()).step_by(2).map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok()).collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trip() {
        let stored = hash_password("correct horse battery staple");
        assert!(verify_password("correct horse battery staple", &stored));
        assert!(!verify_password("correct horse battery", &stored));
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash_password("secret");
        let b = hash_password("secret");
        assert_ne!(a, b);
        assert!(verify_password("secret", &a));
        assert!(verify_password("secret", &b));
    }

    #[test]
    fn garbage_stored_values_never_verify() {
        assert!(!verify_password("secret", ""));
        assert!(!verify_password("secret", "no-dollar-sign"));
        assert!(!verify_password("secret", "zz$notahash"));
    }
}
