//! Password hashing and verification utilities.
//!
//! Uses Argon2id with work factors taken from configuration. Hashes produced under older
//! factors still verify (the parameters live in the PHC string) and are flagged for rehash.

use crate::config::PasswordConfig;
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sha2::{Digest, Sha256};

const DUMMY_SALT: &[u8] = b"idp-bridge/no-such-account";

#[derive(Clone, Debug)]
pub struct PasswordHashing {
    params: Params,
}

impl PasswordHashing {
    pub fn new(config: &PasswordConfig) -> Result<Self, argon2::Error> {
        let params = Params::new(
            config.argon2_memory_kib,
            config.argon2_iterations,
            config.argon2_parallelism,
            None,
        )?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a password, returning the PHC-formatted string suitable for storage.
    pub fn hash(&self, password: &str) -> Result<String, argon2::password_hash::Error> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self.argon2().hash_password(password.as_bytes(), &salt)?;
        Ok(hash.to_string())
    }

    /// Verify a password against a stored hash. Unparsable hashes never verify.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(hash) else {
            return false;
        };
        self.argon2()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// Spend the same Argon2 work as [`verify`](Self::verify) without a stored hash to
    /// compare against. Used when the account does not exist.
    pub fn verify_dummy(&self, password: &str) {
        if let Err(e) = self.burn(password) {
            tracing::debug!(error = %e, "dummy password check failed");
        }
    }

    fn burn(&self, password: &str) -> Result<(), argon2::Error> {
        let mut output = [0u8; 32];
        self.argon2()
            .hash_password_into(password.as_bytes(), DUMMY_SALT, &mut output)
    }

    /// Whether `hash` was produced with a different algorithm or weaker factors than
    /// the current policy.
    pub fn needs_rehash(&self, hash: &str) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(hash) else {
            return true;
        };
        if parsed_hash.algorithm.as_str() != "argon2id"
            || parsed_hash.version != Some(Version::V0x13 as u32)
        {
            return true;
        }
        match Params::try_from(&parsed_hash) {
            Ok(stored) => {
                stored.m_cost() != self.params.m_cost()
                    || stored.t_cost() != self.params.t_cost()
                    || stored.p_cost() != self.params.p_cost()
            }
            Err(_) => true,
        }
    }
}

/// Short digest of a stored hash. Embedded in password-reset links so that a link stops
/// working once the password it was issued against has changed.
pub fn password_fingerprint(password_hash: &str) -> String {
    let digest = Sha256::digest(password_hash.as_bytes());
    format!("{digest:x}")[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hashing(memory_kib: u32, iterations: u32) -> PasswordHashing {
        PasswordHashing::new(&PasswordConfig {
            min_length: 8,
            argon2_memory_kib: memory_kib,
            argon2_iterations: iterations,
            argon2_parallelism: 1,
        })
        .expect("valid argon2 params")
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hashing = hashing(64, 1);
        let password = "my-secure-password-123!";
        let hash = hashing.hash(password).expect("Failed to hash password");

        assert!(hash.starts_with("$argon2id$"));
        assert!(hashing.verify(password, &hash));
        assert!(!hashing.verify("wrong-password", &hash));
    }

    #[test]
    fn test_hash_produces_different_salts() {
        let hashing = hashing(64, 1);
        let hash1 = hashing.hash("same-password").expect("Failed to hash");
        let hash2 = hashing.hash("same-password").expect("Failed to hash");

        assert_ne!(hash1, hash2);
        assert!(hashing.verify("same-password", &hash1));
        assert!(hashing.verify("same-password", &hash2));
    }

    #[test]
    fn test_verify_invalid_hash_format() {
        let hashing = hashing(64, 1);
        assert!(!hashing.verify("password", "not-a-valid-hash"));
        assert!(!hashing.verify("password", ""));
        assert!(!hashing.verify("password", "$invalid$hash$format"));
    }

    #[test]
    fn stale_parameters_need_rehash() {
        let old = hashing(64, 1);
        let current = hashing(128, 2);
        let hash = old.hash("password1").expect("Failed to hash");

        // Old hashes still verify under the new policy.
        assert!(current.verify("password1", &hash));
        assert!(current.needs_rehash(&hash));
        assert!(!old.needs_rehash(&hash));
        assert!(current.needs_rehash("garbage"));
    }

    #[test]
    fn dummy_check_runs_argon2_with_current_parameters() {
        let hashing = hashing(64, 1);
        assert!(hashing.burn("anything").is_ok());
        assert!(hashing.burn("").is_ok());
        hashing.verify_dummy("anything");
    }

    #[test]
    fn fingerprint_tracks_the_hash() {
        let a = password_fingerprint("$argon2id$v=19$m=64,t=1,p=1$abc$def");
        let b = password_fingerprint("$argon2id$v=19$m=64,t=1,p=1$abc$deg");
        assert_eq!(a.len(), 16);
        assert_ne!(a, b);
    }
}
