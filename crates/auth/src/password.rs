//! Password hashing with Argon2id.
//!
//! Stored credentials are PHC strings; plaintext never leaves this module.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};

use crate::error::AuthError;

/// Argon2id hasher.
///
/// `new()` uses the argon2 crate defaults (m=19456 KiB, t=2, p=1), which
/// match the OWASP recommendation. Tests build cheaper instances with
/// [`PasswordHasher::with_params`].
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordHasher {
    pub fn new() -> Self {
        Self {
            params: Params::default(),
        }
    }

    pub fn with_params(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self, AuthError> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| AuthError::Hashing(format!("invalid parameters: {e}")))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a plaintext password into a PHC string.
    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| AuthError::Hashing(e.to_string()))
    }

    /// `Ok(true)` on match, `Ok(false)` on mismatch.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(hash).map_err(|_| AuthError::InvalidHashFormat)?;
        match self.argon2().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::Hashing(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::with_params(1024, 1, 1).unwrap()
    }

    #[test]
    fn hash_is_argon2id_phc_string() {
        let hash = hasher().hash("password").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("password"));
    }

    #[test]
    fn correct_password_matches() {
        let h = hasher();
        let hash = h.hash("hunter2").unwrap();
        assert!(h.verify("hunter2", &hash).unwrap());
        assert!(!h.verify("hunter3", &hash).unwrap());
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let h = hasher();
        assert_ne!(h.hash("pw").unwrap(), h.hash("pw").unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert_eq!(hasher().verify("pw", "not-a-hash"), Err(AuthError::InvalidHashFormat));
    }
}
