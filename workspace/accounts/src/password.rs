use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rand::rngs::OsRng;
use tracing::{debug, instrument, warn};

use crate::error::Result;

/// Stateless one-way password hashing with Argon2id.
///
/// Hashes are PHC strings (`$argon2id$v=19$...`) that carry their own salt
/// and parameters, so verification needs nothing but the stored value.
#[derive(Clone, Copy, Debug, Default)]
pub struct PasswordService;

impl PasswordService {
    pub fn new() -> Self {
        Self
    }

    fn context() -> Argon2<'static> {
        Argon2::new(
            argon2::Algorithm::Argon2id,
            argon2::Version::V0x13,
            argon2::Params::DEFAULT,
        )
    }

    /// Hashes `password` with a fresh random salt.
    #[instrument(skip_all)]
    pub fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Self::context().hash_password(password.as_bytes(), &salt)?;
        debug!("Password hashed");
        Ok(hash.to_string())
    }

    /// Checks `password` against a stored PHC hash.
    ///
    /// A mismatch is `Ok(false)`. A stored value that is not a valid hash is
    /// an error.
    #[instrument(skip_all)]
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        let parsed = PasswordHash::new(hash)?;
        match Self::context().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => {
                warn!("Password verification failed");
                Ok(false)
            }
            Err(error) => Err(error.into()),
        }
    }
}
