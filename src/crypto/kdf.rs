use argon2::{Algorithm, Argon2, Params, Version};

use super::KEY_LEN;
use crate::error::{Error, Result};

/// Argon2id cost parameters.
///
/// The same parameters drive both login-password hashing on the server and
/// vault-key derivation on the client; the two derivations never share a
/// salt or a resulting key.
#[derive(Debug, Clone, Copy)]
pub struct KdfParams {
    mem_cost_kib: u32,
    time_cost: u32,
    parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            // 64 MiB memory cost
            mem_cost_kib: 64 * 1024,
            time_cost: 3,
            parallelism: 1,
        }
    }
}

impl KdfParams {
    pub fn new(mem_cost_kib: u32, time_cost: u32, parallelism: u32) -> Result<Self> {
        let params = Self {
            mem_cost_kib,
            time_cost,
            parallelism,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn mem_cost_kib(&self) -> u32 {
        self.mem_cost_kib
    }

    pub fn time_cost(&self) -> u32 {
        self.time_cost
    }

    pub fn parallelism(&self) -> u32 {
        self.parallelism
    }

    pub fn validate(&self) -> Result<()> {
        if self.time_cost < 1 {
            return Err(Error::Config("argon2 time cost must be >= 1".into()));
        }
        if self.parallelism < 1 {
            return Err(Error::Config("argon2 parallelism must be >= 1".into()));
        }
        if self.mem_cost_kib < 8 * self.parallelism {
            return Err(Error::Config(
                "argon2 memory cost must be at least 8 * parallelism".into(),
            ));
        }
        Ok(())
    }
}

/// Derive a key of arbitrary length with Argon2id.
pub fn derive_key_into(
    secret: &str,
    salt: &[u8],
    kdf: KdfParams,
    out: &mut [u8],
) -> Result<()> {
    kdf.validate()?;

    let params = Params::new(
        kdf.mem_cost_kib,
        kdf.time_cost,
        kdf.parallelism,
        Some(out.len()),
    )
    .map_err(|e| Error::Config(format!("failed to construct argon2 params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    argon2
        .hash_password_into(secret.as_bytes(), salt, out)
        .map_err(|e| Error::Config(format!("argon2 key derivation failed: {e}")))
}

/// Derive a 32-byte key: the login-password hash when `secret` is the login
/// password, or the vault key when `secret` is the codeword.
pub fn derive_key(secret: &str, salt: &[u8], kdf: KdfParams) -> Result<[u8; KEY_LEN]> {
    let mut key = [0u8; KEY_LEN];
    derive_key_into(secret, salt, kdf, &mut key)?;
    Ok(key)
}
