//! Cryptographic primitives.
//!
//! Key derivation, authenticated encryption, digests, and the random-byte
//! source everything else draws salts and nonces from.

pub mod aead;
pub mod digest;
pub mod kdf;

pub use aead::{fill_random, open, random_array, seal};
pub use digest::{sha512, sha512_hex};
pub use kdf::{KdfParams, derive_key};

/// Length of the symmetric encryption key (32 bytes / 256 bits).
pub const KEY_LEN: usize = 32;
/// Length of the AES-GCM nonce (12 bytes / 96 bits).
pub const NONCE_LEN: usize = 12;
/// Length of the AES-GCM authentication tag (16 bytes / 128 bits).
pub const TAG_LEN: usize = 16;
/// Length of the login-password salt (16 bytes).
pub const PASSWORD_SALT_LEN: usize = 16;
/// Length of the per-user vault salt (32 bytes).
pub const VAULT_SALT_LEN: usize = 32;
