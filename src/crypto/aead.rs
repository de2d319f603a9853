use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use zeroize::Zeroizing;

use super::{KEY_LEN, NONCE_LEN};
use crate::error::{Error, Result};

/// Fill a buffer from the OS cryptographic RNG. Fails loudly if the source
/// is unavailable; nothing in this crate degrades to a weaker generator.
pub fn fill_random(buf: &mut [u8]) -> Result<()> {
    getrandom::fill(buf).map_err(|_| Error::Config("OS random generator unavailable".into()))
}

/// Draw a fixed-size array of random bytes. Used for salts, nonces, and
/// mnemonic entropy.
pub fn random_array<const N: usize>() -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    fill_random(&mut buf)?;
    Ok(buf)
}

/// Encrypt plaintext with AES-256-GCM under a fresh random nonce.
///
/// The returned blob is `nonce ‖ ciphertext+tag`; the nonce is never reused
/// and never stored anywhere else.
pub fn seal(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new(key.into());

    let nonce: [u8; NONCE_LEN] = random_array()?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| Error::Crypto)?;

    let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Decrypt a nonce-prefixed blob produced by [`seal`].
///
/// Fails closed on a short blob or any tag mismatch; the caller treats that
/// failure as "wrong key", never as recoverable corruption.
pub fn open(key: &[u8; KEY_LEN], blob: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    if blob.len() < NONCE_LEN {
        return Err(Error::Crypto);
    }
    let (nonce, ciphertext) = blob.split_at(NONCE_LEN);

    let cipher = Aes256Gcm::new(key.into());
    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| Error::Crypto)?;
    Ok(Zeroizing::new(plaintext))
}
