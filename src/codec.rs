//! Seals the vault table into the opaque blob the server stores, and opens
//! it again on the client.

use zeroize::Zeroizing;

use crate::crypto::{KEY_LEN, aead};
use crate::error::{Error, Result};
use crate::vault::VaultTable;

/// Serialize the vault to its plaintext JSON form and encrypt it under the
/// vault key. The result is the wire/storage blob `nonce ‖ ciphertext+tag`.
pub fn seal(vault: &VaultTable, key: &[u8; KEY_LEN]) -> Result<Vec<u8>> {
    let plaintext = Zeroizing::new(vault.to_json()?);
    aead::seal(key, plaintext.as_bytes())
}

/// Decrypt a blob and rebuild the vault table.
///
/// A tag mismatch surfaces as [`Error::Crypto`] — the caller's only signal
/// of a wrong codeword. The zero-length blob is the caller's empty-vault
/// sentinel and never reaches this function.
pub fn open(blob: &[u8], key: &[u8; KEY_LEN]) -> Result<VaultTable> {
    let plaintext = aead::open(key, blob)?;
    let text = std::str::from_utf8(&plaintext).map_err(|_| Error::Crypto)?;
    VaultTable::from_json(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::VaultEntry;

    fn sample_vault() -> VaultTable {
        let mut vault = VaultTable::new();
        vault
            .upsert(VaultEntry::new(
                "github",
                "a@x.com",
                "hunter2",
                "https://github.com",
                "",
            ))
            .unwrap();
        vault
            .upsert(VaultEntry::new("mail", "bob", "s3cret", "", "personal"))
            .unwrap();
        vault
    }

    #[test]
    fn seal_open_roundtrip() {
        let key = [7u8; KEY_LEN];
        let blob = seal(&sample_vault(), &key).unwrap();
        let restored = open(&blob, &key).unwrap();

        assert_eq!(restored.len(), 2);
        assert_eq!(restored.get("a@x.com", "github").unwrap().password, "hunter2");
        assert_eq!(restored.get("bob", "mail").unwrap().note, "personal");
    }

    #[test]
    fn wrong_key_is_crypto_error() {
        let blob = seal(&sample_vault(), &[7u8; KEY_LEN]).unwrap();
        assert!(matches!(open(&blob, &[8u8; KEY_LEN]), Err(Error::Crypto)));
    }

    #[test]
    fn tampered_blob_is_crypto_error() {
        let key = [7u8; KEY_LEN];
        let mut blob = seal(&sample_vault(), &key).unwrap();
        let mid = blob.len() / 2;
        blob[mid] ^= 0xff;
        assert!(matches!(open(&blob, &key), Err(Error::Crypto)));
    }

    #[test]
    fn empty_vault_roundtrips() {
        let key = [1u8; KEY_LEN];
        let blob = seal(&VaultTable::new(), &key).unwrap();
        assert!(open(&blob, &key).unwrap().is_empty());
    }
}
