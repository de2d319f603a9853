//! Client-side orchestration.
//!
//! Speaks the wire protocol one connection per call, derives the vault key
//! locally from the codeword, and owns the decrypted vault table for the
//! lifetime of a session. The codeword and vault key never reach the
//! server in any form.

use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};

use zeroize::{Zeroize, Zeroizing};

use crate::codec;
use crate::crypto::{KEY_LEN, kdf, kdf::KdfParams};
use crate::error::{Error, Result};
use crate::protocol::{Request, Response};
use crate::validate;
use crate::vault::{VaultEntry, VaultTable};

/// An authenticated session's in-memory state. Dropped (and the key wiped)
/// on logout.
struct Session {
    username: String,
    password: Zeroizing<String>,
    code_word: Zeroizing<String>,
    vault_key: [u8; KEY_LEN],
    vault: VaultTable,
}

impl Drop for Session {
    fn drop(&mut self) {
        self.vault_key.zeroize();
    }
}

pub struct Client {
    server_addr: String,
    kdf: KdfParams,
    session: Option<Session>,
}

impl Client {
    pub fn new(server_addr: impl Into<String>) -> Self {
        Self::with_kdf(server_addr, KdfParams::default())
    }

    pub fn with_kdf(server_addr: impl Into<String>, kdf: KdfParams) -> Self {
        Self {
            server_addr: server_addr.into(),
            kdf,
            session: None,
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.is_some()
    }

    pub fn username(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.username.as_str())
    }

    /// One request, one response, one connection.
    fn send(&self, request: &Request) -> Result<Response> {
        let mut stream = TcpStream::connect(&self.server_addr)?;
        stream.write_all(&serde_json::to_vec(request)?)?;
        // Half-close so the server's read sees EOF.
        stream.shutdown(Shutdown::Write)?;

        let mut raw = Vec::new();
        stream.read_to_end(&mut raw)?;
        if raw.is_empty() {
            return Err(Error::Protocol("empty response from server".into()));
        }
        Ok(serde_json::from_slice(&raw)?)
    }

    fn expect_success(response: Response) -> Result<Response> {
        if response.is_success() {
            Ok(response)
        } else {
            Err(Error::Remote(
                response
                    .message
                    .unwrap_or_else(|| "unspecified server error".into()),
            ))
        }
    }

    fn derive_vault_key(&self, code_word: &str, vault_salt_hex: &str) -> Result<[u8; KEY_LEN]> {
        let salt = hex::decode(vault_salt_hex)
            .map_err(|_| Error::Protocol("vault salt is not valid hex".into()))?;
        kdf::derive_key(code_word, &salt, self.kdf)
    }

    /// Decode and decrypt a hex blob into a vault table. The empty blob is
    /// the empty vault.
    fn open_blob_hex(vault_data: &str, key: &[u8; KEY_LEN]) -> Result<VaultTable> {
        if vault_data.is_empty() {
            return Ok(VaultTable::new());
        }
        let blob = hex::decode(vault_data)
            .map_err(|_| Error::Protocol("vault data is not valid hex".into()))?;
        if blob.is_empty() {
            return Ok(VaultTable::new());
        }
        codec::open(&blob, key)
    }

    pub fn check_user(&self, username: &str) -> Result<bool> {
        let response = Self::expect_success(self.send(&Request::CheckUser {
            username: username.to_string(),
        })?)?;
        response
            .exists
            .ok_or_else(|| Error::Protocol("checkUser response missing 'exists'".into()))
    }

    /// Register a new account. The server returns the one-time seed words
    /// and the vault salt; the client then encrypts an empty vault under
    /// the codeword-derived key and uploads it, leaving the session open.
    pub fn register(
        &mut self,
        username: &str,
        password: &str,
        code_word: &str,
    ) -> Result<Vec<String>> {
        validate::validate_username(username)?;
        validate::validate_password(password)?;
        validate::validate_code_word(code_word)?;

        let response = Self::expect_success(self.send(&Request::Register {
            username: username.to_string(),
            password: password.to_string(),
        })?)?;
        let seed_words = response
            .seed_words
            .ok_or_else(|| Error::Protocol("register response missing seed words".into()))?;
        let vault_salt = response
            .vault_salt
            .ok_or_else(|| Error::Protocol("register response missing vault salt".into()))?;

        let vault_key = self.derive_vault_key(code_word, &vault_salt)?;
        let vault = VaultTable::new();
        let blob = codec::seal(&vault, &vault_key)?;

        Self::expect_success(self.send(&Request::UpdateVault {
            username: username.to_string(),
            password: password.to_string(),
            vault_data: hex::encode(blob),
        })?)?;

        self.session = Some(Session {
            username: username.to_string(),
            password: Zeroizing::new(password.to_string()),
            code_word: Zeroizing::new(code_word.to_string()),
            vault_key,
            vault,
        });
        Ok(seed_words)
    }

    /// Authenticate and open the vault. A blob that does not decrypt under
    /// the supplied codeword fails the whole login: the password was
    /// accepted, but an unreadable vault is not a usable session.
    pub fn login(&mut self, username: &str, password: &str, code_word: &str) -> Result<()> {
        validate::validate_code_word(code_word)?;

        let response = Self::expect_success(self.send(&Request::Login {
            username: username.to_string(),
            password: password.to_string(),
        })?)?;
        let vault_salt = response
            .vault_salt
            .ok_or_else(|| Error::Protocol("login response missing vault salt".into()))?;
        let vault_data = response
            .vault_data
            .ok_or_else(|| Error::Protocol("login response missing vault data".into()))?;

        let vault_key = self.derive_vault_key(code_word, &vault_salt)?;
        let vault = Self::open_blob_hex(&vault_data, &vault_key)?;

        self.session = Some(Session {
            username: username.to_string(),
            password: Zeroizing::new(password.to_string()),
            code_word: Zeroizing::new(code_word.to_string()),
            vault_key,
            vault,
        });
        Ok(())
    }

    /// Rotate the login password from inside a session.
    ///
    /// Order matters: the current blob is fetched under the old credentials
    /// and the codeword proven by decrypting it. Only then is the mutating
    /// call issued, so a wrong codeword can never strand the vault behind a
    /// rotated password. The decrypted plaintext is re-sealed under the new
    /// salt with the same codeword and uploaded before the session state is
    /// updated.
    pub fn change_password(
        &mut self,
        seed_phrase: &str,
        new_password: &str,
        code_word: &str,
    ) -> Result<Vec<String>> {
        validate::validate_code_word(code_word)?;
        validate::validate_password(new_password)?;

        let (username, old_password) = {
            let session = self
                .session
                .as_ref()
                .ok_or_else(|| Error::Auth("not logged in".into()))?;
            (session.username.clone(), session.password.clone())
        };

        let fetched = Self::expect_success(self.send(&Request::GetVault {
            username: username.clone(),
            password: old_password.to_string(),
        })?)?;
        let current_salt = fetched
            .vault_salt
            .ok_or_else(|| Error::Protocol("getVault response missing vault salt".into()))?;
        let current_data = fetched
            .vault_data
            .ok_or_else(|| Error::Protocol("getVault response missing vault data".into()))?;

        // Decrypt-to-verify; aborts with Error::Crypto before any rotation.
        let old_key = self.derive_vault_key(code_word, &current_salt)?;
        let vault = Self::open_blob_hex(&current_data, &old_key)?;

        let response = Self::expect_success(self.send(&Request::ChangePassword {
            username: username.clone(),
            seed_phrase: seed_phrase.to_string(),
            new_password: new_password.to_string(),
        })?)?;
        let new_seed_words = response
            .new_seed_words
            .ok_or_else(|| Error::Protocol("rotation response missing new seed words".into()))?;
        let new_vault_salt = response
            .new_vault_salt
            .ok_or_else(|| Error::Protocol("rotation response missing new vault salt".into()))?;

        let new_key = self.derive_vault_key(code_word, &new_vault_salt)?;
        let blob = codec::seal(&vault, &new_key)?;
        Self::expect_success(self.send(&Request::UpdateVault {
            username: username.clone(),
            password: new_password.to_string(),
            vault_data: hex::encode(blob),
        })?)?;

        if let Some(session) = self.session.as_mut() {
            session.password = Zeroizing::new(new_password.to_string());
            session.code_word = Zeroizing::new(code_word.to_string());
            session.vault_key.zeroize();
            session.vault_key = new_key;
            session.vault = vault;
        }
        Ok(new_seed_words)
    }

    /// Rotate the password with the recovery phrase when the old password
    /// is lost. Same verify-before-rotate ordering as
    /// [`Self::change_password`], authorized by the phrase instead of the
    /// password. Does not open a session.
    pub fn recover_password(
        &mut self,
        username: &str,
        seed_phrase: &str,
        new_password: &str,
        code_word: &str,
    ) -> Result<Vec<String>> {
        validate::validate_code_word(code_word)?;
        validate::validate_password(new_password)?;

        let fetched = Self::expect_success(self.send(&Request::GetVaultWithSeedPhrase {
            username: username.to_string(),
            seed_phrase: seed_phrase.to_string(),
        })?)?;
        let current_salt = fetched
            .vault_salt
            .ok_or_else(|| Error::Protocol("getVault response missing vault salt".into()))?;
        let current_data = fetched
            .vault_data
            .ok_or_else(|| Error::Protocol("getVault response missing vault data".into()))?;

        let old_key = self.derive_vault_key(code_word, &current_salt)?;
        let vault = Self::open_blob_hex(&current_data, &old_key)?;

        let response = Self::expect_success(self.send(&Request::RecoverPassword {
            username: username.to_string(),
            seed_phrase: seed_phrase.to_string(),
            new_password: new_password.to_string(),
        })?)?;
        let new_seed_words = response
            .new_seed_words
            .ok_or_else(|| Error::Protocol("rotation response missing new seed words".into()))?;
        let new_vault_salt = response
            .new_vault_salt
            .ok_or_else(|| Error::Protocol("rotation response missing new vault salt".into()))?;

        let new_key = self.derive_vault_key(code_word, &new_vault_salt)?;
        let blob = codec::seal(&vault, &new_key)?;
        Self::expect_success(self.send(&Request::UpdateVault {
            username: username.to_string(),
            password: new_password.to_string(),
            vault_data: hex::encode(blob),
        })?)?;

        Ok(new_seed_words)
    }

    /// Sync, then drop the session and wipe its key material. A failing
    /// sync keeps the session open so nothing is silently lost.
    pub fn logout(&mut self) -> Result<()> {
        if self.session.is_some() {
            self.sync_to_server()?;
        }
        self.session = None;
        Ok(())
    }

    /// Drop the session without syncing. Local changes since the last sync
    /// are discarded.
    pub fn abandon_session(&mut self) {
        self.session = None;
    }

    fn session_mut(&mut self) -> Result<&mut Session> {
        self.session
            .as_mut()
            .ok_or_else(|| Error::Auth("not logged in".into()))
    }

    fn session_ref(&self) -> Result<&Session> {
        self.session
            .as_ref()
            .ok_or_else(|| Error::Auth("not logged in".into()))
    }

    /// Add or overwrite the entry for (login, service) in the local vault.
    pub fn add_entry(
        &mut self,
        service: &str,
        login: &str,
        password: &str,
        url: &str,
        note: &str,
    ) -> Result<()> {
        let session = self.session_mut()?;
        session
            .vault
            .upsert(VaultEntry::new(service, login, password, url, note))
    }

    /// Update an existing entry; unknown (login, service) is a validation
    /// error.
    pub fn update_entry(
        &mut self,
        service: &str,
        login: &str,
        password: &str,
        url: &str,
        note: &str,
    ) -> Result<()> {
        let session = self.session_mut()?;
        if session.vault.get(login, service).is_none() {
            return Err(Error::Validation(format!(
                "no entry for '{login}' at '{service}'"
            )));
        }
        session
            .vault
            .upsert(VaultEntry::new(service, login, password, url, note))
    }

    pub fn delete_entry(&mut self, service: &str, login: &str) -> Result<()> {
        let session = self.session_mut()?;
        if !session.vault.remove(login, service) {
            return Err(Error::Validation(format!(
                "no entry for '{login}' at '{service}'"
            )));
        }
        Ok(())
    }

    /// Snapshot of the decrypted entries, cloned out of the session.
    pub fn vault_entries(&self) -> Result<Vec<VaultEntry>> {
        let session = self.session_ref()?;
        Ok(session.vault.entries().cloned().collect())
    }

    /// Re-encrypt the local vault and upload it.
    pub fn sync_to_server(&mut self) -> Result<()> {
        let session = self.session_ref()?;
        let blob = codec::seal(&session.vault, &session.vault_key)?;
        Self::expect_success(self.send(&Request::UpdateVault {
            username: session.username.clone(),
            password: session.password.to_string(),
            vault_data: hex::encode(blob),
        })?)?;
        Ok(())
    }

    /// Refetch the blob and replace the local vault with its contents. The
    /// key is re-derived in case the salt rotated underneath the session.
    pub fn sync_from_server(&mut self) -> Result<()> {
        let (username, password, code_word) = {
            let session = self.session_ref()?;
            (
                session.username.clone(),
                session.password.clone(),
                session.code_word.clone(),
            )
        };

        let response = Self::expect_success(self.send(&Request::GetVault {
            username,
            password: password.to_string(),
        })?)?;
        let vault_salt = response
            .vault_salt
            .ok_or_else(|| Error::Protocol("getVault response missing vault salt".into()))?;
        let vault_data = response
            .vault_data
            .ok_or_else(|| Error::Protocol("getVault response missing vault data".into()))?;

        let vault_key = self.derive_vault_key(&code_word, &vault_salt)?;
        let vault = Self::open_blob_hex(&vault_data, &vault_key)?;

        let session = self.session_mut()?;
        session.vault_key.zeroize();
        session.vault_key = vault_key;
        session.vault = vault;
        Ok(())
    }
}
