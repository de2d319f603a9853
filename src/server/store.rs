//! Durable state behind the request handlers: the credential table held
//! under a process-local lock, plus the per-user blob files.
//!
//! Every successful mutation rewrites the record file before the lock is
//! released, so durability holds after each mutating call without the
//! reload-per-request cost.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::credentials::CredentialTable;
use crate::error::{Error, Result};
use crate::storage::FileStore;

pub struct UserStore {
    users_file: FileStore,
    vault_dir: PathBuf,
    users: Mutex<CredentialTable>,
}

impl UserStore {
    /// Open the record file and blob directory, bootstrapping both when
    /// absent (fresh deployments start with an empty record file).
    pub fn open(users_file: PathBuf, vault_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&vault_dir)?;

        let users_file = FileStore::new(users_file);
        let users = if users_file.exists() {
            let data = users_file.load()?;
            let text = std::str::from_utf8(&data)
                .map_err(|_| Error::Internal("record file is not valid UTF-8".into()))?;
            CredentialTable::from_json(text)?
        } else {
            let table = CredentialTable::new();
            users_file.save(table.to_json()?.as_bytes())?;
            table
        };

        Ok(Self {
            users_file,
            vault_dir,
            users: Mutex::new(users),
        })
    }

    /// Read access to the credential table.
    pub fn with_users<R>(&self, read: impl FnOnce(&CredentialTable) -> R) -> R {
        let users = self.users.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        read(&users)
    }

    /// Mutate the credential table and persist it before releasing the
    /// lock. If the mutation fails nothing is written.
    pub fn mutate_users<R>(
        &self,
        mutate: impl FnOnce(&mut CredentialTable) -> Result<R>,
    ) -> Result<R> {
        let mut users = self.users.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let outcome = mutate(&mut users)?;
        self.users_file.save(users.to_json()?.as_bytes())?;
        Ok(outcome)
    }

    fn vault_path(&self, login: &str) -> PathBuf {
        self.vault_dir.join(format!("{login}.vault"))
    }

    pub fn vault_exists(&self, login: &str) -> bool {
        self.vault_path(login).exists()
    }

    /// Raw blob bytes for a user. Missing file is an authentication-level
    /// failure: registration always creates the (possibly empty) blob.
    pub fn read_vault(&self, login: &str) -> Result<Vec<u8>> {
        let path = self.vault_path(login);
        if !path.exists() {
            return Err(Error::Auth(format!("no vault stored for '{login}'")));
        }
        Ok(fs::read(path)?)
    }

    /// Like [`Self::read_vault`], but a missing blob reads as empty. Used
    /// by password rotation, which must succeed even when the upload of the
    /// initial vault never happened.
    pub fn read_vault_or_empty(&self, login: &str) -> Result<Vec<u8>> {
        let path = self.vault_path(login);
        if !path.exists() {
            return Ok(Vec::new());
        }
        Ok(fs::read(path)?)
    }

    /// Unconditionally replace a user's blob (last-writer-wins).
    pub fn write_vault(&self, login: &str, blob: &[u8]) -> Result<()> {
        FileStore::new(self.vault_path(login)).save(blob)
    }

    pub fn users_path(&self) -> &Path {
        self.users_file.path()
    }
}
