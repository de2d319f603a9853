//! Login-keyed authentication records and their persisted form.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::table::{ProbeTable, Record};

/// Per-user authentication record.
///
/// All binary material is stored hex-encoded. The four secret-bearing
/// fields travel together: a password rotation replaces the hash, both
/// salts, and the seed-phrase hash in one step, never a subset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    #[serde(rename = "_login")]
    pub login: String,
    #[serde(rename = "_passwordHash")]
    pub password_hash: String,
    #[serde(rename = "_salt")]
    pub password_salt: String,
    #[serde(rename = "_seedPhraseHash")]
    pub seed_phrase_hash: String,
    #[serde(rename = "_vaultSalt")]
    pub vault_salt: String,
}

impl Record for CredentialRecord {
    fn probe_key(&self) -> Vec<u8> {
        self.login.as_bytes().to_vec()
    }

    fn same_key(&self, other: &Self) -> bool {
        self.login == other.login
    }
}

/// Replacement secret material minted for a password rotation.
#[derive(Debug, Clone)]
pub struct SecretRotation {
    pub password_hash: String,
    pub password_salt: String,
    pub seed_phrase_hash: String,
    pub vault_salt: String,
}

/// The server-side user directory: an open-addressing table keyed by login.
///
/// Logins are unique among live records; duplicate registration is rejected
/// here, before the slot-claiming insert runs.
#[derive(Default)]
pub struct CredentialTable {
    table: ProbeTable<CredentialRecord>,
}

impl CredentialTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn contains(&self, login: &str) -> bool {
        self.get(login).is_some()
    }

    pub fn get(&self, login: &str) -> Option<&CredentialRecord> {
        self.table.find(login.as_bytes(), |r| r.login == login)
    }

    pub fn insert(&mut self, record: CredentialRecord) -> Result<()> {
        if self.contains(&record.login) {
            return Err(Error::Validation(format!(
                "user '{}' already exists",
                record.login
            )));
        }
        self.table.insert(record)
    }

    /// Soft-delete a record; its slot is reclaimed on the next rehash.
    pub fn remove(&mut self, login: &str) -> bool {
        self.table.remove(login.as_bytes(), |r| r.login == login)
    }

    /// Replace all secret-bearing fields of one record in a single step.
    pub fn rotate(&mut self, login: &str, rotation: SecretRotation) -> Result<()> {
        let record = self
            .table
            .find_mut(login.as_bytes(), |r| r.login == login)
            .ok_or_else(|| Error::Auth(format!("unknown user '{login}'")))?;
        record.password_hash = rotation.password_hash;
        record.password_salt = rotation.password_salt;
        record.seed_phrase_hash = rotation.seed_phrase_hash;
        record.vault_salt = rotation.vault_salt;
        Ok(())
    }

    pub fn records(&self) -> impl Iterator<Item = &CredentialRecord> {
        self.table.iter()
    }

    /// Serialize live records as the persisted JSON array.
    pub fn to_json(&self) -> Result<String> {
        let records: Vec<&CredentialRecord> = self.records().collect();
        Ok(serde_json::to_string_pretty(&records)?)
    }

    /// Rebuild a table from the persisted JSON array.
    pub fn from_json(data: &str) -> Result<Self> {
        let records: Vec<CredentialRecord> = serde_json::from_str(data)?;
        let mut table = Self::new();
        for record in records {
            table.insert(record)?;
        }
        Ok(table)
    }
}
