//! The decrypted vault: per-service credential entries keyed by
//! (login, service).
//!
//! A vault table exists in cleartext only inside an authenticated client
//! session; everywhere else it travels as the encrypted blob produced by
//! [`crate::codec`].

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::table::{ProbeTable, Record};

/// One stored credential.
///
/// `login` is the stored account's own username for that service, which may
/// differ from the vault owner's login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultEntry {
    #[serde(rename = "_service")]
    pub service: String,
    #[serde(rename = "_lastModifiedTime")]
    pub last_modified: String,
    #[serde(rename = "_login")]
    pub login: String,
    #[serde(rename = "_password")]
    pub password: String,
    #[serde(rename = "_url")]
    pub url: String,
    #[serde(rename = "_note")]
    pub note: String,
}

impl VaultEntry {
    /// Build an entry stamped with the current local time.
    pub fn new(service: &str, login: &str, password: &str, url: &str, note: &str) -> Self {
        Self {
            service: service.to_string(),
            last_modified: timestamp(),
            login: login.to_string(),
            password: password.to_string(),
            url: url.to_string(),
            note: note.to_string(),
        }
    }
}

fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

impl Record for VaultEntry {
    /// The probe hash folds login ‖ service; distinct services for one
    /// login can collide here and are resolved by [`Self::same_key`].
    fn probe_key(&self) -> Vec<u8> {
        let mut key = Vec::with_capacity(self.login.len() + self.service.len());
        key.extend_from_slice(self.login.as_bytes());
        key.extend_from_slice(self.service.as_bytes());
        key
    }

    fn same_key(&self, other: &Self) -> bool {
        self.login == other.login && self.service == other.service
    }
}

fn composite_key(login: &str, service: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(login.len() + service.len());
    key.extend_from_slice(login.as_bytes());
    key.extend_from_slice(service.as_bytes());
    key
}

/// A user's decrypted credential collection.
#[derive(Default)]
pub struct VaultTable {
    table: ProbeTable<VaultEntry>,
}

impl VaultTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Insert or overwrite the entry for (login, service). At most one live
    /// entry exists per composite key; inserting an existing key updates the
    /// payload in place.
    pub fn upsert(&mut self, entry: VaultEntry) -> Result<()> {
        self.table.upsert(entry)
    }

    pub fn get(&self, login: &str, service: &str) -> Option<&VaultEntry> {
        self.table.find(&composite_key(login, service), |e| {
            e.login == login && e.service == service
        })
    }

    pub fn remove(&mut self, login: &str, service: &str) -> bool {
        self.table.remove(&composite_key(login, service), |e| {
            e.login == login && e.service == service
        })
    }

    pub fn entries(&self) -> impl Iterator<Item = &VaultEntry> {
        self.table.iter()
    }

    /// Serialize to the plaintext intermediate form the codec encrypts.
    pub fn to_json(&self) -> Result<String> {
        let entries: Vec<&VaultEntry> = self.entries().collect();
        Ok(serde_json::to_string(&entries)?)
    }

    /// Rebuild from the plaintext intermediate form.
    pub fn from_json(data: &str) -> Result<Self> {
        let entries: Vec<VaultEntry> = serde_json::from_str(data)?;
        let mut table = Self::new();
        for entry in entries {
            table.upsert(entry)?;
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(service: &str, login: &str, password: &str) -> VaultEntry {
        VaultEntry::new(service, login, password, "https://example.com", "")
    }

    #[test]
    fn upsert_same_composite_key_keeps_one_entry() {
        let mut vault = VaultTable::new();
        vault.upsert(entry("github", "a@x.com", "p1")).unwrap();
        vault.upsert(entry("github", "a@x.com", "p2")).unwrap();

        assert_eq!(vault.len(), 1);
        assert_eq!(vault.get("a@x.com", "github").unwrap().password, "p2");
    }

    #[test]
    fn same_login_distinct_services_coexist() {
        let mut vault = VaultTable::new();
        vault.upsert(entry("github", "a@x.com", "p1")).unwrap();
        vault.upsert(entry("gitlab", "a@x.com", "p2")).unwrap();

        assert_eq!(vault.len(), 2);
        assert_eq!(vault.get("a@x.com", "github").unwrap().password, "p1");
        assert_eq!(vault.get("a@x.com", "gitlab").unwrap().password, "p2");
    }

    #[test]
    fn same_service_distinct_logins_coexist() {
        let mut vault = VaultTable::new();
        vault.upsert(entry("github", "work@x.com", "p1")).unwrap();
        vault.upsert(entry("github", "home@x.com", "p2")).unwrap();
        assert_eq!(vault.len(), 2);
    }

    #[test]
    fn concatenation_collisions_resolved_by_full_key() {
        // "ab"+"c" and "a"+"bc" concatenate identically, so they share a
        // probe hash; the full composite comparison keeps them distinct.
        let mut vault = VaultTable::new();
        vault.upsert(entry("c", "ab", "p1")).unwrap();
        vault.upsert(entry("bc", "a", "p2")).unwrap();

        assert_eq!(vault.len(), 2);
        assert_eq!(vault.get("ab", "c").unwrap().password, "p1");
        assert_eq!(vault.get("a", "bc").unwrap().password, "p2");
    }

    #[test]
    fn remove_deletes_exactly_one_entry() {
        let mut vault = VaultTable::new();
        vault.upsert(entry("github", "a@x.com", "p1")).unwrap();
        vault.upsert(entry("gitlab", "a@x.com", "p2")).unwrap();

        assert!(vault.remove("a@x.com", "github"));
        assert!(!vault.remove("a@x.com", "github"));
        assert_eq!(vault.len(), 1);
        assert!(vault.get("a@x.com", "gitlab").is_some());
    }

    #[test]
    fn json_roundtrip_preserves_entries_and_field_names() {
        let mut vault = VaultTable::new();
        vault
            .upsert(VaultEntry::new(
                "github",
                "a@x.com",
                "p1",
                "https://github.com",
                "work account",
            ))
            .unwrap();

        let json = vault.to_json().unwrap();
        for field in [
            "\"_service\"",
            "\"_lastModifiedTime\"",
            "\"_login\"",
            "\"_password\"",
            "\"_url\"",
            "\"_note\"",
        ] {
            assert!(json.contains(field), "missing {field} in {json}");
        }

        let restored = VaultTable::from_json(&json).unwrap();
        assert_eq!(
            restored.get("a@x.com", "github").unwrap(),
            vault.get("a@x.com", "github").unwrap()
        );
    }

    #[test]
    fn empty_vault_serializes_to_empty_array() {
        let vault = VaultTable::new();
        assert_eq!(vault.to_json().unwrap(), "[]");
        assert!(VaultTable::from_json("[]").unwrap().is_empty());
    }

    #[test]
    fn entry_timestamps_are_set() {
        let e = entry("github", "a@x.com", "p1");
        assert!(!e.last_modified.is_empty());
    }
}
