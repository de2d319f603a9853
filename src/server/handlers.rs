//! Stateless-per-request handlers for the eight protocol actions.
//!
//! All durable state lives in the [`UserStore`]; each handler authorizes,
//! mutates, persists, and builds one response. Authentication failures are
//! answered with a generic error status — the message text is not a
//! security channel.

use crate::credentials::{CredentialRecord, SecretRotation};
use crate::crypto::{PASSWORD_SALT_LEN, VAULT_SALT_LEN, aead, kdf, kdf::KdfParams};
use crate::error::{Error, Result};
use crate::mnemonic::{self, WordList};
use crate::protocol::{Request, Response};
use crate::validate;

use super::store::UserStore;

/// The session/protocol engine: request in, response out, no state carried
/// between calls.
pub struct Engine {
    store: UserStore,
    words: WordList,
    kdf: KdfParams,
}

impl Engine {
    pub fn new(store: UserStore, words: WordList, kdf: KdfParams) -> Self {
        Self { store, words, kdf }
    }

    /// Dispatch one request. Errors become error responses here; the accept
    /// loop never sees a handler failure.
    pub fn handle(&self, request: Request) -> Response {
        let action = request.action();
        let result = match request {
            Request::Register { username, password } => self.register(&username, &password),
            Request::Login { username, password } => self.login(&username, &password),
            Request::ChangePassword {
                username,
                seed_phrase,
                new_password,
            } => self.rotate_password(&username, &seed_phrase, &new_password, "password changed"),
            Request::RecoverPassword {
                username,
                seed_phrase,
                new_password,
            } => self.rotate_password(&username, &seed_phrase, &new_password, "password recovered"),
            Request::GetVault { username, password } => self.get_vault(&username, &password),
            Request::GetVaultWithSeedPhrase {
                username,
                seed_phrase,
            } => self.get_vault_with_seed_phrase(&username, &seed_phrase),
            Request::UpdateVault {
                username,
                password,
                vault_data,
            } => self.update_vault(&username, &password, &vault_data),
            Request::CheckUser { username } => self.check_user(&username),
        };

        match result {
            Ok(response) => {
                tracing::info!(action, "request handled");
                response
            }
            Err(error) => {
                tracing::warn!(action, %error, "request rejected");
                Response::error(public_message(&error))
            }
        }
    }

    fn register(&self, username: &str, password: &str) -> Result<Response> {
        validate::validate_username(username)?;
        validate::validate_password(password)?;

        // Cheap existence check before the memory-hard hashing.
        if self.store.with_users(|users| users.contains(username)) {
            return Err(Error::Validation(format!(
                "user '{username}' already exists"
            )));
        }

        let (rotation, seed_words) = self.mint_secrets(password)?;
        let vault_salt = rotation.vault_salt.clone();
        let record = CredentialRecord {
            login: username.to_string(),
            password_hash: rotation.password_hash,
            password_salt: rotation.password_salt,
            seed_phrase_hash: rotation.seed_phrase_hash,
            vault_salt: rotation.vault_salt,
        };

        self.store.mutate_users(|users| users.insert(record))?;

        // The blob starts empty; the client encrypts the empty vault under
        // its codeword and uploads it.
        self.store.write_vault(username, &[])?;

        Ok(Response {
            seed_words: Some(seed_words),
            vault_salt: Some(vault_salt),
            ..Response::success()
        })
    }

    fn login(&self, username: &str, password: &str) -> Result<Response> {
        let record = self.require_user(username)?;
        self.verify_password(&record, password)?;

        let blob = self.store.read_vault(username)?;
        Ok(Response {
            message: Some("login successful".into()),
            vault_data: Some(hex::encode(blob)),
            vault_salt: Some(record.vault_salt),
            ..Response::success()
        })
    }

    /// Shared body of changePassword and recoverPassword: authorize by
    /// seed-phrase hash, mint a full set of replacement secrets, persist,
    /// and hand back the blob still encrypted under the old vault key so
    /// the client can re-encrypt and re-upload.
    fn rotate_password(
        &self,
        username: &str,
        seed_phrase: &str,
        new_password: &str,
        message: &str,
    ) -> Result<Response> {
        validate::validate_password(new_password)?;

        let record = self.require_user(username)?;
        if !mnemonic::verify(seed_phrase, &record.seed_phrase_hash) {
            return Err(Error::Auth("wrong recovery phrase".into()));
        }

        let old_vault_salt = record.vault_salt.clone();
        let blob = self.store.read_vault_or_empty(username)?;

        let (rotation, new_seed_words) = self.mint_secrets(new_password)?;
        let new_vault_salt = rotation.vault_salt.clone();
        self.store
            .mutate_users(|users| users.rotate(username, rotation))?;

        Ok(Response {
            message: Some(message.into()),
            new_seed_words: Some(new_seed_words),
            old_vault_salt: Some(old_vault_salt),
            new_vault_salt: Some(new_vault_salt),
            vault_data: Some(hex::encode(blob)),
            ..Response::success()
        })
    }

    fn get_vault(&self, username: &str, password: &str) -> Result<Response> {
        let record = self.require_user(username)?;
        self.verify_password(&record, password)?;
        self.vault_response(username, record.vault_salt)
    }

    fn get_vault_with_seed_phrase(&self, username: &str, seed_phrase: &str) -> Result<Response> {
        let record = self.require_user(username)?;
        if !mnemonic::verify(seed_phrase, &record.seed_phrase_hash) {
            return Err(Error::Auth("wrong recovery phrase".into()));
        }
        self.vault_response(username, record.vault_salt)
    }

    fn vault_response(&self, username: &str, vault_salt: String) -> Result<Response> {
        let blob = self.store.read_vault(username)?;
        Ok(Response {
            vault_data: Some(hex::encode(blob)),
            vault_salt: Some(vault_salt),
            ..Response::success()
        })
    }

    fn update_vault(&self, username: &str, password: &str, vault_data: &str) -> Result<Response> {
        let record = self.require_user(username)?;
        self.verify_password(&record, password)?;

        let blob = hex::decode(vault_data)
            .map_err(|_| Error::Validation("vault data is not valid hex".into()))?;
        self.store.write_vault(username, &blob)?;

        Ok(Response {
            message: Some("vault updated".into()),
            ..Response::success()
        })
    }

    fn check_user(&self, username: &str) -> Result<Response> {
        let exists = self.store.with_users(|users| users.contains(username));
        Ok(Response {
            exists: Some(exists),
            ..Response::success()
        })
    }

    fn require_user(&self, username: &str) -> Result<CredentialRecord> {
        self.store
            .with_users(|users| users.get(username).cloned())
            .ok_or_else(|| Error::Auth(format!("unknown user '{username}'")))
    }

    fn verify_password(&self, record: &CredentialRecord, password: &str) -> Result<()> {
        let salt = hex::decode(&record.password_salt)
            .map_err(|_| Error::Internal("stored password salt is not valid hex".into()))?;
        let hash = kdf::derive_key(password, &salt, self.kdf)?;
        if hex::encode(hash) != record.password_hash {
            return Err(Error::Auth("wrong password".into()));
        }
        Ok(())
    }

    /// Mint the full secret set shared by registration and rotation: fresh
    /// password salt + Argon2id hash, fresh vault salt, fresh seed phrase.
    fn mint_secrets(&self, password: &str) -> Result<(SecretRotation, Vec<String>)> {
        let password_salt: [u8; PASSWORD_SALT_LEN] = aead::random_array()?;
        let password_hash = kdf::derive_key(password, &password_salt, self.kdf)?;
        let vault_salt: [u8; VAULT_SALT_LEN] = aead::random_array()?;
        let seed_words = self.words.generate()?;

        let rotation = SecretRotation {
            password_hash: hex::encode(password_hash),
            password_salt: hex::encode(password_salt),
            seed_phrase_hash: mnemonic::phrase_hash(&seed_words),
            vault_salt: hex::encode(vault_salt),
        };
        Ok((rotation, seed_words))
    }
}

/// What the network caller gets to see. Validation and authentication
/// messages pass through; infrastructure failures are flattened so internal
/// paths and I/O details stay out of responses.
fn public_message(error: &Error) -> String {
    match error {
        Error::Validation(_) | Error::Auth(_) | Error::Remote(_) => error.to_string(),
        Error::Crypto => error.to_string(),
        Error::Config(_) | Error::Protocol(_) | Error::Internal(_) | Error::Io(_)
        | Error::Serde(_) => "internal server error".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mnemonic::WORD_COUNT;
    use crate::protocol::Status;
    use tempfile::{TempDir, tempdir};

    fn cheap_kdf() -> KdfParams {
        KdfParams::new(8, 1, 1).unwrap()
    }

    fn test_words() -> WordList {
        let text: String = (0..WORD_COUNT).map(|i| format!("word{i:04}\n")).collect();
        WordList::from_lines(&text).unwrap()
    }

    fn engine() -> (Engine, TempDir) {
        let dir = tempdir().unwrap();
        let store = UserStore::open(dir.path().join("users.json"), dir.path().join("vaults"))
            .unwrap();
        (Engine::new(store, test_words(), cheap_kdf()), dir)
    }

    fn register(engine: &Engine, username: &str, password: &str) -> Response {
        engine.handle(Request::Register {
            username: username.into(),
            password: password.into(),
        })
    }

    #[test]
    fn register_returns_seed_words_and_vault_salt() {
        let (engine, _dir) = engine();
        let response = register(&engine, "alice", "Str0ng!Pass");

        assert_eq!(response.status, Status::Success);
        assert_eq!(response.seed_words.unwrap().len(), 12);
        // 32-byte vault salt, hex-encoded.
        assert_eq!(response.vault_salt.unwrap().len(), VAULT_SALT_LEN * 2);
    }

    #[test]
    fn register_creates_empty_blob() {
        let (engine, _dir) = engine();
        register(&engine, "alice", "Str0ng!Pass");

        let response = engine.handle(Request::Login {
            username: "alice".into(),
            password: "Str0ng!Pass".into(),
        });
        assert_eq!(response.status, Status::Success);
        assert_eq!(response.vault_data.unwrap(), "");
    }

    #[test]
    fn register_rejects_duplicates_and_bad_formats() {
        let (engine, _dir) = engine();
        assert_eq!(register(&engine, "alice", "Str0ng!Pass").status, Status::Success);
        assert_eq!(register(&engine, "alice", "Str0ng!Pass").status, Status::Error);
        assert_eq!(register(&engine, "al", "Str0ng!Pass").status, Status::Error);
        assert_eq!(register(&engine, "bob", "weakpass").status, Status::Error);
    }

    #[test]
    fn login_fails_on_wrong_password_or_unknown_user() {
        let (engine, _dir) = engine();
        register(&engine, "alice", "Str0ng!Pass");

        let wrong = engine.handle(Request::Login {
            username: "alice".into(),
            password: "Wr0ng!Pass".into(),
        });
        assert_eq!(wrong.status, Status::Error);

        let unknown = engine.handle(Request::Login {
            username: "ghost".into(),
            password: "Str0ng!Pass".into(),
        });
        assert_eq!(unknown.status, Status::Error);
    }

    #[test]
    fn update_vault_requires_password_and_roundtrips() {
        let (engine, _dir) = engine();
        register(&engine, "alice", "Str0ng!Pass");

        let denied = engine.handle(Request::UpdateVault {
            username: "alice".into(),
            password: "Wr0ng!Pass".into(),
            vault_data: "deadbeef".into(),
        });
        assert_eq!(denied.status, Status::Error);

        let accepted = engine.handle(Request::UpdateVault {
            username: "alice".into(),
            password: "Str0ng!Pass".into(),
            vault_data: "deadbeef".into(),
        });
        assert_eq!(accepted.status, Status::Success);

        let fetched = engine.handle(Request::GetVault {
            username: "alice".into(),
            password: "Str0ng!Pass".into(),
        });
        assert_eq!(fetched.vault_data.unwrap(), "deadbeef");
    }

    #[test]
    fn update_vault_rejects_bad_hex() {
        let (engine, _dir) = engine();
        register(&engine, "alice", "Str0ng!Pass");

        let response = engine.handle(Request::UpdateVault {
            username: "alice".into(),
            password: "Str0ng!Pass".into(),
            vault_data: "not-hex!".into(),
        });
        assert_eq!(response.status, Status::Error);
    }

    #[test]
    fn rotation_with_correct_phrase_replaces_credentials() {
        let (engine, _dir) = engine();
        let seed_words = register(&engine, "alice", "Str0ng!Pass")
            .seed_words
            .unwrap();

        let response = engine.handle(Request::ChangePassword {
            username: "alice".into(),
            seed_phrase: seed_words.join(" "),
            new_password: "N3w!Password".into(),
        });
        assert_eq!(response.status, Status::Success);
        assert_eq!(response.new_seed_words.as_ref().unwrap().len(), 12);
        assert_ne!(
            response.old_vault_salt.as_ref().unwrap(),
            response.new_vault_salt.as_ref().unwrap()
        );

        // Old password is gone, new one works.
        let old = engine.handle(Request::Login {
            username: "alice".into(),
            password: "Str0ng!Pass".into(),
        });
        assert_eq!(old.status, Status::Error);
        let new = engine.handle(Request::Login {
            username: "alice".into(),
            password: "N3w!Password".into(),
        });
        assert_eq!(new.status, Status::Success);

        // The old phrase no longer authorizes anything.
        let reuse = engine.handle(Request::RecoverPassword {
            username: "alice".into(),
            seed_phrase: seed_words.join(" "),
            new_password: "An0ther!Pass".into(),
        });
        assert_eq!(reuse.status, Status::Error);
    }

    #[test]
    fn rotation_with_wrong_phrase_mutates_nothing() {
        let (engine, _dir) = engine();
        register(&engine, "alice", "Str0ng!Pass");

        let before = engine
            .handle(Request::GetVault {
                username: "alice".into(),
                password: "Str0ng!Pass".into(),
            })
            .vault_salt
            .unwrap();

        let response = engine.handle(Request::RecoverPassword {
            username: "alice".into(),
            seed_phrase: "wrong words entirely".into(),
            new_password: "N3w!Password".into(),
        });
        assert_eq!(response.status, Status::Error);

        // Password and vault salt are untouched.
        let after = engine.handle(Request::GetVault {
            username: "alice".into(),
            password: "Str0ng!Pass".into(),
        });
        assert_eq!(after.status, Status::Success);
        assert_eq!(after.vault_salt.unwrap(), before);
    }

    #[test]
    fn rotation_returns_blob_under_old_key() {
        let (engine, _dir) = engine();
        let seed_words = register(&engine, "alice", "Str0ng!Pass")
            .seed_words
            .unwrap();
        engine.handle(Request::UpdateVault {
            username: "alice".into(),
            password: "Str0ng!Pass".into(),
            vault_data: "cafebabe".into(),
        });

        let response = engine.handle(Request::ChangePassword {
            username: "alice".into(),
            seed_phrase: seed_words.join(" "),
            new_password: "N3w!Password".into(),
        });
        // The server hands the stored bytes back untouched; re-encryption
        // is the client's job.
        assert_eq!(response.vault_data.unwrap(), "cafebabe");
    }

    #[test]
    fn get_vault_with_seed_phrase_authorizes_by_phrase() {
        let (engine, _dir) = engine();
        let seed_words = register(&engine, "alice", "Str0ng!Pass")
            .seed_words
            .unwrap();

        let ok = engine.handle(Request::GetVaultWithSeedPhrase {
            username: "alice".into(),
            seed_phrase: seed_words.join(" "),
        });
        assert_eq!(ok.status, Status::Success);

        let bad = engine.handle(Request::GetVaultWithSeedPhrase {
            username: "alice".into(),
            seed_phrase: "not the phrase".into(),
        });
        assert_eq!(bad.status, Status::Error);
    }

    #[test]
    fn check_user_reports_existence() {
        let (engine, _dir) = engine();
        register(&engine, "alice", "Str0ng!Pass");

        let known = engine.handle(Request::CheckUser {
            username: "alice".into(),
        });
        assert_eq!(known.exists, Some(true));

        let unknown = engine.handle(Request::CheckUser {
            username: "ghost".into(),
        });
        assert_eq!(unknown.exists, Some(false));
    }

    #[test]
    fn infrastructure_errors_are_not_leaked() {
        let message = public_message(&Error::Internal("slot table corrupt at /var/lib".into()));
        assert_eq!(message, "internal server error");
        let auth = public_message(&Error::Auth("wrong password".into()));
        assert_eq!(auth, "wrong password");
    }
}
