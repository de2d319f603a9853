//! Wire protocol: one JSON object per request and one per response over a
//! connection-per-call TCP channel. Binary payloads (salts, blobs) are
//! lowercase hex strings.

use serde::{Deserialize, Serialize};

/// Client request, selected by the `action` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    #[serde(rename_all = "camelCase")]
    Register { username: String, password: String },
    #[serde(rename_all = "camelCase")]
    Login { username: String, password: String },
    #[serde(rename_all = "camelCase")]
    ChangePassword {
        username: String,
        seed_phrase: String,
        new_password: String,
    },
    #[serde(rename_all = "camelCase")]
    RecoverPassword {
        username: String,
        seed_phrase: String,
        new_password: String,
    },
    #[serde(rename_all = "camelCase")]
    GetVault { username: String, password: String },
    #[serde(rename_all = "camelCase")]
    GetVaultWithSeedPhrase {
        username: String,
        seed_phrase: String,
    },
    #[serde(rename_all = "camelCase")]
    UpdateVault {
        username: String,
        password: String,
        vault_data: String,
    },
    #[serde(rename_all = "camelCase")]
    CheckUser { username: String },
}

impl Request {
    /// Action name as it appears on the wire; used for logging.
    pub fn action(&self) -> &'static str {
        match self {
            Request::Register { .. } => "register",
            Request::Login { .. } => "login",
            Request::ChangePassword { .. } => "changePassword",
            Request::RecoverPassword { .. } => "recoverPassword",
            Request::GetVault { .. } => "getVault",
            Request::GetVaultWithSeedPhrase { .. } => "getVaultWithSeedPhrase",
            Request::UpdateVault { .. } => "updateVault",
            Request::CheckUser { .. } => "checkUser",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// Server response. Fields beyond `status` appear per action; absent fields
/// are omitted from the encoded object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed_words: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_seed_words: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vault_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vault_salt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_vault_salt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_vault_salt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exists: Option<bool>,
}

impl Response {
    /// Success skeleton; use struct update syntax to attach fields.
    pub fn success() -> Self {
        Self {
            status: Status::Success,
            message: None,
            seed_words: None,
            new_seed_words: None,
            vault_data: None,
            vault_salt: None,
            old_vault_salt: None,
            new_vault_salt: None,
            exists: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            message: Some(message.into()),
            ..Self::success()
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}
