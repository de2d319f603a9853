//! passkeep: a client/server password manager.
//!
//! The server (`server`) keeps per-user authentication records and opaque
//! encrypted vault blobs; it can verify a login password and a recovery
//! phrase but can never read a vault. The client (`client`) derives the
//! vault key from a codeword that exists only on the client, and holds the
//! decrypted vault in memory for the lifetime of a session.
//!
//! Three independent secrets protect an account: the login password
//! (authenticates to the server), the twelve-word recovery phrase
//! (authorizes a password reset), and the vault codeword (encrypts the
//! vault). Compromise of any one of them alone does not expose stored
//! credentials.

pub mod client;
pub mod codec;
pub mod credentials;
pub mod crypto;
pub mod error;
pub mod mnemonic;
pub mod protocol;
pub mod server;
pub mod storage;
pub mod table;
pub mod validate;
pub mod vault;

pub use client::Client;
pub use crypto::kdf::KdfParams;
pub use error::{Error, Result};
pub use server::{Server, ServerConfig, ShutdownToken};
pub use vault::VaultEntry;
