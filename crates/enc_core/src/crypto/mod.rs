//! At-rest encryption for the sealed snapshot.
//!
//! ## Security Model
//!
//! - AES-256-GCM authenticated encryption
//! - Unique random nonce per seal
//! - Key derived from the deployment passphrase with HKDF-SHA256 and a
//!   per-store random salt
//! - Keys and passphrases are zeroized on drop

mod cipher;
mod passphrase;

pub use cipher::{
    random_salt, CryptoManager, EncryptionKey, KEY_SIZE, NONCE_SIZE, SALT_SIZE, TAG_SIZE,
};
pub use passphrase::Passphrase;
