//! Sealed snapshot file format.
//!
//! ## Layout
//!
//! ```text
//! | magic "ENCS" (4) | version u16 LE (2) | salt (16) | nonce (12) | ciphertext + tag |
//! ```
//!
//! The first 22 bytes (magic, version, salt) are authenticated as associated
//! data, so a modified header fails decryption. The plaintext is canonical
//! CBOR of [`Snapshot`].

use crate::crypto::{random_salt, CryptoManager, EncryptionKey, Passphrase, SALT_SIZE};
use crate::error::{CoreError, CoreResult};
use crate::model::Store;
use serde::{Deserialize, Serialize};

/// Magic bytes at the start of every sealed snapshot.
pub const SNAPSHOT_MAGIC: [u8; 4] = *b"ENCS";
/// Current snapshot file version.
pub const SNAPSHOT_VERSION: u16 = 1;
/// Size of the plaintext header.
pub const HEADER_SIZE: usize = 4 + 2 + SALT_SIZE;

/// Decoded snapshot contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Snapshot schema version.
    pub version: u16,
    /// All stores.
    pub stores: Vec<Store>,
}

/// Borrowed form used when sealing, so state is not cloned.
#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u16,
    stores: &'a [Store],
}

/// Plaintext header of a sealed snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotHeader {
    /// File format version.
    pub version: u16,
    /// Key derivation salt.
    pub salt: [u8; SALT_SIZE],
}

impl SnapshotHeader {
    /// Encodes the header.
    #[must_use]
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[..4].copy_from_slice(&SNAPSHOT_MAGIC);
        out[4..6].copy_from_slice(&self.version.to_le_bytes());
        out[6..].copy_from_slice(&self.salt);
        out
    }

    /// Decodes and validates the header at the start of `sealed`.
    pub fn decode(sealed: &[u8]) -> CoreResult<Self> {
        if sealed.len() < HEADER_SIZE {
            return Err(CoreError::invalid_format("snapshot shorter than header"));
        }
        if sealed[..4] != SNAPSHOT_MAGIC {
            return Err(CoreError::invalid_format("bad snapshot magic"));
        }

        let version = u16::from_le_bytes([sealed[4], sealed[5]]);
        if version != SNAPSHOT_VERSION {
            return Err(CoreError::invalid_format(format!(
                "unsupported snapshot version {version}"
            )));
        }

        let mut salt = [0u8; SALT_SIZE];
        salt.copy_from_slice(&sealed[6..HEADER_SIZE]);
        Ok(Self { version, salt })
    }
}

/// Seals and opens snapshots under one derived key.
///
/// A sealer is bound to a salt. The salt is fixed when a store is first
/// created and adopted from the payload on import.
#[derive(Debug)]
pub struct Sealer {
    header: SnapshotHeader,
    crypto: CryptoManager,
}

impl Sealer {
    /// Creates a sealer for a new store with a fresh random salt.
    pub fn create(passphrase: &Passphrase) -> CoreResult<Self> {
        Self::with_salt(passphrase, random_salt())
    }

    /// Creates a sealer matching the header of an existing sealed snapshot.
    pub fn for_sealed(passphrase: &Passphrase, sealed: &[u8]) -> CoreResult<Self> {
        let header = SnapshotHeader::decode(sealed)?;
        Self::with_salt(passphrase, header.salt)
    }

    fn with_salt(passphrase: &Passphrase, salt: [u8; SALT_SIZE]) -> CoreResult<Self> {
        let key = EncryptionKey::derive(passphrase, &salt)?;
        Ok(Self {
            header: SnapshotHeader {
                version: SNAPSHOT_VERSION,
                salt,
            },
            crypto: CryptoManager::new(&key),
        })
    }

    /// Returns the salt this sealer is bound to.
    #[must_use]
    pub fn salt(&self) -> &[u8; SALT_SIZE] {
        &self.header.salt
    }

    /// Encodes and encrypts `stores` into a sealed snapshot.
    pub fn seal(&self, stores: &[Store]) -> CoreResult<Vec<u8>> {
        let plaintext = enc_codec::to_canonical_cbor(&SnapshotRef {
            version: SNAPSHOT_VERSION,
            stores,
        })?;

        let header = self.header.encode();
        let body = self.crypto.encrypt(&plaintext, &header)?;

        let mut out = Vec::with_capacity(HEADER_SIZE + body.len());
        out.extend_from_slice(&header);
        out.extend(body);
        Ok(out)
    }

    /// Decrypts and decodes a sealed snapshot.
    ///
    /// # Errors
    ///
    /// - `InvalidFormat` if the header is malformed or its salt differs from
    ///   this sealer's
    /// - `DecryptionFailed` on a wrong passphrase or tampered bytes
    /// - `Codec` if the decrypted payload is not a snapshot
    pub fn open(&self, sealed: &[u8]) -> CoreResult<Snapshot> {
        let header = SnapshotHeader::decode(sealed)?;
        if header.salt != self.header.salt {
            return Err(CoreError::invalid_format("snapshot salt mismatch"));
        }

        let (aad, body) = sealed.split_at(HEADER_SIZE);
        let plaintext = self.crypto.decrypt(body, aad)?;
        let snapshot: Snapshot = enc_codec::from_cbor(&plaintext)?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(CoreError::invalid_format(format!(
                "unsupported snapshot schema {}",
                snapshot.version
            )));
        }
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewRecord, Record};

    fn sample_stores() -> Vec<Store> {
        let mut store = Store::new("personal".into(), 100);
        store.records.push(Record::new(
            NewRecord::new("password", "bank", vec![0xde, 0xad]).expires_at(500),
            100,
        ));
        vec![store, Store::new("work".into(), 200)]
    }

    #[test]
    fn seal_open_roundtrip() {
        let pass = Passphrase::new("pw");
        let sealer = Sealer::create(&pass).unwrap();
        let stores = sample_stores();

        let sealed = sealer.seal(&stores).unwrap();
        assert_eq!(&sealed[..4], b"ENCS");

        let reopened = Sealer::for_sealed(&pass, &sealed).unwrap();
        let snapshot = reopened.open(&sealed).unwrap();
        assert_eq!(snapshot.version, SNAPSHOT_VERSION);
        assert_eq!(snapshot.stores, stores);
    }

    #[test]
    fn header_roundtrip() {
        let header = SnapshotHeader {
            version: SNAPSHOT_VERSION,
            salt: [9; SALT_SIZE],
        };
        let bytes = header.encode();
        assert_eq!(SnapshotHeader::decode(&bytes).unwrap(), header);
    }

    #[test]
    fn plaintext_is_not_visible() {
        let sealer = Sealer::create(&Passphrase::new("pw")).unwrap();
        let sealed = sealer.seal(&sample_stores()).unwrap();
        let needle = b"personal";
        assert!(!sealed.windows(needle.len()).any(|w| w == needle));
    }

    #[test]
    fn wrong_passphrase_fails() {
        let sealed = Sealer::create(&Passphrase::new("right"))
            .unwrap()
            .seal(&sample_stores())
            .unwrap();

        let wrong = Sealer::for_sealed(&Passphrase::new("wrong"), &sealed).unwrap();
        assert!(matches!(
            wrong.open(&sealed),
            Err(CoreError::DecryptionFailed { .. })
        ));
    }

    #[test]
    fn tampered_salt_fails() {
        let pass = Passphrase::new("pw");
        let mut sealed = Sealer::create(&pass)
            .unwrap()
            .seal(&sample_stores())
            .unwrap();
        sealed[10] ^= 0x01;

        let sealer = Sealer::for_sealed(&pass, &sealed).unwrap();
        assert!(sealer.open(&sealed).is_err());
    }

    #[test]
    fn bad_magic_rejected() {
        let mut bytes = vec![0u8; 64];
        bytes[..4].copy_from_slice(b"NOPE");
        assert!(matches!(
            SnapshotHeader::decode(&bytes),
            Err(CoreError::InvalidFormat { .. })
        ));
        assert!(SnapshotHeader::decode(b"ENC").is_err());
    }

    #[test]
    fn unknown_version_rejected() {
        let mut bytes = SnapshotHeader {
            version: SNAPSHOT_VERSION,
            salt: [0; SALT_SIZE],
        }
        .encode()
        .to_vec();
        bytes[4] = 9;
        assert!(SnapshotHeader::decode(&bytes).is_err());
    }

    #[test]
    fn salt_is_fixed_per_sealer() {
        let pass = Passphrase::new("pw");
        let sealer = Sealer::create(&pass).unwrap();
        let a = sealer.seal(&[]).unwrap();
        let b = sealer.seal(&[]).unwrap();

        assert_eq!(a[..HEADER_SIZE], b[..HEADER_SIZE]);
        assert_ne!(a, b);
        assert_eq!(&a[6..HEADER_SIZE], sealer.salt());
    }
}
