//! Deployment passphrase.

use zeroize::{Zeroize, ZeroizeOnDrop};

/// The secret the store key is derived from.
///
/// Zeroized on drop and never printed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Passphrase {
    bytes: Vec<u8>,
}

impl Passphrase {
    /// Wraps a passphrase.
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: secret.into(),
        }
    }

    /// Reads a passphrase from file contents, dropping one trailing newline.
    #[must_use]
    pub fn from_file_contents(mut contents: Vec<u8>) -> Self {
        if contents.last() == Some(&b'\n') {
            contents.pop();
            if contents.last() == Some(&b'\r') {
                contents.pop();
            }
        }
        Self { bytes: contents }
    }

    /// Returns the raw passphrase bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns `true` if the passphrase is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Passphrase([REDACTED])")
    }
}
