//! Portable archive container.
//!
//! ## Format
//!
//! A tar stream with two regular-file entries:
//!
//! | Entry | Content |
//! |-------|---------|
//! | `MANIFEST.json` | [`ArchiveManifest`] as JSON |
//! | `store.enc` | sealed snapshot bytes, verbatim |
//!
//! Readers check `format_version` before interpreting any other manifest
//! field, so a future layout fails with [`CodecError::UnsupportedVersion`]
//! instead of being misread.

use crate::error::{CodecError, CodecResult};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Current archive format version.
pub const ARCHIVE_VERSION: u16 = 1;
/// Tar entry name of the manifest.
pub const MANIFEST_ENTRY: &str = "MANIFEST.json";
/// Tar entry name of the sealed payload.
pub const PAYLOAD_ENTRY: &str = "store.enc";
/// Largest manifest entry accepted by readers.
pub const MAX_MANIFEST_SIZE: u64 = 64 * 1024;
/// Largest payload entry accepted by readers.
pub const MAX_PAYLOAD_SIZE: u64 = 4 * 1024 * 1024 * 1024;

/// Manifest describing an archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveManifest {
    /// Archive format version.
    pub format_version: u16,
    /// Creation time (Unix milliseconds).
    pub created_at: u64,
    /// Size of the payload in bytes.
    pub size: u64,
    /// Tar entry name holding the payload.
    pub payload: String,
}

impl ArchiveManifest {
    /// Creates a manifest for a payload of `size` bytes.
    #[must_use]
    pub fn new(size: u64, created_at: u64) -> Self {
        Self {
            format_version: ARCHIVE_VERSION,
            created_at,
            size,
            payload: PAYLOAD_ENTRY.to_string(),
        }
    }

    /// Parses and validates a manifest.
    ///
    /// The version is checked on the raw JSON first.
    pub fn decode(bytes: &[u8]) -> CodecResult<Self> {
        let raw: serde_json::Value = serde_json::from_slice(bytes)?;
        let found = raw
            .get("format_version")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| CodecError::invalid("manifest has no format_version"))?;

        if found != u64::from(ARCHIVE_VERSION) {
            return Err(CodecError::UnsupportedVersion {
                found,
                supported: ARCHIVE_VERSION,
            });
        }

        let manifest: Self = serde_json::from_value(raw)?;
        if manifest.payload != PAYLOAD_ENTRY {
            return Err(CodecError::invalid(format!(
                "unexpected payload entry: {}",
                manifest.payload
            )));
        }
        Ok(manifest)
    }

    /// Serializes the manifest to pretty JSON.
    pub fn encode(&self) -> CodecResult<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}

fn append_entry<W: Write>(
    builder: &mut tar::Builder<W>,
    name: &str,
    data: &[u8],
    mtime_secs: u64,
) -> CodecResult<()> {
    let mut header = tar::Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(0o600);
    header.set_mtime(mtime_secs);
    header.set_entry_type(tar::EntryType::Regular);
    header.set_cksum();
    builder.append_data(&mut header, name, data)?;
    Ok(())
}

/// Reads one entry body, refusing sizes above `limit`.
///
/// The header size is attacker-controlled, so it is checked before reading and
/// the read itself is bounded.
fn read_entry<R: Read>(
    entry: &mut tar::Entry<'_, R>,
    name: &str,
    limit: u64,
) -> CodecResult<Vec<u8>> {
    let declared = entry.size();
    if declared > limit {
        return Err(CodecError::invalid(format!(
            "entry {name} is {declared} bytes, limit is {limit}"
        )));
    }

    let mut data = Vec::new();
    entry
        .take(limit)
        .read_to_end(&mut data)
        .map_err(|e| CodecError::invalid(format!("truncated entry {name}: {e}")))?;
    Ok(data)
}

/// Writes an archive containing `payload` to `writer`.
///
/// Returns the manifest that was embedded.
///
/// # Errors
///
/// Returns an error if writing to `writer` fails.
pub fn write_archive<W: Write>(
    writer: W,
    payload: &[u8],
    created_at: u64,
) -> CodecResult<ArchiveManifest> {
    let manifest = ArchiveManifest::new(payload.len() as u64, created_at);
    let manifest_bytes = manifest.encode()?;
    let mtime = created_at / 1000;

    let mut builder = tar::Builder::new(writer);
    append_entry(&mut builder, MANIFEST_ENTRY, &manifest_bytes, mtime)?;
    append_entry(&mut builder, PAYLOAD_ENTRY, payload, mtime)?;
    let mut inner = builder.into_inner()?;
    inner.flush()?;

    Ok(manifest)
}

/// Reads an archive, returning its manifest and verbatim payload.
///
/// # Errors
///
/// - [`CodecError::UnsupportedVersion`] if the manifest version is unknown
/// - [`CodecError::Invalid`] if the container is malformed, an entry is
///   missing or duplicated, an unknown entry is present, or the payload size
///   disagrees with the manifest
pub fn read_archive<R: Read>(reader: R) -> CodecResult<(ArchiveManifest, Vec<u8>)> {
    let mut archive = tar::Archive::new(reader);
    let mut manifest: Option<ArchiveManifest> = None;
    let mut payload: Option<Vec<u8>> = None;

    let entries = archive
        .entries()
        .map_err(|e| CodecError::invalid(format!("malformed container: {e}")))?;

    for entry in entries {
        let mut entry =
            entry.map_err(|e| CodecError::invalid(format!("malformed container: {e}")))?;
        let name = entry
            .path()
            .map_err(|e| CodecError::invalid(format!("bad entry name: {e}")))?
            .to_string_lossy()
            .into_owned();

        match name.as_str() {
            MANIFEST_ENTRY if manifest.is_none() => {
                let data = read_entry(&mut entry, &name, MAX_MANIFEST_SIZE)?;
                manifest = Some(ArchiveManifest::decode(&data)?);
            }
            PAYLOAD_ENTRY if payload.is_none() => {
                payload = Some(read_entry(&mut entry, &name, MAX_PAYLOAD_SIZE)?);
            }
            MANIFEST_ENTRY | PAYLOAD_ENTRY => {
                return Err(CodecError::invalid(format!("duplicate entry: {name}")));
            }
            other => {
                return Err(CodecError::invalid(format!("unexpected entry: {other}")));
            }
        }
    }

    let manifest = manifest.ok_or_else(|| CodecError::invalid("missing manifest"))?;
    let payload = payload.ok_or_else(|| CodecError::invalid("missing payload"))?;

    if manifest.size != payload.len() as u64 {
        return Err(CodecError::invalid(format!(
            "payload size mismatch: manifest says {}, found {}",
            manifest.size,
            payload.len()
        )));
    }

    Ok((manifest, payload))
}

/// Reads only the manifest of an archive.
///
/// Stops at the first entry; archives written by [`write_archive`] always
/// carry the manifest first.
pub fn read_manifest<R: Read>(reader: R) -> CodecResult<ArchiveManifest> {
    let mut archive = tar::Archive::new(reader);
    let mut entries = archive
        .entries()
        .map_err(|e| CodecError::invalid(format!("malformed container: {e}")))?;

    let mut entry = entries
        .next()
        .ok_or_else(|| CodecError::invalid("missing manifest"))?
        .map_err(|e| CodecError::invalid(format!("malformed container: {e}")))?;

    let is_manifest = entry
        .path()
        .map(|p| p.to_string_lossy() == MANIFEST_ENTRY)
        .unwrap_or(false);
    if !is_manifest {
        return Err(CodecError::invalid("manifest is not the first entry"));
    }

    let data = read_entry(&mut entry, MANIFEST_ENTRY, MAX_MANIFEST_SIZE)?;
    ArchiveManifest::decode(&data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn archive_bytes(payload: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        write_archive(&mut buf, payload, 1_700_000_000_123).unwrap();
        buf
    }

    /// Builds a tar with arbitrary entries for negative tests.
    fn raw_tar(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (name, data) in entries {
            append_entry(&mut builder, name, data, 0).unwrap();
        }
        builder.into_inner().unwrap()
    }

    #[test]
    fn payload_is_preserved_verbatim() {
        let payload: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        let (manifest, decoded) = read_archive(archive_bytes(&payload).as_slice()).unwrap();

        assert_eq!(decoded, payload);
        assert_eq!(manifest.format_version, ARCHIVE_VERSION);
        assert_eq!(manifest.size, 10_000);
        assert_eq!(manifest.created_at, 1_700_000_000_123);
        assert_eq!(manifest.payload, PAYLOAD_ENTRY);
    }

    #[test]
    fn manifest_is_first_entry() {
        let bytes = archive_bytes(b"abc");
        let manifest = read_manifest(bytes.as_slice()).unwrap();
        assert_eq!(manifest.size, 3);
    }

    #[test]
    fn unknown_version_rejected() {
        let manifest = br#"{"format_version":99,"created_at":0,"size":3,"payload":"store.enc","extra":[1]}"#;
        let bytes = raw_tar(&[(MANIFEST_ENTRY, &manifest[..]), (PAYLOAD_ENTRY, &b"abc"[..])]);

        let result = read_archive(bytes.as_slice());
        assert!(matches!(
            result,
            Err(CodecError::UnsupportedVersion { found: 99, .. })
        ));
    }

    #[test]
    fn size_mismatch_rejected() {
        let manifest = ArchiveManifest::new(10, 0).encode().unwrap();
        let bytes = raw_tar(&[(MANIFEST_ENTRY, &manifest[..]), (PAYLOAD_ENTRY, &b"abc"[..])]);

        assert!(matches!(
            read_archive(bytes.as_slice()),
            Err(CodecError::Invalid(_))
        ));
    }

    #[test]
    fn missing_payload_rejected() {
        let manifest = ArchiveManifest::new(3, 0).encode().unwrap();
        let bytes = raw_tar(&[(MANIFEST_ENTRY, &manifest[..])]);

        assert!(matches!(
            read_archive(bytes.as_slice()),
            Err(CodecError::Invalid(_))
        ));
    }

    #[test]
    fn unexpected_entry_rejected() {
        let manifest = ArchiveManifest::new(3, 0).encode().unwrap();
        let bytes = raw_tar(&[
            (MANIFEST_ENTRY, &manifest[..]),
            (PAYLOAD_ENTRY, &b"abc"[..]),
            ("notes.txt", &b"x"[..]),
        ]);

        assert!(matches!(
            read_archive(bytes.as_slice()),
            Err(CodecError::Invalid(_))
        ));
    }

    #[test]
    fn garbage_input_rejected() {
        let garbage = vec![0x5au8; 2048];
        assert!(read_archive(garbage.as_slice()).is_err());
        assert!(read_archive(&[][..]).is_err());
    }

    /// A lone header claiming an enormous body, followed by a little padding.
    fn oversized_header(name: &str, size: u64) -> Vec<u8> {
        let mut header = tar::Header::new_gnu();
        header.set_path(name).unwrap();
        header.set_size(size);
        header.set_mode(0o600);
        header.set_entry_type(tar::EntryType::Regular);
        header.set_cksum();

        let mut bytes = header.as_bytes().to_vec();
        bytes.extend_from_slice(&[0u8; 1024]);
        bytes
    }

    #[test]
    fn oversized_entry_header_rejected() {
        let bytes = oversized_header(MANIFEST_ENTRY, 1 << 62);
        assert!(matches!(
            read_archive(bytes.as_slice()),
            Err(CodecError::Invalid(_))
        ));
        assert!(matches!(
            read_manifest(bytes.as_slice()),
            Err(CodecError::Invalid(_))
        ));

        let bytes = oversized_header(PAYLOAD_ENTRY, MAX_PAYLOAD_SIZE + 1);
        assert!(matches!(
            read_archive(bytes.as_slice()),
            Err(CodecError::Invalid(_))
        ));
    }

    #[test]
    fn manifest_without_version_rejected() {
        let result = ArchiveManifest::decode(br#"{"size":1}"#);
        assert!(matches!(result, Err(CodecError::Invalid(_))));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn truncated_archive_never_yields_other_payload(
            payload in prop::collection::vec(any::<u8>(), 0..2048),
            cut in 0usize..4096,
        ) {
            let bytes = archive_bytes(&payload);
            let cut = cut.min(bytes.len());
            if let Ok((_, read)) = read_archive(&bytes[..cut]) {
                prop_assert_eq!(read, payload);
            }
        }
    }
}
