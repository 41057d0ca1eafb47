//! # Binary Snapshot Format
//!
//! Compact encoding of a whole [`DocumentState`], for caches and fast
//! reloads. The JSON save file stays the interchange format.
//!
//! Layout: header (9 bytes) + postcard payload.
//! - 4 bytes: magic (`FOLI`)
//! - 1 byte: format version
//! - 4 bytes: payload length, little endian
//!
//! The header and declared length are validated before any payload byte is
//! decoded, and inputs above [`MAX_PERSISTENCE_PAYLOAD_SIZE`] are rejected
//! up front.

use crate::document::DocumentState;
use crate::types::FolioError;

// =============================================================================
// LIMITS
// =============================================================================

/// Largest snapshot accepted, header included.
pub const MAX_PERSISTENCE_PAYLOAD_SIZE: usize = 256 * 1024 * 1024; // 256 MB

pub const MAGIC_BYTES: &[u8; 4] = b"FOLI";
pub const FORMAT_VERSION: u8 = 1;
pub const HEADER_SIZE: usize = 9;

// =============================================================================
// FILE HEADER
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistenceHeader {
    pub magic: [u8; 4],
    pub version: u8,
    pub payload_len: u32,
}

impl PersistenceHeader {
    /// Header for a payload of `payload_len` bytes at the current version.
    #[must_use]
    pub fn new(payload_len: u32) -> Self {
        Self {
            magic: *MAGIC_BYTES,
            version: FORMAT_VERSION,
            payload_len,
        }
    }

    /// Check magic and version.
    ///
    /// # Errors
    ///
    /// `DeserializationError` on a foreign magic, `UnsupportedVersion` on
    /// any version other than [`FORMAT_VERSION`].
    pub fn validate(&self) -> Result<(), FolioError> {
        if &self.magic != MAGIC_BYTES {
            return Err(FolioError::DeserializationError("invalid magic bytes".to_string()));
        }
        if self.version != FORMAT_VERSION {
            return Err(FolioError::UnsupportedVersion(format!(
                "binary format {} (expected {FORMAT_VERSION})",
                self.version
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes[5..9].copy_from_slice(&self.payload_len.to_le_bytes());
        bytes
    }

    /// # Errors
    ///
    /// `DeserializationError` when fewer than [`HEADER_SIZE`] bytes are given.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FolioError> {
        let Some(header) = bytes.get(..HEADER_SIZE) else {
            return Err(FolioError::DeserializationError("header too short".to_string()));
        };
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&header[0..4]);
        let mut len = [0u8; 4];
        len.copy_from_slice(&header[5..9]);
        Ok(Self {
            magic,
            version: header[4],
            payload_len: u32::from_le_bytes(len),
        })
    }
}

/// Whether `bytes` start with the snapshot magic.
#[must_use]
pub fn has_magic(bytes: &[u8]) -> bool {
    bytes.starts_with(MAGIC_BYTES)
}

// =============================================================================
// SERIALIZATION FUNCTIONS
// =============================================================================

pub(crate) fn encode_payload(state: &DocumentState) -> Result<Vec<u8>, FolioError> {
    postcard::to_stdvec(state).map_err(|e| FolioError::SerializationError(e.to_string()))
}

/// Encode a state as header + payload.
///
/// # Errors
///
/// `SerializationError` if encoding fails or the payload exceeds
/// [`MAX_PERSISTENCE_PAYLOAD_SIZE`].
pub fn state_to_bytes(state: &DocumentState) -> Result<Vec<u8>, FolioError> {
    let payload = encode_payload(state)?;
    if payload.len() + HEADER_SIZE > MAX_PERSISTENCE_PAYLOAD_SIZE {
        return Err(FolioError::SerializationError(format!(
            "snapshot of {} bytes exceeds maximum allowed {MAX_PERSISTENCE_PAYLOAD_SIZE} bytes",
            payload.len()
        )));
    }
    let len = u32::try_from(payload.len()).map_err(|e| FolioError::SerializationError(e.to_string()))?;

    let mut result = Vec::with_capacity(HEADER_SIZE + payload.len());
    result.extend_from_slice(&PersistenceHeader::new(len).to_bytes());
    result.extend_from_slice(&payload);
    Ok(result)
}

/// Decode a state written by [`state_to_bytes`].
///
/// # Errors
///
/// `DeserializationError` for short, oversized, truncated or corrupt input;
/// `UnsupportedVersion` for a snapshot from another format version.
pub fn state_from_bytes(bytes: &[u8]) -> Result<DocumentState, FolioError> {
    if bytes.len() > MAX_PERSISTENCE_PAYLOAD_SIZE {
        return Err(FolioError::DeserializationError(format!(
            "data size {} bytes exceeds maximum allowed {MAX_PERSISTENCE_PAYLOAD_SIZE} bytes",
            bytes.len()
        )));
    }
    let header = PersistenceHeader::from_bytes(bytes)?;
    header.validate()?;

    let payload = &bytes[HEADER_SIZE..];
    if payload.len() != header.payload_len as usize {
        return Err(FolioError::DeserializationError(format!(
            "payload is {} bytes, header declares {}",
            payload.len(),
            header.payload_len
        )));
    }
    postcard::from_bytes(payload)
        .map_err(|e| FolioError::DeserializationError(format!("failed to decode snapshot: {e}")))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutations::page::AddPage;
    use crate::mutations::step::AddStep;
    use crate::mutations::{PageMutations, StepMutations};
    use crate::store::Store;

    fn sample_state() -> DocumentState {
        let mut store = Store::new();
        let page = PageMutations::add(&mut store, &AddPage::default()).expect("page");
        StepMutations::add(&mut store, &AddStep::new(page)).expect("step");
        store.state_mut().template.settings = serde_json::json!({"page": {"fill": {"color": "white"}}});
        store.into_state()
    }

    #[test]
    fn header_roundtrip() {
        let header = PersistenceHeader::new(1234);
        let restored = PersistenceHeader::from_bytes(&header.to_bytes()).expect("parse header");
        assert_eq!(restored, header);
        assert!(restored.validate().is_ok());
    }

    #[test]
    fn bytes_roundtrip_bit_exact() {
        let state = sample_state();
        let bytes1 = state_to_bytes(&state).expect("first serialize");
        let restored = state_from_bytes(&bytes1).expect("deserialize");
        assert_eq!(restored, state);
        let bytes2 = state_to_bytes(&restored).expect("second serialize");
        assert_eq!(bytes1, bytes2, "save -> load -> save must produce identical bytes");
    }

    #[test]
    fn invalid_magic_rejected() {
        let mut bytes = state_to_bytes(&sample_state()).expect("serialize");
        bytes[0..4].copy_from_slice(b"XXXX");
        assert!(matches!(state_from_bytes(&bytes), Err(FolioError::DeserializationError(_))));
        assert!(!has_magic(&bytes));
    }

    #[test]
    fn future_version_rejected() {
        let mut bytes = state_to_bytes(&sample_state()).expect("serialize");
        bytes[4] = FORMAT_VERSION + 1;
        assert!(matches!(state_from_bytes(&bytes), Err(FolioError::UnsupportedVersion(_))));
    }

    #[test]
    fn truncated_payload_rejected() {
        let bytes = state_to_bytes(&sample_state()).expect("serialize");
        assert!(state_from_bytes(&bytes[..bytes.len() - 1]).is_err());
        assert!(state_from_bytes(&bytes[..4]).is_err());
    }
}
