//! # Formats
//!
//! Encodings of a [`DocumentState`]:
//!
//! - [`save_file`]: the JSON save envelope, run through [`compat`] on load.
//! - [`persistence`]: the compact postcard snapshot behind a `FOLI` header.
//!
//! Every function here is a pure transformation. File I/O lives in the app.

pub mod compat;
pub mod persistence;
pub mod save_file;

use crate::document::DocumentState;
use crate::types::FolioError;

/// Deterministic checksum of a state's binary encoding.
///
/// Not a cryptographic hash: it catches accidental corruption and serves
/// quick equality checks between saved documents. Enable `crypto-hash` for
/// [`crypto_hash`].
///
/// # Errors
///
/// `SerializationError` if the state cannot be encoded.
pub fn checksum(state: &DocumentState) -> Result<u64, FolioError> {
    let bytes = persistence::encode_payload(state)?;
    Ok(checksum_bytes(&bytes))
}

/// Word-wise rotate/XOR over `bytes`, seeded with their length.
#[must_use]
pub fn checksum_bytes(bytes: &[u8]) -> u64 {
    let mut hash = (bytes.len() as u64).rotate_left(3);
    for chunk in bytes.chunks(8) {
        let mut word = [0u8; 8];
        word[..chunk.len()].copy_from_slice(chunk);
        hash = hash.rotate_left(13) ^ u64::from_le_bytes(word);
        hash ^= hash.rotate_left(29);
    }
    hash
}

/// BLAKE3 digest of a state's binary encoding, hex encoded.
///
/// # Errors
///
/// `SerializationError` if the state cannot be encoded.
#[cfg(feature = "crypto-hash")]
pub fn crypto_hash(state: &DocumentState) -> Result<String, FolioError> {
    let bytes = persistence::encode_payload(state)?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutations::PageMutations;
    use crate::mutations::page::AddPage;
    use crate::store::Store;

    #[test]
    fn checksum_is_stable_and_sensitive() {
        let mut store = Store::new();
        PageMutations::add(&mut store, &AddPage::default()).expect("page");
        let first = checksum(store.state()).expect("checksum");
        assert_eq!(first, checksum(&store.state().clone()).expect("checksum"));

        if let Some(page) = store.state_mut().pages.iter_mut().next() {
            page.number = 42;
        }
        assert_ne!(first, checksum(store.state()).expect("checksum"));
    }

    #[test]
    fn checksum_depends_on_byte_order() {
        assert_ne!(checksum_bytes(b"abcdefgh12345678"), checksum_bytes(b"12345678abcdefgh"));
        assert_ne!(checksum_bytes(b""), checksum_bytes(b"\0"));
    }

    #[cfg(feature = "crypto-hash")]
    #[test]
    fn crypto_hash_is_hex_blake3() {
        let state = DocumentState::default();
        let hash = crypto_hash(&state).expect("hash");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, crypto_hash(&state).expect("hash"));
    }
}
