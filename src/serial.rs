//! Binary serialization and deserialization of compiled chatplans.
//!
//! This module provides a stable binary format for persisting compiled
//! [`Chatplan`](crate::Chatplan) values. The format consists of a 32-byte
//! fixed header followed by a bincode-encoded payload.
//!
//! ## Wire Format
//!
//! ```text
//! Offset  Size  Field
//! 0       4     Magic bytes: b"CHPL"
//! 4       2     Format version (u16, little-endian)
//! 6       2     Engine version (u16, little-endian)
//! 8       4     Flags (u32, reserved)
//! 12      4     Payload length in bytes (u32, little-endian)
//! 16      16    BLAKE3 hash of the payload (truncated to 16 bytes)
//! 32..    var   Bincode-encoded payload
//! ```
//!
//! The payload holds the definition tree. Decoding runs it through the
//! compiler again, so regexes and time windows are rebuilt and re-validated.
//!
//! ## Versioning
//!
//! The format version in the header must match exactly. If it does not,
//! deserialization fails immediately with [`DeserializeError::IncompatibleVersion`].
//! The engine version is informational only.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Chatplan, ChatplanBuilder, CompileError, ContextDef};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const MAGIC: &[u8; 4] = b"CHPL";
const FORMAT_VERSION: u16 = 1;
const ENGINE_VERSION: u16 = 1;
const HEADER_SIZE: usize = 32;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur when serializing a [`Chatplan`](crate::Chatplan) to bytes.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("failed to encode chatplan: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("I/O error during serialization: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur when deserializing a [`Chatplan`](crate::Chatplan) from bytes.
#[derive(Debug, Error)]
pub enum DeserializeError {
    #[error("not a chatplan binary: invalid magic bytes")]
    BadMagic,

    #[error("incompatible format version: blob is v{blob}, engine supports v{supported}")]
    IncompatibleVersion { blob: u16, supported: u16 },

    #[error("integrity check failed: BLAKE3 checksum mismatch")]
    ChecksumMismatch,

    #[error("payload length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: u32, actual: usize },

    #[error("failed to decode payload: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("cached chatplan no longer compiles: {0}")]
    Compile(#[from] CompileError),

    #[error("I/O error during deserialization: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct CachedChatplan {
    metadata: ChatplanMetadata,
    contexts: Vec<ContextDef>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatplanMetadata {
    context_count: usize,
    extension_count: usize,
    condition_count: usize,
    source_digest: Option<[u8; 32]>,
}

impl CachedChatplan {
    fn new(chatplan: &Chatplan, source_text: Option<&str>) -> Self {
        let contexts = chatplan.to_defs();
        let (extension_count, condition_count) = count(&contexts);
        Self {
            metadata: ChatplanMetadata {
                context_count: contexts.len(),
                extension_count,
                condition_count,
                source_digest: source_text.map(|s| *blake3::hash(s.as_bytes()).as_bytes()),
            },
            contexts,
        }
    }

    fn into_chatplan(self) -> Result<Chatplan, DeserializeError> {
        validate(&self)?;
        let chatplan = self
            .contexts
            .into_iter()
            .fold(ChatplanBuilder::new(), ChatplanBuilder::context_def)
            .compile()?;
        Ok(chatplan)
    }
}

fn count(contexts: &[ContextDef]) -> (usize, usize) {
    let extensions = contexts.iter().flat_map(|c| &c.extensions);
    let extension_count = extensions.clone().count();
    let condition_count = extensions.map(|e| e.conditions.len()).sum();
    (extension_count, condition_count)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(ser: &CachedChatplan) -> Result<(), DeserializeError> {
    let (extension_count, condition_count) = count(&ser.contexts);

    if ser.metadata.context_count != ser.contexts.len() {
        return Err(DeserializeError::Validation(format!(
            "metadata says {} contexts but payload has {}",
            ser.metadata.context_count,
            ser.contexts.len()
        )));
    }
    if ser.metadata.extension_count != extension_count {
        return Err(DeserializeError::Validation(format!(
            "metadata says {} extensions but payload has {}",
            ser.metadata.extension_count, extension_count
        )));
    }
    if ser.metadata.condition_count != condition_count {
        return Err(DeserializeError::Validation(format!(
            "metadata says {} conditions but payload has {}",
            ser.metadata.condition_count, condition_count
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Header I/O
// ---------------------------------------------------------------------------

fn write_header(buf: &mut Vec<u8>, payload: &[u8]) {
    let hash = blake3::hash(payload);
    let hash_bytes = hash.as_bytes();

    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    buf.extend_from_slice(&ENGINE_VERSION.to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes()); // flags (reserved)
    #[allow(clippy::cast_possible_truncation)] // payload will never exceed 4 GiB
    let payload_len = payload.len() as u32;
    buf.extend_from_slice(&payload_len.to_le_bytes());
    buf.extend_from_slice(&hash_bytes[..16]);
}

#[allow(clippy::cast_possible_truncation)] // HEADER_SIZE is 32, always fits in u32
fn read_header(bytes: &[u8]) -> Result<(u16, u32, [u8; 16]), DeserializeError> {
    if bytes.len() < HEADER_SIZE {
        return Err(DeserializeError::LengthMismatch {
            expected: HEADER_SIZE as u32,
            actual: bytes.len(),
        });
    }

    if &bytes[0..4] != MAGIC {
        return Err(DeserializeError::BadMagic);
    }

    let format_version = u16::from_le_bytes([bytes[4], bytes[5]]);
    // bytes[6..8] is engine_version, bytes[8..12] is flags
    let payload_len = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]);

    let mut hash = [0u8; 16];
    hash.copy_from_slice(&bytes[16..32]);

    Ok((format_version, payload_len, hash))
}

fn checked_payload(bytes: &[u8]) -> Result<&[u8], DeserializeError> {
    let (format_version, payload_len, stored_hash) = read_header(bytes)?;

    if format_version != FORMAT_VERSION {
        return Err(DeserializeError::IncompatibleVersion {
            blob: format_version,
            supported: FORMAT_VERSION,
        });
    }

    let payload_end = HEADER_SIZE + payload_len as usize;
    if bytes.len() < payload_end {
        return Err(DeserializeError::LengthMismatch {
            expected: payload_len,
            actual: bytes.len() - HEADER_SIZE,
        });
    }
    let payload = &bytes[HEADER_SIZE..payload_end];

    if blake3::hash(payload).as_bytes()[..16] != stored_hash {
        return Err(DeserializeError::ChecksumMismatch);
    }
    Ok(payload)
}

fn decode_payload(bytes: &[u8]) -> Result<CachedChatplan, DeserializeError> {
    let payload = checked_payload(bytes)?;
    let (cached, _): (CachedChatplan, usize) =
        bincode::serde::decode_from_slice(payload, bincode::config::standard())?;
    Ok(cached)
}

// ---------------------------------------------------------------------------
// Public encode/decode
// ---------------------------------------------------------------------------

pub(crate) fn encode(
    chatplan: &Chatplan,
    source_text: Option<&str>,
) -> Result<Vec<u8>, SerializeError> {
    let cached = CachedChatplan::new(chatplan, source_text);
    let payload = bincode::serde::encode_to_vec(&cached, bincode::config::standard())?;

    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    write_header(&mut buf, &payload);
    buf.extend_from_slice(&payload);
    Ok(buf)
}

pub(crate) fn decode(bytes: &[u8]) -> Result<Chatplan, DeserializeError> {
    decode_payload(bytes)?.into_chatplan()
}

/// `true` when `bytes` is a valid cache built from exactly `source_text`.
///
/// # Errors
///
/// Returns [`DeserializeError`] if `bytes` is not a readable cache.
pub fn is_fresh(bytes: &[u8], source_text: &str) -> Result<bool, DeserializeError> {
    let digest = decode_payload(bytes)?.metadata.source_digest;
    Ok(digest == Some(*blake3::hash(source_text.as_bytes()).as_bytes()))
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ActionDef;

    fn sample() -> Chatplan {
        Chatplan::builder()
            .context("default", |c| {
                c.extension("echo", |e| {
                    e.condition(|c| {
                        c.field("to")
                            .expression(r"^(\d+)$")
                            .time("hour", "9-17")
                            .action_def(ActionDef::new("reply", "$1").inline().repeat(2))
                    })
                })
            })
            .compile()
            .unwrap()
    }

    #[test]
    fn definitions_survive_the_payload() {
        let defs = sample().to_defs();
        let payload = bincode::serde::encode_to_vec(&defs, bincode::config::standard()).unwrap();
        let (back, _): (Vec<ContextDef>, usize) =
            bincode::serde::decode_from_slice(&payload, bincode::config::standard()).unwrap();
        assert_eq!(back, defs);
    }

    #[test]
    fn metadata_counts() {
        let ser = CachedChatplan::new(&sample(), Some("src"));
        assert_eq!(ser.metadata.context_count, 1);
        assert_eq!(ser.metadata.extension_count, 1);
        assert_eq!(ser.metadata.condition_count, 1);
        assert!(ser.metadata.source_digest.is_some());
    }

    #[test]
    fn validate_count_mismatch() {
        let mut ser = CachedChatplan::new(&sample(), None);
        ser.metadata.condition_count = 7;
        assert!(matches!(
            validate(&ser),
            Err(DeserializeError::Validation(_))
        ));
    }

    #[test]
    fn invalid_definition_fails_compile() {
        let mut ser = CachedChatplan::new(&sample(), None);
        ser.contexts[0].extensions[0].conditions[0].expression = "(".into();
        assert!(matches!(
            ser.into_chatplan(),
            Err(DeserializeError::Compile(_))
        ));
    }

    // -- Header round-trip --

    #[test]
    fn header_round_trip() {
        let payload = b"test payload data";
        let mut buf = Vec::new();
        write_header(&mut buf, payload);
        assert_eq!(buf.len(), HEADER_SIZE);

        let (format_version, payload_len, hash) = read_header(&buf).unwrap();
        assert_eq!(format_version, FORMAT_VERSION);
        assert_eq!(payload_len as usize, payload.len());

        let expected_hash = blake3::hash(payload);
        assert_eq!(&hash, &expected_hash.as_bytes()[..16]);
    }

    #[test]
    fn header_bad_magic() {
        let mut buf = vec![0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(b"RIFF");
        assert!(matches!(read_header(&buf), Err(DeserializeError::BadMagic)));
    }

    #[test]
    fn header_too_short() {
        let buf = vec![0u8; 10];
        assert!(matches!(
            read_header(&buf),
            Err(DeserializeError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn freshness_tracks_source() {
        let bytes = encode(&sample(), Some("context default {}")).unwrap();
        assert!(is_fresh(&bytes, "context default {}").unwrap());
        assert!(!is_fresh(&bytes, "context other {}").unwrap());
    }
}
