//! Native model file format.
//!
//! A fixed 32-byte header followed by a JSON payload. The header identifies
//! the model kind and carries a CRC32 of the payload, so a file can be
//! checked before the payload is parsed.
//!
//! # Layout
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//! 0       4     Magic ("CKIT")
//! 4       1     Version major
//! 5       1     Version minor
//! 6       1     Model kind tag
//! 7       1     Reserved
//! 8       2     Flags (bitfield)
//! 10      2     Reserved
//! 12      4     Payload size (bytes)
//! 16      4     CRC32 checksum of payload
//! 20      4     Number of features
//! 24      4     Number of arms
//! 28      4     Reserved
//! ```
//!
//! All integers are little-endian.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::model::ModelKind;

// ============================================================================
// Constants
// ============================================================================

/// Magic bytes identifying a model file.
pub const MAGIC: &[u8; 4] = b"CKIT";

pub const CURRENT_VERSION_MAJOR: u8 = 1;
pub const CURRENT_VERSION_MINOR: u8 = 0;

/// Size of the format header in bytes.
pub const HEADER_SIZE: usize = 32;

// ============================================================================
// Format Flags
// ============================================================================

/// Bitfield describing optional payload features.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormatFlags(u16);

impl FormatFlags {
    /// At least one feature is categorical.
    pub const HAS_CATEGORICAL: u16 = 1 << 0;
    /// The model was trained with a weight column.
    pub const HAS_WEIGHT: u16 = 1 << 1;

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn contains(self, flag: u16) -> bool {
        self.0 & flag == flag
    }

    pub fn set(&mut self, flag: u16) {
        self.0 |= flag;
    }
}

// ============================================================================
// Format Header
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatHeader {
    pub version_major: u8,
    pub version_minor: u8,
    pub model_kind: ModelKind,
    pub flags: FormatFlags,
    pub payload_size: u32,
    pub checksum: u32,
    pub num_features: u32,
    pub num_arms: u32,
}

impl FormatHeader {
    /// Header with the current version and an empty payload.
    pub fn new(model_kind: ModelKind, num_features: u32, num_arms: u32) -> Self {
        Self {
            version_major: CURRENT_VERSION_MAJOR,
            version_minor: CURRENT_VERSION_MINOR,
            model_kind,
            flags: FormatFlags::empty(),
            payload_size: 0,
            checksum: 0,
            num_features,
            num_arms,
        }
    }

    pub fn with_flags(mut self, flags: FormatFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(MAGIC);
        buf[4] = self.version_major;
        buf[5] = self.version_minor;
        buf[6] = self.model_kind.tag();
        buf[8..10].copy_from_slice(&self.flags.bits().to_le_bytes());
        buf[12..16].copy_from_slice(&self.payload_size.to_le_bytes());
        buf[16..20].copy_from_slice(&self.checksum.to_le_bytes());
        buf[20..24].copy_from_slice(&self.num_features.to_le_bytes());
        buf[24..28].copy_from_slice(&self.num_arms.to_le_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8; HEADER_SIZE]) -> Result<Self, DeserializeError> {
        if &buf[0..4] != MAGIC {
            return Err(DeserializeError::NotAModel);
        }

        let version_major = buf[4];
        let version_minor = buf[5];
        if version_major > CURRENT_VERSION_MAJOR {
            return Err(DeserializeError::UnsupportedVersion {
                major: version_major,
                minor: version_minor,
            });
        }

        let model_kind = ModelKind::from_u8(buf[6])
            .ok_or_else(|| DeserializeError::CorruptPayload(format!("unknown model kind {}", buf[6])))?;

        let u32_at = |at: usize| u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]]);

        Ok(Self {
            version_major,
            version_minor,
            model_kind,
            flags: FormatFlags::from_bits(u16::from_le_bytes([buf[8], buf[9]])),
            payload_size: u32_at(12),
            checksum: u32_at(16),
            num_features: u32_at(20),
            num_arms: u32_at(24),
        })
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while writing a model file.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("payload of {0} bytes exceeds the format limit")]
    PayloadTooLarge(usize),
}

/// Errors that can occur while reading a model file.
#[derive(Debug, Error)]
pub enum DeserializeError {
    #[error("not a causalkit model file")]
    NotAModel,

    #[error("model requires format version {major}.{minor} or later")]
    UnsupportedVersion { major: u8, minor: u8 },

    #[error("checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("file truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("corrupt payload: {0}")]
    CorruptPayload(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("decoding error: {0}")]
    Decoding(#[from] serde_json::Error),
}

// ============================================================================
// Native Codec
// ============================================================================

pub fn compute_checksum(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Writes and reads the header-plus-payload format.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeCodec;

impl NativeCodec {
    pub fn new() -> Self {
        Self
    }

    /// Write `header` and `payload`, filling in the size and checksum.
    pub fn write_to<W: Write>(
        &self,
        writer: &mut W,
        header: &mut FormatHeader,
        payload: &[u8],
    ) -> Result<(), SerializeError> {
        header.payload_size =
            u32::try_from(payload.len()).map_err(|_| SerializeError::PayloadTooLarge(payload.len()))?;
        header.checksum = compute_checksum(payload);
        writer.write_all(&header.to_bytes())?;
        writer.write_all(payload)?;
        Ok(())
    }

    /// Read and verify a header and its payload.
    pub fn read_from<R: Read>(
        &self,
        reader: &mut R,
    ) -> Result<(FormatHeader, Vec<u8>), DeserializeError> {
        let mut header_buf = [0u8; HEADER_SIZE];
        let got = read_up_to(reader, &mut header_buf)?;
        if got < HEADER_SIZE {
            return Err(DeserializeError::Truncated {
                expected: HEADER_SIZE,
                actual: got,
            });
        }
        let header = FormatHeader::from_bytes(&header_buf)?;

        // payload_size is outside the checksum: cap the read, don't reserve.
        let expected = header.payload_size as usize;
        let mut payload = Vec::new();
        reader
            .by_ref()
            .take(u64::from(header.payload_size) + 1)
            .read_to_end(&mut payload)?;
        if payload.len() < expected {
            return Err(DeserializeError::Truncated {
                expected,
                actual: payload.len(),
            });
        }
        if payload.len() > expected {
            return Err(DeserializeError::CorruptPayload(
                "trailing bytes after payload".into(),
            ));
        }

        let actual = compute_checksum(&payload);
        if actual != header.checksum {
            return Err(DeserializeError::ChecksumMismatch {
                expected: header.checksum,
                actual,
            });
        }

        Ok((header, payload))
    }

    /// Encode `payload` as JSON behind a header.
    pub fn serialize<T: Serialize>(
        &self,
        header: FormatHeader,
        payload: &T,
    ) -> Result<Vec<u8>, SerializeError> {
        let payload_bytes = serde_json::to_vec(payload)?;
        let mut header = header;
        let mut output = Vec::with_capacity(HEADER_SIZE + payload_bytes.len());
        self.write_to(&mut output, &mut header, &payload_bytes)?;
        Ok(output)
    }

    pub fn deserialize<T: DeserializeOwned>(
        &self,
        bytes: &[u8],
    ) -> Result<(FormatHeader, T), DeserializeError> {
        let mut cursor = std::io::Cursor::new(bytes);
        let (header, payload) = self.read_from(&mut cursor)?;
        Ok((header, serde_json::from_slice(&payload)?))
    }

    /// Write a model file.
    pub fn save<T: Serialize>(
        &self,
        path: &Path,
        header: FormatHeader,
        payload: &T,
    ) -> Result<(), SerializeError> {
        let bytes = self.serialize(header, payload)?;
        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(&bytes)?;
        writer.flush()?;
        Ok(())
    }

    /// Read a model file.
    pub fn load<T: DeserializeOwned>(
        &self,
        path: &Path,
    ) -> Result<(FormatHeader, T), DeserializeError> {
        let mut reader = BufReader::new(File::open(path)?);
        let (header, payload) = self.read_from(&mut reader)?;
        Ok((header, serde_json::from_slice(&payload)?))
    }
}

/// Fill as much of `buf` as the reader provides; returns the count read.
fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn payload() -> BTreeMap<String, Vec<f32>> {
        BTreeMap::from([("a".to_string(), vec![1.0, 2.5]), ("b".to_string(), vec![])])
    }

    fn header() -> FormatHeader {
        FormatHeader::new(ModelKind::RandomForestRegressor, 4, 3)
    }

    #[test]
    fn header_roundtrip() {
        let mut flags = FormatFlags::empty();
        flags.set(FormatFlags::HAS_CATEGORICAL);
        let header = FormatHeader {
            payload_size: 1234,
            checksum: 0xDEAD_BEEF,
            ..header().with_flags(flags)
        };
        let bytes = header.to_bytes();
        assert_eq!(&bytes[0..4], b"CKIT");
        assert_eq!(bytes[6], 2);
        let parsed = FormatHeader::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, header);
        assert!(parsed.flags.contains(FormatFlags::HAS_CATEGORICAL));
        assert!(!parsed.flags.contains(FormatFlags::HAS_WEIGHT));
    }

    #[test]
    fn payload_roundtrip() {
        let codec = NativeCodec::new();
        let bytes = codec.serialize(header(), &payload()).unwrap();
        let (h, back): (_, BTreeMap<String, Vec<f32>>) = codec.deserialize(&bytes).unwrap();
        assert_eq!(back, payload());
        assert_eq!(h.model_kind, ModelKind::RandomForestRegressor);
        assert_eq!(h.num_arms, 3);
        assert_eq!(h.payload_size as usize, bytes.len() - HEADER_SIZE);
    }

    #[test]
    fn wrong_magic() {
        let codec = NativeCodec::new();
        let mut bytes = codec.serialize(header(), &payload()).unwrap();
        bytes[0] = b'X';
        let err = codec.deserialize::<BTreeMap<String, Vec<f32>>>(&bytes).unwrap_err();
        assert!(matches!(err, DeserializeError::NotAModel));
    }

    #[test]
    fn newer_major_version() {
        let codec = NativeCodec::new();
        let mut bytes = codec.serialize(header(), &payload()).unwrap();
        bytes[4] = CURRENT_VERSION_MAJOR + 1;
        let err = codec.deserialize::<BTreeMap<String, Vec<f32>>>(&bytes).unwrap_err();
        assert!(matches!(err, DeserializeError::UnsupportedVersion { .. }));
    }

    #[test]
    fn corrupted_payload_fails_checksum() {
        let codec = NativeCodec::new();
        let mut bytes = codec.serialize(header(), &payload()).unwrap();
        let last = bytes.len() - 2;
        bytes[last] ^= 0xFF;
        let err = codec.deserialize::<BTreeMap<String, Vec<f32>>>(&bytes).unwrap_err();
        assert!(matches!(err, DeserializeError::ChecksumMismatch { .. }));
    }

    #[test]
    fn truncated_file() {
        let codec = NativeCodec::new();
        let bytes = codec.serialize(header(), &payload()).unwrap();

        let err = codec
            .deserialize::<BTreeMap<String, Vec<f32>>>(&bytes[..bytes.len() - 3])
            .unwrap_err();
        assert!(matches!(err, DeserializeError::Truncated { actual, expected } if expected == actual + 3));

        let err = codec.deserialize::<BTreeMap<String, Vec<f32>>>(&bytes[..10]).unwrap_err();
        assert!(matches!(err, DeserializeError::Truncated { expected: HEADER_SIZE, actual: 10 }));
    }

    #[test]
    fn oversized_length_field_is_truncation() {
        let codec = NativeCodec::new();
        let mut bytes = codec.serialize(header(), &payload()).unwrap();
        let actual = bytes.len() - HEADER_SIZE;
        bytes[12..16].copy_from_slice(&u32::MAX.to_le_bytes());

        let err = codec.deserialize::<BTreeMap<String, Vec<f32>>>(&bytes).unwrap_err();
        assert!(matches!(
            err,
            DeserializeError::Truncated { expected, actual: a } if expected == u32::MAX as usize && a == actual
        ));
    }

    #[test]
    fn trailing_bytes_rejected() {
        let codec = NativeCodec::new();
        let mut bytes = codec.serialize(header(), &payload()).unwrap();
        bytes.push(b' ');
        let err = codec.deserialize::<BTreeMap<String, Vec<f32>>>(&bytes).unwrap_err();
        assert!(matches!(err, DeserializeError::CorruptPayload(_)));
    }

    #[test]
    fn file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.ckit");
        let codec = NativeCodec::new();
        codec.save(&path, header(), &payload()).unwrap();
        let (_, back): (_, BTreeMap<String, Vec<f32>>) = codec.load(&path).unwrap();
        assert_eq!(back, payload());
    }
}
