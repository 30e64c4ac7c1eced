use std::fmt;

mod snapshot;

pub use snapshot::{decode_snapshot_payload, encode_snapshot_payload};

use connwatch_types::SnapshotMessage;

pub const DEFAULT_MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;
/// "CWCH", sent once by the producer before the first frame.
pub const PROTOCOL_MAGIC: u32 = 0x43574348;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameCodecError {
    PayloadTooLarge { len: usize, max: usize },
    FrameTooShort { len: usize },
    FrameTooLarge { len: usize, max: usize },
    FrameTruncated { expected: usize, actual: usize },
}

impl fmt::Display for FrameCodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PayloadTooLarge { len, max } => {
                write!(f, "payload too large: {len} > {max}")
            }
            Self::FrameTooShort { len } => write!(f, "frame too short: {len}"),
            Self::FrameTooLarge { len, max } => write!(f, "frame too large: {len} > {max}"),
            Self::FrameTruncated { expected, actual } => {
                write!(
                    f,
                    "truncated frame payload: expected {expected}, got {actual}"
                )
            }
        }
    }
}

impl std::error::Error for FrameCodecError {}

#[derive(Debug)]
pub enum WireError {
    Frame(FrameCodecError),
    Json(String),
    /// Valid JSON that is neither an object nor `null`.
    Shape(String),
    MagicMismatch { expected: u32, actual: u32 },
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Frame(err) => write!(f, "{err}"),
            Self::Json(err) => write!(f, "{err}"),
            Self::Shape(err) => write!(f, "unexpected snapshot shape: {err}"),
            Self::MagicMismatch { expected, actual } => {
                write!(
                    f,
                    "protocol magic mismatch: expected 0x{expected:08x}, got 0x{actual:08x}"
                )
            }
        }
    }
}

impl std::error::Error for WireError {}

impl From<FrameCodecError> for WireError {
    fn from(value: FrameCodecError) -> Self {
        Self::Frame(value)
    }
}

pub fn encode_frame(payload: &[u8], max_payload_bytes: usize) -> Result<Vec<u8>, FrameCodecError> {
    if payload.len() > max_payload_bytes {
        return Err(FrameCodecError::PayloadTooLarge {
            len: payload.len(),
            max: max_payload_bytes,
        });
    }

    let payload_len =
        u32::try_from(payload.len()).map_err(|_| FrameCodecError::PayloadTooLarge {
            len: payload.len(),
            max: u32::MAX as usize,
        })?;

    let mut out = Vec::with_capacity(4 + payload.len());
    out.extend_from_slice(&payload_len.to_be_bytes());
    out.extend_from_slice(payload);
    Ok(out)
}

pub fn decode_frame(frame: &[u8], max_payload_bytes: usize) -> Result<&[u8], FrameCodecError> {
    if frame.len() < 4 {
        return Err(FrameCodecError::FrameTooShort { len: frame.len() });
    }

    let mut prefix = [0u8; 4];
    prefix.copy_from_slice(&frame[..4]);
    let payload_len = u32::from_be_bytes(prefix) as usize;
    if payload_len > max_payload_bytes {
        return Err(FrameCodecError::FrameTooLarge {
            len: payload_len,
            max: max_payload_bytes,
        });
    }

    let actual_payload_len = frame.len() - 4;
    if actual_payload_len != payload_len {
        return Err(FrameCodecError::FrameTruncated {
            expected: payload_len,
            actual: actual_payload_len,
        });
    }

    Ok(&frame[4..])
}

pub fn encode_protocol_magic() -> [u8; 4] {
    PROTOCOL_MAGIC.to_be_bytes()
}

pub fn decode_protocol_magic(bytes: [u8; 4]) -> Result<(), WireError> {
    let actual = u32::from_be_bytes(bytes);
    if actual != PROTOCOL_MAGIC {
        return Err(WireError::MagicMismatch {
            expected: PROTOCOL_MAGIC,
            actual,
        });
    }
    Ok(())
}

/// Frames one snapshot message (or the `null` keep-alive) for the ingest socket.
pub fn encode_snapshot_frame(
    message: Option<&SnapshotMessage>,
    max_payload_bytes: usize,
) -> Result<Vec<u8>, WireError> {
    let payload = encode_snapshot_payload(message)?;
    Ok(encode_frame(&payload, max_payload_bytes)?)
}

pub fn encode_snapshot_frame_default(
    message: Option<&SnapshotMessage>,
) -> Result<Vec<u8>, WireError> {
    encode_snapshot_frame(message, DEFAULT_MAX_FRAME_BYTES)
}

pub fn decode_snapshot_frame(
    frame: &[u8],
    max_payload_bytes: usize,
) -> Result<Option<SnapshotMessage>, WireError> {
    let payload = decode_frame(frame, max_payload_bytes)?;
    decode_snapshot_payload(payload)
}

pub fn decode_snapshot_frame_default(frame: &[u8]) -> Result<Option<SnapshotMessage>, WireError> {
    decode_snapshot_frame(frame, DEFAULT_MAX_FRAME_BYTES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_magic_roundtrip() {
        let bytes = encode_protocol_magic();
        assert_eq!(&bytes, b"CWCH");
        decode_protocol_magic(bytes).expect("protocol magic should decode");
    }

    #[test]
    fn foreign_magic_is_rejected() {
        let err = decode_protocol_magic(*b"MOIR").expect_err("foreign magic must fail");
        assert!(
            err.to_string().contains("protocol magic mismatch"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn frame_length_prefix_is_big_endian() {
        let frame = encode_frame(b"null", 64).expect("small payload should encode");
        assert_eq!(&frame[..4], &[0, 0, 0, 4]);
        assert_eq!(decode_frame(&frame, 64).expect("frame should decode"), b"null");
    }

    #[test]
    fn oversized_and_truncated_frames_are_rejected() {
        assert_eq!(
            encode_frame(&[0u8; 8], 4),
            Err(FrameCodecError::PayloadTooLarge { len: 8, max: 4 })
        );
        assert_eq!(
            decode_frame(&[0, 0], 4),
            Err(FrameCodecError::FrameTooShort { len: 2 })
        );
        assert_eq!(
            decode_frame(&[0, 0, 0, 9, 1], 4),
            Err(FrameCodecError::FrameTooLarge { len: 9, max: 4 })
        );
        assert_eq!(
            decode_frame(&[0, 0, 0, 3, 1], 4),
            Err(FrameCodecError::FrameTruncated {
                expected: 3,
                actual: 1
            })
        );
    }

    #[test]
    fn null_snapshot_frame_decodes_to_none() {
        let frame = encode_snapshot_frame_default(None).expect("null frame should encode");
        let decoded = decode_snapshot_frame_default(&frame).expect("null frame should decode");
        assert!(decoded.is_none());
    }
}
