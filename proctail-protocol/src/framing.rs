//! Length-prefixed framing: a 4-byte little-endian length followed by the
//! UTF-8 JSON payload (spec §4.4, §6). Requests and responses use the same
//! framing, so this module is shared by both directions.

use std::io::{Read, Write};

use crate::error::ProtocolError;

/// Upper bound on a single frame's payload size. Guards against a
/// malformed or hostile length prefix forcing an unbounded allocation.
pub const MAX_FRAME_LEN: u32 = 16 * 1024 * 1024;

/// Writes one length-prefixed frame and flushes the writer.
///
/// # Errors
/// Returns [`ProtocolError::FrameTooLarge`] if `payload` exceeds
/// [`MAX_FRAME_LEN`], or [`ProtocolError::Io`] on a write failure.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<(), ProtocolError> {
    let len = u32::try_from(payload.len()).unwrap_or(u32::MAX);
    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge(len));
    }
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(payload)?;
    writer.flush()?;
    Ok(())
}

/// Reads one length-prefixed frame.
///
/// # Errors
/// Returns [`ProtocolError::ConnectionClosed`] if the stream ends before a
/// length prefix can be read, [`ProtocolError::FrameTooLarge`] if the
/// declared length exceeds [`MAX_FRAME_LEN`], or [`ProtocolError::Io`] on
/// any other read failure.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>, ProtocolError> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ProtocolError::ConnectionClosed);
        }
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_le_bytes(len_buf);
    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge(len));
    }

    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload)?;
    Ok(payload)
}
