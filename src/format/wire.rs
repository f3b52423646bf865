//! SSH wire primitives: big-endian `uint32` and length-prefixed `string`
//!
//! Readers work on `&mut &[u8]` and advance the slice, so a nested decoder
//! (e.g. the external key parser) can pick up where these left off.

use crate::error::{KeyCodecError, Result};

/// Size of a length prefix
pub const U32_LEN: usize = 4;

pub fn put_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_be_bytes());
}

/// Append `data` as a length-prefixed string
pub fn put_string(buf: &mut Vec<u8>, data: &[u8]) -> Result<()> {
    let len = u32::try_from(data.len()).map_err(|_| {
        KeyCodecError::EncodingFailure(format!("field of {} bytes exceeds u32", data.len()))
    })?;
    put_u32(buf, len);
    buf.extend_from_slice(data);
    Ok(())
}

/// Encoded size of a length-prefixed string holding `len` bytes
pub fn string_len(len: usize) -> usize {
    U32_LEN + len
}

pub fn read_u32(input: &mut &[u8]) -> Result<u32> {
    let bytes = read_bytes(input, U32_LEN)?;
    Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Read exactly `len` raw bytes
pub fn read_bytes<'a>(input: &mut &'a [u8], len: usize) -> Result<&'a [u8]> {
    if input.len() < len {
        return Err(KeyCodecError::MalformedContainer(format!(
            "need {} bytes, {} remain",
            len,
            input.len()
        )));
    }
    let (head, tail) = input.split_at(len);
    *input = tail;
    Ok(head)
}

/// Read a length-prefixed string, bounds-checking the declared length
pub fn read_string<'a>(input: &mut &'a [u8]) -> Result<&'a [u8]> {
    let len = read_u32(input)? as usize;
    if len > input.len() {
        return Err(KeyCodecError::MalformedContainer(format!(
            "declared length {} overruns the remaining {} bytes",
            len,
            input.len()
        )));
    }
    read_bytes(input, len)
}

/// Read a length-prefixed string that must be UTF-8
pub fn read_str<'a>(input: &mut &'a [u8]) -> Result<&'a str> {
    let bytes = read_string(input)?;
    std::str::from_utf8(bytes)
        .map_err(|_| KeyCodecError::MalformedContainer("string field is not UTF-8".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_string_layout() {
        let mut buf = Vec::new();
        put_string(&mut buf, b"none").unwrap();
        assert_eq!(buf, b"\x00\x00\x00\x04none");
        assert_eq!(buf.len(), string_len(4));
    }

    #[test]
    fn test_read_sequence_advances() {
        let mut buf = Vec::new();
        put_u32(&mut buf, 1);
        put_string(&mut buf, b"bcrypt").unwrap();
        put_string(&mut buf, b"").unwrap();

        let mut input = &buf[..];
        assert_eq!(read_u32(&mut input).unwrap(), 1);
        assert_eq!(read_str(&mut input).unwrap(), "bcrypt");
        assert_eq!(read_string(&mut input).unwrap(), b"");
        assert!(input.is_empty());
    }

    #[test]
    fn test_read_string_overrun() {
        let buf = b"\x00\x00\x00\x10abc";
        let mut input = &buf[..];
        let result = read_string(&mut input);
        assert!(matches!(result, Err(KeyCodecError::MalformedContainer(_))));
    }

    #[test]
    fn test_read_u32_truncated() {
        let mut input: &[u8] = &[0, 0, 1];
        assert!(read_u32(&mut input).is_err());
    }
}
