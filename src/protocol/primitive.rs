use crate::error::{Error, Result};
use zerocopy::FromBytes;
use zerocopy::byteorder::little_endian::{U16 as U16LE, U32 as U32LE, U64 as U64LE};

/// First byte of a length-encoded field meaning SQL NULL
pub const LENENC_NULL: u8 = 0xFB;

/// Largest field length a row may carry; offsets are kept within signed 32-bit range
pub const MAX_FIELD_LENGTH: u64 = i32::MAX as u64;

/// Read 1-byte integer
pub fn read_int_1(data: &[u8]) -> Result<(u8, &[u8])> {
    match data.split_first() {
        Some((&value, rest)) => Ok((value, rest)),
        None => Err(Error::UnexpectedEof),
    }
}

/// Read 2-byte little-endian integer
pub fn read_int_2(data: &[u8]) -> Result<(u16, &[u8])> {
    let (value, rest) = U16LE::ref_from_prefix(data).map_err(|_| Error::UnexpectedEof)?;
    Ok((value.get(), rest))
}

/// Read 3-byte little-endian integer
pub fn read_int_3(data: &[u8]) -> Result<(u32, &[u8])> {
    match data {
        [a, b, c, rest @ ..] => Ok((u32::from_le_bytes([*a, *b, *c, 0]), rest)),
        _ => Err(Error::UnexpectedEof),
    }
}

/// Read 4-byte little-endian integer
pub fn read_int_4(data: &[u8]) -> Result<(u32, &[u8])> {
    let (value, rest) = U32LE::ref_from_prefix(data).map_err(|_| Error::UnexpectedEof)?;
    Ok((value.get(), rest))
}

/// Read 8-byte little-endian integer
pub fn read_int_8(data: &[u8]) -> Result<(u64, &[u8])> {
    let (value, rest) = U64LE::ref_from_prefix(data).map_err(|_| Error::UnexpectedEof)?;
    Ok((value.get(), rest))
}

/// Read length-encoded integer
///
/// `0xFB` (NULL) and `0xFF` (ERR header) are not valid integer prefixes.
pub fn read_int_lenenc(data: &[u8]) -> Result<(u64, &[u8])> {
    let (first, rest) = read_int_1(data)?;
    match first {
        0xFC => {
            let (val, rest) = read_int_2(rest)?;
            Ok((val as u64, rest))
        }
        0xFD => {
            let (val, rest) = read_int_3(rest)?;
            Ok((val as u64, rest))
        }
        0xFE => read_int_8(rest),
        LENENC_NULL | 0xFF => Err(Error::InvalidPacket),
        val => Ok((val as u64, rest)),
    }
}

/// Read the length prefix of a row field
///
/// Returns `None` for the NULL marker. Lengths above `MAX_FIELD_LENGTH` are
/// rejected as malformed.
pub fn read_field_length(data: &[u8]) -> Result<(Option<usize>, &[u8])> {
    if let Some((&LENENC_NULL, rest)) = data.split_first() {
        return Ok((None, rest));
    }
    let (len, rest) = read_int_lenenc(data)?;
    if len > MAX_FIELD_LENGTH {
        return Err(Error::InvalidPacket);
    }
    Ok((Some(len as usize), rest))
}

/// Read fixed-length string
pub fn read_string_fix(data: &[u8], len: usize) -> Result<(&[u8], &[u8])> {
    if data.len() < len {
        return Err(Error::UnexpectedEof);
    }
    Ok(data.split_at(len))
}

/// Read null-terminated string
pub fn read_string_null(data: &[u8]) -> Result<(&[u8], &[u8])> {
    match data.iter().position(|&byte| byte == 0) {
        Some(i) => Ok((&data[..i], &data[i + 1..])),
        None => Err(Error::UnexpectedEof),
    }
}

/// Read length-encoded string
pub fn read_string_lenenc(data: &[u8]) -> Result<(&[u8], &[u8])> {
    let (len, rest) = read_int_lenenc(data)?;
    if len > MAX_FIELD_LENGTH {
        return Err(Error::InvalidPacket);
    }
    read_string_fix(rest, len as usize)
}

/// Write 1-byte integer
pub fn write_int_1(out: &mut Vec<u8>, value: u8) {
    out.push(value);
}

/// Write 2-byte little-endian integer
pub fn write_int_2(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Write 3-byte little-endian integer
pub fn write_int_3(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes()[..3]);
}

/// Write 4-byte little-endian integer
pub fn write_int_4(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Write 8-byte little-endian integer
pub fn write_int_8(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Write length-encoded integer
pub fn write_int_lenenc(out: &mut Vec<u8>, value: u64) {
    if value < 251 {
        out.push(value as u8);
    } else if value < (1 << 16) {
        out.push(0xfc);
        write_int_2(out, value as u16);
    } else if value < (1 << 24) {
        out.push(0xfd);
        write_int_3(out, value as u32);
    } else {
        out.push(0xfe);
        write_int_8(out, value);
    }
}

/// Write null-terminated string
pub fn write_string_null(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(s.as_bytes());
    out.push(0);
}

/// Write length-encoded bytes
pub fn write_bytes_lenenc(out: &mut Vec<u8>, data: &[u8]) {
    write_int_lenenc(out, data.len() as u64);
    out.extend_from_slice(data);
}
