use crate::constant::ServerStatusFlags;
use crate::error::{Error, Result};
use crate::protocol::primitive::*;
use zerocopy::byteorder::little_endian::U16 as U16LE;
use zerocopy::{FromBytes, Immutable, KnownLayout};

/// Frame kind, decided by the first payload byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    Ok,
    Err,
    Eof,
    /// Row, column count, column definition, ..
    Data,
}

/// Classify a frame by its sentinel byte.
///
/// `0xFE` only ends a stream when the frame is shorter than 9 bytes; a longer
/// frame starting with `0xFE` is a row or length-encoded value.
pub fn classify_frame(payload: &[u8]) -> Result<FrameType> {
    match payload.first() {
        None => Err(Error::InvalidPacket),
        Some(0xFF) => Ok(FrameType::Err),
        Some(0xFE) if payload.len() < 9 => Ok(FrameType::Eof),
        Some(0x00) => Ok(FrameType::Ok),
        Some(_) => Ok(FrameType::Data),
    }
}

#[derive(Debug)]
pub struct OkPayloadBytes<'a>(pub &'a [u8]);

#[derive(Debug)]
pub struct ErrPayloadBytes<'a>(pub &'a [u8]);

/// OK packet response
#[derive(Debug, Clone)]
pub struct OkPayload {
    pub affected_rows: u64,
    pub last_insert_id: u64,
    pub status_flags: ServerStatusFlags,
    pub warnings: u16,
    /// Human readable status; may carry a redirection hint
    pub info: String,
}

impl TryFrom<OkPayloadBytes<'_>> for OkPayload {
    type Error = Error;

    fn try_from(bytes: OkPayloadBytes<'_>) -> Result<Self> {
        let (header, data) = read_int_1(bytes.0)?;
        if header != 0x00 && header != 0xFE {
            return Err(Error::InvalidPacket);
        }

        let (affected_rows, rest) = read_int_lenenc(data)?;
        let (last_insert_id, rest) = read_int_lenenc(rest)?;
        let (status_flags, rest) = read_int_2(rest)?;
        let (warnings, rest) = read_int_2(rest)?;

        Ok(OkPayload {
            affected_rows,
            last_insert_id,
            status_flags: ServerStatusFlags::from_bits_truncate(status_flags),
            warnings,
            info: String::from_utf8_lossy(rest).into_owned(),
        })
    }
}

/// ERR packet response
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("ERROR {} ({}): {}", self.error_code, self.sql_state, self.message)]
pub struct ErrPayload {
    pub error_code: u16,
    pub sql_state: String,
    pub message: String,
}

impl TryFrom<ErrPayloadBytes<'_>> for ErrPayload {
    type Error = Error;

    fn try_from(bytes: ErrPayloadBytes<'_>) -> Result<Self> {
        let (header, data) = read_int_1(bytes.0)?;
        if header != 0xFF {
            return Err(Error::InvalidPacket);
        }

        let (error_code, data) = read_int_2(data)?;

        // SQL state marker '#'
        let (sql_state, rest) = match data.split_first() {
            Some((b'#', rest)) => {
                let (state_bytes, rest) = read_string_fix(rest, 5)?;
                (String::from_utf8_lossy(state_bytes).into_owned(), rest)
            }
            _ => (String::new(), data),
        };

        Ok(ErrPayload {
            error_code,
            sql_state,
            message: String::from_utf8_lossy(rest).into_owned(),
        })
    }
}

/// EOF packet response (zero-copy)
///
/// Layout after header byte 0xFE:
/// - warnings: 2 bytes (little-endian)
/// - status_flags: 2 bytes (little-endian)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
pub struct EofPacket {
    pub warnings: U16LE,
    pub status_flags: U16LE,
}

impl EofPacket {
    pub fn warnings(&self) -> u16 {
        self.warnings.get()
    }

    pub fn status_flags(&self) -> ServerStatusFlags {
        ServerStatusFlags::from_bits_truncate(self.status_flags.get())
    }

    pub fn more_results(&self) -> bool {
        self.status_flags()
            .contains(ServerStatusFlags::SERVER_MORE_RESULTS_EXISTS)
    }
}

/// Read EOF packet (header byte 0xFE, length < 9)
pub fn read_eof_packet(payload: &[u8]) -> Result<&EofPacket> {
    let (header, data) = read_int_1(payload)?;
    if header != 0xFE {
        return Err(Error::InvalidPacket);
    }
    EofPacket::ref_from_prefix(data)
        .map(|(eof, _)| eof)
        .map_err(|_| Error::UnexpectedEof)
}
