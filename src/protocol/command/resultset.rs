use crate::error::Result;
use crate::protocol::response::{EofPacket, ErrPayloadBytes, FrameType, classify_frame, read_eof_packet};

/// A frame read while a result set streams its rows
#[derive(Debug)]
pub enum RowFrame<'a> {
    Row,
    End(&'a EofPacket),
}

/// Classify a row-stream frame; an ERR frame becomes `Error::ServerError`
pub fn read_row_frame(payload: &[u8]) -> Result<RowFrame<'_>> {
    match classify_frame(payload)? {
        FrameType::Err => Err(ErrPayloadBytes(payload).into()),
        FrameType::Eof => Ok(RowFrame::End(read_eof_packet(payload)?)),
        FrameType::Ok | FrameType::Data => Ok(RowFrame::Row),
    }
}
