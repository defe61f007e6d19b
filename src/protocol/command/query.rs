use crate::constant::CommandByte;
use crate::error::{Error, Result};
use crate::protocol::primitive::*;
use crate::protocol::response::{ErrPayloadBytes, OkPayloadBytes};

/// Write COM_QUERY command
pub fn write_query(out: &mut Vec<u8>, sql: &str) {
    write_int_1(out, CommandByte::Query as u8);
    out.extend_from_slice(sql.as_bytes());
}

/// First frame of a command response
#[derive(Debug)]
pub enum QueryResponse<'a> {
    Ok(OkPayloadBytes<'a>),
    ResultSet { column_count: usize },
}

/// Read the first frame answering COM_QUERY / COM_STMT_EXECUTE
/// - 0xFF: ERR packet
/// - 0x00: OK packet (no result set)
/// - 0xFB: LOCAL INFILE request
/// - otherwise: column count as a length-encoded integer
pub fn read_query_response(payload: &[u8]) -> Result<QueryResponse<'_>> {
    match payload.first() {
        None => Err(Error::InvalidPacket),
        Some(0xFF) => Err(ErrPayloadBytes(payload).into()),
        Some(0x00) => Ok(QueryResponse::Ok(OkPayloadBytes(payload))),
        Some(0xFB) => Err(Error::Unsupported(
            "LOCAL INFILE requests are not supported".to_string(),
        )),
        Some(_) => {
            let (column_count, _rest) = read_int_lenenc(payload)?;
            Ok(QueryResponse::ResultSet {
                column_count: usize::try_from(column_count).map_err(|_| Error::InvalidPacket)?,
            })
        }
    }
}
