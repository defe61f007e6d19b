use crate::col::ColumnDefinition;
use crate::constant::{ColumnFlags, ColumnType};
use crate::error::{Error, Result};
use crate::protocol::primitive::*;
use zerocopy::byteorder::little_endian::{U16 as U16LE, U32 as U32LE};
use zerocopy::{FromBytes, Immutable, KnownLayout};

/// Represents a payload part of a column definition packet
#[derive(Debug, Clone, Copy)]
pub struct ColumnDefinitionBytes<'a>(pub &'a [u8]);

impl TryFrom<ColumnDefinitionBytes<'_>> for ColumnDefinition {
    type Error = Error;

    fn try_from(bytes: ColumnDefinitionBytes<'_>) -> Result<Self> {
        let data = bytes.0;

        let (_catalog, data) = read_string_lenenc(data)?;
        let (schema, data) = read_string_lenenc(data)?;
        let (table, data) = read_string_lenenc(data)?;
        let (org_table, data) = read_string_lenenc(data)?;
        let (name, data) = read_string_lenenc(data)?;
        let (org_name, data) = read_string_lenenc(data)?;

        // length of fixed fields, always 0x0c
        let (_length, data) = read_int_lenenc(data)?;
        let (tail, _rest) =
            ColumnDefinitionTail::ref_from_prefix(data).map_err(|_| Error::UnexpectedEof)?;

        Ok(ColumnDefinition {
            schema: String::from_utf8_lossy(schema).into_owned(),
            table: String::from_utf8_lossy(table).into_owned(),
            org_table: String::from_utf8_lossy(org_table).into_owned(),
            name: String::from_utf8_lossy(name).into_owned(),
            org_name: String::from_utf8_lossy(org_name).into_owned(),
            charset: tail.charset(),
            column_length: tail.column_length(),
            column_type: tail.column_type()?,
            flags: tail.flags(),
            decimals: tail.decimals,
        })
    }
}

/// Fixed-size tail of Column Definition packet (12 bytes)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
pub struct ColumnDefinitionTail {
    charset: U16LE,
    column_length: U32LE,
    column_type: u8,
    flags: U16LE,
    decimals: u8,
    reserved: U16LE,
}

impl ColumnDefinitionTail {
    pub fn charset(&self) -> u16 {
        self.charset.get()
    }

    pub fn column_length(&self) -> u32 {
        self.column_length.get()
    }

    pub fn column_type(&self) -> Result<ColumnType> {
        ColumnType::from_u8(self.column_type).ok_or(Error::InvalidPacket)
    }

    pub fn flags(&self) -> ColumnFlags {
        ColumnFlags::from_bits_truncate(self.flags.get())
    }
}

/// Encode a column definition frame
pub fn write_column_definition(out: &mut Vec<u8>, column: &ColumnDefinition) {
    write_bytes_lenenc(out, b"def");
    write_bytes_lenenc(out, column.schema.as_bytes());
    write_bytes_lenenc(out, column.table.as_bytes());
    write_bytes_lenenc(out, column.org_table.as_bytes());
    write_bytes_lenenc(out, column.name.as_bytes());
    write_bytes_lenenc(out, column.org_name.as_bytes());
    write_int_lenenc(out, 0x0c);
    write_int_2(out, column.charset);
    write_int_4(out, column.column_length);
    write_int_1(out, column.column_type as u8);
    write_int_2(out, column.flags.bits());
    write_int_1(out, column.decimals);
    write_int_2(out, 0);
}
