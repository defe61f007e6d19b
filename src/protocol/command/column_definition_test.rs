use std::mem::size_of;

use pretty_assertions::assert_eq;
use zerocopy::FromBytes;

use crate::col::ColumnDefinition;
use crate::constant::{ColumnFlags, ColumnType};
use crate::protocol::command::column_definition::{
    ColumnDefinitionBytes, ColumnDefinitionTail, write_column_definition,
};

#[test]
fn tail_size() {
    assert_eq!(size_of::<ColumnDefinitionTail>(), 12);
}

#[test]
fn tail_parsing() {
    let data: [u8; 12] = [
        0x21, 0x00, // charset = 33
        0xFF, 0x00, 0x00, 0x00, // column_length = 255
        0xFD, // VAR_STRING
        0x00, 0x00, // flags
        0x00, // decimals
        0x00, 0x00, // reserved
    ];

    let tail = ColumnDefinitionTail::ref_from_bytes(&data).unwrap();
    assert_eq!(tail.charset(), 33);
    assert_eq!(tail.column_length(), 255);
    assert!(tail.flags().is_empty());
    assert_eq!(tail.column_type().unwrap(), ColumnType::MYSQL_TYPE_VAR_STRING);
}

#[test]
fn tail_with_part_key_flag() {
    let data: [u8; 12] = [
        0x3f, 0x00, // charset = 63 (binary)
        0x0B, 0x00, 0x00, 0x00, // column_length = 11
        0x03, // LONG
        0x23, 0x42, // NOT_NULL | PRI_KEY | UNSIGNED | AUTO_INCREMENT | PART_KEY
        0x00, 0x00, 0x00,
    ];

    let tail = ColumnDefinitionTail::ref_from_bytes(&data).unwrap();
    let flags = tail.flags();
    assert!(flags.contains(ColumnFlags::NOT_NULL_FLAG));
    assert!(flags.contains(ColumnFlags::UNSIGNED_FLAG));
    assert!(flags.contains(ColumnFlags::PART_KEY_FLAG));
    assert_eq!(tail.column_type().unwrap(), ColumnType::MYSQL_TYPE_LONG);
}

#[test]
fn unknown_column_type_is_rejected() {
    let data: [u8; 12] = [0x21, 0, 0, 0, 0, 0, 0x42, 0, 0, 0, 0, 0];
    let tail = ColumnDefinitionTail::ref_from_bytes(&data).unwrap();
    assert!(tail.column_type().is_err());
}

#[test]
fn full_definition_roundtrip() {
    let mut column = ColumnDefinition::new("amount", ColumnType::MYSQL_TYPE_NEWDECIMAL)
        .with_length(12)
        .with_decimals(2)
        .with_flags(ColumnFlags::NOT_NULL_FLAG);
    column.schema = "shop".to_string();
    column.table = "o".to_string();
    column.org_table = "orders".to_string();
    column.org_name = "amount".to_string();

    let mut payload = Vec::new();
    write_column_definition(&mut payload, &column);

    let parsed = ColumnDefinition::try_from(ColumnDefinitionBytes(&payload)).unwrap();
    assert_eq!(parsed, column);
    assert!(parsed.is_signed());
    assert!(!parsed.is_binary());
}

#[test]
fn truncated_definition() {
    let column = ColumnDefinition::new("id", ColumnType::MYSQL_TYPE_LONG);
    let mut payload = Vec::new();
    write_column_definition(&mut payload, &column);
    payload.truncate(payload.len() - 3);
    assert!(ColumnDefinition::try_from(ColumnDefinitionBytes(&payload)).is_err());
}
