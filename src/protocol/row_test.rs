use pretty_assertions::assert_eq;

use crate::col::ColumnDefinition;
use crate::constant::ColumnType;
use crate::error::Error;
use crate::protocol::primitive::{LENENC_NULL, write_bytes_lenenc};
use crate::protocol::row::{DecodedSlice, Located, ResumePoint, RowDecoder, RowProtocol};
use crate::protocol::value::NullBitmap;

fn text_row(values: &[Option<&[u8]>]) -> Vec<u8> {
    let mut row = Vec::new();
    for value in values {
        match value {
            Some(bytes) => write_bytes_lenenc(&mut row, bytes),
            None => row.push(LENENC_NULL),
        }
    }
    row
}

/// Binary row; each value is already in its wire encoding
fn binary_row(values: &[Option<&[u8]>]) -> Vec<u8> {
    let mut bitmap = vec![0u8; NullBitmap::result_set_len(values.len())];
    for (idx, value) in values.iter().enumerate() {
        if value.is_none() {
            let bit = idx + 2;
            bitmap[bit >> 3] |= 1 << (bit & 7);
        }
    }
    let mut row = vec![0x00];
    row.extend_from_slice(&bitmap);
    for value in values.iter().flatten() {
        row.extend_from_slice(value);
    }
    row
}

fn lenenc(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    write_bytes_lenenc(&mut out, bytes);
    out
}

fn varchar_columns(n: usize) -> Vec<ColumnDefinition> {
    (0..n)
        .map(|i| ColumnDefinition::new(format!("c{i}"), ColumnType::MYSQL_TYPE_VAR_STRING))
        .collect()
}

fn mixed_columns() -> Vec<ColumnDefinition> {
    vec![
        ColumnDefinition::new("id", ColumnType::MYSQL_TYPE_LONGLONG),
        ColumnDefinition::new("name", ColumnType::MYSQL_TYPE_VAR_STRING),
        ColumnDefinition::new("flag", ColumnType::MYSQL_TYPE_TINY),
        ColumnDefinition::new("born", ColumnType::MYSQL_TYPE_DATE),
        ColumnDefinition::new("score", ColumnType::MYSQL_TYPE_DOUBLE),
        ColumnDefinition::new("year", ColumnType::MYSQL_TYPE_YEAR),
        ColumnDefinition::new("n", ColumnType::MYSQL_TYPE_LONG),
        ColumnDefinition::new("blob", ColumnType::MYSQL_TYPE_BLOB),
    ]
}

fn mixed_binary_row(nulls: &[usize]) -> Vec<u8> {
    let id = 42i64.to_le_bytes();
    let name = lenenc(b"alice");
    let flag = [1u8];
    let born = [4u8, 0xD0, 0x07, 1, 15];
    let score = 2.5f64.to_le_bytes();
    let year = 1999u16.to_le_bytes();
    let n = (-7i32).to_le_bytes();
    let blob = lenenc(&[0xDE, 0xAD, 0xBE, 0xEF]);
    let values: [&[u8]; 8] = [&id, &name, &flag, &born, &score, &year, &n, &blob];
    let values: Vec<Option<&[u8]>> = values
        .iter()
        .enumerate()
        .map(|(i, v)| if nulls.contains(&i) { None } else { Some(*v) })
        .collect();
    binary_row(&values)
}

#[test]
fn text_row_locates_each_column() {
    let columns = varchar_columns(3);
    let decoder = RowDecoder::new(RowProtocol::Text, &columns);
    let row = text_row(&[Some(b"ab"), Some(b""), Some(b"xyz")]);

    let start = decoder.start();
    assert_eq!(start, ResumePoint { column: 0, offset: 0 });

    let first = decoder.locate(&row, 0, start).unwrap();
    assert_eq!(
        first,
        Located::Value(DecodedSlice {
            column: 0,
            offset: 1,
            length: 2
        })
    );
    let second = decoder.locate(&row, 1, start).unwrap();
    assert_eq!(second.slice().unwrap().length, 0);
    let third = decoder.locate(&row, 2, start).unwrap();
    assert_eq!(third.slice().unwrap().bytes(&row), b"xyz");
    assert_eq!(third.end(), row.len());
}

#[test]
fn text_null_marker_regardless_of_neighbours() {
    let columns = varchar_columns(3);
    let decoder = RowDecoder::new(RowProtocol::Text, &columns);
    let neighbours: [&[u8]; 3] = [b"", b"\xFB\xFB", b"0123456789"];
    for left in neighbours {
        for right in neighbours {
            let row = text_row(&[Some(left), None, Some(right)]);
            let located = decoder.locate(&row, 1, decoder.start()).unwrap();
            assert!(located.is_null());
            let after = decoder.locate(&row, 2, decoder.start()).unwrap();
            assert_eq!(after.slice().unwrap().bytes(&row), right);
        }
    }
}

#[test]
fn binary_null_bitmap_regardless_of_neighbours() {
    let columns = mixed_columns();
    let decoder = RowDecoder::new(RowProtocol::Binary, &columns);
    for target in 0..columns.len() {
        let row = mixed_binary_row(&[target]);
        for column in 0..columns.len() {
            let located = decoder.locate(&row, column, decoder.start()).unwrap();
            assert_eq!(located.is_null(), column == target, "column {column}");
        }
    }
}

#[test]
fn binary_fixed_and_lenenc_widths() {
    let columns = mixed_columns();
    let decoder = RowDecoder::new(RowProtocol::Binary, &columns);
    let row = mixed_binary_row(&[]);
    let start = decoder.start();
    // header byte + 2-byte bitmap for 8 columns
    assert_eq!(start.offset, 3);

    let id = decoder.locate(&row, 0, start).unwrap().slice().unwrap();
    assert_eq!(id.bytes(&row), &42i64.to_le_bytes());
    let name = decoder.locate(&row, 1, start).unwrap().slice().unwrap();
    assert_eq!(name.bytes(&row), b"alice");
    let born = decoder.locate(&row, 3, start).unwrap().slice().unwrap();
    assert_eq!(born.bytes(&row), &[0xD0, 0x07, 1, 15]);
    let year = decoder.locate(&row, 5, start).unwrap().slice().unwrap();
    assert_eq!(year.length, 2);
    let blob = decoder.locate(&row, 7, start).unwrap().slice().unwrap();
    assert_eq!(blob.bytes(&row), &[0xDE, 0xAD, 0xBE, 0xEF]);
    assert_eq!(blob.end(), row.len());
}

#[test]
fn resume_matches_full_scan() {
    let columns = mixed_columns();
    let decoder = RowDecoder::new(RowProtocol::Binary, &columns);
    for nulls in [vec![], vec![1], vec![0, 3, 7], vec![2, 4, 6]] {
        let row = mixed_binary_row(&nulls);
        let mut resume = decoder.start();
        for column in 0..columns.len() {
            let full = decoder.locate(&row, column, decoder.start()).unwrap();
            let cached = decoder.locate(&row, column, resume).unwrap();
            assert_eq!(full, cached);
            resume = cached.resume_point();
        }
    }

    let columns = varchar_columns(5);
    let decoder = RowDecoder::new(RowProtocol::Text, &columns);
    let row = text_row(&[Some(b"a"), None, Some(b"ccc"), None, Some(b"eeeee")]);
    for skip_to in 0..5 {
        for target in skip_to..5 {
            let resume = if skip_to == 0 {
                decoder.start()
            } else {
                decoder
                    .locate(&row, skip_to - 1, decoder.start())
                    .unwrap()
                    .resume_point()
            };
            assert_eq!(
                decoder.locate(&row, target, resume).unwrap(),
                decoder.locate(&row, target, decoder.start()).unwrap()
            );
        }
    }
}

#[test]
fn lenenc_length_boundaries() {
    let columns = varchar_columns(2);
    let decoder = RowDecoder::new(RowProtocol::Text, &columns);
    for (len, header) in [
        (250usize, 1usize),
        (251, 3),
        (65535, 3),
        (65536, 4),
        (16777215, 4),
        (16777216, 9),
    ] {
        let value = vec![b'x'; len];
        let row = text_row(&[Some(&value), Some(b"tail")]);
        let located = decoder.locate(&row, 0, decoder.start()).unwrap();
        let slice = located.slice().unwrap();
        assert_eq!(slice.offset, header, "length {len}");
        assert_eq!(slice.length, len);
        let tail = decoder.locate(&row, 1, located.resume_point()).unwrap();
        assert_eq!(tail.slice().unwrap().bytes(&row), b"tail");
    }
}

#[test]
fn absent_type_decodes_as_null_without_consuming() {
    let columns = vec![
        ColumnDefinition::new("nothing", ColumnType::MYSQL_TYPE_NULL),
        ColumnDefinition::new("n", ColumnType::MYSQL_TYPE_TINY),
    ];
    let decoder = RowDecoder::new(RowProtocol::Binary, &columns);
    let row = vec![0x00, 0x00, 9];
    assert!(decoder.locate(&row, 0, decoder.start()).unwrap().is_null());
    let n = decoder.locate(&row, 1, decoder.start()).unwrap();
    assert_eq!(n.slice().unwrap().bytes(&row), &[9]);
}

#[test]
fn truncated_rows_are_framing_errors() {
    let columns = varchar_columns(2);
    let decoder = RowDecoder::new(RowProtocol::Text, &columns);
    let mut row = text_row(&[Some(b"abc"), Some(b"defg")]);
    row.truncate(row.len() - 1);
    assert!(decoder.locate(&row, 0, decoder.start()).is_ok());
    assert!(matches!(
        decoder.locate(&row, 1, decoder.start()),
        Err(Error::UnexpectedEof)
    ));

    let columns = mixed_columns();
    let decoder = RowDecoder::new(RowProtocol::Binary, &columns);
    let row = mixed_binary_row(&[]);
    assert!(matches!(
        decoder.locate(&row[..10], 4, decoder.start()),
        Err(Error::UnexpectedEof)
    ));
    assert!(matches!(
        decoder.locate(&row[..2], 0, decoder.start()),
        Err(Error::UnexpectedEof)
    ));
}

#[test]
fn bad_column_index() {
    let columns = varchar_columns(1);
    let decoder = RowDecoder::new(RowProtocol::Text, &columns);
    let row = text_row(&[Some(b"a")]);
    assert!(matches!(
        decoder.locate(&row, 1, decoder.start()),
        Err(Error::InvalidParameter(_))
    ));
}
