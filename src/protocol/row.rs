//! Locating one column inside a raw row.
//!
//! Rows are packed and variable width, so finding column `k` means walking
//! every column before it. Callers keep the `ResumePoint` that follows the last
//! located column and pass it back to continue the walk instead of restarting
//! at column 0.
use crate::col::ColumnDefinition;
use crate::constant::BinaryWidth;
use crate::error::{Error, Result, eyre};
use crate::protocol::primitive::read_field_length;
use crate::protocol::value::NullBitmap;

/// Wire encoding of the rows of a result set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowProtocol {
    /// COM_QUERY: every value is a length-encoded string, NULL is `0xFB`
    Text,
    /// COM_STMT_EXECUTE: `0x00` header, NULL bitmap, native encodings
    Binary,
}

/// Position from which a column walk continues
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResumePoint {
    /// First column that has not been walked yet
    pub column: usize,
    /// Byte offset in the row where that column starts
    pub offset: usize,
}

/// Byte range of one non-NULL value inside a row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedSlice {
    pub column: usize,
    pub offset: usize,
    pub length: usize,
}

impl DecodedSlice {
    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    pub fn bytes<'a>(&self, row: &'a [u8]) -> &'a [u8] {
        row.get(self.offset..self.end()).unwrap_or_default()
    }
}

/// Result of locating a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Located {
    Null { column: usize, end: usize },
    Value(DecodedSlice),
}

impl Located {
    pub fn column(&self) -> usize {
        match self {
            Self::Null { column, .. } => *column,
            Self::Value(slice) => slice.column,
        }
    }

    /// Byte offset right after this column's encoding
    pub fn end(&self) -> usize {
        match self {
            Self::Null { end, .. } => *end,
            Self::Value(slice) => slice.end(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null { .. })
    }

    pub fn slice(&self) -> Option<DecodedSlice> {
        match self {
            Self::Null { .. } => None,
            Self::Value(slice) => Some(*slice),
        }
    }

    /// Where the walk to a later column continues
    pub fn resume_point(&self) -> ResumePoint {
        ResumePoint {
            column: self.column() + 1,
            offset: self.end(),
        }
    }
}

/// Column locator for rows sharing one column array
#[derive(Debug, Clone, Copy)]
pub struct RowDecoder<'a> {
    protocol: RowProtocol,
    columns: &'a [ColumnDefinition],
}

impl<'a> RowDecoder<'a> {
    pub fn new(protocol: RowProtocol, columns: &'a [ColumnDefinition]) -> Self {
        Self { protocol, columns }
    }

    pub fn protocol(&self) -> RowProtocol {
        self.protocol
    }

    /// Resume point of column 0: after the header and NULL bitmap for binary rows
    pub fn start(&self) -> ResumePoint {
        let offset = match self.protocol {
            RowProtocol::Text => 0,
            RowProtocol::Binary => 1 + NullBitmap::result_set_len(self.columns.len()),
        };
        ResumePoint { column: 0, offset }
    }

    /// Locate `column` (0-based) in `row`, walking from `resume`.
    ///
    /// `row` is the whole row frame, including the binary `0x00` header. A row
    /// shorter than its own encoding claims fails with `Error::UnexpectedEof`.
    pub fn locate(&self, row: &[u8], column: usize, resume: ResumePoint) -> Result<Located> {
        if column >= self.columns.len() {
            return Err(Error::InvalidParameter(format!(
                "No such column: {}",
                column + 1
            )));
        }
        if resume.column > column {
            return Err(Error::LibraryBug(eyre!(
                "resume point at column {} is past target column {}",
                resume.column,
                column
            )));
        }
        let start = self.start();
        if resume.offset < start.offset || resume.offset > row.len() {
            return Err(Error::UnexpectedEof);
        }

        let bitmap = match self.protocol {
            RowProtocol::Text => None,
            RowProtocol::Binary => {
                let bitmap = row.get(1..start.offset).ok_or(Error::UnexpectedEof)?;
                Some(NullBitmap::for_result_set(bitmap))
            }
        };

        let mut offset = resume.offset;
        for idx in resume.column..column {
            offset = self.step(row, idx, offset, bitmap)?.end();
        }
        self.step(row, column, offset, bitmap)
    }

    fn step(
        &self,
        row: &[u8],
        column: usize,
        offset: usize,
        bitmap: Option<NullBitmap<'_>>,
    ) -> Result<Located> {
        let width = match bitmap {
            None => BinaryWidth::LengthEncoded,
            Some(bitmap) if bitmap.is_null(column) => {
                return Ok(Located::Null {
                    column,
                    end: offset,
                });
            }
            Some(_) => self.columns[column].column_type.binary_width(),
        };

        match width {
            BinaryWidth::Absent => Ok(Located::Null {
                column,
                end: offset,
            }),
            BinaryWidth::Fixed(length) => {
                if offset + length > row.len() {
                    return Err(Error::UnexpectedEof);
                }
                Ok(Located::Value(DecodedSlice {
                    column,
                    offset,
                    length,
                }))
            }
            BinaryWidth::LengthEncoded => {
                let data = row.get(offset..).ok_or(Error::UnexpectedEof)?;
                let (length, rest) = read_field_length(data)?;
                let value_offset = offset + (data.len() - rest.len());
                match length {
                    None => Ok(Located::Null {
                        column,
                        end: value_offset,
                    }),
                    Some(length) if length > rest.len() => Err(Error::UnexpectedEof),
                    Some(length) => Ok(Located::Value(DecodedSlice {
                        column,
                        offset: value_offset,
                        length,
                    })),
                }
            }
        }
    }
}
