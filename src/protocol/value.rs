//! Binary protocol wire layouts for temporal values and the row NULL bitmap
use zerocopy::byteorder::little_endian::{U16 as U16LE, U32 as U32LE};
use zerocopy::{FromBytes, Immutable, KnownLayout};

/// DATE/DATETIME/TIMESTAMP - 4 bytes (ymd)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
pub struct Timestamp4 {
    pub year: U16LE,
    pub month: u8,
    pub day: u8,
}

/// DATE/DATETIME/TIMESTAMP - 7 bytes (ymd + hms)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
pub struct Timestamp7 {
    pub year: U16LE,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

/// DATE/DATETIME/TIMESTAMP - 11 bytes (ymd + hms + microseconds)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
pub struct Timestamp11 {
    pub year: U16LE,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub microsecond: U32LE,
}

/// TIME - 8 bytes: is_negative (1), days (4 LE), hour, minute, second
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
pub struct Time8 {
    pub is_negative: u8,
    pub days: U32LE,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

/// TIME - 12 bytes: `Time8` followed by microsecond (4 LE)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
pub struct Time12 {
    pub is_negative: u8,
    pub days: U32LE,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub microsecond: U32LE,
}

/// NULL bitmap of a binary row
///
/// Result set rows reserve the 2 leading bits, so column `i` lives at bit `i + 2`.
#[derive(Debug, Clone, Copy)]
pub struct NullBitmap<'a> {
    bitmap: &'a [u8],
    offset: usize,
}

impl<'a> NullBitmap<'a> {
    /// Bitmap length in bytes for a row of `num_columns`
    pub const fn result_set_len(num_columns: usize) -> usize {
        (num_columns + 7 + 2) >> 3
    }

    pub fn for_result_set(bitmap: &'a [u8]) -> Self {
        Self { bitmap, offset: 2 }
    }

    pub fn is_null(&self, idx: usize) -> bool {
        let bit_pos = idx + self.offset;
        let byte_pos = bit_pos >> 3;
        let bit_offset = bit_pos & 7;

        match self.bitmap.get(byte_pos) {
            Some(byte) => (byte & (1 << bit_offset)) != 0,
            None => false,
        }
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.bitmap
    }
}
