//! Typed conversion of one located column.
//!
//! A [`Cell`] is the byte slice of a single non-NULL value together with its
//! column metadata and the row encoding. [`FromCell`] turns it into a Rust
//! value. Conversions never touch the cursor: a failed conversion is reported
//! to the caller and the row stays readable.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rust_decimal::Decimal;
use simdutf8::basic::from_utf8;
use smart_default::SmartDefault;
use zerocopy::FromBytes;

use crate::col::ColumnDefinition;
use crate::constant::ColumnType;
use crate::error::{Error, Result};
use crate::protocol::row::{Located, RowProtocol};
use crate::protocol::value::{Time8, Time12, Timestamp4, Timestamp7, Timestamp11};
use crate::value::{
    Date, Time, Timestamp, Value, is_zero_date_text, parse_date, parse_time, parse_timestamp,
};

/// Session-level compatibility flags applied to every conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, SmartDefault)]
pub struct MaterializeOptions {
    /// BIT(1) and TINYINT(1) read as `Value::Bool`
    #[default = true]
    pub tiny_int1_is_bit: bool,
    /// YEAR read as a `Date` (January 1st) instead of a number
    #[default = true]
    pub year_is_date_type: bool,
    /// Offset of the session time zone from UTC, used for instants
    pub session_time_offset_secs: i32,
}

/// One non-NULL column value of the current row
#[derive(Debug, Clone, Copy)]
pub struct Cell<'a> {
    pub column: &'a ColumnDefinition,
    pub bytes: &'a [u8],
    pub protocol: RowProtocol,
    pub options: &'a MaterializeOptions,
}

/// Conversion from a column value.
///
/// `Ok(None)` is returned for values that read as SQL NULL even though the row
/// does not mark them NULL, such as the all-zero date.
pub trait FromCell: Sized {
    fn from_cell(cell: &Cell<'_>) -> Result<Option<Self>>;
}

/// Materialize `located` from `row`; NULL columns yield `Ok(None)` without calling `T`
pub fn materialize<T: FromCell>(
    row: &[u8],
    located: &Located,
    column: &ColumnDefinition,
    protocol: RowProtocol,
    options: &MaterializeOptions,
) -> Result<Option<T>> {
    match located.slice() {
        None => Ok(None),
        Some(slice) => T::from_cell(&Cell {
            column,
            bytes: slice.bytes(row),
            protocol,
            options,
        }),
    }
}

/// A value in the form its column type carries on the wire
#[derive(Debug, Clone, Copy, PartialEq)]
enum Native<'a> {
    Int(i128),
    Float(f64),
    Text(&'a str),
    Opaque(&'a [u8]),
}

impl<'a> Cell<'a> {
    pub fn name(&self) -> &str {
        &self.column.name
    }

    pub fn column_type(&self) -> ColumnType {
        self.column.column_type
    }

    pub fn is_binary_protocol(&self) -> bool {
        self.protocol == RowProtocol::Binary
    }

    /// The value as UTF-8 text
    pub fn text(&self, target: &'static str) -> Result<&'a str> {
        from_utf8(self.bytes).map_err(|_| self.unparsable(target))
    }

    fn lossy(&self) -> String {
        String::from_utf8_lossy(self.bytes).into_owned()
    }

    fn unparsable(&self, target: &'static str) -> Error {
        Error::unparsable(self.name(), String::from_utf8_lossy(self.bytes), target)
    }

    fn fixed<const N: usize>(&self) -> Result<[u8; N]> {
        <[u8; N]>::try_from(self.bytes).map_err(|_| Error::InvalidPacket)
    }

    fn text_or_opaque(&self) -> Native<'a> {
        match from_utf8(self.bytes) {
            Ok(text) => Native::Text(text),
            Err(_) => Native::Opaque(self.bytes),
        }
    }

    fn native(&self, target: &'static str) -> Result<Native<'a>> {
        let signed = self.column.is_signed();
        if self.column_type() == ColumnType::MYSQL_TYPE_BIT {
            return Ok(Native::Int(bit_value(self.bytes)));
        }
        match self.protocol {
            RowProtocol::Text => match self.column_type() {
                ColumnType::MYSQL_TYPE_FLOAT | ColumnType::MYSQL_TYPE_DOUBLE => {
                    let text = self.text(target)?;
                    text.trim()
                        .parse::<f64>()
                        .map(Native::Float)
                        .map_err(|_| self.unparsable(target))
                }
                _ => Ok(self.text_or_opaque()),
            },
            RowProtocol::Binary => Ok(match self.column_type() {
                ColumnType::MYSQL_TYPE_TINY => {
                    let [b] = self.fixed::<1>()?;
                    Native::Int(if signed { b as i8 as i128 } else { b as i128 })
                }
                ColumnType::MYSQL_TYPE_SHORT | ColumnType::MYSQL_TYPE_YEAR => {
                    let b = self.fixed::<2>()?;
                    Native::Int(if signed {
                        i16::from_le_bytes(b) as i128
                    } else {
                        u16::from_le_bytes(b) as i128
                    })
                }
                ColumnType::MYSQL_TYPE_LONG | ColumnType::MYSQL_TYPE_INT24 => {
                    let b = self.fixed::<4>()?;
                    Native::Int(if signed {
                        i32::from_le_bytes(b) as i128
                    } else {
                        u32::from_le_bytes(b) as i128
                    })
                }
                ColumnType::MYSQL_TYPE_LONGLONG => {
                    let b = self.fixed::<8>()?;
                    Native::Int(if signed {
                        i64::from_le_bytes(b) as i128
                    } else {
                        u64::from_le_bytes(b) as i128
                    })
                }
                ColumnType::MYSQL_TYPE_FLOAT => {
                    Native::Float(f32::from_le_bytes(self.fixed::<4>()?) as f64)
                }
                ColumnType::MYSQL_TYPE_DOUBLE => {
                    Native::Float(f64::from_le_bytes(self.fixed::<8>()?))
                }
                ty if ty.is_temporal() || ty.is_time() => Native::Opaque(self.bytes),
                _ => self.text_or_opaque(),
            }),
        }
    }

    /// Year of a YEAR column, with the two-digit YEAR(2) window applied
    fn year(&self) -> Result<u16> {
        let (year, two_digit) = match self.native("Date")? {
            Native::Int(year) => (year, self.column.column_length == 2),
            Native::Text(text) => (
                text.parse::<i128>().map_err(|_| self.unparsable("Date"))?,
                self.bytes.len() == 2 && self.column.column_length == 2,
            ),
            _ => return Err(self.unparsable("Date")),
        };
        let year = match (two_digit, year) {
            (true, y) if y <= 69 => y + 2000,
            (true, y) => y + 1900,
            (false, y) => y,
        };
        u16::try_from(year).map_err(|_| Error::out_of_range(self.name(), year, "Date"))
    }

    /// All-zero text temporal values read as NULL
    fn is_zero_date(&self) -> bool {
        !self.is_binary_protocol()
            && (self.column_type().is_temporal() || self.column_type().is_time())
            && from_utf8(self.bytes).is_ok_and(is_zero_date_text)
    }

    fn timestamp(&self) -> Result<Option<Timestamp>> {
        if self.is_zero_date() {
            return Ok(None);
        }
        let ty = self.column_type();
        if ty == ColumnType::MYSQL_TYPE_YEAR {
            return Ok(Some(Date::new(self.year()?, 1, 1).at(0, 0, 0, 0)));
        }
        if ty.is_time() {
            let Some(time) = self.time()? else {
                return Ok(None);
            };
            return timestamp_from_time(&time)
                .map(Some)
                .ok_or_else(|| self.unparsable("Timestamp"));
        }
        if self.is_binary_protocol() && ty.is_temporal() {
            return Ok(binary_timestamp(self.bytes)?.filter(|ts| !ts.date.is_zero()));
        }
        let text = self.text("Timestamp")?;
        parse_timestamp(text)
            .map(Some)
            .ok_or_else(|| self.unparsable("Timestamp"))
    }

    fn date(&self) -> Result<Option<Date>> {
        if self.is_zero_date() {
            return Ok(None);
        }
        let ty = self.column_type();
        if ty == ColumnType::MYSQL_TYPE_YEAR {
            return Ok(Some(Date::new(self.year()?, 1, 1)));
        }
        if ty.is_time() {
            return Err(Error::Unsupported(format!(
                "Cannot read TIME column '{}' as a date",
                self.name()
            )));
        }
        if self.is_binary_protocol() && ty.is_temporal() {
            return Ok(binary_timestamp(self.bytes)?
                .map(|ts| ts.date)
                .filter(|date| !date.is_zero()));
        }
        let text = self.text("Date")?;
        parse_date(text)
            .map(Some)
            .ok_or_else(|| self.unparsable("Date"))
    }

    fn time(&self) -> Result<Option<Time>> {
        if self.is_zero_date() {
            return Ok(None);
        }
        let ty = self.column_type();
        if ty == ColumnType::MYSQL_TYPE_DATE || ty == ColumnType::MYSQL_TYPE_NEWDATE {
            return Ok(Some(Time::default()));
        }
        if self.is_binary_protocol() {
            if ty.is_time() {
                return binary_time(self.bytes).map(Some);
            }
            if ty.is_temporal() {
                return Ok(binary_timestamp(self.bytes)?.map(|ts| time_of_day(&ts)));
            }
        }
        let text = self.text("Time")?;
        if ty.is_temporal() {
            return parse_timestamp(text)
                .map(|ts| Some(time_of_day(&ts)))
                .ok_or_else(|| self.unparsable("Time"));
        }
        parse_time(text)
            .map(Some)
            .ok_or_else(|| self.unparsable("Time"))
    }
}

/// BIT values are big-endian, at most 8 bytes
fn bit_value(bytes: &[u8]) -> i128 {
    let start = bytes.len().saturating_sub(8);
    bytes[start..]
        .iter()
        .fold(0i128, |acc, b| (acc << 8) | *b as i128)
}

/// Binary DATE/DATETIME/TIMESTAMP; length 0 is the zero value and reads as NULL
fn binary_timestamp(bytes: &[u8]) -> Result<Option<Timestamp>> {
    let ts = match bytes.len() {
        0 => return Ok(None),
        4 => {
            let ts = Timestamp4::ref_from_bytes(bytes).map_err(|_| Error::InvalidPacket)?;
            Date::new(ts.year.get(), ts.month, ts.day).at(0, 0, 0, 0)
        }
        7 => {
            let ts = Timestamp7::ref_from_bytes(bytes).map_err(|_| Error::InvalidPacket)?;
            Date::new(ts.year.get(), ts.month, ts.day).at(ts.hour, ts.minute, ts.second, 0)
        }
        11 => {
            let ts = Timestamp11::ref_from_bytes(bytes).map_err(|_| Error::InvalidPacket)?;
            Date::new(ts.year.get(), ts.month, ts.day).at(
                ts.hour,
                ts.minute,
                ts.second,
                micros_to_nanos(ts.microsecond.get())?,
            )
        }
        _ => return Err(Error::InvalidPacket),
    };
    Ok(Some(ts))
}

/// Binary TIME; length 0 is `00:00:00`
fn binary_time(bytes: &[u8]) -> Result<Time> {
    let (negative, days, hour, minute, second, micros) = match bytes.len() {
        0 => return Ok(Time::default()),
        8 => {
            let t = Time8::ref_from_bytes(bytes).map_err(|_| Error::InvalidPacket)?;
            (t.is_negative, t.days.get(), t.hour, t.minute, t.second, 0)
        }
        12 => {
            let t = Time12::ref_from_bytes(bytes).map_err(|_| Error::InvalidPacket)?;
            let micros = t.microsecond.get();
            (t.is_negative, t.days.get(), t.hour, t.minute, t.second, micros)
        }
        _ => return Err(Error::InvalidPacket),
    };
    let hours = days
        .checked_mul(24)
        .and_then(|h| h.checked_add(hour as u32))
        .ok_or(Error::InvalidPacket)?;
    Ok(Time {
        negative: negative == 1,
        hours,
        minute,
        second,
        nanosecond: micros_to_nanos(micros)?,
    })
}

/// Fractional seconds travel as microseconds below one second
fn micros_to_nanos(micros: u32) -> Result<u32> {
    if micros >= 1_000_000 {
        return Err(Error::InvalidPacket);
    }
    Ok(micros * 1000)
}

fn time_of_day(ts: &Timestamp) -> Time {
    Time {
        negative: false,
        hours: ts.hour as u32,
        minute: ts.minute,
        second: ts.second,
        nanosecond: ts.nanosecond,
    }
}

/// A TIME read as a timestamp is an offset from 1970-01-01 00:00:00
fn timestamp_from_time(time: &Time) -> Option<Timestamp> {
    let nanos = time.total_nanos();
    let seconds = nanos.div_euclid(1_000_000_000) as i64;
    let nanosecond = nanos.rem_euclid(1_000_000_000) as u32;
    Timestamp::from_unix_seconds(seconds, nanosecond, 0)
}

/// Integer text, retrying `-?\d+\.0+` without its zero fraction
fn parse_integer_text(text: &str) -> Option<i128> {
    if let Ok(v) = text.parse::<i128>() {
        return Some(v);
    }
    let (integral, fraction) = text.split_once('.')?;
    let digits = integral.strip_prefix('-').unwrap_or(integral);
    if digits.is_empty()
        || !digits.bytes().all(|b| b.is_ascii_digit())
        || fraction.is_empty()
        || !fraction.bytes().all(|b| b == b'0')
    {
        return None;
    }
    integral.parse().ok()
}

fn integer<T: TryFrom<i128>>(cell: &Cell<'_>, target: &'static str) -> Result<Option<T>> {
    if cell.bytes.is_empty() && !cell.is_binary_protocol() {
        return T::try_from(0).map(Some).map_err(|_| cell.unparsable(target));
    }
    let wide = match cell.native(target)? {
        Native::Int(v) => v,
        Native::Float(f) => {
            let truncated = f.trunc();
            if !truncated.is_finite() {
                return Err(Error::out_of_range(cell.name(), f, target));
            }
            return T::try_from(truncated as i128)
                .map(Some)
                .map_err(|_| Error::out_of_range(cell.name(), f, target));
        }
        Native::Text(text) => parse_integer_text(text)
            .ok_or_else(|| Error::out_of_range(cell.name(), text, target))?,
        Native::Opaque(_) => return Err(cell.unparsable(target)),
    };
    T::try_from(wide)
        .map(Some)
        .map_err(|_| Error::out_of_range(cell.name(), wide, target))
}

fn float(cell: &Cell<'_>, target: &'static str) -> Result<Option<f64>> {
    if cell.bytes.is_empty() && !cell.is_binary_protocol() {
        return Ok(Some(0.0));
    }
    match cell.native(target)? {
        Native::Int(v) => Ok(Some(v as f64)),
        Native::Float(f) => Ok(Some(f)),
        Native::Text(text) => text
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| cell.unparsable(target)),
        Native::Opaque(_) => Err(cell.unparsable(target)),
    }
}

macro_rules! impl_from_cell_integer {
    ($($ty:ty => $target:literal),* $(,)?) => {
        $(
            impl FromCell for $ty {
                fn from_cell(cell: &Cell<'_>) -> Result<Option<Self>> {
                    integer(cell, $target)
                }
            }
        )*
    };
}

impl_from_cell_integer! {
    i8 => "Byte",
    i16 => "Short",
    i32 => "Integer",
    i64 => "Long",
    i128 => "BigInteger",
    u8 => "UnsignedByte",
    u16 => "UnsignedShort",
    u32 => "UnsignedInteger",
    u64 => "UnsignedLong",
}

impl FromCell for f64 {
    fn from_cell(cell: &Cell<'_>) -> Result<Option<Self>> {
        float(cell, "Double")
    }
}

impl FromCell for f32 {
    fn from_cell(cell: &Cell<'_>) -> Result<Option<Self>> {
        if cell.is_binary_protocol() && cell.column_type() == ColumnType::MYSQL_TYPE_FLOAT {
            return Ok(Some(f32::from_le_bytes(cell.fixed::<4>()?)));
        }
        Ok(float(cell, "Float")?.map(|v| v as f32))
    }
}

impl FromCell for bool {
    fn from_cell(cell: &Cell<'_>) -> Result<Option<Self>> {
        fn text_truth(bytes: &[u8]) -> bool {
            !(bytes.is_empty() || bytes == b"\0" || bytes == b"0" || bytes == b"false")
        }
        if !cell.is_binary_protocol() {
            return Ok(Some(text_truth(cell.bytes)));
        }
        Ok(Some(match cell.native("Boolean")? {
            Native::Int(v) => v != 0,
            Native::Float(f) => f != 0.0,
            Native::Text(_) | Native::Opaque(_) => text_truth(cell.bytes),
        }))
    }
}

impl FromCell for Decimal {
    fn from_cell(cell: &Cell<'_>) -> Result<Option<Self>> {
        if cell.bytes.is_empty() && !cell.is_binary_protocol() {
            return Ok(None);
        }
        match cell.native("BigDecimal")? {
            Native::Int(v) => Decimal::try_from_i128_with_scale(v, 0)
                .map(Some)
                .map_err(|_| Error::out_of_range(cell.name(), v, "BigDecimal")),
            Native::Float(f) => Decimal::try_from(f)
                .map(Some)
                .map_err(|_| Error::out_of_range(cell.name(), f, "BigDecimal")),
            Native::Text(text) => {
                let text = text.trim();
                text.parse::<Decimal>()
                    .or_else(|_| Decimal::from_scientific(text))
                    .map(Some)
                    .map_err(|_| cell.unparsable("BigDecimal"))
            }
            Native::Opaque(_) => Err(cell.unparsable("BigDecimal")),
        }
    }
}

impl FromCell for Vec<u8> {
    fn from_cell(cell: &Cell<'_>) -> Result<Option<Self>> {
        Ok(Some(cell.bytes.to_vec()))
    }
}

impl FromCell for String {
    fn from_cell(cell: &Cell<'_>) -> Result<Option<Self>> {
        let ty = cell.column_type();
        let options = cell.options;
        if ty == ColumnType::MYSQL_TYPE_BIT
            && options.tiny_int1_is_bit
            && cell.column.column_length == 1
        {
            let set = cell.bytes.iter().any(|b| *b != 0);
            return Ok(Some(if set { "1" } else { "0" }.to_string()));
        }
        if ty == ColumnType::MYSQL_TYPE_YEAR && options.year_is_date_type {
            return Ok(cell.date()?.map(|date| date.to_string()));
        }
        if cell.is_zero_date() {
            return Ok(None);
        }
        if !cell.is_binary_protocol() {
            return Ok(Some(cell.lossy()));
        }

        if ty.is_time() {
            let time = binary_time(cell.bytes)?;
            let mut out = time.to_string();
            if time.nanosecond == 0 && cell.column.decimals > 0 && cell.column.decimals <= 6 {
                out.push('.');
                out.extend(std::iter::repeat_n('0', cell.column.decimals as usize));
            }
            return Ok(Some(out));
        }
        if ty.is_temporal() {
            return Ok(binary_timestamp(cell.bytes)?
                .filter(|ts| !ts.date.is_zero())
                .map(|ts| match ty {
                    ColumnType::MYSQL_TYPE_DATE | ColumnType::MYSQL_TYPE_NEWDATE => {
                        ts.date.to_string()
                    }
                    _ => ts.to_string(),
                }));
        }
        Ok(Some(match cell.native("String")? {
            Native::Int(v) => v.to_string(),
            Native::Float(f) if ty == ColumnType::MYSQL_TYPE_FLOAT => (f as f32).to_string(),
            Native::Float(f) => f.to_string(),
            Native::Text(text) => text.to_string(),
            Native::Opaque(_) => cell.lossy(),
        }))
    }
}

impl FromCell for Date {
    fn from_cell(cell: &Cell<'_>) -> Result<Option<Self>> {
        cell.date()
    }
}

impl FromCell for Time {
    fn from_cell(cell: &Cell<'_>) -> Result<Option<Self>> {
        cell.time()
    }
}

impl FromCell for Timestamp {
    fn from_cell(cell: &Cell<'_>) -> Result<Option<Self>> {
        cell.timestamp()
    }
}

/// Instant of a temporal value interpreted in the session time zone
impl FromCell for SystemTime {
    fn from_cell(cell: &Cell<'_>) -> Result<Option<Self>> {
        let Some(ts) = cell.timestamp()? else {
            return Ok(None);
        };
        let seconds = ts
            .to_unix_seconds(cell.options.session_time_offset_secs)
            .ok_or_else(|| Error::out_of_range(cell.name(), ts, "SystemTime"))?;
        let instant = if seconds >= 0 {
            UNIX_EPOCH.checked_add(Duration::new(seconds as u64, ts.nanosecond))
        } else {
            UNIX_EPOCH
                .checked_sub(Duration::from_secs(seconds.unsigned_abs()))
                .and_then(|t| t.checked_add(Duration::from_nanos(ts.nanosecond as u64)))
        };
        instant
            .map(Some)
            .ok_or_else(|| Error::out_of_range(cell.name(), ts, "SystemTime"))
    }
}

impl FromCell for Value {
    fn from_cell(cell: &Cell<'_>) -> Result<Option<Self>> {
        let column = cell.column;
        let options = cell.options;
        let bit_like = options.tiny_int1_is_bit && column.column_length == 1;
        let value = match column.column_type {
            ColumnType::MYSQL_TYPE_NULL => Value::Null,
            ColumnType::MYSQL_TYPE_BIT if bit_like => {
                Value::Bool(cell.bytes.iter().any(|b| *b != 0))
            }
            ColumnType::MYSQL_TYPE_BIT => Value::Bytes(cell.bytes.to_vec()),
            ColumnType::MYSQL_TYPE_TINY if bit_like => match cell.protocol {
                RowProtocol::Text => Value::Bool(cell.bytes.first() != Some(&b'0')),
                RowProtocol::Binary => Value::Bool(cell.bytes.first() != Some(&0)),
            },
            ColumnType::MYSQL_TYPE_TINY
            | ColumnType::MYSQL_TYPE_SHORT
            | ColumnType::MYSQL_TYPE_INT24 => lift(i32::from_cell(cell)?, Value::Int),
            ColumnType::MYSQL_TYPE_LONG if column.is_signed() => {
                lift(i32::from_cell(cell)?, Value::Int)
            }
            ColumnType::MYSQL_TYPE_LONG => lift(i64::from_cell(cell)?, Value::Long),
            ColumnType::MYSQL_TYPE_LONGLONG if column.is_signed() => {
                lift(i64::from_cell(cell)?, Value::Long)
            }
            ColumnType::MYSQL_TYPE_LONGLONG => lift(i128::from_cell(cell)?, Value::BigInteger),
            ColumnType::MYSQL_TYPE_FLOAT => lift(f32::from_cell(cell)?, Value::Float),
            ColumnType::MYSQL_TYPE_DOUBLE => lift(f64::from_cell(cell)?, Value::Double),
            ColumnType::MYSQL_TYPE_NEWDECIMAL => lift(Decimal::from_cell(cell)?, Value::Decimal),
            ColumnType::MYSQL_TYPE_YEAR if options.year_is_date_type => {
                lift(cell.date()?, Value::Date)
            }
            ColumnType::MYSQL_TYPE_YEAR => lift(i16::from_cell(cell)?, Value::Short),
            ColumnType::MYSQL_TYPE_DATE | ColumnType::MYSQL_TYPE_NEWDATE => {
                lift(cell.date()?, Value::Date)
            }
            ColumnType::MYSQL_TYPE_TIME | ColumnType::MYSQL_TYPE_TIME2 => {
                lift(cell.time()?, Value::Time)
            }
            ColumnType::MYSQL_TYPE_TIMESTAMP
            | ColumnType::MYSQL_TYPE_TIMESTAMP2
            | ColumnType::MYSQL_TYPE_DATETIME
            | ColumnType::MYSQL_TYPE_DATETIME2 => lift(cell.timestamp()?, Value::Timestamp),
            ColumnType::MYSQL_TYPE_GEOMETRY | ColumnType::MYSQL_TYPE_TYPED_ARRAY => {
                Value::Bytes(cell.bytes.to_vec())
            }
            ColumnType::MYSQL_TYPE_DECIMAL
            | ColumnType::MYSQL_TYPE_VARCHAR
            | ColumnType::MYSQL_TYPE_VAR_STRING
            | ColumnType::MYSQL_TYPE_STRING
            | ColumnType::MYSQL_TYPE_ENUM
            | ColumnType::MYSQL_TYPE_SET
            | ColumnType::MYSQL_TYPE_JSON
            | ColumnType::MYSQL_TYPE_TINY_BLOB
            | ColumnType::MYSQL_TYPE_MEDIUM_BLOB
            | ColumnType::MYSQL_TYPE_LONG_BLOB
            | ColumnType::MYSQL_TYPE_BLOB => {
                if column.is_binary() {
                    Value::Bytes(cell.bytes.to_vec())
                } else {
                    Value::String(cell.lossy())
                }
            }
        };
        Ok(Some(value))
    }
}

fn lift<T>(value: Option<T>, variant: impl FnOnce(T) -> Value) -> Value {
    value.map_or(Value::Null, variant)
}
