//! Owned column values and the temporal types the materializer produces
use std::fmt;

use rust_decimal::Decimal;

/// Calendar date as sent by the server; `0000-00-00` is representable
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Date {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

/// Signed duration in hours/minutes/seconds; MySQL TIME spans `-838:59:59` to `838:59:59`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Time {
    pub negative: bool,
    /// Days already folded in
    pub hours: u32,
    pub minute: u8,
    pub second: u8,
    pub nanosecond: u32,
}

/// Local date-time without zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp {
    pub date: Date,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub nanosecond: u32,
}

/// A materialized column value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Short(i16),
    Int(i32),
    Long(i64),
    /// Unsigned BIGINT, widened so `u64::MAX` stays positive
    BigInteger(i128),
    Float(f32),
    Double(f64),
    Decimal(Decimal),
    Date(Date),
    Time(Time),
    Timestamp(Timestamp),
    String(String),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

const NANOS_PER_SECOND: i64 = 1_000_000_000;

impl Date {
    pub const fn new(year: u16, month: u8, day: u8) -> Self {
        Self { year, month, day }
    }

    pub fn is_zero(&self) -> bool {
        self.year == 0 && self.month == 0 && self.day == 0
    }

    pub fn at(self, hour: u8, minute: u8, second: u8, nanosecond: u32) -> Timestamp {
        Timestamp {
            date: self,
            hour,
            minute,
            second,
            nanosecond,
        }
    }
}

impl Time {
    pub fn total_seconds(&self) -> i64 {
        let seconds =
            self.hours as i64 * 3600 + self.minute as i64 * 60 + self.second as i64;
        if self.negative { -seconds } else { seconds }
    }

    pub fn total_nanos(&self) -> i128 {
        let nanos = (self.hours as i128 * 3600 + self.minute as i128 * 60 + self.second as i128)
            * NANOS_PER_SECOND as i128
            + self.nanosecond as i128;
        if self.negative { -nanos } else { nanos }
    }
}

impl Timestamp {
    pub fn is_zero(&self) -> bool {
        self.date.is_zero()
            && self.hour == 0
            && self.minute == 0
            && self.second == 0
            && self.nanosecond == 0
    }

    /// Seconds since the epoch, treating this value as local time at
    /// `utc_offset_secs`; `None` when the fields are not a calendar date-time
    pub fn to_unix_seconds(&self, utc_offset_secs: i32) -> Option<i64> {
        let local = chrono::NaiveDateTime::try_from(*self).ok()?;
        local
            .and_utc()
            .timestamp()
            .checked_sub(i64::from(utc_offset_secs))
    }

    pub fn to_unix_micros(&self, utc_offset_secs: i32) -> Option<i64> {
        self.to_unix_seconds(utc_offset_secs)?
            .checked_mul(1_000_000)?
            .checked_add(i64::from(self.nanosecond / 1000))
    }

    /// Inverse of [`Timestamp::to_unix_seconds`]
    pub fn from_unix_seconds(seconds: i64, nanosecond: u32, utc_offset_secs: i32) -> Option<Self> {
        let local = seconds.checked_add(i64::from(utc_offset_secs))?;
        let utc = chrono::DateTime::from_timestamp(local, nanosecond)?;
        Some(Self::from(utc.naive_utc()))
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            f.write_str("-")?;
        }
        write!(f, "{:02}:{:02}:{:02}", self.hours, self.minute, self.second)?;
        write_fraction(f, self.nanosecond)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:02}:{:02}:{:02}",
            self.date, self.hour, self.minute, self.second
        )?;
        write_fraction(f, self.nanosecond)
    }
}

/// Microseconds with 6 digits; full nanoseconds only when they carry sub-micro digits
fn write_fraction(f: &mut fmt::Formatter<'_>, nanosecond: u32) -> fmt::Result {
    if nanosecond == 0 {
        Ok(())
    } else if nanosecond % 1000 == 0 {
        write!(f, ".{:06}", nanosecond / 1000)
    } else {
        write!(f, ".{:09}", nanosecond)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Short(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}", v),
            Value::BigInteger(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Decimal(v) => write!(f, "{}", v),
            Value::Date(v) => write!(f, "{}", v),
            Value::Time(v) => write!(f, "{}", v),
            Value::Timestamp(v) => write!(f, "{}", v),
            Value::String(v) => f.write_str(v),
            Value::Bytes(v) => f.write_str(&String::from_utf8_lossy(v)),
        }
    }
}

fn parse_digits<T: std::str::FromStr>(s: &str) -> Option<T> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Fractional seconds: the first 9 digits after `.` as nanoseconds, right-padded with zeros.
///
/// Digits past the 9th are dropped without being inspected. Returns `None` when
/// one of the inspected characters is not a digit.
pub fn extract_nanos(fraction: &str) -> Option<u32> {
    let mut nanos = 0u32;
    let mut digits = fraction.bytes();
    for _ in 0..9 {
        let digit = match digits.next() {
            None => 0,
            Some(b) if b.is_ascii_digit() => (b - b'0') as u32,
            Some(_) => return None,
        };
        nanos = nanos * 10 + digit;
    }
    Some(nanos)
}

/// `YYYY-MM-DD`, ignoring anything after the 10th character
pub fn parse_date(s: &str) -> Option<Date> {
    let head = s.get(..10)?;
    let mut parts = head.split('-');
    let year = parse_digits(parts.next()?)?;
    let month = parse_digits(parts.next()?)?;
    let day = parse_digits(parts.next()?)?;
    if parts.next().is_some() {
        return None;
    }
    Some(Date { year, month, day })
}

/// `[-]H+:MM:SS[.fraction]`
pub fn parse_time(s: &str) -> Option<Time> {
    let (negative, rest) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let (clock, nanosecond) = match rest.split_once('.') {
        Some((clock, fraction)) => (clock, extract_nanos(fraction)?),
        None => (rest, 0),
    };
    let mut parts = clock.split(':');
    let hours = parse_digits(parts.next()?)?;
    let minute = parse_digits(parts.next()?)?;
    let second = parse_digits(parts.next()?)?;
    if parts.next().is_some() {
        return None;
    }
    Some(Time {
        negative,
        hours,
        minute,
        second,
        nanosecond,
    })
}

/// `YYYY-MM-DD[( |T)HH:MM:SS[.fraction]]`
pub fn parse_timestamp(s: &str) -> Option<Timestamp> {
    let date = parse_date(s)?;
    let rest = &s[10..];
    if rest.is_empty() {
        return Some(date.at(0, 0, 0, 0));
    }
    let clock = rest.strip_prefix([' ', 'T'])?;
    let time = parse_time(clock)?;
    if time.negative || time.hours > 23 {
        return None;
    }
    Some(date.at(
        time.hours as u8,
        time.minute,
        time.second,
        time.nanosecond,
    ))
}

/// Whether a text temporal value carries the all-zero date
pub fn is_zero_date_text(s: &str) -> bool {
    s.starts_with("0000-00-00")
}

mod chrono_impl {
    use super::{Date, Time, Timestamp};
    use crate::error::{Error, Result};

    impl TryFrom<Date> for chrono::NaiveDate {
        type Error = Error;

        fn try_from(date: Date) -> Result<Self> {
            chrono::NaiveDate::from_ymd_opt(date.year as i32, date.month as u32, date.day as u32)
                .ok_or_else(|| Error::out_of_range("", date, "NaiveDate"))
        }
    }

    impl TryFrom<Timestamp> for chrono::NaiveDateTime {
        type Error = Error;

        fn try_from(ts: Timestamp) -> Result<Self> {
            let date = chrono::NaiveDate::try_from(ts.date)?;
            let time = chrono::NaiveTime::from_hms_nano_opt(
                ts.hour as u32,
                ts.minute as u32,
                ts.second as u32,
                ts.nanosecond,
            )
            .ok_or_else(|| Error::out_of_range("", ts, "NaiveDateTime"))?;
            Ok(chrono::NaiveDateTime::new(date, time))
        }
    }

    impl TryFrom<Time> for chrono::NaiveTime {
        type Error = Error;

        fn try_from(time: Time) -> Result<Self> {
            if time.negative || time.hours > 23 {
                return Err(Error::out_of_range("", time, "NaiveTime"));
            }
            chrono::NaiveTime::from_hms_nano_opt(
                time.hours,
                time.minute as u32,
                time.second as u32,
                time.nanosecond,
            )
            .ok_or_else(|| Error::out_of_range("", time, "NaiveTime"))
        }
    }

    impl From<Time> for chrono::TimeDelta {
        fn from(time: Time) -> Self {
            let secs = time.hours as i64 * 3600 + time.minute as i64 * 60 + time.second as i64;
            let delta = chrono::TimeDelta::seconds(secs)
                + chrono::TimeDelta::nanoseconds(time.nanosecond as i64);
            if time.negative { -delta } else { delta }
        }
    }

    impl From<chrono::NaiveDate> for Date {
        fn from(date: chrono::NaiveDate) -> Self {
            use chrono::Datelike;
            Date {
                year: date.year().clamp(0, u16::MAX as i32) as u16,
                month: date.month() as u8,
                day: date.day() as u8,
            }
        }
    }

    impl From<chrono::NaiveDateTime> for Timestamp {
        fn from(dt: chrono::NaiveDateTime) -> Self {
            use chrono::Timelike;
            Date::from(dt.date()).at(
                dt.hour() as u8,
                dt.minute() as u8,
                dt.second() as u8,
                dt.nanosecond(),
            )
        }
    }
}
