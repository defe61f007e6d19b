use pretty_assertions::assert_eq;

use crate::value::{
    Date, Time, Timestamp, Value, extract_nanos, is_zero_date_text, parse_date, parse_time,
    parse_timestamp,
};

#[test]
fn extract_nanos_pads_and_truncates() {
    assert_eq!(extract_nanos(""), Some(0));
    assert_eq!(extract_nanos("5"), Some(500_000_000));
    assert_eq!(extract_nanos("123456"), Some(123_456_000));
    assert_eq!(extract_nanos("123456789"), Some(123_456_789));
    assert_eq!(extract_nanos("1234567891"), Some(123_456_789));
    // only the first 9 characters are inspected
    assert_eq!(extract_nanos("123456789x"), Some(123_456_789));
    assert_eq!(extract_nanos("12a"), None);
}

#[test]
fn parse_date_text() {
    assert_eq!(parse_date("2024-02-29"), Some(Date::new(2024, 2, 29)));
    assert_eq!(parse_date("2024-02-29 10:00:00"), Some(Date::new(2024, 2, 29)));
    assert_eq!(parse_date("0000-00-00"), Some(Date::new(0, 0, 0)));
    assert_eq!(parse_date("2024-2-29"), None);
    assert_eq!(parse_date("20240229xx"), None);
    assert_eq!(parse_date("2024"), None);
}

#[test]
fn parse_time_text() {
    assert_eq!(
        parse_time("838:59:59"),
        Some(Time {
            negative: false,
            hours: 838,
            minute: 59,
            second: 59,
            nanosecond: 0,
        })
    );
    assert_eq!(
        parse_time("-01:02:03.5"),
        Some(Time {
            negative: true,
            hours: 1,
            minute: 2,
            second: 3,
            nanosecond: 500_000_000,
        })
    );
    assert_eq!(parse_time("10:00"), None);
    assert_eq!(parse_time("10:00:00.x"), None);
}

#[test]
fn parse_timestamp_text() {
    let ts = parse_timestamp("2023-12-31 23:59:58.000001").unwrap();
    assert_eq!(ts, Date::new(2023, 12, 31).at(23, 59, 58, 1_000));
    assert_eq!(
        parse_timestamp("2023-12-31T01:02:03"),
        Some(Date::new(2023, 12, 31).at(1, 2, 3, 0))
    );
    assert_eq!(
        parse_timestamp("2023-12-31"),
        Some(Date::new(2023, 12, 31).at(0, 0, 0, 0))
    );
    assert_eq!(parse_timestamp("2023-12-31 24:00:00"), None);
    assert_eq!(parse_timestamp("2023-12-31_01:02:03"), None);
}

#[test]
fn zero_date_detection() {
    assert!(is_zero_date_text("0000-00-00"));
    assert!(is_zero_date_text("0000-00-00 00:00:00"));
    assert!(!is_zero_date_text("0001-01-01"));
    assert!(Date::default().is_zero());
    assert!(Timestamp::default().is_zero());
}

#[test]
fn display_formats() {
    assert_eq!(Date::new(7, 3, 9).to_string(), "0007-03-09");
    assert_eq!(
        Date::new(2020, 1, 2).at(3, 4, 5, 0).to_string(),
        "2020-01-02 03:04:05"
    );
    assert_eq!(
        Date::new(2020, 1, 2).at(3, 4, 5, 120_000).to_string(),
        "2020-01-02 03:04:05.000120"
    );
    assert_eq!(
        Date::new(2020, 1, 2).at(3, 4, 5, 123_456_789).to_string(),
        "2020-01-02 03:04:05.123456789"
    );
    let time = Time {
        negative: true,
        hours: 49,
        minute: 0,
        second: 1,
        nanosecond: 250_000_000,
    };
    assert_eq!(time.to_string(), "-49:00:01.250000");
    assert_eq!(Value::Null.to_string(), "NULL");
    assert_eq!(Value::Bytes(b"ab".to_vec()).to_string(), "ab");
}

#[test]
fn epoch_conversions() {
    let epoch = Date::new(1970, 1, 1).at(0, 0, 0, 0);
    assert_eq!(epoch.to_unix_seconds(0), Some(0));
    assert_eq!(Date::new(1969, 12, 31).at(23, 59, 59, 0).to_unix_seconds(0), Some(-1));
    assert_eq!(Date::new(2000, 3, 1).at(0, 0, 0, 0).to_unix_seconds(0), Some(951_868_800));
    assert_eq!(
        Timestamp::from_unix_seconds(951_868_799, 0, 0),
        Some(Date::new(2000, 2, 29).at(23, 59, 59, 0))
    );

    let ts = Date::new(2021, 6, 15).at(12, 30, 0, 500_000);
    assert_eq!(ts.to_unix_seconds(0), Some(1_623_760_200));
    assert_eq!(ts.to_unix_seconds(3600), Some(1_623_756_600));
    assert_eq!(ts.to_unix_micros(0), Some(1_623_760_200_000_500));
    assert_eq!(Timestamp::from_unix_seconds(1_623_760_200, 500_000, 0), Some(ts));
    assert_eq!(Timestamp::from_unix_seconds(1_623_756_600, 500_000, 3600), Some(ts));

    // fields outside the calendar have no instant
    assert_eq!(Date::new(2021, 2, 30).at(0, 0, 0, 0).to_unix_seconds(0), None);
    assert_eq!(Timestamp::default().to_unix_seconds(0), None);
    assert_eq!(Timestamp::from_unix_seconds(i64::MAX, 0, 1), None);
}

#[test]
fn time_totals() {
    let time = Time {
        negative: true,
        hours: 25,
        minute: 1,
        second: 2,
        nanosecond: 3,
    };
    assert_eq!(time.total_seconds(), -(25 * 3600 + 62));
    assert_eq!(time.total_nanos(), -((25 * 3600 + 62) * 1_000_000_000 + 3));
}

#[test]
fn chrono_conversions() {
    let ts = Date::new(2021, 6, 15).at(12, 30, 0, 500_000);
    let naive = chrono::NaiveDateTime::try_from(ts).unwrap();
    assert_eq!(Timestamp::from(naive), ts);
    assert!(chrono::NaiveDate::try_from(Date::default()).is_err());
    let long = Time {
        negative: false,
        hours: 30,
        minute: 0,
        second: 0,
        nanosecond: 0,
    };
    assert!(chrono::NaiveTime::try_from(long).is_err());
    assert_eq!(chrono::TimeDelta::from(long).num_hours(), 30);
}
