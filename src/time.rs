use chrono::{DateTime, NaiveDateTime, Utc};
use std::fmt;

/// 100-nanosecond intervals between 1601-01-01 and 1970-01-01.
pub const EPOCH_DIFFERENCE_100NS: i128 = 116_444_736_000_000_000;

const TICKS_PER_SECOND: i128 = 10_000_000;

/// Correction applied to every converted timestamp.
///
/// Fitted against a reference forensic suite's rendering of the same journal
/// data, which differed by 13971 or 13972 seconds across samples. It is an
/// approximation, not a derived conversion.
pub const REFERENCE_CLOCK_CORRECTION_SECS: i64 = -13_971;

/// 0001-01-01 00:00:00 UTC in Unix seconds.
const MIN_CALENDAR_SECS: i64 = -62_135_596_800;
/// 9999-12-31 23:59:59 UTC in Unix seconds.
const MAX_CALENDAR_SECS: i64 = 253_402_300_799;

const CALENDAR_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A converted journal timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timestamp {
    /// UTC date/time, already corrected.
    Calendar(NaiveDateTime),
    /// Corrected Unix seconds that fall outside years 1..=9999.
    Raw(i64),
}

impl Timestamp {
    /// Builds a timestamp from the two 32-bit halves stored in a record.
    pub fn from_parts(low: u32, high: u32) -> Self {
        let secs = filetime_to_unix_secs(join_filetime(low, high))
            + REFERENCE_CLOCK_CORRECTION_SECS;

        if !(MIN_CALENDAR_SECS..=MAX_CALENDAR_SECS).contains(&secs) {
            return Timestamp::Raw(secs);
        }

        match DateTime::<Utc>::from_timestamp(secs, 0) {
            Some(dt) => Timestamp::Calendar(dt.naive_utc()),
            None => Timestamp::Raw(secs),
        }
    }

    pub fn is_calendar(&self) -> bool {
        matches!(self, Timestamp::Calendar(_))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timestamp::Calendar(dt) => write!(f, "{}", dt.format(CALENDAR_FORMAT)),
            Timestamp::Raw(secs) => write!(f, "{}", secs),
        }
    }
}

/// Joins the low and high halves of a FILETIME.
pub fn join_filetime(low: u32, high: u32) -> u64 {
    ((high as u64) << 32) | low as u64
}

/// Converts a FILETIME (100-nanosecond intervals since 1601-01-01 UTC) to
/// whole Unix seconds, rounding toward negative infinity.
pub fn filetime_to_unix_secs(filetime: u64) -> i64 {
    let since_unix = filetime as i128 - EPOCH_DIFFERENCE_100NS;
    // |since_unix| / 10^7 always fits in i64.
    since_unix.div_euclid(TICKS_PER_SECOND) as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn filetime_to_unix_secs_test() {
        assert_eq!(filetime_to_unix_secs(116_444_736_000_000_000), 0);
        assert_eq!(filetime_to_unix_secs(0), -11_644_473_600);
        // Half a second before the Unix epoch rounds down.
        assert_eq!(filetime_to_unix_secs(116_444_735_995_000_000), -1);
    }

    #[test]
    fn join_filetime_test() {
        assert_eq!(join_filetime(0, 0), 0);
        assert_eq!(join_filetime(0xFFFF_FFFF, 0), 0xFFFF_FFFF);
        assert_eq!(join_filetime(0x1234_5678, 0x01CA_6D2E), 0x01CA_6D2E_1234_5678);
    }

    // The expected values carry the fitted reference correction, so they are
    // 3h52m51s earlier than the true UTC instant.
    #[test]
    fn unix_epoch_is_shifted_by_reference_correction() {
        let filetime: u64 = 116_444_736_000_000_000;
        let ts = Timestamp::from_parts(filetime as u32, (filetime >> 32) as u32);

        let expected = NaiveDate::from_ymd_opt(1969, 12, 31)
            .unwrap()
            .and_hms_opt(20, 7, 9)
            .unwrap();
        assert_eq!(ts, Timestamp::Calendar(expected));
        assert_eq!(ts.to_string(), "1969-12-31 20:07:09");
    }

    #[test]
    fn known_date_round_trip() {
        // 2020-01-01 00:00:00 UTC
        let filetime: u64 = 132_223_104_000_000_000;
        let ts = Timestamp::from_parts(filetime as u32, (filetime >> 32) as u32);
        assert_eq!(ts.to_string(), "2019-12-31 20:07:09");
    }

    #[test]
    fn zero_timestamp_produces_a_value() {
        let ts = Timestamp::from_parts(0, 0);
        assert!(ts.is_calendar());
        assert_eq!(ts.to_string(), "1600-12-31 20:07:09");
    }

    #[test]
    fn out_of_range_falls_back_to_raw() {
        let ts = Timestamp::from_parts(u32::MAX, u32::MAX);
        let expected = filetime_to_unix_secs(u64::MAX) + REFERENCE_CLOCK_CORRECTION_SECS;
        assert_eq!(ts, Timestamp::Raw(expected));
        assert_eq!(ts.to_string(), expected.to_string());
    }
}
