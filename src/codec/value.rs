//! Decoded sample values.

use alloc::string::String;
use alloc::vec::Vec;

const NS_PER_MS: i64 = 1_000_000;
const NS_PER_DAY: i64 = 86_400 * 1_000_000_000;

/// Days from 1970-01-01 to the given civil date (proleptic Gregorian).
pub(crate) fn days_from_civil(year: i64, month: u32, day: u32) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400;
    let m = month as i64;
    let doy = (153 * (if m > 2 { m - 3 } else { m + 9 }) + 2) / 5 + day as i64 - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

/// Civil date for a day count since 1970-01-01.
pub(crate) fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    let year = yoe + era * 400 + if month <= 2 { 1 } else { 0 };
    (year, month, day)
}

/// CANopen DATE: 7 packed bytes holding a calendar timestamp.
///
/// ```text
/// 0  milliseconds  u16  0..59999 within the minute
/// 2  minute        bits 0..5
/// 3  hour          bits 0..4, bit 7 summer time
/// 4  day           bits 0..4, bits 5..7 day of week
/// 5  month         bits 0..5
/// 6  year          bits 0..6, years since 2000
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CanOpenDate {
    pub milliseconds: u16,
    pub minute: u8,
    pub hour: u8,
    pub summer_time: bool,
    pub day: u8,
    pub weekday: u8,
    pub month: u8,
    pub year: u16,
}

impl CanOpenDate {
    pub const SIZE: usize = 7;

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        Some(Self {
            milliseconds: u16::from_le_bytes([bytes[0], bytes[1]]),
            minute: bytes[2] & 0x3F,
            hour: bytes[3] & 0x1F,
            summer_time: bytes[3] & 0x80 != 0,
            day: bytes[4] & 0x1F,
            weekday: bytes[4] >> 5,
            month: bytes[5] & 0x3F,
            year: 2000 + (bytes[6] & 0x7F) as u16,
        })
    }

    pub fn to_bytes(&self) -> [u8; 7] {
        let ms = self.milliseconds.to_le_bytes();
        [
            ms[0],
            ms[1],
            self.minute & 0x3F,
            (self.hour & 0x1F) | if self.summer_time { 0x80 } else { 0 },
            (self.day & 0x1F) | (self.weekday << 5),
            self.month & 0x3F,
            (self.year.saturating_sub(2000).min(127)) as u8,
        ]
    }

    /// Builds the date for an absolute time in nanoseconds since 1970 (UTC).
    pub fn from_unix_ns(ns: i64) -> Self {
        let days = ns.div_euclid(NS_PER_DAY);
        let in_day_ms = ns.rem_euclid(NS_PER_DAY) / NS_PER_MS;
        let (year, month, day) = civil_from_days(days);
        let weekday = ((days + 3).rem_euclid(7) + 1) as u8;
        Self {
            milliseconds: (in_day_ms % 60_000) as u16,
            minute: ((in_day_ms / 60_000) % 60) as u8,
            hour: (in_day_ms / 3_600_000) as u8,
            summer_time: false,
            day: day as u8,
            weekday,
            month: month as u8,
            year: year.clamp(2000, 2127) as u16,
        }
    }

    /// Nanoseconds since 1970-01-01 (UTC), ignoring the summer time flag.
    pub fn to_unix_ns(&self) -> i64 {
        let days = days_from_civil(self.year as i64, self.month.max(1) as u32, self.day.max(1) as u32);
        days * NS_PER_DAY
            + (self.hour as i64 * 3_600_000 + self.minute as i64 * 60_000 + self.milliseconds as i64)
                * NS_PER_MS
    }
}

/// CANopen TIME: milliseconds since midnight (28 bits) and days since 1984-01-01.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CanOpenTime {
    pub milliseconds: u32,
    pub days: u16,
}

impl CanOpenTime {
    pub const SIZE: usize = 6;

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        Some(Self {
            milliseconds: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) & 0x0FFF_FFFF,
            days: u16::from_le_bytes([bytes[4], bytes[5]]),
        })
    }

    pub fn to_bytes(&self) -> [u8; 6] {
        let ms = (self.milliseconds & 0x0FFF_FFFF).to_le_bytes();
        let days = self.days.to_le_bytes();
        [ms[0], ms[1], ms[2], ms[3], days[0], days[1]]
    }

    pub fn to_unix_ns(&self) -> i64 {
        let epoch_1984 = days_from_civil(1984, 1, 1);
        (epoch_1984 + self.days as i64) * NS_PER_DAY + self.milliseconds as i64 * NS_PER_MS
    }

    pub fn from_unix_ns(ns: i64) -> Self {
        let days = ns.div_euclid(NS_PER_DAY) - days_from_civil(1984, 1, 1);
        Self {
            milliseconds: (ns.rem_euclid(NS_PER_DAY) / NS_PER_MS) as u32,
            days: days.clamp(0, u16::MAX as i64) as u16,
        }
    }
}

/// One channel value as stored in a record, before conversion.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DecodedValue {
    UnsignedInteger(u64),
    SignedInteger(i64),
    Float(f64),
    String(String),
    ByteArray(Vec<u8>),
    MimeSample(Vec<u8>),
    MimeStream(Vec<u8>),
    CanOpenDate(CanOpenDate),
    CanOpenTime(CanOpenTime),
    Complex { re: f64, im: f64 },
    Unknown,
}

impl DecodedValue {
    #[inline]
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            DecodedValue::UnsignedInteger(_) | DecodedValue::SignedInteger(_)
        )
    }

    #[inline]
    pub fn is_float(&self) -> bool {
        matches!(self, DecodedValue::Float(_))
    }

    #[inline]
    pub fn is_string(&self) -> bool {
        matches!(self, DecodedValue::String(_))
    }

    #[inline]
    pub fn is_bytes(&self) -> bool {
        matches!(
            self,
            DecodedValue::ByteArray(_) | DecodedValue::MimeSample(_) | DecodedValue::MimeStream(_)
        )
    }

    /// Numeric view of the value. CANopen dates and times yield nanoseconds
    /// since 1970; strings, bytes and complex numbers yield `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DecodedValue::UnsignedInteger(v) => Some(*v as f64),
            DecodedValue::SignedInteger(v) => Some(*v as f64),
            DecodedValue::Float(v) => Some(*v),
            DecodedValue::CanOpenDate(d) => Some(d.to_unix_ns() as f64),
            DecodedValue::CanOpenTime(t) => Some(t.to_unix_ns() as f64),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            DecodedValue::ByteArray(b) | DecodedValue::MimeSample(b) | DecodedValue::MimeStream(b) => {
                Some(b)
            }
            DecodedValue::String(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DecodedValue::String(s) => Some(s),
            _ => None,
        }
    }
}

macro_rules! from_unsigned {
    ($($t:ty),*) => {$(
        impl From<$t> for DecodedValue {
            fn from(v: $t) -> Self {
                DecodedValue::UnsignedInteger(v as u64)
            }
        }
    )*};
}

macro_rules! from_signed {
    ($($t:ty),*) => {$(
        impl From<$t> for DecodedValue {
            fn from(v: $t) -> Self {
                DecodedValue::SignedInteger(v as i64)
            }
        }
    )*};
}

from_unsigned!(u8, u16, u32, u64);
from_signed!(i8, i16, i32, i64);

impl From<f64> for DecodedValue {
    fn from(v: f64) -> Self {
        DecodedValue::Float(v)
    }
}

impl From<f32> for DecodedValue {
    fn from(v: f32) -> Self {
        DecodedValue::Float(v as f64)
    }
}

impl From<bool> for DecodedValue {
    fn from(v: bool) -> Self {
        DecodedValue::UnsignedInteger(v as u64)
    }
}

impl From<&str> for DecodedValue {
    fn from(v: &str) -> Self {
        DecodedValue::String(v.into())
    }
}

impl From<String> for DecodedValue {
    fn from(v: String) -> Self {
        DecodedValue::String(v)
    }
}

impl From<Vec<u8>> for DecodedValue {
    fn from(v: Vec<u8>) -> Self {
        DecodedValue::ByteArray(v)
    }
}

impl From<&[u8]> for DecodedValue {
    fn from(v: &[u8]) -> Self {
        DecodedValue::ByteArray(v.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn civil_round_trip() {
        assert_eq!(days_from_civil(1970, 1, 1), 0);
        assert_eq!(days_from_civil(1984, 1, 1), 5113);
        assert_eq!(civil_from_days(days_from_civil(2024, 2, 29)), (2024, 2, 29));
    }

    #[test]
    fn canopen_date_packing() {
        let date = CanOpenDate {
            milliseconds: 12_345,
            minute: 42,
            hour: 13,
            summer_time: true,
            day: 17,
            weekday: 3,
            month: 10,
            year: 2023,
        };
        let bytes = date.to_bytes();
        assert_eq!(bytes[6], 23);
        assert_eq!(CanOpenDate::from_bytes(&bytes), Some(date));
    }

    #[test]
    fn canopen_time_epoch() {
        let t = CanOpenTime {
            milliseconds: 1000,
            days: 0,
        };
        assert_eq!(t.to_unix_ns(), 5113 * NS_PER_DAY + 1_000_000_000);
        assert_eq!(CanOpenTime::from_unix_ns(t.to_unix_ns()), t);
        assert!(CanOpenTime::from_bytes(&[0u8; 5]).is_none());
    }

    #[test]
    fn numeric_views() {
        assert_eq!(DecodedValue::from(7u16).as_f64(), Some(7.0));
        assert_eq!(DecodedValue::from(-3i8).as_f64(), Some(-3.0));
        assert_eq!(DecodedValue::from("x").as_f64(), None);
        assert!(DecodedValue::from(vec![1u8]).is_bytes());
    }
}
