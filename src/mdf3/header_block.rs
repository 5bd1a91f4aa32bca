use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use super::{parse_block_header, push_block_header, push_link, read_link};
use crate::Result;
use crate::codec::{civil_from_days, days_from_civil};
use crate::blocks::{read_fixed_str, read_i16, read_u16, read_u64, write_fixed_str};

/// Block size written for MDF 3.20 and later.
pub(crate) const HD3_BLOCK_SIZE: usize = 208;
/// Block size of MDF 3.0/3.1 files (no nanosecond timestamp).
const HD3_LEGACY_SIZE: usize = 164;

const NS_PER_SECOND: u64 = 1_000_000_000;

/// MDF3 header block.
///
/// ```text
///   4 dg, tx, pr links      u32 each
///  16 number of DG blocks   u16
///  18 date "DD:MM:YYYY"     char[10]
///  28 time "HH:MM:SS"       char[8]
///  36 author, organization, project, subject   char[32] each
/// 164 timestamp ns          u64   (3.20+)
/// 172 UTC offset [h]        i16
/// 174 time quality          u16
/// 176 timer id              char[32]
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Hd3Block {
    pub first_dg_addr: u64,
    pub comment_addr: u64,
    pub program_addr: u64,
    pub dg_count: u16,
    pub author: String,
    pub organization: String,
    pub project: String,
    pub subject: String,
    /// Local start time in ns since 1970 (local = UTC + offset).
    pub timestamp_ns: u64,
    pub utc_offset_hours: i16,
    pub time_quality: u16,
    pub timer_id: String,
}

impl Default for Hd3Block {
    fn default() -> Self {
        Self {
            first_dg_addr: 0,
            comment_addr: 0,
            program_addr: 0,
            dg_count: 0,
            author: String::new(),
            organization: String::new(),
            project: String::new(),
            subject: String::new(),
            timestamp_ns: 0,
            utc_offset_hours: 0,
            time_quality: 0,
            timer_id: String::from("Local PC Reference Time"),
        }
    }
}

impl Hd3Block {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let size = parse_block_header(bytes, "HD")?;
        crate::blocks::validate_buffer_size(bytes, HD3_LEGACY_SIZE)?;
        let mut block = Self {
            first_dg_addr: read_link(bytes, 4),
            comment_addr: read_link(bytes, 8),
            program_addr: read_link(bytes, 12),
            dg_count: read_u16(bytes, 16),
            author: read_fixed_str(bytes, 36, 32),
            organization: read_fixed_str(bytes, 68, 32),
            project: read_fixed_str(bytes, 100, 32),
            subject: read_fixed_str(bytes, 132, 32),
            timer_id: String::new(),
            ..Self::default()
        };
        if size >= HD3_BLOCK_SIZE {
            block.timestamp_ns = read_u64(bytes, 164);
            block.utc_offset_hours = read_i16(bytes, 172);
            block.time_quality = read_u16(bytes, 174);
            block.timer_id = read_fixed_str(bytes, 176, 32);
        } else {
            let date = read_fixed_str(bytes, 18, 10);
            let time = read_fixed_str(bytes, 28, 8);
            block.timestamp_ns = parse_date_time(&date, &time).unwrap_or(0);
        }
        Ok(block)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::with_capacity(HD3_BLOCK_SIZE);
        push_block_header(&mut buffer, "HD", HD3_BLOCK_SIZE)?;
        push_link(&mut buffer, self.first_dg_addr)?;
        push_link(&mut buffer, self.comment_addr)?;
        push_link(&mut buffer, self.program_addr)?;
        buffer.extend_from_slice(&self.dg_count.to_le_bytes());
        let (date, time) = format_date_time(self.timestamp_ns);
        for (text, width) in [(date, 10), (time, 8)] {
            let mut field = text.into_bytes();
            field.resize(width, 0);
            buffer.extend_from_slice(&field);
        }
        write_fixed_str(&mut buffer, &self.author, 32);
        write_fixed_str(&mut buffer, &self.organization, 32);
        write_fixed_str(&mut buffer, &self.project, 32);
        write_fixed_str(&mut buffer, &self.subject, 32);
        buffer.extend_from_slice(&self.timestamp_ns.to_le_bytes());
        buffer.extend_from_slice(&self.utc_offset_hours.to_le_bytes());
        buffer.extend_from_slice(&self.time_quality.to_le_bytes());
        write_fixed_str(&mut buffer, &self.timer_id, 32);
        Ok(buffer)
    }
}

fn parse_date_time(date: &str, time: &str) -> Option<u64> {
    let mut d = date.split(':').map(|p| p.trim().parse::<i64>().ok());
    let (day, month, year) = (d.next()??, d.next()??, d.next()??);
    let mut t = time.split(':').map(|p| p.trim().parse::<u64>().ok());
    let (hour, minute, second) = (t.next()??, t.next()??, t.next()??);
    let days = days_from_civil(year, u32::try_from(month).ok()?, u32::try_from(day).ok()?);
    let seconds = u64::try_from(days).ok()? * 86_400 + hour * 3600 + minute * 60 + second;
    seconds.checked_mul(NS_PER_SECOND)
}

fn format_date_time(ns: u64) -> (String, String) {
    let seconds = ns / NS_PER_SECOND;
    let (year, month, day) = civil_from_days((seconds / 86_400) as i64);
    let in_day = seconds % 86_400;
    (
        format!("{day:02}:{month:02}:{year:04}"),
        format!(
            "{:02}:{:02}:{:02}",
            in_day / 3600,
            (in_day / 60) % 60,
            in_day % 60
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trip() {
        let hd = Hd3Block {
            first_dg_addr: 0x200,
            dg_count: 2,
            author: "Ayla".into(),
            project: "Bench".into(),
            timestamp_ns: 1_577_836_800_123_000_000,
            utc_offset_hours: 1,
            ..Hd3Block::default()
        };
        let bytes = hd.to_bytes().unwrap();
        assert_eq!(bytes.len(), HD3_BLOCK_SIZE);
        assert_eq!(&bytes[18..28], b"01:01:2020");
        assert_eq!(&bytes[28..36], b"00:00:00");
        assert_eq!(Hd3Block::from_bytes(&bytes).unwrap(), hd);
    }

    #[test]
    fn legacy_header_uses_date_and_time_text() {
        let mut bytes = Hd3Block::default().to_bytes().unwrap();
        bytes.truncate(HD3_LEGACY_SIZE);
        bytes[2..4].copy_from_slice(&(HD3_LEGACY_SIZE as u16).to_le_bytes());
        bytes[18..36].copy_from_slice(b"29:02:202413:45:10");
        let hd = Hd3Block::from_bytes(&bytes).unwrap();
        assert_eq!(hd.timestamp_ns, 1_709_214_310 * NS_PER_SECOND);
    }
}
