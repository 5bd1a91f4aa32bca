use alloc::string::String;
use alloc::vec::Vec;

use super::{parse_block_header, push_block_header, push_link, read_link};
use crate::Result;
use crate::blocks::{read_f64, read_fixed_str, read_u16, validate_buffer_size, write_fixed_str};

pub(crate) const CN3_BLOCK_SIZE: usize = 228;
/// Size of CN blocks before long names were introduced.
const CN3_BASE_SIZE: usize = 218;

pub const CN3_TYPE_DATA: u16 = 0;
pub const CN3_TYPE_TIME: u16 = 1;

/// MDF3 channel block.
///
/// ```text
///   4 cn, cc, ce, cd, tx links   u32 each
///  24 channel type               u16  (0 data, 1 time)
///  26 short name                 char[32]
///  58 description                char[128]
/// 186 start bit                  u16
/// 188 number of bits             u16
/// 190 data type                  u16
/// 192 value range valid          u16
/// 194 min, max, sample rate      f64 each
/// 218 long name, display name    u32 TX links
/// 226 additional byte offset     u16
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Cn3Block {
    pub next_cn_addr: u64,
    pub conversion_addr: u64,
    pub extension_addr: u64,
    pub dependency_addr: u64,
    pub comment_addr: u64,
    pub channel_type: u16,
    pub short_name: String,
    pub description: String,
    pub start_bit: u16,
    pub bit_count: u16,
    pub data_type: u16,
    pub range_valid: bool,
    pub min: f64,
    pub max: f64,
    pub sample_rate: f64,
    pub long_name_addr: u64,
    pub display_name_addr: u64,
    pub additional_byte_offset: u16,
}

impl Default for Cn3Block {
    fn default() -> Self {
        Self {
            next_cn_addr: 0,
            conversion_addr: 0,
            extension_addr: 0,
            dependency_addr: 0,
            comment_addr: 0,
            channel_type: CN3_TYPE_DATA,
            short_name: String::new(),
            description: String::new(),
            start_bit: 0,
            bit_count: 0,
            data_type: 0,
            range_valid: false,
            min: 0.0,
            max: 0.0,
            sample_rate: 0.0,
            long_name_addr: 0,
            display_name_addr: 0,
            additional_byte_offset: 0,
        }
    }
}

impl Cn3Block {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let size = parse_block_header(bytes, "CN")?;
        validate_buffer_size(bytes, CN3_BASE_SIZE)?;
        let extended = size >= CN3_BLOCK_SIZE;
        Ok(Self {
            next_cn_addr: read_link(bytes, 4),
            conversion_addr: read_link(bytes, 8),
            extension_addr: read_link(bytes, 12),
            dependency_addr: read_link(bytes, 16),
            comment_addr: read_link(bytes, 20),
            channel_type: read_u16(bytes, 24),
            short_name: read_fixed_str(bytes, 26, 32),
            description: read_fixed_str(bytes, 58, 128),
            start_bit: read_u16(bytes, 186),
            bit_count: read_u16(bytes, 188),
            data_type: read_u16(bytes, 190),
            range_valid: read_u16(bytes, 192) != 0,
            min: read_f64(bytes, 194),
            max: read_f64(bytes, 202),
            sample_rate: read_f64(bytes, 210),
            long_name_addr: if extended { read_link(bytes, 218) } else { 0 },
            display_name_addr: if extended { read_link(bytes, 222) } else { 0 },
            additional_byte_offset: if extended { read_u16(bytes, 226) } else { 0 },
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::with_capacity(CN3_BLOCK_SIZE);
        push_block_header(&mut buffer, "CN", CN3_BLOCK_SIZE)?;
        for link in [
            self.next_cn_addr,
            self.conversion_addr,
            self.extension_addr,
            self.dependency_addr,
            self.comment_addr,
        ] {
            push_link(&mut buffer, link)?;
        }
        buffer.extend_from_slice(&self.channel_type.to_le_bytes());
        write_fixed_str(&mut buffer, &self.short_name, 32);
        write_fixed_str(&mut buffer, &self.description, 128);
        buffer.extend_from_slice(&self.start_bit.to_le_bytes());
        buffer.extend_from_slice(&self.bit_count.to_le_bytes());
        buffer.extend_from_slice(&self.data_type.to_le_bytes());
        buffer.extend_from_slice(&u16::from(self.range_valid).to_le_bytes());
        buffer.extend_from_slice(&self.min.to_le_bytes());
        buffer.extend_from_slice(&self.max.to_le_bytes());
        buffer.extend_from_slice(&self.sample_rate.to_le_bytes());
        push_link(&mut buffer, self.long_name_addr)?;
        push_link(&mut buffer, self.display_name_addr)?;
        buffer.extend_from_slice(&self.additional_byte_offset.to_le_bytes());
        Ok(buffer)
    }

    /// Byte offset of the value inside the record.
    pub fn byte_offset(&self) -> u32 {
        u32::from(self.start_bit / 8) + u32::from(self.additional_byte_offset)
    }

    pub fn bit_offset(&self) -> u8 {
        (self.start_bit % 8) as u8
    }
}
