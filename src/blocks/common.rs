// blocks/common.rs
//! Common types, traits, and helper functions for MDF4 block parsing.
//!
//! This module provides:
//! - [`BlockHeader`]: The 24-byte header present in all MDF4 blocks
//! - [`BlockParse`]: Trait for parsing blocks from bytes
//! - [`DataType`]: Enum representing MDF data types
//! - Byte helpers shared by the MDF3 and MDF4 block layers

use crate::{
    Error, Result,
    blocks::{metadata_block::MetadataBlock, text_block::TextBlock},
};
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

// ============================================================================
// Byte Parsing Helpers
// ============================================================================
//
// The readers below index directly; callers validate the slice length with
// `validate_buffer_size` before using them.

#[inline]
pub fn read_u64(bytes: &[u8], offset: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[offset..offset + 8]);
    u64::from_le_bytes(raw)
}

#[inline]
pub fn read_i64(bytes: &[u8], offset: usize) -> i64 {
    read_u64(bytes, offset) as i64
}

#[inline]
pub fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(raw)
}

#[inline]
pub fn read_i32(bytes: &[u8], offset: usize) -> i32 {
    read_u32(bytes, offset) as i32
}

#[inline]
pub fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

#[inline]
pub fn read_i16(bytes: &[u8], offset: usize) -> i16 {
    read_u16(bytes, offset) as i16
}

#[inline]
pub fn read_f64(bytes: &[u8], offset: usize) -> f64 {
    f64::from_bits(read_u64(bytes, offset))
}

#[inline]
pub fn read_u8(bytes: &[u8], offset: usize) -> u8 {
    bytes[offset]
}

/// Read a fixed-width, NUL padded Latin-1 text field (MDF3 style).
pub fn read_fixed_str(bytes: &[u8], offset: usize, width: usize) -> String {
    let field = &bytes[offset..offset + width];
    let end = field.iter().position(|&b| b == 0).unwrap_or(width);
    field[..end]
        .iter()
        .map(|&b| b as char)
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// Append `text` as a fixed-width, NUL padded Latin-1 field.
///
/// One byte is always kept for the terminator.
pub fn write_fixed_str(buffer: &mut Vec<u8>, text: &str, width: usize) {
    let mut field: Vec<u8> = text
        .chars()
        .map(|c| if (c as u32) < 256 { c as u32 as u8 } else { b'?' })
        .take(width.saturating_sub(1))
        .collect();
    field.resize(width, 0);
    buffer.extend_from_slice(&field);
}

// ============================================================================
// Validation Helpers
// ============================================================================

/// Validate that a buffer has at least `expected` bytes.
#[inline]
pub fn validate_buffer_size(bytes: &[u8], expected: usize) -> Result<()> {
    if bytes.len() < expected {
        return Err(Error::TooShortBuffer {
            actual: bytes.len(),
            expected,
            file: file!(),
            line: line!(),
        });
    }
    Ok(())
}

/// Validate that a block header has the expected ID.
#[inline]
pub fn validate_block_id(header: &BlockHeader, expected_id: &str) -> Result<()> {
    if header.id != expected_id {
        return Err(Error::BlockSerializationError(format!(
            "Block must have ID '{}', found '{}'",
            expected_id, header.id
        )));
    }
    Ok(())
}

/// Validate that a block header has the expected length.
#[inline]
pub fn validate_block_length(header: &BlockHeader, expected: u64) -> Result<()> {
    if header.length != expected {
        return Err(Error::BlockSerializationError(format!(
            "Block {} must have length={}, found {}",
            header.id, expected, header.length
        )));
    }
    Ok(())
}

/// Calculate padding needed to reach 8-byte alignment.
#[inline]
pub const fn padding_to_align_8(size: usize) -> usize {
    (8 - (size % 8)) % 8
}

/// Safely convert a u64 offset/address to usize for indexing.
#[inline]
pub fn u64_to_usize(value: u64, context: &str) -> Result<usize> {
    usize::try_from(value).map_err(|_| {
        Error::BlockSerializationError(format!(
            "{} value {} exceeds maximum addressable size on this platform",
            context, value
        ))
    })
}

/// Slice `file` starting at block address `address`.
pub fn block_slice(file: &[u8], address: u64) -> Result<&[u8]> {
    let offset = u64_to_usize(address, "block address")?;
    validate_buffer_size(file, offset.saturating_add(1))?;
    Ok(&file[offset..])
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockHeader {
    /// 4-byte block type identifier (e.g., "##HD", "##DG").
    pub id: String,
    /// Reserved field, always 0.
    pub reserved: u32,
    /// Total length of the block in bytes, including this header.
    pub length: u64,
    /// Number of link fields in this block.
    pub link_count: u64,
}

impl BlockHeader {
    pub fn new(id: &str, length: u64, link_count: u64) -> Self {
        Self {
            id: id.to_string(),
            reserved: 0,
            length,
            link_count,
        }
    }

    /// Serializes the 24-byte header: id, reserved, length, link count.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let id_bytes = self.id.as_bytes();
        if id_bytes.len() != 4 {
            return Err(Error::BlockSerializationError(format!(
                "block id '{}' must be 4 bytes",
                self.id
            )));
        }
        let mut buffer = Vec::with_capacity(24);
        buffer.extend_from_slice(id_bytes);
        buffer.extend_from_slice(&self.reserved.to_le_bytes());
        buffer.extend_from_slice(&self.length.to_le_bytes());
        buffer.extend_from_slice(&self.link_count.to_le_bytes());
        Ok(buffer)
    }

    /// Parse a block header from the first 24 bytes of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        validate_buffer_size(bytes, 24)?;
        Ok(Self {
            id: String::from_utf8_lossy(&bytes[0..4]).into_owned(),
            reserved: read_u32(bytes, 4),
            length: read_u64(bytes, 8),
            link_count: read_u64(bytes, 16),
        })
    }

    /// Byte length of the block body, bounded by the available slice.
    pub fn checked_len(&self, available: usize) -> Result<usize> {
        let len = u64_to_usize(self.length, "block length")?;
        if len < 24 || len > available {
            return Err(Error::TooShortBuffer {
                actual: available,
                expected: len.max(24),
                file: file!(),
                line: line!(),
            });
        }
        Ok(len)
    }
}

pub trait BlockParse<'a>: Sized {
    const ID: &'static str;

    fn parse_header(bytes: &[u8]) -> Result<BlockHeader> {
        let header = BlockHeader::from_bytes(bytes)?;
        if header.id != Self::ID {
            return Err(Error::BlockIDError {
                actual: header.id.clone(),
                expected: Self::ID.to_string(),
            });
        }
        header.checked_len(bytes.len())?;
        Ok(header)
    }

    /// Reads the `count` links that follow the header.
    fn parse_links(bytes: &[u8], header: &BlockHeader) -> Result<Vec<u64>> {
        let count = u64_to_usize(header.link_count, "link count")?;
        validate_buffer_size(bytes, 24 + count * 8)?;
        Ok((0..count).map(|i| read_u64(bytes, 24 + i * 8)).collect())
    }

    fn from_bytes(bytes: &'a [u8]) -> Result<Self>;
}

/// Returns link `index` or 0 when the block carries fewer links.
#[inline]
pub fn link_at(links: &[u64], index: usize) -> u64 {
    links.get(index).copied().unwrap_or(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DataType {
    #[default]
    UnsignedIntegerLE,
    UnsignedIntegerBE,
    SignedIntegerLE,
    SignedIntegerBE,
    FloatLE,
    FloatBE,
    StringLatin1,
    StringUtf8,
    StringUtf16LE,
    StringUtf16BE,
    ByteArray,
    MimeSample,
    MimeStream,
    CanOpenDate,
    CanOpenTime,
    ComplexLE,
    ComplexBE,
    Unknown(u8),
}

impl DataType {
    /// The MDF4 `cn_data_type` code.
    pub fn to_u8(&self) -> u8 {
        match self {
            DataType::UnsignedIntegerLE => 0,
            DataType::UnsignedIntegerBE => 1,
            DataType::SignedIntegerLE => 2,
            DataType::SignedIntegerBE => 3,
            DataType::FloatLE => 4,
            DataType::FloatBE => 5,
            DataType::StringLatin1 => 6,
            DataType::StringUtf8 => 7,
            DataType::StringUtf16LE => 8,
            DataType::StringUtf16BE => 9,
            DataType::ByteArray => 10,
            DataType::MimeSample => 11,
            DataType::MimeStream => 12,
            DataType::CanOpenDate => 13,
            DataType::CanOpenTime => 14,
            DataType::ComplexLE => 15,
            DataType::ComplexBE => 16,
            DataType::Unknown(code) => *code,
        }
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => DataType::UnsignedIntegerLE,
            1 => DataType::UnsignedIntegerBE,
            2 => DataType::SignedIntegerLE,
            3 => DataType::SignedIntegerBE,
            4 => DataType::FloatLE,
            5 => DataType::FloatBE,
            6 => DataType::StringLatin1,
            7 => DataType::StringUtf8,
            8 => DataType::StringUtf16LE,
            9 => DataType::StringUtf16BE,
            10 => DataType::ByteArray,
            11 => DataType::MimeSample,
            12 => DataType::MimeStream,
            13 => DataType::CanOpenDate,
            14 => DataType::CanOpenTime,
            15 => DataType::ComplexLE,
            16 => DataType::ComplexBE,
            other => DataType::Unknown(other),
        }
    }

    /// Maps an MDF3 `cn_data_type` code. `little_endian_default` is the byte
    /// order declared in the MDF3 identification block for codes 0..=3.
    pub fn from_mdf3(value: u16, little_endian_default: bool) -> Self {
        let native = |le: DataType, be: DataType| if little_endian_default { le } else { be };
        match value {
            0 => native(DataType::UnsignedIntegerLE, DataType::UnsignedIntegerBE),
            1 => native(DataType::SignedIntegerLE, DataType::SignedIntegerBE),
            2 | 3 => native(DataType::FloatLE, DataType::FloatBE),
            7 => DataType::StringLatin1,
            8 => DataType::ByteArray,
            9 => DataType::UnsignedIntegerBE,
            10 => DataType::SignedIntegerBE,
            11 | 12 => DataType::FloatBE,
            13 => DataType::UnsignedIntegerLE,
            14 => DataType::SignedIntegerLE,
            15 | 16 => DataType::FloatLE,
            other => DataType::Unknown(other.min(255) as u8),
        }
    }

    /// The MDF3 code written for this type; `None` when MDF3 cannot express it.
    pub fn to_mdf3(&self, bit_count: u32) -> Option<u16> {
        let float_code = |le: u16, be: u16| if bit_count == 32 { le } else { be };
        match self {
            DataType::UnsignedIntegerLE => Some(13),
            DataType::SignedIntegerLE => Some(14),
            DataType::FloatLE => Some(float_code(15, 16)),
            DataType::UnsignedIntegerBE => Some(9),
            DataType::SignedIntegerBE => Some(10),
            DataType::FloatBE => Some(float_code(11, 12)),
            DataType::StringLatin1 | DataType::StringUtf8 => Some(7),
            DataType::ByteArray | DataType::MimeSample | DataType::MimeStream => Some(8),
            _ => None,
        }
    }

    pub fn is_big_endian(&self) -> bool {
        matches!(
            self,
            DataType::UnsignedIntegerBE
                | DataType::SignedIntegerBE
                | DataType::FloatBE
                | DataType::StringUtf16BE
                | DataType::ComplexBE
        )
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            DataType::UnsignedIntegerLE
                | DataType::UnsignedIntegerBE
                | DataType::SignedIntegerLE
                | DataType::SignedIntegerBE
        )
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, DataType::SignedIntegerLE | DataType::SignedIntegerBE)
    }

    pub fn is_float(&self) -> bool {
        matches!(self, DataType::FloatLE | DataType::FloatBE)
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    pub fn is_string(&self) -> bool {
        matches!(
            self,
            DataType::StringLatin1
                | DataType::StringUtf8
                | DataType::StringUtf16LE
                | DataType::StringUtf16BE
        )
    }

    /// Byte arrays and MIME payloads.
    pub fn is_bytes(&self) -> bool {
        matches!(
            self,
            DataType::ByteArray | DataType::MimeSample | DataType::MimeStream
        )
    }

    /// Typical bit width used when a channel is created without an explicit size.
    pub fn default_bits(&self) -> u32 {
        match self {
            DataType::UnsignedIntegerLE
            | DataType::UnsignedIntegerBE
            | DataType::SignedIntegerLE
            | DataType::SignedIntegerBE => 32,
            DataType::FloatLE | DataType::FloatBE => 64,
            DataType::CanOpenDate => 56,
            DataType::CanOpenTime => 48,
            DataType::ComplexLE | DataType::ComplexBE => 128,
            _ => 8,
        }
    }
}

impl core::fmt::Display for DataType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DataType::UnsignedIntegerLE => write!(f, "uint (LE)"),
            DataType::UnsignedIntegerBE => write!(f, "uint (BE)"),
            DataType::SignedIntegerLE => write!(f, "int (LE)"),
            DataType::SignedIntegerBE => write!(f, "int (BE)"),
            DataType::FloatLE => write!(f, "float (LE)"),
            DataType::FloatBE => write!(f, "float (BE)"),
            DataType::StringLatin1 => write!(f, "string (Latin-1)"),
            DataType::StringUtf8 => write!(f, "string (UTF-8)"),
            DataType::StringUtf16LE => write!(f, "string (UTF-16 LE)"),
            DataType::StringUtf16BE => write!(f, "string (UTF-16 BE)"),
            DataType::ByteArray => write!(f, "byte array"),
            DataType::MimeSample => write!(f, "MIME sample"),
            DataType::MimeStream => write!(f, "MIME stream"),
            DataType::CanOpenDate => write!(f, "CANopen date"),
            DataType::CanOpenTime => write!(f, "CANopen time"),
            DataType::ComplexLE => write!(f, "complex (LE)"),
            DataType::ComplexBE => write!(f, "complex (BE)"),
            DataType::Unknown(code) => write!(f, "unknown ({code})"),
        }
    }
}

/// A TX or MD block resolved to its text.
#[derive(Debug, Clone, PartialEq)]
pub enum StringBlock {
    Text(String),
    Metadata(String),
}

impl StringBlock {
    pub fn into_string(self) -> String {
        match self {
            StringBlock::Text(s) | StringBlock::Metadata(s) => s,
        }
    }
}

/// Read a text or metadata block at `address`.
///
/// Returns `Ok(None)` when `address` is zero or points to another block type.
pub fn read_string_block(file: &[u8], address: u64) -> Result<Option<StringBlock>> {
    if address == 0 {
        return Ok(None);
    }
    let bytes = block_slice(file, address)?;
    let header = BlockHeader::from_bytes(bytes)?;
    match header.id.as_str() {
        "##TX" => Ok(Some(StringBlock::Text(TextBlock::from_bytes(bytes)?.text))),
        "##MD" => Ok(Some(StringBlock::Metadata(
            MetadataBlock::from_bytes(bytes)?.xml,
        ))),
        _ => Ok(None),
    }
}

/// Convenience wrapper returning the plain text of a TX/MD block or "".
pub fn read_text(file: &[u8], address: u64) -> Result<String> {
    Ok(read_string_block(file, address)?
        .map(StringBlock::into_string)
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trip() {
        let header = BlockHeader::new("##DG", 64, 4);
        let bytes = header.to_bytes().unwrap();
        assert_eq!(bytes.len(), 24);
        assert_eq!(BlockHeader::from_bytes(&bytes).unwrap(), header);
    }

    #[test]
    fn header_rejects_bad_id_length() {
        assert!(BlockHeader::new("##X", 24, 0).to_bytes().is_err());
    }

    #[test]
    fn mdf3_type_mapping_honours_default_byte_order() {
        assert_eq!(DataType::from_mdf3(0, true), DataType::UnsignedIntegerLE);
        assert_eq!(DataType::from_mdf3(0, false), DataType::UnsignedIntegerBE);
        assert_eq!(DataType::from_mdf3(16, false), DataType::FloatLE);
        assert_eq!(DataType::FloatLE.to_mdf3(32), Some(15));
        assert_eq!(DataType::CanOpenDate.to_mdf3(56), None);
    }

    #[test]
    fn fixed_strings_are_padded_and_trimmed() {
        let mut buf = Vec::new();
        write_fixed_str(&mut buf, "Engine", 8);
        assert_eq!(buf, b"Engine\0\0");
        assert_eq!(read_fixed_str(&buf, 0, 8), "Engine");
    }
}
