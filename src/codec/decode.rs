use super::{CanOpenDate, CanOpenTime, ChannelLayout, DecodedValue};
use crate::blocks::DataType;
use crate::blocks::channel_block::{CN_FLAG_ALL_INVALID, CN_FLAG_INVAL_BIT_VALID};

use alloc::string::String;

/// Reports whether the value of a channel in `record` is valid.
///
/// `record` starts after the record ID; the invalidation bytes follow the
/// first `data_bytes` bytes.
pub fn check_value_validity(record: &[u8], data_bytes: u32, flags: u32, inval_bit_pos: u32) -> bool {
    if flags & CN_FLAG_ALL_INVALID != 0 {
        return false;
    }
    if flags & CN_FLAG_INVAL_BIT_VALID == 0 {
        return true;
    }

    let inval_byte_offset = data_bytes as usize + (inval_bit_pos >> 3) as usize;
    let inval_bit_index = inval_bit_pos & 0x07;
    match record.get(inval_byte_offset) {
        // A set invalidation bit marks the value invalid.
        Some(byte) => (byte >> inval_bit_index) & 0x01 == 0,
        None => true,
    }
}

fn bit_mask(bit_count: u32) -> u64 {
    if bit_count >= 64 {
        u64::MAX
    } else {
        (1u64 << bit_count) - 1
    }
}

/// Loads the bit field of an integer channel, returning the unsigned raw bits.
fn read_bits(slice: &[u8], layout: &ChannelLayout) -> Option<u64> {
    if slice.len() > 8 || layout.bit_count == 0 || layout.bit_count > 64 {
        return None;
    }
    let raw = if layout.data_type.is_big_endian() {
        slice.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
    } else {
        slice
            .iter()
            .rev()
            .fold(0u64, |acc, &b| (acc << 8) | b as u64)
    };
    Some((raw >> layout.bit_offset) & bit_mask(layout.bit_count))
}

fn sign_extend(unsigned: u64, bit_count: u32) -> i64 {
    if bit_count >= 64 {
        return unsigned as i64;
    }
    let sign_bit = 1u64 << (bit_count - 1);
    if unsigned & sign_bit != 0 {
        (unsigned | !bit_mask(bit_count)) as i64
    } else {
        unsigned as i64
    }
}

fn read_float(slice: &[u8], big_endian: bool) -> Option<f64> {
    match slice.len() {
        4 => {
            let mut raw = [0u8; 4];
            raw.copy_from_slice(slice);
            let bits = if big_endian {
                u32::from_be_bytes(raw)
            } else {
                u32::from_le_bytes(raw)
            };
            Some(f32::from_bits(bits) as f64)
        }
        8 => {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(slice);
            let bits = if big_endian {
                u64::from_be_bytes(raw)
            } else {
                u64::from_le_bytes(raw)
            };
            Some(f64::from_bits(bits))
        }
        _ => None,
    }
}

fn decode_utf16(slice: &[u8], big_endian: bool) -> Option<String> {
    if slice.len() % 2 != 0 {
        return None;
    }
    let units: alloc::vec::Vec<u16> = slice
        .chunks_exact(2)
        .map(|c| {
            if big_endian {
                u16::from_be_bytes([c[0], c[1]])
            } else {
                u16::from_le_bytes([c[0], c[1]])
            }
        })
        .take_while(|&u| u != 0)
        .collect();
    Some(String::from_utf16_lossy(&units))
}

/// Decodes the channel described by `layout` from `record`.
///
/// `record` starts after the record ID. Returns `None` when the record is too
/// short or the type/size combination is not decodable.
pub fn decode_channel_value(record: &[u8], layout: &ChannelLayout) -> Option<DecodedValue> {
    let start = layout.byte_offset as usize;
    let len = layout.byte_len();
    if len == 0 {
        return None;
    }
    let slice = record.get(start..start.checked_add(len)?)?;
    decode_slice(slice, layout)
}

/// Decodes a value whose bytes have already been isolated, e.g. a VLSD entry.
pub fn decode_slice(slice: &[u8], layout: &ChannelLayout) -> Option<DecodedValue> {
    match layout.data_type {
        DataType::UnsignedIntegerLE | DataType::UnsignedIntegerBE => {
            read_bits(slice, layout).map(DecodedValue::UnsignedInteger)
        }
        DataType::SignedIntegerLE | DataType::SignedIntegerBE => read_bits(slice, layout)
            .map(|raw| DecodedValue::SignedInteger(sign_extend(raw, layout.bit_count))),
        DataType::FloatLE | DataType::FloatBE => {
            if layout.bit_offset != 0 {
                return None;
            }
            read_float(slice, layout.data_type.is_big_endian()).map(DecodedValue::Float)
        }
        DataType::StringLatin1 => {
            let s: String = slice
                .iter()
                .take_while(|&&b| b != 0)
                .map(|&b| b as char)
                .collect();
            Some(DecodedValue::String(s))
        }
        DataType::StringUtf8 => {
            let end = slice.iter().position(|&b| b == 0).unwrap_or(slice.len());
            Some(DecodedValue::String(
                String::from_utf8_lossy(&slice[..end]).into_owned(),
            ))
        }
        DataType::StringUtf16LE => decode_utf16(slice, false).map(DecodedValue::String),
        DataType::StringUtf16BE => decode_utf16(slice, true).map(DecodedValue::String),
        DataType::ByteArray => Some(DecodedValue::ByteArray(slice.to_vec())),
        DataType::MimeSample => Some(DecodedValue::MimeSample(slice.to_vec())),
        DataType::MimeStream => Some(DecodedValue::MimeStream(slice.to_vec())),
        DataType::CanOpenDate => CanOpenDate::from_bytes(slice).map(DecodedValue::CanOpenDate),
        DataType::CanOpenTime => CanOpenTime::from_bytes(slice).map(DecodedValue::CanOpenTime),
        DataType::ComplexLE | DataType::ComplexBE => {
            let half = slice.len() / 2;
            let big_endian = layout.data_type.is_big_endian();
            let re = read_float(&slice[..half], big_endian)?;
            let im = read_float(&slice[half..], big_endian)?;
            Some(DecodedValue::Complex { re, im })
        }
        DataType::Unknown(_) => None,
    }
}
