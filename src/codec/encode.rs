use super::{ChannelLayout, DecodedValue};
use crate::blocks::DataType;
use crate::{Error, Result};

use alloc::format;
use alloc::vec::Vec;

fn codec_error(layout: &ChannelLayout, what: &str) -> Error {
    Error::CodecError(format!(
        "cannot encode {what} as {} with {} bits",
        layout.data_type, layout.bit_count
    ))
}

/// Writes the low `bit_count` bits of `raw` into `slot`, leaving the
/// neighbouring bits of shared bytes untouched.
fn write_bits(slot: &mut [u8], layout: &ChannelLayout, raw: u64) -> Result<()> {
    if slot.len() > 8 || layout.bit_count == 0 || layout.bit_count > 64 {
        return Err(codec_error(layout, "integer"));
    }
    let big_endian = layout.data_type.is_big_endian();
    let load = |bytes: &[u8]| -> u64 {
        if big_endian {
            bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
        } else {
            bytes.iter().rev().fold(0u64, |acc, &b| (acc << 8) | b as u64)
        }
    };
    let mask = if layout.bit_count >= 64 {
        u64::MAX
    } else {
        (1u64 << layout.bit_count) - 1
    };
    let shift = layout.bit_offset as u32;
    let field = mask.checked_shl(shift).unwrap_or(0);
    let current = load(slot);
    let updated = (current & !field) | ((raw & mask).checked_shl(shift).unwrap_or(0));

    let n = slot.len();
    for (i, byte) in slot.iter_mut().enumerate() {
        let index = if big_endian { n - 1 - i } else { i };
        *byte = (updated >> (8 * index)) as u8;
    }
    Ok(())
}

fn write_float(slot: &mut [u8], big_endian: bool, value: f64) -> bool {
    match slot.len() {
        4 => {
            let v = value as f32;
            let bytes = if big_endian { v.to_be_bytes() } else { v.to_le_bytes() };
            slot.copy_from_slice(&bytes);
            true
        }
        8 => {
            let bytes = if big_endian {
                value.to_be_bytes()
            } else {
                value.to_le_bytes()
            };
            slot.copy_from_slice(&bytes);
            true
        }
        _ => false,
    }
}

/// Copies `bytes` into `slot`, truncating and zero padding.
fn write_bytes(slot: &mut [u8], bytes: &[u8]) {
    let n = bytes.len().min(slot.len());
    slot[..n].copy_from_slice(&bytes[..n]);
    slot[n..].fill(0);
}

/// Encodes text for `data_type`, cut to at most `max` bytes without
/// splitting a character.
pub fn encode_text(text: &str, data_type: DataType, max: usize) -> Vec<u8> {
    match data_type {
        DataType::StringLatin1 => text
            .chars()
            .map(|c| if (c as u32) < 256 { c as u32 as u8 } else { b'?' })
            .take(max)
            .collect(),
        DataType::StringUtf16LE | DataType::StringUtf16BE => {
            let mut out = Vec::new();
            for c in text.chars() {
                let mut units = [0u16; 2];
                let encoded = c.encode_utf16(&mut units);
                if out.len() + encoded.len() * 2 > max {
                    break;
                }
                for unit in encoded.iter() {
                    if data_type == DataType::StringUtf16BE {
                        out.extend_from_slice(&unit.to_be_bytes());
                    } else {
                        out.extend_from_slice(&unit.to_le_bytes());
                    }
                }
            }
            out
        }
        _ => {
            let mut end = text.len().min(max);
            while !text.is_char_boundary(end) {
                end -= 1;
            }
            text.as_bytes()[..end].to_vec()
        }
    }
}

/// Encodes `value` into the channel slot of `record` (record ID excluded).
pub fn encode_channel_value(
    record: &mut [u8],
    layout: &ChannelLayout,
    value: &DecodedValue,
) -> Result<()> {
    let start = layout.byte_offset as usize;
    let len = layout.byte_len();
    let end = start
        .checked_add(len)
        .filter(|&end| end <= record.len() && len > 0)
        .ok_or_else(|| {
            Error::CodecError(format!(
                "channel slot {start}+{len} outside record of {} bytes",
                record.len()
            ))
        })?;
    let slot = &mut record[start..end];

    match layout.data_type {
        DataType::UnsignedIntegerLE | DataType::UnsignedIntegerBE => {
            let raw = match value {
                DecodedValue::UnsignedInteger(v) => *v,
                DecodedValue::SignedInteger(v) => *v as u64,
                DecodedValue::Float(v) if *v >= 0.0 => v.round() as u64,
                DecodedValue::Float(_) => 0,
                _ => return Err(codec_error(layout, "non-numeric value")),
            };
            write_bits(slot, layout, raw)
        }
        DataType::SignedIntegerLE | DataType::SignedIntegerBE => {
            let raw = match value {
                DecodedValue::SignedInteger(v) => *v,
                DecodedValue::UnsignedInteger(v) => *v as i64,
                DecodedValue::Float(v) => v.round() as i64,
                _ => return Err(codec_error(layout, "non-numeric value")),
            };
            write_bits(slot, layout, raw as u64)
        }
        DataType::FloatLE | DataType::FloatBE => {
            let v = value
                .as_f64()
                .ok_or_else(|| codec_error(layout, "non-numeric value"))?;
            if write_float(slot, layout.data_type.is_big_endian(), v) {
                Ok(())
            } else {
                Err(codec_error(layout, "float"))
            }
        }
        DataType::StringLatin1
        | DataType::StringUtf8
        | DataType::StringUtf16LE
        | DataType::StringUtf16BE => {
            let bytes = match value {
                DecodedValue::String(s) => encode_text(s, layout.data_type, slot.len()),
                other => other
                    .as_bytes()
                    .map(<[u8]>::to_vec)
                    .ok_or_else(|| codec_error(layout, "non-text value"))?,
            };
            write_bytes(slot, &bytes);
            Ok(())
        }
        DataType::ByteArray | DataType::MimeSample | DataType::MimeStream => {
            let bytes = value
                .as_bytes()
                .ok_or_else(|| codec_error(layout, "non-byte value"))?;
            write_bytes(slot, bytes);
            Ok(())
        }
        DataType::CanOpenDate => {
            let date = match value {
                DecodedValue::CanOpenDate(d) => *d,
                other => match other.as_f64() {
                    Some(ns) => super::CanOpenDate::from_unix_ns(ns as i64),
                    None => return Err(codec_error(layout, "non-date value")),
                },
            };
            write_bytes(slot, &date.to_bytes());
            Ok(())
        }
        DataType::CanOpenTime => {
            let time = match value {
                DecodedValue::CanOpenTime(t) => *t,
                other => match other.as_f64() {
                    Some(ns) => super::CanOpenTime::from_unix_ns(ns as i64),
                    None => return Err(codec_error(layout, "non-time value")),
                },
            };
            write_bytes(slot, &time.to_bytes());
            Ok(())
        }
        DataType::ComplexLE | DataType::ComplexBE => {
            let (re, im) = match value {
                DecodedValue::Complex { re, im } => (*re, *im),
                other => (
                    other
                        .as_f64()
                        .ok_or_else(|| codec_error(layout, "non-numeric value"))?,
                    0.0,
                ),
            };
            let half = slot.len() / 2;
            let big_endian = layout.data_type.is_big_endian();
            let (re_slot, im_slot) = slot.split_at_mut(half);
            if write_float(re_slot, big_endian, re) && write_float(im_slot, big_endian, im) {
                Ok(())
            } else {
                Err(codec_error(layout, "complex"))
            }
        }
        DataType::Unknown(_) => Err(codec_error(layout, "value")),
    }
}

/// Sets or clears the invalidation bit at `inval_bit_pos` after `data_bytes`.
pub fn set_invalidation_bit(record: &mut [u8], data_bytes: u32, inval_bit_pos: u32, invalid: bool) {
    let offset = data_bytes as usize + (inval_bit_pos >> 3) as usize;
    if let Some(byte) = record.get_mut(offset) {
        let bit = 1u8 << (inval_bit_pos & 0x07);
        if invalid {
            *byte |= bit;
        } else {
            *byte &= !bit;
        }
    }
}
