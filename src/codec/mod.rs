//! Binary codec: one channel value to and from the bytes of a record.
//!
//! Records handed to the codec start after the record ID. Integer channels may
//! be bit packed; every other type occupies whole bytes. Decoding never panics
//! on short records: it returns `None` instead.

mod decode;
mod encode;
mod value;

pub use decode::{check_value_validity, decode_channel_value, decode_slice};
pub use encode::{encode_channel_value, encode_text, set_invalidation_bit};
pub use value::{CanOpenDate, CanOpenTime, DecodedValue};
pub(crate) use value::{civil_from_days, days_from_civil};

use crate::blocks::DataType;

/// Where and how a channel sits inside a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelLayout {
    pub data_type: DataType,
    /// Offset of the first byte, relative to the end of the record ID.
    pub byte_offset: u32,
    /// Bit offset inside the first byte (0..=7).
    pub bit_offset: u8,
    pub bit_count: u32,
}

impl ChannelLayout {
    pub fn new(data_type: DataType, byte_offset: u32, bit_offset: u8, bit_count: u32) -> Self {
        Self {
            data_type,
            byte_offset,
            bit_offset,
            bit_count,
        }
    }

    /// Number of record bytes touched by this channel.
    pub fn byte_len(&self) -> usize {
        if self.data_type.is_integer() {
            (self.bit_offset as usize + self.bit_count as usize).div_ceil(8)
        } else {
            (self.bit_count as usize).div_ceil(8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(data_type: DataType, byte_offset: u32, bit_offset: u8, bit_count: u32) -> ChannelLayout {
        ChannelLayout::new(data_type, byte_offset, bit_offset, bit_count)
    }

    #[test]
    fn unsigned_le_and_be() {
        let record = [0x34, 0x12, 0x12, 0x34];
        let le = layout(DataType::UnsignedIntegerLE, 0, 0, 16);
        let be = layout(DataType::UnsignedIntegerBE, 2, 0, 16);
        assert_eq!(
            decode_channel_value(&record, &le),
            Some(DecodedValue::UnsignedInteger(0x1234))
        );
        assert_eq!(
            decode_channel_value(&record, &be),
            Some(DecodedValue::UnsignedInteger(0x1234))
        );
    }

    #[test]
    fn signed_values_are_sign_extended() {
        let l = layout(DataType::SignedIntegerLE, 0, 2, 4);
        let mut record = [0u8; 1];
        encode_channel_value(&mut record, &l, &DecodedValue::SignedInteger(-3)).unwrap();
        assert_eq!(record[0], 0b0011_0100);
        assert_eq!(
            decode_channel_value(&record, &l),
            Some(DecodedValue::SignedInteger(-3))
        );
    }

    #[test]
    fn bit_fields_keep_neighbours() {
        let low = layout(DataType::UnsignedIntegerLE, 0, 0, 3);
        let high = layout(DataType::UnsignedIntegerLE, 0, 3, 5);
        let mut record = [0u8; 1];
        encode_channel_value(&mut record, &low, &DecodedValue::UnsignedInteger(5)).unwrap();
        encode_channel_value(&mut record, &high, &DecodedValue::UnsignedInteger(17)).unwrap();
        assert_eq!(
            decode_channel_value(&record, &low),
            Some(DecodedValue::UnsignedInteger(5))
        );
        assert_eq!(
            decode_channel_value(&record, &high),
            Some(DecodedValue::UnsignedInteger(17))
        );
    }

    #[test]
    fn encode_decode_preserves_bytes() {
        let cases = [
            layout(DataType::UnsignedIntegerBE, 0, 0, 24),
            layout(DataType::SignedIntegerLE, 0, 0, 64),
            layout(DataType::FloatBE, 0, 0, 32),
            layout(DataType::FloatLE, 0, 0, 64),
            layout(DataType::ByteArray, 0, 0, 64),
        ];
        let bytes = [0x3F, 0x80, 0x01, 0x00, 0x11, 0x22, 0x33, 0x44];
        for l in cases {
            let value = decode_channel_value(&bytes, &l).unwrap();
            let mut out = [0u8; 8];
            out[l.byte_len()..].copy_from_slice(&bytes[l.byte_len()..]);
            encode_channel_value(&mut out, &l, &value).unwrap();
            assert_eq!(out, bytes, "{:?}", l.data_type);
        }
    }

    #[test]
    fn floats_in_both_byte_orders() {
        for data_type in [DataType::FloatLE, DataType::FloatBE] {
            let l = layout(data_type, 2, 0, 64);
            let mut record = [0u8; 10];
            encode_channel_value(&mut record, &l, &DecodedValue::Float(-12.75)).unwrap();
            assert_eq!(
                decode_channel_value(&record, &l),
                Some(DecodedValue::Float(-12.75))
            );
        }
    }

    #[test]
    fn strings_are_truncated_on_char_boundaries() {
        let l = layout(DataType::StringUtf8, 0, 0, 32);
        let mut record = [0xFFu8; 4];
        encode_channel_value(&mut record, &l, &"aé€".into()).unwrap();
        assert_eq!(&record, &[b'a', 0xC3, 0xA9, 0]);
        assert_eq!(
            decode_channel_value(&record, &l),
            Some(DecodedValue::String("aé".into()))
        );

        let utf16 = layout(DataType::StringUtf16BE, 0, 0, 48);
        let mut record = [0u8; 6];
        encode_channel_value(&mut record, &utf16, &"Hi".into()).unwrap();
        assert_eq!(
            decode_channel_value(&record, &utf16),
            Some(DecodedValue::String("Hi".into()))
        );
    }

    #[test]
    fn canopen_types_are_not_integers() {
        let date = CanOpenDate {
            milliseconds: 500,
            minute: 1,
            hour: 2,
            day: 3,
            month: 4,
            year: 2021,
            ..Default::default()
        };
        let l = layout(DataType::CanOpenDate, 0, 0, 56);
        let mut record = [0u8; 7];
        encode_channel_value(&mut record, &l, &DecodedValue::CanOpenDate(date)).unwrap();
        assert_eq!(
            decode_channel_value(&record, &l),
            Some(DecodedValue::CanOpenDate(date))
        );
    }

    #[test]
    fn complex_values() {
        let l = layout(DataType::ComplexLE, 0, 0, 128);
        let mut record = [0u8; 16];
        let value = DecodedValue::Complex { re: 1.5, im: -2.0 };
        encode_channel_value(&mut record, &l, &value).unwrap();
        assert_eq!(decode_channel_value(&record, &l), Some(value));
    }

    #[test]
    fn decoding_fails_closed() {
        let record = [0u8; 4];
        assert_eq!(
            decode_channel_value(&record, &layout(DataType::UnsignedIntegerLE, 2, 0, 32)),
            None
        );
        assert_eq!(
            decode_channel_value(&record, &layout(DataType::FloatLE, 0, 0, 24)),
            None
        );
        assert_eq!(
            decode_channel_value(&record, &layout(DataType::Unknown(99), 0, 0, 8)),
            None
        );
        let mut short = [0u8; 2];
        assert!(
            encode_channel_value(
                &mut short,
                &layout(DataType::UnsignedIntegerLE, 0, 0, 32),
                &DecodedValue::UnsignedInteger(1)
            )
            .is_err()
        );
    }

    #[test]
    fn invalidation_bits() {
        use crate::blocks::channel_block::{CN_FLAG_ALL_INVALID, CN_FLAG_INVAL_BIT_VALID};
        let mut record = [0u8; 3];
        assert!(check_value_validity(&record, 2, 0, 0));
        assert!(!check_value_validity(&record, 2, CN_FLAG_ALL_INVALID, 0));
        set_invalidation_bit(&mut record, 2, 5, true);
        assert_eq!(record[2], 0b0010_0000);
        assert!(!check_value_validity(&record, 2, CN_FLAG_INVAL_BIT_VALID, 5));
        assert!(check_value_validity(&record, 2, CN_FLAG_INVAL_BIT_VALID, 4));
    }
}
