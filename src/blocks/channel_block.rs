use super::CN_BLOCK_SIZE;
use crate::{
    Result,
    blocks::common::{
        BlockHeader, BlockParse, DataType, link_at, read_f64, read_u8, read_u16, read_u32,
        validate_block_id, validate_block_length, validate_buffer_size,
    },
};
use alloc::vec::Vec;

pub const CN_DATA_LINK: u64 = 64;

/// `cn_flags` bits.
pub const CN_FLAG_ALL_INVALID: u32 = 0x0001;
pub const CN_FLAG_INVAL_BIT_VALID: u32 = 0x0002;
pub const CN_FLAG_PRECISION_VALID: u32 = 0x0004;
pub const CN_FLAG_VALUE_RANGE_VALID: u32 = 0x0008;
pub const CN_FLAG_LIMIT_VALID: u32 = 0x0010;
pub const CN_FLAG_EXTENDED_LIMIT_VALID: u32 = 0x0020;
pub const CN_FLAG_DISCRETE: u32 = 0x0040;
pub const CN_FLAG_CALIBRATION: u32 = 0x0080;
pub const CN_FLAG_CALCULATED: u32 = 0x0100;
pub const CN_FLAG_VIRTUAL: u32 = 0x0200;
pub const CN_FLAG_BUS_EVENT: u32 = 0x0400;
pub const CN_FLAG_STRICTLY_MONOTONOUS: u32 = 0x0800;
pub const CN_FLAG_DEFAULT_X: u32 = 0x1000;

#[derive(Debug, Clone)]
pub struct ChannelBlock {
    pub header: BlockHeader,
    pub next_ch_addr: u64,
    /// CA block or first child CN of a structure channel.
    pub component_addr: u64,
    pub name_addr: u64,
    pub source_addr: u64,
    pub conversion_addr: u64,
    /// SD/DL/CG (VLSD), or length CN (MLSD).
    pub data_addr: u64,
    pub unit_addr: u64,
    pub comment_addr: u64,
    pub channel_type: u8,
    pub sync_type: u8,
    pub data_type: DataType,
    pub bit_offset: u8,
    pub byte_offset: u32,
    pub bit_count: u32,
    pub flags: u32,
    pub pos_invalidation_bit: u32,
    pub precision: u8,
    pub attachment_count: u16,
    pub min_raw_value: f64,
    pub max_raw_value: f64,
    pub lower_limit: f64,
    pub upper_limit: f64,
    pub lower_ext_limit: f64,
    pub upper_ext_limit: f64,
}

impl Default for ChannelBlock {
    fn default() -> Self {
        ChannelBlock {
            header: BlockHeader::new("##CN", CN_BLOCK_SIZE as u64, 8),
            next_ch_addr: 0,
            component_addr: 0,
            name_addr: 0,
            source_addr: 0,
            conversion_addr: 0,
            data_addr: 0,
            unit_addr: 0,
            comment_addr: 0,
            channel_type: 0,
            sync_type: 0,
            data_type: DataType::UnsignedIntegerLE,
            bit_offset: 0,
            byte_offset: 0,
            bit_count: 0,
            flags: 0,
            pos_invalidation_bit: 0,
            precision: 0,
            attachment_count: 0,
            min_raw_value: 0.0,
            max_raw_value: 0.0,
            lower_limit: 0.0,
            upper_limit: 0.0,
            lower_ext_limit: 0.0,
            upper_ext_limit: 0.0,
        }
    }
}

impl BlockParse<'_> for ChannelBlock {
    const ID: &'static str = "##CN";

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header = Self::parse_header(bytes)?;
        let links = Self::parse_links(bytes, &header)?;
        // Attachment and default-X links may follow the eight fixed ones.
        let d = 24 + 8 * links.len();
        validate_buffer_size(bytes, d + 72)?;

        Ok(Self {
            next_ch_addr: link_at(&links, 0),
            component_addr: link_at(&links, 1),
            name_addr: link_at(&links, 2),
            source_addr: link_at(&links, 3),
            conversion_addr: link_at(&links, 4),
            data_addr: link_at(&links, 5),
            unit_addr: link_at(&links, 6),
            comment_addr: link_at(&links, 7),
            channel_type: read_u8(bytes, d),
            sync_type: read_u8(bytes, d + 1),
            data_type: DataType::from_u8(read_u8(bytes, d + 2)),
            bit_offset: read_u8(bytes, d + 3),
            byte_offset: read_u32(bytes, d + 4),
            bit_count: read_u32(bytes, d + 8),
            flags: read_u32(bytes, d + 12),
            pos_invalidation_bit: read_u32(bytes, d + 16),
            precision: read_u8(bytes, d + 20),
            attachment_count: read_u16(bytes, d + 22),
            min_raw_value: read_f64(bytes, d + 24),
            max_raw_value: read_f64(bytes, d + 32),
            lower_limit: read_f64(bytes, d + 40),
            upper_limit: read_f64(bytes, d + 48),
            lower_ext_limit: read_f64(bytes, d + 56),
            upper_ext_limit: read_f64(bytes, d + 64),
            header,
        })
    }
}

impl ChannelBlock {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        validate_block_id(&self.header, "##CN")?;
        validate_block_length(&self.header, CN_BLOCK_SIZE as u64)?;

        let mut buffer = Vec::with_capacity(CN_BLOCK_SIZE);
        buffer.extend_from_slice(&self.header.to_bytes()?);
        for link in [
            self.next_ch_addr,
            self.component_addr,
            self.name_addr,
            self.source_addr,
            self.conversion_addr,
            self.data_addr,
            self.unit_addr,
            self.comment_addr,
        ] {
            buffer.extend_from_slice(&link.to_le_bytes());
        }
        buffer.push(self.channel_type);
        buffer.push(self.sync_type);
        buffer.push(self.data_type.to_u8());
        buffer.push(self.bit_offset);
        buffer.extend_from_slice(&self.byte_offset.to_le_bytes());
        buffer.extend_from_slice(&self.bit_count.to_le_bytes());
        buffer.extend_from_slice(&self.flags.to_le_bytes());
        buffer.extend_from_slice(&self.pos_invalidation_bit.to_le_bytes());
        buffer.push(self.precision);
        buffer.push(0);
        buffer.extend_from_slice(&self.attachment_count.to_le_bytes());
        for value in [
            self.min_raw_value,
            self.max_raw_value,
            self.lower_limit,
            self.upper_limit,
            self.lower_ext_limit,
            self.upper_ext_limit,
        ] {
            buffer.extend_from_slice(&value.to_le_bytes());
        }
        debug_assert_eq!(buffer.len(), CN_BLOCK_SIZE);
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_block_round_trip() {
        let cn = ChannelBlock {
            channel_type: 2,
            sync_type: 1,
            data_type: DataType::FloatLE,
            byte_offset: 4,
            bit_count: 64,
            flags: CN_FLAG_INVAL_BIT_VALID,
            pos_invalidation_bit: 3,
            upper_limit: 10.0,
            ..Default::default()
        };
        let bytes = cn.to_bytes().unwrap();
        let parsed = ChannelBlock::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.channel_type, 2);
        assert_eq!(parsed.data_type, DataType::FloatLE);
        assert_eq!(parsed.byte_offset, 4);
        assert_eq!(parsed.pos_invalidation_bit, 3);
        assert_eq!(parsed.upper_limit, 10.0);
    }
}
