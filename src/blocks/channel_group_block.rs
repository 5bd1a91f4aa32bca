use super::CG_BLOCK_SIZE;
use crate::{
    Result,
    blocks::common::{
        BlockHeader, BlockParse, link_at, read_u16, read_u32, read_u64, validate_block_id,
        validate_block_length, validate_buffer_size,
    },
};
use alloc::vec::Vec;

pub const CG_NEXT_LINK: u64 = 24;
pub const CG_CYCLE_COUNT: u64 = 80;
/// Offset of `cg_data_bytes`; for VLSD groups the u64 total stream size.
pub const CG_DATA_BYTES: u64 = 96;

/// `cg_flags` bits.
pub const CG_FLAG_VLSD: u16 = 0x0001;
pub const CG_FLAG_BUS_EVENT: u16 = 0x0002;
pub const CG_FLAG_PLAIN_BUS_EVENT: u16 = 0x0004;
pub const CG_FLAG_REMOTE_MASTER: u16 = 0x0008;
pub const CG_FLAG_EVENT_SIGNAL: u16 = 0x0010;

#[derive(Debug, Clone)]
pub struct ChannelGroupBlock {
    pub header: BlockHeader,
    pub next_cg_addr: u64,
    pub first_ch_addr: u64,
    pub acq_name_addr: u64,
    pub acq_source_addr: u64,
    pub first_sample_reduction_addr: u64,
    pub comment_addr: u64,
    pub record_id: u64,
    pub cycle_count: u64,
    pub flags: u16,
    pub path_separator: u16,
    /// Data bytes per record, excluding the record id. For a VLSD group this
    /// is the low half of the total VLSD byte count.
    pub data_bytes: u32,
    pub invalidation_bytes: u32,
}

impl Default for ChannelGroupBlock {
    fn default() -> Self {
        ChannelGroupBlock {
            header: BlockHeader::new("##CG", CG_BLOCK_SIZE as u64, 6),
            next_cg_addr: 0,
            first_ch_addr: 0,
            acq_name_addr: 0,
            acq_source_addr: 0,
            first_sample_reduction_addr: 0,
            comment_addr: 0,
            record_id: 0,
            cycle_count: 0,
            flags: 0,
            path_separator: 0,
            data_bytes: 0,
            invalidation_bytes: 0,
        }
    }
}

impl BlockParse<'_> for ChannelGroupBlock {
    const ID: &'static str = "##CG";

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header = Self::parse_header(bytes)?;
        let links = Self::parse_links(bytes, &header)?;
        let data = 24 + 8 * links.len();
        validate_buffer_size(bytes, data + 32)?;
        Ok(Self {
            next_cg_addr: link_at(&links, 0),
            first_ch_addr: link_at(&links, 1),
            acq_name_addr: link_at(&links, 2),
            acq_source_addr: link_at(&links, 3),
            first_sample_reduction_addr: link_at(&links, 4),
            comment_addr: link_at(&links, 5),
            record_id: read_u64(bytes, data),
            cycle_count: read_u64(bytes, data + 8),
            flags: read_u16(bytes, data + 16),
            path_separator: read_u16(bytes, data + 18),
            data_bytes: read_u32(bytes, data + 24),
            invalidation_bytes: read_u32(bytes, data + 28),
            header,
        })
    }
}

impl ChannelGroupBlock {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        validate_block_id(&self.header, "##CG")?;
        validate_block_length(&self.header, CG_BLOCK_SIZE as u64)?;

        let mut buffer = Vec::with_capacity(CG_BLOCK_SIZE);
        buffer.extend_from_slice(&self.header.to_bytes()?);
        for link in [
            self.next_cg_addr,
            self.first_ch_addr,
            self.acq_name_addr,
            self.acq_source_addr,
            self.first_sample_reduction_addr,
            self.comment_addr,
        ] {
            buffer.extend_from_slice(&link.to_le_bytes());
        }
        buffer.extend_from_slice(&self.record_id.to_le_bytes());
        buffer.extend_from_slice(&self.cycle_count.to_le_bytes());
        buffer.extend_from_slice(&self.flags.to_le_bytes());
        buffer.extend_from_slice(&self.path_separator.to_le_bytes());
        buffer.extend_from_slice(&0u32.to_le_bytes());
        buffer.extend_from_slice(&self.data_bytes.to_le_bytes());
        buffer.extend_from_slice(&self.invalidation_bytes.to_le_bytes());
        debug_assert_eq!(buffer.len(), CG_BLOCK_SIZE);
        Ok(buffer)
    }

    /// Total byte count of a VLSD channel group (data and inval fields combined).
    pub fn vlsd_total_bytes(&self) -> u64 {
        (self.data_bytes as u64) | ((self.invalidation_bytes as u64) << 32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_group_round_trip() {
        let cg = ChannelGroupBlock {
            record_id: 3,
            cycle_count: 42,
            flags: CG_FLAG_BUS_EVENT,
            path_separator: b'.' as u16,
            data_bytes: 17,
            invalidation_bytes: 1,
            ..Default::default()
        };
        let parsed = ChannelGroupBlock::from_bytes(&cg.to_bytes().unwrap()).unwrap();
        assert_eq!(parsed.record_id, 3);
        assert_eq!(parsed.cycle_count, 42);
        assert_eq!(parsed.flags, CG_FLAG_BUS_EVENT);
        assert_eq!(parsed.data_bytes, 17);
        assert_eq!(parsed.invalidation_bytes, 1);
    }
}
