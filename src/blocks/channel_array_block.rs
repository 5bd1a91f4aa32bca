use crate::{
    Result,
    blocks::common::{
        BlockHeader, BlockParse, link_at, read_i32, read_u8, read_u16, read_u32, read_u64,
        validate_block_id, validate_buffer_size,
    },
};
use alloc::vec::Vec;

/// `ca_flags` bits that do not add optional links or data fields.
pub const CA_LINK_FREE_FLAGS: u32 = 0x0040 | 0x0080;

/// CABLOCK: array description attached to a channel via its component link.
///
/// Only the composition link is written; the optional link families tied to
/// dynamic sizes, quantities and axes are read past but not resolved.
#[derive(Debug, Clone)]
pub struct ChannelArrayBlock {
    pub header: BlockHeader,
    pub composition_addr: u64,
    pub array_type: u8,
    pub storage: u8,
    pub flags: u32,
    pub byte_offset_base: i32,
    pub inval_bit_pos_base: u32,
    pub dim_sizes: Vec<u64>,
}

impl Default for ChannelArrayBlock {
    fn default() -> Self {
        Self {
            header: BlockHeader::new("##CA", 24 + 8 + 16, 1),
            composition_addr: 0,
            array_type: 0,
            storage: 0,
            flags: 0,
            byte_offset_base: 0,
            inval_bit_pos_base: 0,
            dim_sizes: Vec::new(),
        }
    }
}

impl BlockParse<'_> for ChannelArrayBlock {
    const ID: &'static str = "##CA";

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header = Self::parse_header(bytes)?;
        let links = Self::parse_links(bytes, &header)?;
        let d = 24 + links.len() * 8;
        validate_buffer_size(bytes, d + 16)?;
        let ndim = read_u16(bytes, d + 2) as usize;
        validate_buffer_size(bytes, d + 16 + ndim * 8)?;
        Ok(Self {
            composition_addr: link_at(&links, 0),
            array_type: read_u8(bytes, d),
            storage: read_u8(bytes, d + 1),
            flags: read_u32(bytes, d + 4),
            byte_offset_base: read_i32(bytes, d + 8),
            inval_bit_pos_base: read_u32(bytes, d + 12),
            dim_sizes: (0..ndim).map(|i| read_u64(bytes, d + 16 + i * 8)).collect(),
            header,
        })
    }
}

impl ChannelArrayBlock {
    pub fn finish_layout(&mut self) {
        self.header.link_count = 1;
        self.header.length = (24 + 8 + 16 + self.dim_sizes.len() * 8) as u64;
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        validate_block_id(&self.header, "##CA")?;
        let mut buffer = Vec::with_capacity(self.header.length as usize);
        buffer.extend_from_slice(&self.header.to_bytes()?);
        buffer.extend_from_slice(&self.composition_addr.to_le_bytes());
        buffer.push(self.array_type);
        buffer.push(self.storage);
        buffer.extend_from_slice(&(self.dim_sizes.len() as u16).to_le_bytes());
        buffer.extend_from_slice(&(self.flags & CA_LINK_FREE_FLAGS).to_le_bytes());
        buffer.extend_from_slice(&self.byte_offset_base.to_le_bytes());
        buffer.extend_from_slice(&self.inval_bit_pos_base.to_le_bytes());
        for dim in &self.dim_sizes {
            buffer.extend_from_slice(&dim.to_le_bytes());
        }
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_array_round_trip() {
        let mut ca = ChannelArrayBlock {
            array_type: 1,
            storage: 0,
            byte_offset_base: 8,
            dim_sizes: alloc::vec![3, 4],
            ..Default::default()
        };
        ca.finish_layout();
        let parsed = ChannelArrayBlock::from_bytes(&ca.to_bytes().unwrap()).unwrap();
        assert_eq!(parsed.dim_sizes, alloc::vec![3, 4]);
        assert_eq!(parsed.byte_offset_base, 8);
        assert_eq!(parsed.array_type, 1);
    }
}
