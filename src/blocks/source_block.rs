use super::SI_BLOCK_SIZE;
use crate::{
    Result,
    blocks::common::{
        BlockHeader, BlockParse, link_at, read_u8, validate_block_id, validate_buffer_size,
    },
};
use alloc::vec::Vec;

/// SIBLOCK: origin of a channel group acquisition or of a channel value.
#[derive(Debug, Clone)]
pub struct SourceBlock {
    pub header: BlockHeader,
    pub name_addr: u64,
    pub path_addr: u64,
    pub comment_addr: u64,
    pub source_type: u8,
    pub bus_type: u8,
    /// Bit 0: simulated source.
    pub flags: u8,
}

impl Default for SourceBlock {
    fn default() -> Self {
        Self {
            header: BlockHeader::new("##SI", SI_BLOCK_SIZE as u64, 3),
            name_addr: 0,
            path_addr: 0,
            comment_addr: 0,
            source_type: 0,
            bus_type: 0,
            flags: 0,
        }
    }
}

impl BlockParse<'_> for SourceBlock {
    const ID: &'static str = "##SI";

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header = Self::parse_header(bytes)?;
        let links = Self::parse_links(bytes, &header)?;
        let data_start = 24 + links.len() * 8;
        validate_buffer_size(bytes, data_start + 3)?;

        Ok(Self {
            name_addr: link_at(&links, 0),
            path_addr: link_at(&links, 1),
            comment_addr: link_at(&links, 2),
            source_type: read_u8(bytes, data_start),
            bus_type: read_u8(bytes, data_start + 1),
            flags: read_u8(bytes, data_start + 2),
            header,
        })
    }
}

impl SourceBlock {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        validate_block_id(&self.header, "##SI")?;
        let mut buffer = Vec::with_capacity(SI_BLOCK_SIZE);
        buffer.extend_from_slice(&self.header.to_bytes()?);
        buffer.extend_from_slice(&self.name_addr.to_le_bytes());
        buffer.extend_from_slice(&self.path_addr.to_le_bytes());
        buffer.extend_from_slice(&self.comment_addr.to_le_bytes());
        buffer.push(self.source_type);
        buffer.push(self.bus_type);
        buffer.push(self.flags);
        buffer.extend_from_slice(&[0u8; 5]);
        Ok(buffer)
    }
}
