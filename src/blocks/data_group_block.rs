use super::DG_BLOCK_SIZE;
use crate::{
    Result,
    blocks::common::{
        BlockHeader, BlockParse, link_at, read_u8, validate_block_id, validate_block_length,
        validate_buffer_size,
    },
};
use alloc::vec::Vec;

pub const DG_NEXT_LINK: u64 = 24;
pub const DG_DATA_LINK: u64 = 40;

#[derive(Debug, Clone)]
pub struct DataGroupBlock {
    pub header: BlockHeader,
    pub next_dg_addr: u64,
    pub first_cg_addr: u64,
    pub data_block_addr: u64,
    pub comment_addr: u64,
    /// Size of the record id prefix: 0, 1, 2, 4 or 8 bytes.
    pub record_id_size: u8,
}

impl Default for DataGroupBlock {
    fn default() -> Self {
        DataGroupBlock {
            header: BlockHeader::new("##DG", DG_BLOCK_SIZE as u64, 4),
            next_dg_addr: 0,
            first_cg_addr: 0,
            data_block_addr: 0,
            comment_addr: 0,
            record_id_size: 0,
        }
    }
}

impl BlockParse<'_> for DataGroupBlock {
    const ID: &'static str = "##DG";

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header = Self::parse_header(bytes)?;
        let links = Self::parse_links(bytes, &header)?;
        let data = 24 + 8 * links.len();
        validate_buffer_size(bytes, data + 1)?;
        Ok(Self {
            next_dg_addr: link_at(&links, 0),
            first_cg_addr: link_at(&links, 1),
            data_block_addr: link_at(&links, 2),
            comment_addr: link_at(&links, 3),
            record_id_size: read_u8(bytes, data),
            header,
        })
    }
}

impl DataGroupBlock {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        validate_block_id(&self.header, "##DG")?;
        validate_block_length(&self.header, DG_BLOCK_SIZE as u64)?;

        let mut buffer = Vec::with_capacity(DG_BLOCK_SIZE);
        buffer.extend_from_slice(&self.header.to_bytes()?);
        buffer.extend_from_slice(&self.next_dg_addr.to_le_bytes());
        buffer.extend_from_slice(&self.first_cg_addr.to_le_bytes());
        buffer.extend_from_slice(&self.data_block_addr.to_le_bytes());
        buffer.extend_from_slice(&self.comment_addr.to_le_bytes());
        buffer.push(self.record_id_size);
        buffer.extend_from_slice(&[0u8; 7]);
        Ok(buffer)
    }
}
