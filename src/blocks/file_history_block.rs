use crate::{
    Result,
    blocks::common::{
        BlockHeader, BlockParse, link_at, read_i16, read_u8, read_u64, validate_block_id,
        validate_buffer_size,
    },
};
use alloc::vec::Vec;

pub const FH_BLOCK_SIZE: usize = 56;

/// FHBLOCK: one entry of the file change log. The details live in the
/// `<FHcomment>` MD block.
#[derive(Debug, Clone)]
pub struct FileHistoryBlock {
    pub header: BlockHeader,
    pub next_fh_addr: u64,
    pub comment_addr: u64,
    pub time_ns: u64,
    pub tz_offset_min: i16,
    pub dst_offset_min: i16,
    pub time_flags: u8,
}

impl Default for FileHistoryBlock {
    fn default() -> Self {
        Self {
            header: BlockHeader::new("##FH", FH_BLOCK_SIZE as u64, 2),
            next_fh_addr: 0,
            comment_addr: 0,
            time_ns: 0,
            tz_offset_min: 0,
            dst_offset_min: 0,
            time_flags: 0,
        }
    }
}

impl BlockParse<'_> for FileHistoryBlock {
    const ID: &'static str = "##FH";

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header = Self::parse_header(bytes)?;
        let links = Self::parse_links(bytes, &header)?;
        let d = 24 + links.len() * 8;
        validate_buffer_size(bytes, d + 13)?;
        Ok(Self {
            next_fh_addr: link_at(&links, 0),
            comment_addr: link_at(&links, 1),
            time_ns: read_u64(bytes, d),
            tz_offset_min: read_i16(bytes, d + 8),
            dst_offset_min: read_i16(bytes, d + 10),
            time_flags: read_u8(bytes, d + 12),
            header,
        })
    }
}

impl FileHistoryBlock {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        validate_block_id(&self.header, "##FH")?;
        let mut buffer = Vec::with_capacity(FH_BLOCK_SIZE);
        buffer.extend_from_slice(&self.header.to_bytes()?);
        buffer.extend_from_slice(&self.next_fh_addr.to_le_bytes());
        buffer.extend_from_slice(&self.comment_addr.to_le_bytes());
        buffer.extend_from_slice(&self.time_ns.to_le_bytes());
        buffer.extend_from_slice(&self.tz_offset_min.to_le_bytes());
        buffer.extend_from_slice(&self.dst_offset_min.to_le_bytes());
        buffer.push(self.time_flags);
        buffer.extend_from_slice(&[0u8; 3]);
        Ok(buffer)
    }
}
