use alloc::vec::Vec;

use super::{parse_block_header, push_block_header, push_link, read_link};
use crate::Result;
use crate::blocks::{read_u16, read_u32, validate_buffer_size};

pub(crate) const CG3_BLOCK_SIZE: usize = 30;

/// MDF3 channel group block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cg3Block {
    pub next_cg_addr: u64,
    pub first_cn_addr: u64,
    pub comment_addr: u64,
    pub record_id: u16,
    pub cn_count: u16,
    /// Record size in bytes, without record ids.
    pub record_size: u16,
    pub record_count: u32,
    /// Sample reduction blocks (3.3 only).
    pub first_sr_addr: u64,
}

impl Cg3Block {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let size = parse_block_header(bytes, "CG")?;
        validate_buffer_size(bytes, 26)?;
        Ok(Self {
            next_cg_addr: read_link(bytes, 4),
            first_cn_addr: read_link(bytes, 8),
            comment_addr: read_link(bytes, 12),
            record_id: read_u16(bytes, 16),
            cn_count: read_u16(bytes, 18),
            record_size: read_u16(bytes, 20),
            record_count: read_u32(bytes, 22),
            first_sr_addr: if size >= CG3_BLOCK_SIZE {
                read_link(bytes, 26)
            } else {
                0
            },
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::with_capacity(CG3_BLOCK_SIZE);
        push_block_header(&mut buffer, "CG", CG3_BLOCK_SIZE)?;
        push_link(&mut buffer, self.next_cg_addr)?;
        push_link(&mut buffer, self.first_cn_addr)?;
        push_link(&mut buffer, self.comment_addr)?;
        buffer.extend_from_slice(&self.record_id.to_le_bytes());
        buffer.extend_from_slice(&self.cn_count.to_le_bytes());
        buffer.extend_from_slice(&self.record_size.to_le_bytes());
        buffer.extend_from_slice(&self.record_count.to_le_bytes());
        push_link(&mut buffer, self.first_sr_addr)?;
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_group_round_trip() {
        let cg = Cg3Block {
            first_cn_addr: 0x300,
            record_id: 2,
            cn_count: 3,
            record_size: 12,
            record_count: 1000,
            ..Cg3Block::default()
        };
        let bytes = cg.to_bytes().unwrap();
        assert_eq!(bytes.len(), CG3_BLOCK_SIZE);
        assert_eq!(Cg3Block::from_bytes(&bytes).unwrap(), cg);
    }
}
