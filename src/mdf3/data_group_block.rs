use alloc::vec::Vec;

use super::{parse_block_header, push_block_header, push_link, read_link};
use crate::blocks::{read_u16, validate_buffer_size};
use crate::{Error, Result};

pub(crate) const DG3_BLOCK_SIZE: usize = 28;

/// MDF3 data group block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dg3Block {
    pub next_dg_addr: u64,
    pub first_cg_addr: u64,
    pub trigger_addr: u64,
    pub data_addr: u64,
    pub cg_count: u16,
    /// 0: no record ids, 1: u8 id before each record, 2: u8 id before and after.
    pub record_id_count: u16,
}

impl Dg3Block {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        parse_block_header(bytes, "DG")?;
        validate_buffer_size(bytes, 24)?;
        let block = Self {
            next_dg_addr: read_link(bytes, 4),
            first_cg_addr: read_link(bytes, 8),
            trigger_addr: read_link(bytes, 12),
            data_addr: read_link(bytes, 16),
            cg_count: read_u16(bytes, 20),
            record_id_count: read_u16(bytes, 22),
        };
        if block.record_id_count > 2 {
            return Err(Error::BlockSerializationError(alloc::format!(
                "invalid MDF3 record id count {}",
                block.record_id_count
            )));
        }
        Ok(block)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::with_capacity(DG3_BLOCK_SIZE);
        push_block_header(&mut buffer, "DG", DG3_BLOCK_SIZE)?;
        push_link(&mut buffer, self.next_dg_addr)?;
        push_link(&mut buffer, self.first_cg_addr)?;
        push_link(&mut buffer, self.trigger_addr)?;
        push_link(&mut buffer, self.data_addr)?;
        buffer.extend_from_slice(&self.cg_count.to_le_bytes());
        buffer.extend_from_slice(&self.record_id_count.to_le_bytes());
        buffer.extend_from_slice(&[0u8; 4]);
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_group_round_trip() {
        let dg = Dg3Block {
            first_cg_addr: 0x100,
            data_addr: 0x400,
            cg_count: 2,
            record_id_count: 1,
            ..Dg3Block::default()
        };
        let bytes = dg.to_bytes().unwrap();
        assert_eq!(bytes.len(), DG3_BLOCK_SIZE);
        assert_eq!(Dg3Block::from_bytes(&bytes).unwrap(), dg);
    }

    #[test]
    fn rejects_unknown_record_id_count() {
        let mut bytes = Dg3Block::default().to_bytes().unwrap();
        bytes[22] = 3;
        assert!(Dg3Block::from_bytes(&bytes).is_err());
    }
}
