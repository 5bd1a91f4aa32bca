//! Attachment Block (##AT): embedded or referenced files.

use crate::{
    Result,
    blocks::common::{
        BlockHeader, BlockParse, link_at, padding_to_align_8, read_u16, read_u64,
        u64_to_usize, validate_block_id, validate_buffer_size,
    },
};
use alloc::vec::Vec;

/// Size of the AT block without embedded data.
pub const AT_HEADER_SIZE: usize = 96;

pub const AT_FLAG_EMBEDDED: u16 = 0x0001;
pub const AT_FLAG_COMPRESSED: u16 = 0x0002;
pub const AT_FLAG_MD5_VALID: u16 = 0x0004;

#[derive(Debug, Clone)]
pub struct AttachmentBlock {
    pub header: BlockHeader,
    pub next_at_addr: u64,
    pub filename_addr: u64,
    pub mimetype_addr: u64,
    pub comment_addr: u64,
    pub flags: u16,
    pub creator_index: u16,
    pub md5_checksum: [u8; 16],
    pub original_size: u64,
    /// Embedded bytes as stored (deflated when `AT_FLAG_COMPRESSED` is set).
    pub embedded_data: Vec<u8>,
}

impl Default for AttachmentBlock {
    fn default() -> Self {
        Self {
            header: BlockHeader::new("##AT", AT_HEADER_SIZE as u64, 4),
            next_at_addr: 0,
            filename_addr: 0,
            mimetype_addr: 0,
            comment_addr: 0,
            flags: 0,
            creator_index: 0,
            md5_checksum: [0; 16],
            original_size: 0,
            embedded_data: Vec::new(),
        }
    }
}

impl BlockParse<'_> for AttachmentBlock {
    const ID: &'static str = "##AT";

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header = Self::parse_header(bytes)?;
        let links = Self::parse_links(bytes, &header)?;
        let d = 24 + links.len() * 8;
        validate_buffer_size(bytes, d + 40)?;

        let mut md5_checksum = [0u8; 16];
        md5_checksum.copy_from_slice(&bytes[d + 8..d + 24]);
        let embedded_size = u64_to_usize(read_u64(bytes, d + 32), "embedded size")?;
        validate_buffer_size(bytes, d + 40 + embedded_size)?;

        Ok(Self {
            next_at_addr: link_at(&links, 0),
            filename_addr: link_at(&links, 1),
            mimetype_addr: link_at(&links, 2),
            comment_addr: link_at(&links, 3),
            flags: read_u16(bytes, d),
            creator_index: read_u16(bytes, d + 2),
            md5_checksum,
            original_size: read_u64(bytes, d + 24),
            embedded_data: bytes[d + 40..d + 40 + embedded_size].to_vec(),
            header,
        })
    }
}

impl AttachmentBlock {
    /// Sets the block length for the current embedded payload.
    pub fn finish_layout(&mut self) {
        let len = AT_HEADER_SIZE + self.embedded_data.len();
        self.header.length = (len + padding_to_align_8(len)) as u64;
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        validate_block_id(&self.header, "##AT")?;
        let mut buffer = Vec::with_capacity(self.header.length as usize);
        buffer.extend_from_slice(&self.header.to_bytes()?);
        for link in [
            self.next_at_addr,
            self.filename_addr,
            self.mimetype_addr,
            self.comment_addr,
        ] {
            buffer.extend_from_slice(&link.to_le_bytes());
        }
        buffer.extend_from_slice(&self.flags.to_le_bytes());
        buffer.extend_from_slice(&self.creator_index.to_le_bytes());
        buffer.extend_from_slice(&[0u8; 4]);
        buffer.extend_from_slice(&self.md5_checksum);
        buffer.extend_from_slice(&self.original_size.to_le_bytes());
        buffer.extend_from_slice(&(self.embedded_data.len() as u64).to_le_bytes());
        buffer.extend_from_slice(&self.embedded_data);
        buffer.resize(self.header.length as usize, 0);
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_attachment_round_trip() {
        let mut at = AttachmentBlock {
            flags: AT_FLAG_EMBEDDED | AT_FLAG_MD5_VALID,
            creator_index: 1,
            md5_checksum: [7; 16],
            original_size: 5,
            embedded_data: b"hello".to_vec(),
            ..Default::default()
        };
        at.finish_layout();
        let bytes = at.to_bytes().unwrap();
        assert_eq!(bytes.len() % 8, 0);
        let parsed = AttachmentBlock::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.embedded_data, b"hello");
        assert_eq!(parsed.md5_checksum, [7; 16]);
        assert_eq!(parsed.creator_index, 1);
    }
}
